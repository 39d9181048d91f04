use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::{
    configuration::{Backend, Settings},
    cookies::CookieSource,
    domain::{AudioFormat, FileName, FormatChoice, MediaFormat, VideoUrl, select_audio_format},
    error::{AppError, YouTubeFailure},
    transcode::{Ffmpeg, Transcoder, can_copy, needs_conversion},
    youtube::{
        DownloadRequest, Extractor, ExtractorError, Native, VideoInfo, YtDlp,
        render_format_table,
    },
};

/// What ended up on disk after a successful download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadReport {
    pub path: PathBuf,
    pub title: String,
    pub converted: bool,
}

pub struct Application {
    settings: Settings,
    extractor: Box<dyn Extractor>,
    transcoder: Box<dyn Transcoder>,
}

impl Application {
    #[instrument(name = "Building Application", skip_all)]
    pub async fn build(settings: Settings) -> Self {
        info!("Building application.");
        debug!("Extractor configuration: {:?}", settings.extractor_cfg);
        let extractor: Box<dyn Extractor> = match settings.extractor_cfg.backend {
            Backend::Ytdlp => Box::new(YtDlp::new(settings.extractor_cfg.clone())),
            Backend::Native => Box::new(Native::new(settings.extractor_cfg.clone())),
        };

        debug!("Encoder configuration: {:?}", settings.encoder_cfg);
        let ffmpeg = Ffmpeg::new(settings.encoder_cfg.clone(), settings.audio_format);
        if settings.audio_format != AudioFormat::Original {
            if let Err(e) = ffmpeg.verify().await {
                warn!("{}. Downloads that need conversion will fail.", e);
            }
        }

        Self::new(settings, extractor, Box::new(ffmpeg))
    }

    pub fn new(
        settings: Settings,
        extractor: Box<dyn Extractor>,
        transcoder: Box<dyn Transcoder>,
    ) -> Self {
        Self {
            settings,
            extractor,
            transcoder,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[instrument(name = "Downloading audio", skip(self), fields(url = %url))]
    pub async fn download(&self, url: &VideoUrl) -> Result<DownloadReport, AppError> {
        let download_dir = self.ensure_download_dir().await?;
        let cookies = self.resolve_cookies().await;

        info!("Checking video availability...");
        let info = self.probe(url, &cookies).await?;
        info!("Video found: {}", info.title);

        let choice = select_audio_format(&info.formats, self.settings.audio_quality);
        self.announce(&choice);

        let staging = tempfile::Builder::new()
            .prefix(".yt-audio-dl-")
            .tempdir_in(&download_dir)
            .map_err(|e| AppError::io("Failed to create staging directory", e))?;

        info!("Starting download...");
        let request = DownloadRequest {
            url,
            choice: &choice,
            cookies: &cookies,
            staging_dir: staging.path(),
            show_progress: self.settings.show_progress,
        };
        let downloaded = match self.extractor.download(&request).await {
            Ok(path) => path,
            Err(e) => return Err(self.fail(e, url, &cookies).await),
        };

        let target = self.settings.audio_format;
        let converted = needs_conversion(&downloaded, target);
        let file = if converted {
            let source_codec = choice.format().and_then(MediaFormat::codec_family);
            let copy_audio = can_copy(source_codec.as_deref(), target);
            if copy_audio {
                info!("Moving {} audio into a .{} file...", target, target);
            } else {
                info!("Converting to {} format...", target);
            }
            self.transcoder.convert(&downloaded, copy_audio).await?
        } else {
            downloaded
        };

        let ext = file
            .extension()
            .and_then(|ext| ext.to_str())
            .or(self.settings.audio_format.extension())
            .unwrap_or("audio");
        let destination =
            FileName::sanitize(&info.title, url.id()).unique_destination(&download_dir, ext);
        move_file(&file, &destination).await?;

        info!("Download completed! File saved in: {}", download_dir.display());
        Ok(DownloadReport {
            path: destination,
            title: info.title,
            converted,
        })
    }

    /// Prints the format table for `url` and returns the listed formats.
    #[instrument(name = "Listing formats", skip(self), fields(url = %url))]
    pub async fn list_formats(&self, url: &VideoUrl) -> Result<Vec<MediaFormat>, AppError> {
        let cookies = self.resolve_cookies().await;
        info!("Checking video availability...");
        let info = self.probe(url, &cookies).await?;
        info!("Video found: {}", info.title);
        print!("{}", render_format_table(&info.formats));
        Ok(info.formats)
    }

    async fn ensure_download_dir(&self) -> Result<PathBuf, AppError> {
        let dir = &self.settings.download_directory;
        if dir.is_dir() {
            return Ok(dir.clone());
        }
        if !self.settings.create_directory_if_missing {
            return Err(AppError::MissingDirectory(dir.clone()));
        }
        info!("Creating download directory {}", dir.display());
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::io("Failed to create download directory", e))?;
        Ok(dir.clone())
    }

    async fn resolve_cookies(&self) -> CookieSource {
        CookieSource::resolve(
            &self.settings.cookies_cfg,
            self.extractor.supports_browser_delegation(),
        )
        .await
    }

    async fn probe(&self, url: &VideoUrl, cookies: &CookieSource) -> Result<VideoInfo, AppError> {
        match self.extractor.probe(url, cookies).await {
            Ok(info) => Ok(info),
            Err(e) => Err(self.fail(e, url, cookies).await),
        }
    }

    fn announce(&self, choice: &FormatChoice) {
        match choice {
            FormatChoice::Opus(_) => {
                info!("Found opus audio format - perfect match!");
                if self.settings.audio_format == AudioFormat::Opus {
                    info!("Will download opus directly - no conversion needed");
                }
            }
            FormatChoice::AudioOnly(format) => info!(
                "Found audio-only format ({}) - minimal conversion needed",
                format.acodec.as_deref().unwrap_or("unknown")
            ),
            FormatChoice::ExtractFromVideo(_) => {
                info!("No audio-only format available - will extract audio from video")
            }
        }
    }

    /// Shows what is on offer when the chosen format turned out to be unavailable.
    async fn fail(&self, error: ExtractorError, url: &VideoUrl, cookies: &CookieSource) -> AppError {
        if error.failure() == YouTubeFailure::FormatUnavailable {
            match self.extractor.probe(url, cookies).await {
                Ok(info) => print!("{}", render_format_table(&info.formats)),
                Err(e) => debug!("Could not list formats: {}", e),
            }
        }
        error.into()
    }
}

/// Rename when possible, copy and remove across filesystems.
async fn move_file(from: &Path, to: &Path) -> Result<(), AppError> {
    if let Err(e) = tokio::fs::rename(from, to).await {
        debug!("Rename failed ({}), copying instead", e);
        tokio::fs::copy(from, to)
            .await
            .map_err(|e| AppError::io(format!("Failed to save {}", to.display()), e))?;
        if let Err(e) = tokio::fs::remove_file(from).await {
            warn!("Could not remove {}: {}", from.display(), e);
        }
    }
    Ok(())
}
