use std::{
    path::{Path, PathBuf},
    sync::{Arc, LazyLock, Mutex},
};

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::instrument;
use yt_audio_dl::{
    configuration::{CookieSettings, Settings},
    cookies::CookieSource,
    domain::{AudioFormat, FormatChoice, MediaFormat, VideoUrl},
    startup::Application,
    telemetry::init_subscriber,
    transcode::{TranscodeError, Transcoder},
    youtube::{DownloadRequest, Extractor, ExtractorError, VideoInfo},
};

static TRACING: LazyLock<()> = LazyLock::new(|| {
    init_subscriber(false);
});

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";

pub fn video_url() -> VideoUrl {
    VideoUrl::parse(format!("https://www.youtube.com/watch?v={}", VIDEO_ID)).unwrap()
}

pub fn audio(id: &str, ext: &str, codec: &str, abr: f64) -> MediaFormat {
    MediaFormat {
        format_id: id.into(),
        ext: ext.into(),
        acodec: Some(codec.into()),
        vcodec: Some("none".into()),
        abr: Some(abr),
        resolution: Some("audio only".into()),
        filesize: Some(3_500_000),
        note: None,
    }
}

pub fn combined(id: &str) -> MediaFormat {
    MediaFormat {
        format_id: id.into(),
        ext: "mp4".into(),
        acodec: Some("mp4a.40.2".into()),
        vcodec: Some("avc1.64001F".into()),
        abr: None,
        resolution: Some("1280x720".into()),
        filesize: None,
        note: Some("720p".into()),
    }
}

pub fn video_info(title: &str, formats: Vec<MediaFormat>) -> VideoInfo {
    VideoInfo {
        id: VIDEO_ID.into(),
        title: title.into(),
        uploader: Some("Uploader".into()),
        duration: Some(212.0),
        formats,
    }
}

#[derive(Debug, Clone)]
pub struct RecordedDownload {
    pub choice: FormatChoice,
    pub staging_dir: PathBuf,
    pub cookie_file: Option<PathBuf>,
}

#[derive(Default)]
pub struct Calls {
    pub probes: usize,
    pub downloads: Vec<RecordedDownload>,
    /// Input file and whether the audio stream was copied.
    pub conversions: Vec<(PathBuf, bool)>,
}

/// Serves a canned `VideoInfo` and drops a file into the staging directory.
pub struct FakeExtractor {
    info: VideoInfo,
    download_error: Option<String>,
    calls: Arc<Mutex<Calls>>,
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn probe(
        &self,
        _url: &VideoUrl,
        _cookies: &CookieSource,
    ) -> Result<VideoInfo, ExtractorError> {
        self.calls.lock().unwrap().probes += 1;
        Ok(self.info.clone())
    }

    async fn download(&self, request: &DownloadRequest<'_>) -> Result<PathBuf, ExtractorError> {
        self.calls.lock().unwrap().downloads.push(RecordedDownload {
            choice: request.choice.clone(),
            staging_dir: request.staging_dir.to_path_buf(),
            cookie_file: request.cookies.file().map(Path::to_path_buf),
        });
        if let Some(message) = &self.download_error {
            return Err(ExtractorError::failed(message.clone()));
        }

        let ext = request
            .choice
            .format()
            .map(|f| f.ext.clone())
            .unwrap_or_else(|| "mp4".into());
        let path = request
            .staging_dir
            .join(format!("{}.{}", request.url.id(), ext));
        tokio::fs::write(&path, b"downloaded").await?;
        Ok(path)
    }
}

/// Swaps the extension and marks the content as converted.
pub struct FakeTranscoder {
    target: AudioFormat,
    fail: bool,
    calls: Arc<Mutex<Calls>>,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn convert(&self, input: &Path, copy_audio: bool) -> Result<PathBuf, TranscodeError> {
        self.calls
            .lock()
            .unwrap()
            .conversions
            .push((input.to_path_buf(), copy_audio));
        if self.fail {
            return Err(TranscodeError::Failed {
                input: input.to_path_buf(),
                stderr: "Invalid data found when processing input".into(),
            });
        }
        let output = input.with_extension(self.target.extension().unwrap_or("bin"));
        tokio::fs::write(&output, b"converted").await?;
        tokio::fs::remove_file(input).await?;
        Ok(output)
    }
}

pub struct TestApp {
    pub app: Application,
    pub download_dir: PathBuf,
    pub calls: Arc<Mutex<Calls>>,
    _root: TempDir,
}

pub struct TestAppBuilder {
    info: VideoInfo,
    audio_format: AudioFormat,
    download_error: Option<String>,
    transcode_fails: bool,
    create_directory: bool,
    cookies: CookieSettings,
}

impl TestAppBuilder {
    pub fn new(info: VideoInfo) -> Self {
        Self {
            info,
            audio_format: AudioFormat::Opus,
            download_error: None,
            transcode_fails: false,
            create_directory: true,
            cookies: CookieSettings {
                use_browser_cookies: false,
                custom_cookies_file: None,
                browsers: Vec::new(),
            },
        }
    }

    pub fn audio_format(mut self, format: AudioFormat) -> Self {
        self.audio_format = format;
        self
    }

    pub fn download_error(mut self, message: &str) -> Self {
        self.download_error = Some(message.into());
        self
    }

    pub fn transcode_fails(mut self) -> Self {
        self.transcode_fails = true;
        self
    }

    pub fn without_directory_creation(mut self) -> Self {
        self.create_directory = false;
        self
    }

    pub fn cookie_file(mut self, path: &Path) -> Self {
        self.cookies.custom_cookies_file = Some(path.to_path_buf());
        self
    }

    #[instrument(name = "Spawning Test App", skip_all)]
    pub fn spawn(self) -> TestApp {
        LazyLock::force(&TRACING);
        let root = tempfile::tempdir().unwrap();
        let download_dir = root.path().join("Music").join("YouTube");

        let mut settings: Settings = serde_json::from_value(serde_json::json!({
            "download_directory": download_dir,
            "create_directory_if_missing": self.create_directory,
            "show_progress": false,
        }))
        .unwrap();
        settings.audio_format = self.audio_format;
        settings.cookies_cfg = self.cookies;

        let calls = Arc::new(Mutex::new(Calls::default()));
        let extractor = FakeExtractor {
            info: self.info,
            download_error: self.download_error,
            calls: calls.clone(),
        };
        let transcoder = FakeTranscoder {
            target: self.audio_format,
            fail: self.transcode_fails,
            calls: calls.clone(),
        };

        TestApp {
            app: Application::new(settings, Box::new(extractor), Box::new(transcoder)),
            download_dir,
            calls,
            _root: root,
        }
    }
}

impl TestApp {
    /// Everything left in the download directory, hidden staging directories included.
    pub fn saved_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.download_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
