use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue};
use rusty_ytdl::{
    RequestOptions, Video, VideoError, VideoFormat, VideoOptions, VideoQuality,
    VideoSearchOptions,
};
use secrecy::ExposeSecret;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use super::{
    BROWSER_HEADERS, DownloadRequest, Extractor, ExtractorError, VideoInfo, random_user_agent,
};
use crate::{
    configuration::ExtractorSettings,
    cookies::{CookieSource, netscape},
    domain::{MediaFormat, VideoUrl},
};

const PROGRESS_STEP: u64 = 5 * 1024 * 1024;

/// In-process extraction with `rusty_ytdl`.
pub struct Native {
    settings: ExtractorSettings,
}

impl Native {
    pub fn new(settings: ExtractorSettings) -> Self {
        Self { settings }
    }

    async fn client(&self, cookies: &CookieSource) -> Result<reqwest::Client, ExtractorError> {
        let mut headers = HeaderMap::new();
        for (name, value) in BROWSER_HEADERS {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }

        let jar = cookies.load().await?;
        if let Some(header) = netscape::cookie_header(&jar, "www.youtube.com", Utc::now().timestamp())
        {
            let mut value = HeaderValue::from_str(header.expose_secret())
                .map_err(|e| ExtractorError::failed(format!("Invalid cookie value: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        Ok(reqwest::Client::builder()
            .user_agent(random_user_agent())
            .default_headers(headers)
            .connect_timeout(self.settings.socket_timeout)
            .danger_accept_invalid_certs(self.settings.skip_certificate_check)
            .build()?)
    }

    async fn video(
        &self,
        url: &VideoUrl,
        cookies: &CookieSource,
        filter: VideoSearchOptions,
    ) -> Result<Video, ExtractorError> {
        let video_options = VideoOptions {
            quality: VideoQuality::Highest,
            filter,
            request_options: RequestOptions {
                client: Some(self.client(cookies).await?),
                ..Default::default()
            },
            ..Default::default()
        };
        Ok(Video::new_with_options(url.to_string(), video_options)?)
    }
}

impl From<VideoError> for ExtractorError {
    fn from(e: VideoError) -> Self {
        ExtractorError::failed(e.to_string())
    }
}

fn to_media_format(format: &VideoFormat) -> MediaFormat {
    let mime = &format.mime_type;
    let resolution = match (format.width, format.height) {
        (Some(width), Some(height)) if format.has_video => Some(format!("{}x{}", width, height)),
        _ => None,
    };
    MediaFormat {
        format_id: format.itag.to_string(),
        ext: mime.container.clone(),
        acodec: if format.has_audio {
            mime.audio_codec.clone().or_else(|| Some("unknown".to_string()))
        } else {
            Some("none".to_string())
        },
        vcodec: if format.has_video {
            mime.video_codec.clone().or_else(|| Some("unknown".to_string()))
        } else {
            Some("none".to_string())
        },
        abr: (format.has_audio && !format.has_video).then(|| format.bitrate as f64 / 1000.0),
        resolution,
        filesize: format.content_length.as_deref().and_then(|len| len.parse().ok()),
        note: format.quality_label.clone(),
    }
}

#[async_trait]
impl Extractor for Native {
    #[instrument(name = "Probing video with rusty_ytdl", skip_all, fields(url = %url))]
    async fn probe(
        &self,
        url: &VideoUrl,
        cookies: &CookieSource,
    ) -> Result<VideoInfo, ExtractorError> {
        let video = self.video(url, cookies, VideoSearchOptions::Audio).await?;
        let info = video.get_info().await?;
        let details = &info.video_details;

        Ok(VideoInfo {
            id: details.video_id.clone(),
            title: details.title.clone(),
            uploader: Some(details.owner_channel_name.clone()).filter(|name| !name.is_empty()),
            duration: details.length_seconds.parse().ok(),
            formats: info.formats.iter().map(to_media_format).collect(),
        })
    }

    #[instrument(name = "Downloading with rusty_ytdl", skip_all, fields(url = %request.url))]
    async fn download(&self, request: &DownloadRequest<'_>) -> Result<PathBuf, ExtractorError> {
        let Some(format) = request.choice.format() else {
            return Err(ExtractorError::failed(
                "Requested format is not available: no stream carries audio",
            ));
        };
        let itag: u64 = format.format_id.parse().map_err(|_| {
            ExtractorError::failed(format!(
                "Requested format is not available: {}",
                format.format_id
            ))
        })?;
        let filter =
            VideoSearchOptions::Custom(Arc::new(move |candidate: &VideoFormat| candidate.itag == itag));
        let ext = &format.ext;

        let video = self.video(request.url, request.cookies, filter).await?;
        let path = request
            .staging_dir
            .join(format!("{}.{}", request.url.id(), ext));
        let mut file = tokio::fs::File::create(&path).await?;

        info!("Downloading audio from YouTube...");
        let stream = video.stream().await?;
        let mut downloaded: u64 = 0;
        let mut next_report = PROGRESS_STEP;
        while let Some(chunk) = stream.chunk().await? {
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            if downloaded >= next_report {
                if request.show_progress {
                    info!("Downloaded {:.1}MB so far", downloaded as f64 / 1024.0 / 1024.0);
                } else {
                    debug!("Downloaded {} bytes so far", downloaded);
                }
                next_report += PROGRESS_STEP;
            }
        }
        file.flush().await?;

        info!("Downloaded {} bytes to {}", downloaded, path.display());
        Ok(path)
    }
}
