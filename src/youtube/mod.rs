use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{
    cookies::{CookieError, CookieSource},
    domain::{FormatChoice, MediaFormat, VideoUrl},
    error::YouTubeFailure,
};

mod formats;
mod headers;
mod native;
mod ytdlp;

pub use formats::render_format_table;
pub use headers::{BROWSER_HEADERS, random_user_agent};
pub use native::Native;
pub use ytdlp::{FALLBACK_SELECTOR, YtDlp, format_selector};

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub uploader: Option<String>,
    /// Seconds.
    pub duration: Option<f64>,
    pub formats: Vec<MediaFormat>,
}

pub struct DownloadRequest<'a> {
    pub url: &'a VideoUrl,
    pub choice: &'a FormatChoice,
    pub cookies: &'a CookieSource,
    /// Empty directory the single downloaded file is written into.
    pub staging_dir: &'a Path,
    pub show_progress: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractorError {
    #[error("{tool} could not be started, is it installed and on PATH?")]
    ToolMissing {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{message}")]
    Failed {
        failure: YouTubeFailure,
        message: String,
    },
    #[error("Unexpected extractor output")]
    Output(#[from] serde_json::Error),
    #[error("Extractor finished without producing a file in {}", .0.display())]
    NoOutput(PathBuf),
    #[error(transparent)]
    Cookies(#[from] CookieError),
    #[error("Failed to build HTTP client")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExtractorError {
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        ExtractorError::Failed {
            failure: YouTubeFailure::classify(&message),
            message,
        }
    }

    pub fn failure(&self) -> YouTubeFailure {
        match self {
            ExtractorError::Failed { failure, .. } => *failure,
            _ => YouTubeFailure::Other,
        }
    }
}

/// Something that can look up a video and fetch one of its streams.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn probe(&self, url: &VideoUrl, cookies: &CookieSource)
    -> Result<VideoInfo, ExtractorError>;

    async fn download(&self, request: &DownloadRequest<'_>) -> Result<PathBuf, ExtractorError>;

    /// Whether encrypted browser stores can be handed over by name.
    fn supports_browser_delegation(&self) -> bool {
        false
    }
}

/// The single finished file an extractor left in `dir`.
pub(crate) async fn staged_file(dir: &Path) -> Result<PathBuf, ExtractorError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let partial = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "part" | "ytdl" | "temp"));
        if entry.file_type().await?.is_file() && !partial {
            return Ok(path);
        }
    }
    Err(ExtractorError::NoOutput(dir.to_path_buf()))
}
