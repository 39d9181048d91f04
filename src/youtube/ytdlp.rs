use std::{
    ffi::OsString,
    path::PathBuf,
    process::{Output, Stdio},
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::{
    BROWSER_HEADERS, DownloadRequest, Extractor, ExtractorError, VideoInfo, random_user_agent,
    staged_file,
};
use crate::{
    configuration::ExtractorSettings,
    cookies::CookieSource,
    domain::{FormatChoice, MediaFormat, VideoUrl},
};

/// Used when no specific audio stream was picked up front.
pub const FALLBACK_SELECTOR: &str =
    "bestaudio[ext=opus]/bestaudio[ext=m4a]/bestaudio[ext=webm]/bestaudio/best";

pub fn format_selector(choice: &FormatChoice) -> String {
    match choice.format() {
        Some(format) => format!("{}/bestaudio/best", format.format_id),
        None => FALLBACK_SELECTOR.to_string(),
    }
}

/// Extraction through the `yt-dlp` executable.
pub struct YtDlp {
    settings: ExtractorSettings,
}

impl YtDlp {
    pub fn new(settings: ExtractorSettings) -> Self {
        Self { settings }
    }

    fn common_args(&self, cookies: &CookieSource) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--no-playlist".into(),
            "--socket-timeout".into(),
            self.settings.socket_timeout.as_secs().to_string().into(),
            "--user-agent".into(),
            random_user_agent().into(),
        ];
        for (name, value) in BROWSER_HEADERS {
            args.push("--add-header".into());
            args.push(format!("{}:{}", name, value).into());
        }
        if self.settings.skip_certificate_check {
            args.push("--no-check-certificates".into());
        }
        if let Some(file) = cookies.file() {
            args.push("--cookies".into());
            args.push(file.as_os_str().to_owned());
        } else if let Some(browser) = cookies.browser() {
            args.push("--cookies-from-browser".into());
            args.push(browser.ytdlp_name().into());
        }
        args
    }

    pub fn probe_args(&self, url: &VideoUrl, cookies: &CookieSource) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-J".into(), "--no-warnings".into()];
        args.extend(self.common_args(cookies));
        args.push(url.to_string().into());
        args
    }

    pub fn download_args(&self, request: &DownloadRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            format_selector(request.choice).into(),
            "-o".into(),
            request
                .staging_dir
                .join("%(id)s.%(ext)s")
                .into_os_string(),
            "--retries".into(),
            self.settings.retries.to_string().into(),
            "--fragment-retries".into(),
            self.settings.fragment_retries.to_string().into(),
            "--abort-on-unavailable-fragments".into(),
            "--no-part".into(),
        ];
        if !request.show_progress {
            args.push("--quiet".into());
            args.push("--no-progress".into());
        }
        args.extend(self.common_args(request.cookies));
        args.push(request.url.to_string().into());
        args
    }

    async fn run(&self, args: Vec<OsString>, show_output: bool) -> Result<Output, ExtractorError> {
        debug!(binary = %self.settings.ytdlp_path.display(), ?args, "Running yt-dlp");
        let mut command = Command::new(&self.settings.ytdlp_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if show_output {
            command.stdout(Stdio::inherit());
        } else {
            command.stdout(Stdio::piped());
        }

        let output = command.output().await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ExtractorError::ToolMissing {
                    tool: self.settings.ytdlp_path.display().to_string(),
                    source,
                }
            } else {
                ExtractorError::Io(source)
            }
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(ExtractorError::failed(error_message(&stderr)));
        }
        for line in stderr.lines().filter(|line| line.starts_with("WARNING")) {
            warn!("{}", line);
        }
        Ok(output)
    }
}

/// The `ERROR:` lines yt-dlp printed, or its whole stderr when there are none.
fn error_message(stderr: &str) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .filter(|line| line.starts_with("ERROR"))
        .collect();
    if errors.is_empty() {
        let trimmed = stderr.trim();
        if trimmed.is_empty() {
            "yt-dlp exited with an error".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        errors.join("\n")
    }
}

#[derive(Deserialize)]
struct RawInfo {
    id: String,
    title: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Deserialize)]
struct RawFormat {
    format_id: String,
    ext: Option<String>,
    acodec: Option<String>,
    vcodec: Option<String>,
    abr: Option<f64>,
    resolution: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    format_note: Option<String>,
}

impl From<RawFormat> for MediaFormat {
    fn from(raw: RawFormat) -> Self {
        MediaFormat {
            format_id: raw.format_id,
            ext: raw.ext.unwrap_or_else(|| "unknown".to_string()),
            acodec: raw.acodec,
            vcodec: raw.vcodec,
            abr: raw.abr,
            resolution: raw.resolution,
            filesize: raw.filesize.or(raw.filesize_approx).map(|size| size as u64),
            note: raw.format_note,
        }
    }
}

pub(crate) fn parse_info(json: &[u8]) -> Result<VideoInfo, ExtractorError> {
    let raw: RawInfo = serde_json::from_slice(json)?;
    Ok(VideoInfo {
        title: raw.title.unwrap_or_else(|| "Unknown title".to_string()),
        id: raw.id,
        uploader: raw.uploader,
        duration: raw.duration,
        formats: raw.formats.into_iter().map(MediaFormat::from).collect(),
    })
}

#[async_trait]
impl Extractor for YtDlp {
    #[instrument(name = "Probing video with yt-dlp", skip_all, fields(url = %url))]
    async fn probe(
        &self,
        url: &VideoUrl,
        cookies: &CookieSource,
    ) -> Result<VideoInfo, ExtractorError> {
        let output = self.run(self.probe_args(url, cookies), false).await?;
        parse_info(&output.stdout)
    }

    #[instrument(name = "Downloading with yt-dlp", skip_all, fields(url = %request.url))]
    async fn download(&self, request: &DownloadRequest<'_>) -> Result<PathBuf, ExtractorError> {
        self.run(self.download_args(request), request.show_progress)
            .await?;
        let path = staged_file(request.staging_dir).await?;
        info!("Downloaded {}", path.display());
        Ok(path)
    }

    fn supports_browser_delegation(&self) -> bool {
        true
    }
}
