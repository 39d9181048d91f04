use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::{configuration::EncoderSettings, domain::AudioFormat};

#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    #[error("{tool} could not be started, is it installed and on PATH?")]
    ToolMissing {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("ffmpeg could not convert {}: {stderr}", .input.display())]
    Failed { input: PathBuf, stderr: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Whether `path` has to go through the encoder to end up as `target`.
pub fn needs_conversion(path: &Path, target: AudioFormat) -> bool {
    let Some(wanted) = target.extension() else {
        return false;
    };
    !path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

pub fn output_path(input: &Path, target: AudioFormat) -> PathBuf {
    match target.extension() {
        Some(ext) => input.with_extension(ext),
        None => input.to_path_buf(),
    }
}

/// Whether a stream in `source_codec` can go into the `target` container untouched.
pub fn can_copy(source_codec: Option<&str>, target: AudioFormat) -> bool {
    let Some(codec) = source_codec.map(str::to_lowercase) else {
        return false;
    };
    match target {
        AudioFormat::Opus => codec == "opus",
        AudioFormat::M4a => matches!(codec.as_str(), "mp4a" | "aac"),
        AudioFormat::Mp3 => codec == "mp3",
        AudioFormat::Flac => codec == "flac",
        AudioFormat::Original => false,
    }
}

pub fn ffmpeg_args(
    input: &Path,
    output: &Path,
    target: AudioFormat,
    settings: &EncoderSettings,
    copy_audio: bool,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-nostdin".into(),
        "-v".into(),
        "warning".into(),
        "-y".into(),
        "-i".into(),
        input.into(),
        "-vn".into(),
    ];
    if copy_audio {
        args.extend(["-c:a".into(), "copy".into(), output.into()]);
        return args;
    }
    if let Some(codec) = target.codec() {
        args.extend(["-c:a".into(), codec.into()]);
    }
    if !target.is_lossless() {
        args.extend(["-b:a".into(), format!("{}k", settings.bitrate_kbps).into()]);
    }
    args.extend([
        "-ar".into(),
        settings.sample_rate.to_string().into(),
        "-ac".into(),
        settings.channels.to_string().into(),
        output.into(),
    ]);
    args
}

/// Re-encodes a downloaded file into the configured audio format.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the converted file. The input is gone afterwards.
    ///
    /// With `copy_audio` the audio stream is only moved into the target container.
    async fn convert(&self, input: &Path, copy_audio: bool) -> Result<PathBuf, TranscodeError>;
}

pub struct Ffmpeg {
    settings: EncoderSettings,
    target: AudioFormat,
}

impl Ffmpeg {
    pub fn new(settings: EncoderSettings, target: AudioFormat) -> Self {
        Self { settings, target }
    }

    fn tool_missing(&self, source: std::io::Error) -> TranscodeError {
        if source.kind() == std::io::ErrorKind::NotFound {
            TranscodeError::ToolMissing {
                tool: self.settings.ffmpeg_path.display().to_string(),
                source,
            }
        } else {
            TranscodeError::Io(source)
        }
    }

    /// Checks that the encoder binary can be started at all.
    #[instrument(name = "Checking ffmpeg", skip(self))]
    pub async fn verify(&self) -> Result<(), TranscodeError> {
        let output = Command::new(&self.settings.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.tool_missing(e))?;
        let version = String::from_utf8_lossy(&output.stdout);
        debug!(version = version.lines().next().unwrap_or_default());
        Ok(())
    }
}

#[async_trait]
impl Transcoder for Ffmpeg {
    #[instrument(name = "Converting audio", skip(self), fields(target = %self.target))]
    async fn convert(&self, input: &Path, copy_audio: bool) -> Result<PathBuf, TranscodeError> {
        let output = output_path(input, self.target);
        if output == input {
            return Ok(output);
        }

        let args = ffmpeg_args(input, &output, self.target, &self.settings, copy_audio);
        debug!(binary = %self.settings.ffmpeg_path.display(), ?args, "Running ffmpeg");
        let result = Command::new(&self.settings.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.tool_missing(e))?;

        if !result.status.success() {
            if let Err(e) = tokio::fs::remove_file(&output).await {
                debug!("No partial output to remove: {}", e);
            }
            return Err(TranscodeError::Failed {
                input: input.to_path_buf(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        for line in String::from_utf8_lossy(&result.stderr).lines() {
            warn!("ffmpeg: {}", line);
        }
        if let Err(e) = tokio::fs::remove_file(input).await {
            warn!("Could not remove {}: {}", input.display(), e);
        }
        info!("Conversion completed successfully!");
        Ok(output)
    }
}
