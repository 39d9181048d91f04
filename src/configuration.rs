use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, FileFormat};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use serde_with::{DurationSeconds, serde_as};

use crate::{
    cookies::Browser,
    domain::{AudioFormat, AudioQuality},
};

pub const SAMPLE_SETTINGS: &str = r#"{
    "download_directory": "~/Music/YouTube",
    "audio_format": "opus",
    "audio_quality": "best",
    "create_directory_if_missing": true,
    "show_progress": true,
    "cookies": {
        "use_browser_cookies": true,
        "custom_cookies_file": null
    }
}"#;

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error(
        "Settings file {} not found. Please create it with the following format:\n{}",
        .0.display(),
        SAMPLE_SETTINGS
    )]
    NotFound(PathBuf),
    #[error("Settings file is not valid")]
    Invalid(#[from] config::ConfigError),
}

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub download_directory: PathBuf,
    #[serde(default)]
    pub audio_format: AudioFormat,
    #[serde(default)]
    pub audio_quality: AudioQuality,
    #[serde(default = "enabled")]
    pub create_directory_if_missing: bool,
    #[serde(default = "enabled")]
    pub show_progress: bool,
    #[serde(rename = "cookies", default)]
    pub cookies_cfg: CookieSettings,
    #[serde(rename = "encoder", default)]
    pub encoder_cfg: EncoderSettings,
    #[serde(rename = "extractor", default)]
    pub extractor_cfg: ExtractorSettings,
}

fn enabled() -> bool {
    true
}

impl Settings {
    /// Reads the JSON settings file, then layers `APP_<SECTION>__<KEY>` overrides on top.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.is_file() {
            return Err(SettingsError::NotFound(path.to_path_buf()));
        }

        let settings: Settings = Config::builder()
            .add_source(config::File::from(path).format(FileFormat::Json))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings.expand_paths())
    }

    fn expand_paths(mut self) -> Self {
        self.download_directory = expand_home(&self.download_directory);
        self.cookies_cfg.custom_cookies_file = self
            .cookies_cfg
            .custom_cookies_file
            .as_deref()
            .map(expand_home);
        self
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CookieSettings {
    pub use_browser_cookies: bool,
    pub custom_cookies_file: Option<PathBuf>,
    /// Tried in order until one yields cookies.
    pub browsers: Vec<Browser>,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            use_browser_cookies: true,
            custom_cookies_file: None,
            browsers: vec![Browser::Chrome, Browser::Firefox, Browser::Edge],
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EncoderSettings {
    pub ffmpeg_path: PathBuf,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub bitrate_kbps: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub sample_rate: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub channels: u8,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            bitrate_kbps: 192,
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Drive the yt-dlp executable.
    #[default]
    Ytdlp,
    /// Extract in-process with rusty_ytdl.
    Native,
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ExtractorSettings {
    pub backend: Backend,
    pub ytdlp_path: PathBuf,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub retries: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub fragment_retries: u32,
    #[serde(rename = "socket_timeout_secs")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub socket_timeout: Duration,
    pub skip_certificate_check: bool,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            backend: Backend::Ytdlp,
            ytdlp_path: PathBuf::from("yt-dlp"),
            retries: 10,
            fragment_retries: 10,
            socket_timeout: Duration::from_secs(30),
            skip_certificate_check: false,
        }
    }
}

/// `~` and `~/...` resolve against the current user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}
