use std::path::PathBuf;

use clap::Parser;

use crate::{
    configuration::{Backend, Settings},
    domain::VideoUrl,
};

/// Download the audio track of a YouTube video.
#[derive(Parser, Debug)]
#[command(name = "yt-audio-dl", version, about)]
pub struct Cli {
    /// YouTube URL or 11-character video id
    #[arg(value_parser = parse_url)]
    pub url: VideoUrl,

    /// List the available formats instead of downloading
    #[arg(short = 'F', long)]
    pub list_formats: bool,

    /// Settings file
    #[arg(
        long,
        env = "YT_AUDIO_DL_SETTINGS",
        default_value = "settings.json"
    )]
    pub settings: PathBuf,

    /// Extraction backend, overrides the settings file
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Directory to save into, overrides the settings file
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Download(VideoUrl),
    ListFormats(VideoUrl),
}

fn parse_url(s: &str) -> Result<VideoUrl, String> {
    VideoUrl::parse(s.to_string())
}

impl Cli {
    pub fn command(&self) -> Command {
        if self.list_formats {
            Command::ListFormats(self.url.clone())
        } else {
            Command::Download(self.url.clone())
        }
    }

    /// Applies command line overrides on top of the loaded settings.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(backend) = self.backend {
            settings.extractor_cfg.backend = backend;
        }
        if let Some(dir) = &self.output_dir {
            settings.download_directory = crate::configuration::expand_home(dir);
        }
        settings
    }
}
