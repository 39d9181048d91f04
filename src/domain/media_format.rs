use serde::{Deserialize, Serialize};

/// One downloadable stream as reported by the extractor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaFormat {
    pub format_id: String,
    pub ext: String,
    pub acodec: Option<String>,
    pub vcodec: Option<String>,
    /// Audio bitrate in kbit/s.
    pub abr: Option<f64>,
    pub resolution: Option<String>,
    /// Size in bytes, when known up front.
    pub filesize: Option<u64>,
    pub note: Option<String>,
}

impl MediaFormat {
    pub fn has_audio(&self) -> bool {
        self.acodec
            .as_deref()
            .is_some_and(|codec| !codec.is_empty() && codec != "none")
    }

    pub fn has_video(&self) -> bool {
        self.vcodec
            .as_deref()
            .is_some_and(|codec| !codec.is_empty() && codec != "none")
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }

    /// Codec name without profile suffix, lowercased (`mp4a.40.2` -> `mp4a`).
    pub fn codec_family(&self) -> Option<String> {
        self.acodec
            .as_deref()
            .and_then(|codec| codec.split('.').next())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    #[default]
    Best,
    Worst,
}

/// Container/codec the saved file should end up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Opus,
    Mp3,
    M4a,
    Flac,
    /// Keep whatever container was downloaded.
    Original,
}

impl AudioFormat {
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            AudioFormat::Opus => Some("opus"),
            AudioFormat::Mp3 => Some("mp3"),
            AudioFormat::M4a => Some("m4a"),
            AudioFormat::Flac => Some("flac"),
            AudioFormat::Original => None,
        }
    }

    /// ffmpeg encoder name.
    pub fn codec(&self) -> Option<&'static str> {
        match self {
            AudioFormat::Opus => Some("libopus"),
            AudioFormat::Mp3 => Some("libmp3lame"),
            AudioFormat::M4a => Some("aac"),
            AudioFormat::Flac => Some("flac"),
            AudioFormat::Original => None,
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self, AudioFormat::Flac)
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension().unwrap_or("original"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormatChoice {
    Opus(MediaFormat),
    AudioOnly(MediaFormat),
    /// Best stream carrying both audio and video, `None` when nothing listed has audio.
    ExtractFromVideo(Option<MediaFormat>),
}

impl FormatChoice {
    pub fn format(&self) -> Option<&MediaFormat> {
        match self {
            FormatChoice::Opus(format)
            | FormatChoice::AudioOnly(format)
            | FormatChoice::ExtractFromVideo(Some(format)) => Some(format),
            FormatChoice::ExtractFromVideo(None) => None,
        }
    }
}

const AAC_FAMILY: [&str; 3] = ["m4a", "mp4a", "aac"];

/// Opus beats AAC beats any other audio-only stream; without any audio-only
/// stream the audio has to be pulled out of a combined one.
pub fn select_audio_format(formats: &[MediaFormat], quality: AudioQuality) -> FormatChoice {
    let audio_only: Vec<&MediaFormat> = formats.iter().filter(|f| f.is_audio_only()).collect();

    let tier = |wanted: &dyn Fn(&str) -> bool| -> Option<MediaFormat> {
        let candidates = audio_only
            .iter()
            .filter(|f| f.codec_family().is_some_and(|c| wanted(&c)));
        pick(candidates.copied(), quality).cloned()
    };

    if let Some(format) = tier(&|codec| codec == "opus") {
        return FormatChoice::Opus(format);
    }
    if let Some(format) = tier(&|codec| AAC_FAMILY.contains(&codec)) {
        return FormatChoice::AudioOnly(format);
    }
    if let Some(format) = tier(&|_| true) {
        return FormatChoice::AudioOnly(format);
    }
    let combined = formats.iter().filter(|f| f.has_audio() && f.has_video());
    FormatChoice::ExtractFromVideo(pick(combined, quality).cloned())
}

fn pick<'a>(
    candidates: impl Iterator<Item = &'a MediaFormat>,
    quality: AudioQuality,
) -> Option<&'a MediaFormat> {
    let bitrate = |f: &MediaFormat| f.abr.unwrap_or(0.0);
    candidates.fold(None, |chosen, f| match chosen {
        None => Some(f),
        Some(current) => {
            let better = match quality {
                AudioQuality::Best => bitrate(f) > bitrate(current),
                AudioQuality::Worst => bitrate(f) < bitrate(current),
            };
            if better { Some(f) } else { Some(current) }
        }
    })
}
