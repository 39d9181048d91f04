use core::fmt;

use url::Url;

const VIDEO_ID_LEN: usize = 11;

/// A YouTube video reference, normalised to its watch URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoUrl {
    id: String,
    url: String,
}

impl VideoUrl {
    pub fn parse(s: String) -> Result<Self, String> {
        let candidate = s.trim();
        if is_video_id(candidate) {
            return Ok(Self::from_id(candidate));
        }

        let url = Url::parse(candidate)
            .map_err(|e| format!("Failed to parse video URL '{}': {}", candidate, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "Failed to parse video URL '{}': unsupported scheme '{}'",
                candidate,
                url.scheme()
            ));
        }

        let host = url.host_str().unwrap_or_default().to_lowercase();
        let id = if host == "youtu.be" || host == "www.youtu.be" {
            url.path_segments()
                .and_then(|mut segments| segments.next())
                .map(str::to_owned)
        } else if is_youtube_host(&host) {
            id_from_youtube_path(&url)
        } else {
            return Err(format!(
                "Failed to parse video URL '{}': '{}' is not a YouTube host",
                candidate, host
            ));
        };

        match id {
            Some(id) if is_video_id(&id) => Ok(Self::from_id(&id)),
            _ => Err(format!(
                "Failed to parse video URL '{}': no video id found",
                candidate
            )),
        }
    }

    fn from_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            url: format!("https://www.youtube.com/watch?v={}", id),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

fn is_video_id(s: &str) -> bool {
    s.len() == VIDEO_ID_LEN
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_youtube_host(host: &str) -> bool {
    matches!(
        host,
        "youtube.com"
            | "www.youtube.com"
            | "m.youtube.com"
            | "music.youtube.com"
            | "youtube-nocookie.com"
            | "www.youtube-nocookie.com"
    )
}

fn id_from_youtube_path(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    match segments.next()? {
        "watch" => url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned()),
        "shorts" | "live" | "embed" | "v" => segments.next().map(str::to_owned),
        _ => None,
    }
}

impl fmt::Display for VideoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.url.fmt(f)
    }
}

impl AsRef<str> for VideoUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

impl TryFrom<String> for VideoUrl {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl std::str::FromStr for VideoUrl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.to_string())
    }
}
