use std::{fmt, path::PathBuf};

use directories::BaseDirs;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Firefox,
    Edge,
}

impl Browser {
    /// Name understood by `yt-dlp --cookies-from-browser`.
    pub fn ytdlp_name(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Edge => "edge",
        }
    }

    /// Chromium-based stores are encrypted with a key held by the OS keyring.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Browser::Chrome | Browser::Edge)
    }

    /// Directory holding this browser's profiles for the current user.
    pub fn profile_root(self) -> Option<PathBuf> {
        let dirs = BaseDirs::new()?;
        let root = if cfg!(target_os = "macos") {
            let support = dirs.home_dir().join("Library/Application Support");
            match self {
                Browser::Chrome => support.join("Google/Chrome"),
                Browser::Firefox => support.join("Firefox/Profiles"),
                Browser::Edge => support.join("Microsoft Edge"),
            }
        } else if cfg!(windows) {
            match self {
                Browser::Chrome => dirs.data_local_dir().join("Google/Chrome/User Data"),
                Browser::Firefox => dirs.data_dir().join("Mozilla/Firefox/Profiles"),
                Browser::Edge => dirs.data_local_dir().join("Microsoft/Edge/User Data"),
            }
        } else {
            match self {
                Browser::Chrome => dirs.config_dir().join("google-chrome"),
                Browser::Firefox => dirs.home_dir().join(".mozilla/firefox"),
                Browser::Edge => dirs.config_dir().join("microsoft-edge"),
            }
        };
        Some(root)
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Browser::Chrome => "Chrome",
            Browser::Firefox => "Firefox",
            Browser::Edge => "Edge",
        };
        f.write_str(name)
    }
}
