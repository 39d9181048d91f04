use std::path::{Path, PathBuf};

use tracing::instrument;
use unicode_segmentation::UnicodeSegmentation;

const MAX_GRAPHEMES: usize = 180;
/// Leaves room for ` (NNN).ext` under the common 255-byte file name limit.
const MAX_BYTES: usize = 200;
const FORBIDDEN: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
const RESERVED: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// A file stem derived from a video title that is safe on every major filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileName(String);

impl FileName {
    /// Falls back to `fallback` (usually the video id) and then to `audio`
    /// when nothing printable survives.
    #[instrument(name = "Sanitizing file name", skip_all)]
    pub fn sanitize(title: &str, fallback: &str) -> Self {
        let cleaned = clean(title);
        if !cleaned.is_empty() {
            return Self(cleaned);
        }
        let cleaned = clean(fallback);
        if !cleaned.is_empty() {
            return Self(cleaned);
        }
        Self("audio".to_string())
    }

    /// First free `<stem>.<ext>` in `dir`, counting up ` (1)`, ` (2)`, ... when taken.
    pub fn unique_destination(&self, dir: &Path, ext: &str) -> PathBuf {
        let candidate = dir.join(format!("{}.{}", self.0, ext));
        if !candidate.exists() {
            return candidate;
        }
        let mut n = 1;
        loop {
            let candidate = dir.join(format!("{} ({}).{}", self.0, n, ext));
            if !candidate.exists() {
                return candidate;
            }
            n += 1;
        }
    }
}

fn clean(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c.is_whitespace() {
                ' '
            } else if FORBIDDEN.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated = truncate(&collapsed);
    let trimmed = truncated.trim_matches(|c: char| c == '.' || c.is_whitespace());

    // Windows only looks at the part before the first dot.
    let device = trimmed.split('.').next().unwrap_or_default();
    if RESERVED.iter().any(|r| r.eq_ignore_ascii_case(device)) {
        format!("{}_{}", device, &trimmed[device.len()..])
    } else {
        trimmed.to_string()
    }
}

fn truncate(text: &str) -> String {
    let mut bytes = 0;
    text.graphemes(true)
        .take(MAX_GRAPHEMES)
        .take_while(|g| {
            bytes += g.len();
            bytes <= MAX_BYTES
        })
        .collect()
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
