mod browser;
mod firefox;
pub mod netscape;

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use secrecy::SecretString;
use tempfile::NamedTempFile;
use tracing::{info, instrument, warn};

use crate::configuration::CookieSettings;

pub use browser::Browser;

#[derive(Debug)]
pub struct Cookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    /// Unix seconds, 0 for session cookies.
    pub expires: i64,
    pub name: String,
    pub value: SecretString,
}

#[derive(thiserror::Error, Debug)]
pub enum CookieError {
    #[error("No {0} profile with a cookie store found")]
    NoProfile(Browser),
    #[error("No YouTube cookies found in {0}")]
    Empty(Browser),
    #[error("Failed to read cookie database")]
    Database(#[from] sqlx::Error),
    #[error("Failed to access cookie file")]
    Io(#[from] std::io::Error),
}

/// Where the extractor gets its cookies from for this run.
///
/// A `Temporary` file is removed from disk when the source is dropped.
#[derive(Debug)]
pub enum CookieSource {
    None,
    File(PathBuf),
    Temporary(NamedTempFile),
    Browser(Browser),
}

impl CookieSource {
    #[instrument(name = "Resolving cookies", skip_all)]
    pub async fn resolve(settings: &CookieSettings, delegation_supported: bool) -> CookieSource {
        Self::resolve_with(settings, delegation_supported, Browser::profile_root).await
    }

    /// A custom cookie file wins, then the configured browsers in order.
    pub async fn resolve_with<F>(
        settings: &CookieSettings,
        delegation_supported: bool,
        profile_root: F,
    ) -> CookieSource
    where
        F: Fn(Browser) -> Option<PathBuf>,
    {
        if let Some(path) = &settings.custom_cookies_file {
            if path.is_file() {
                info!("Using custom cookies file: {}", path.display());
                return CookieSource::File(path.clone());
            }
            warn!("Custom cookies file not found at {}", path.display());
        }

        if settings.use_browser_cookies {
            info!("Attempting to load cookies from browsers...");
            for &browser in &settings.browsers {
                let Some(root) = profile_root(browser).filter(|root| root.is_dir()) else {
                    info!("No {} cookies found", browser);
                    continue;
                };
                if let Some(source) = Self::from_browser(browser, &root, delegation_supported).await
                {
                    return source;
                }
            }

            warn!("Could not load cookies from any browser.");
            warn!(
                "Make sure you have at least one of these browsers installed and are logged into YouTube: {}",
                settings
                    .browsers
                    .iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            return CookieSource::None;
        }

        warn!("No valid cookie source configured. Some videos might be unavailable.");
        CookieSource::None
    }

    async fn from_browser(
        browser: Browser,
        root: &Path,
        delegation_supported: bool,
    ) -> Option<CookieSource> {
        if browser.is_encrypted() {
            if delegation_supported {
                info!("Using {} cookies through the extractor", browser);
                return Some(CookieSource::Browser(browser));
            }
            warn!(
                "{} cookies are encrypted and can only be used with the yt-dlp backend",
                browser
            );
            return None;
        }

        let cookies = match firefox::load_cookies(root).await {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!("Error accessing {} cookies: {}", browser, e);
                return None;
            }
        };
        info!("Successfully loaded cookies from {}", browser);

        match write_temporary(&cookies) {
            Ok(file) => {
                info!("Successfully saved cookies to temporary file");
                Some(CookieSource::Temporary(file))
            }
            Err(e) => {
                warn!("Failed to save cookies from {}: {}", browser, e);
                None
            }
        }
    }

    /// Netscape cookie file to hand to the extractor, if any.
    pub fn file(&self) -> Option<&Path> {
        match self {
            CookieSource::File(path) => Some(path),
            CookieSource::Temporary(file) => Some(file.path()),
            CookieSource::None | CookieSource::Browser(_) => None,
        }
    }

    pub fn browser(&self) -> Option<Browser> {
        match self {
            CookieSource::Browser(browser) => Some(*browser),
            _ => None,
        }
    }

    /// Parsed cookies for in-process HTTP clients.
    pub async fn load(&self) -> Result<Vec<Cookie>, CookieError> {
        match self.file() {
            Some(path) => {
                let text = tokio::fs::read_to_string(path).await?;
                Ok(netscape::parse(&text))
            }
            None => Ok(Vec::new()),
        }
    }
}

fn write_temporary(cookies: &[Cookie]) -> Result<NamedTempFile, CookieError> {
    let mut file = tempfile::Builder::new()
        .prefix("yt-audio-dl-cookies-")
        .suffix(".txt")
        .tempfile()?;
    file.write_all(netscape::render(cookies, Utc::now().timestamp()).as_bytes())?;
    file.flush()?;
    Ok(file)
}
