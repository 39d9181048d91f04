use std::path::PathBuf;

use crate::{
    configuration::SettingsError, cookies::CookieError, transcode::TranscodeError,
    youtube::ExtractorError,
};

/// What YouTube objected to, as far as it can be told from the error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YouTubeFailure {
    BotCheck,
    FormatUnavailable,
    Forbidden,
    Other,
}

impl YouTubeFailure {
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("confirm you're not a bot") || lower.contains("confirm you’re not a bot") {
            YouTubeFailure::BotCheck
        } else if lower.contains("requested format is not available") {
            YouTubeFailure::FormatUnavailable
        } else if lower.contains("http error 403") || lower.contains("403 forbidden") {
            YouTubeFailure::Forbidden
        } else {
            YouTubeFailure::Other
        }
    }

    pub fn summary(&self) -> Option<&'static str> {
        match self {
            YouTubeFailure::BotCheck => Some("YouTube is requesting verification."),
            YouTubeFailure::FormatUnavailable => Some("Could not find suitable audio format."),
            YouTubeFailure::Forbidden => Some("Access forbidden by YouTube."),
            YouTubeFailure::Other => None,
        }
    }

    pub fn hints(&self) -> &'static [&'static str] {
        match self {
            YouTubeFailure::BotCheck => &[
                "Make sure you're logged into YouTube in your browser",
                "Try opening the video in your browser first",
                "Wait a few minutes and try again",
                "If using Firefox, try using Chrome or Safari instead",
            ],
            YouTubeFailure::FormatUnavailable => &["Try using a different format or video URL."],
            YouTubeFailure::Forbidden => &[
                "Too many requests - wait a few minutes and try again",
                "Region restrictions - try with a different video",
                "Age-restricted content - make sure you're logged in",
                "Using a different browser's cookies",
            ],
            YouTubeFailure::Other => &[],
        }
    }
}

#[derive(thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Download directory {0} does not exist and create_directory_if_missing is off")]
    MissingDirectory(PathBuf),
    #[error(transparent)]
    Cookies(#[from] CookieError),
    #[error(transparent)]
    Extractor(#[from] ExtractorError),
    #[error("Audio conversion failed")]
    Transcode(#[from] TranscodeError),
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn failure(&self) -> YouTubeFailure {
        match self {
            AppError::Extractor(e) => e.failure(),
            _ => YouTubeFailure::Other,
        }
    }

    pub fn hints(&self) -> &'static [&'static str] {
        self.failure().hints()
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}

pub fn format_error_details(e: &anyhow::Error) -> String {
    let mut result = format!("{}\n", e);

    // Repeated messages come from transparent wrappers
    let mut seen_messages = std::collections::HashSet::new();
    seen_messages.insert(e.to_string());

    for cause in e.chain().skip(1) {
        let message = cause.to_string();
        if seen_messages.insert(message.clone()) {
            result.push_str(&format!("  Caused by: {}\n", message));
        }
    }

    if let Some(app_error) = e.downcast_ref::<AppError>() {
        let failure = app_error.failure();
        if let Some(summary) = failure.summary() {
            result.push_str(&format!("\n{}\n", summary));
        }
        let hints = app_error.hints();
        if !hints.is_empty() {
            result.push_str("Please try the following:\n");
            for (i, hint) in hints.iter().enumerate() {
                result.push_str(&format!("{}. {}\n", i + 1, hint));
            }
        }
    }
    result
}
