//! Error types for yt-dl

use thiserror::Error;

/// Main error type for yt-dl operations
#[derive(Debug, Error)]
pub enum YtDlError {
    #[error("Invalid video URL or id: {0}")]
    InvalidIdentifier(String),

    #[error("Failed to retrieve player response for {0} (all strategies exhausted)")]
    RetrievalFailed(String),

    #[error("Player script unavailable: {0}")]
    ScriptUnavailable(String),

    #[error("Signature decipher unavailable (player script layout changed?)")]
    DecipherUnavailable,

    #[error("No suitable stream: {0}")]
    NoSuitableStream(String),

    #[error("Missing stream url for itag {0}")]
    MissingStreamUrl(u32),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} for {url}")]
    HttpError { status: u16, url: String },

    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("ffmpeg failed: {0}")]
    MuxFailed(String),
}

impl From<reqwest::Error> for YtDlError {
    fn from(err: reqwest::Error) -> Self {
        YtDlError::from_reqwest(err, None)
    }
}

impl YtDlError {
    /// Classify a reqwest failure, naming `fallback_url` when the error
    /// itself carries no URL (body read timeouts, for one)
    pub fn from_reqwest(err: reqwest::Error, fallback_url: Option<&str>) -> Self {
        let target = err
            .url()
            .map(|u| u.to_string())
            .or_else(|| fallback_url.map(str::to_string));

        if err.is_timeout() {
            return YtDlError::Timeout(target.unwrap_or_else(|| "request".to_string()));
        }
        if let Some(status) = err.status() {
            return YtDlError::HttpError {
                status: status.as_u16(),
                url: target.unwrap_or_default(),
            };
        }
        YtDlError::Request(err)
    }

    /// Check if error came from the transport layer
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            YtDlError::Timeout(_) | YtDlError::HttpError { .. } | YtDlError::Request(_)
        )
    }

    /// Check if error means the upstream player script no longer matches
    pub fn is_script_error(&self) -> bool {
        matches!(
            self,
            YtDlError::ScriptUnavailable(_) | YtDlError::DecipherUnavailable
        )
    }
}
