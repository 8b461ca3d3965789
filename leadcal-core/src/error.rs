//! Error types for leadcal.

use thiserror::Error;

/// Errors that can occur while connecting or syncing a calendar.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    #[error("Authorization popup was blocked")]
    PopupBlocked,

    #[error("Remote call {function}/{path} failed: {message}")]
    RemoteCallFailed {
        function: String,
        path: String,
        message: String,
    },

    #[error("Calendar settings not found")]
    SettingsMissing,

    #[error("Authorization token expired: {0}")]
    AuthorizationTokenExpired(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SyncError {
    pub fn remote(function: &str, path: &str, message: impl Into<String>) -> Self {
        SyncError::RemoteCallFailed {
            function: function.to_string(),
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Whether the failure looks like an expired or revoked authorization.
    ///
    /// The remote side only reports free-form text, so anything mentioning a
    /// token counts.
    pub fn is_token_problem(&self) -> bool {
        match self {
            SyncError::AuthorizationTokenExpired(_) => true,
            other => other.to_string().to_lowercase().contains("token"),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

/// Result type alias for leadcal operations.
pub type SyncResult<T> = Result<T, SyncError>;
