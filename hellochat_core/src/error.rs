//! Failure taxonomy for completion calls.
//!
//! Every failure of a completion request is classified into one of five
//! kinds. Each kind carries a fixed user-facing text which the conversation
//! layer appends to the buffer as an assistant message, so a failed turn never
//! escapes as an error to the rendering surface.

use thiserror::Error;

/// HTTP status reported by the remote for an invalid credential.
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// HTTP status reported by the remote when the caller is throttled.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionErrorKind {
    Unauthorized,
    RateLimited,
    RemoteError,
    NetworkError,
    UnknownError,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("remote rejected the credential (HTTP 401)")]
    Unauthorized,

    #[error("remote rate limit exceeded (HTTP 429)")]
    RateLimited,

    #[error("remote returned HTTP {status}: {}", .message.as_deref().unwrap_or("no error message"))]
    RemoteError {
        status: u16,
        message: Option<String>,
    },

    #[error("request did not reach the remote: {0}")]
    NetworkError(String),

    #[error("completion failed: {0}")]
    UnknownError(String),
}

impl CompletionError {
    /// Classify a non-2xx response.
    ///
    /// `body` is the raw response body; for statuses other than 401 and 429
    /// the `error.message` field is extracted when the body is JSON of the
    /// usual `{"error": {"message": ...}}` shape.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            STATUS_UNAUTHORIZED => Self::Unauthorized,
            STATUS_TOO_MANY_REQUESTS => Self::RateLimited,
            _ => Self::RemoteError {
                status,
                message: remote_error_message(body),
            },
        }
    }

    #[must_use]
    pub const fn kind(&self) -> CompletionErrorKind {
        match self {
            Self::Unauthorized => CompletionErrorKind::Unauthorized,
            Self::RateLimited => CompletionErrorKind::RateLimited,
            Self::RemoteError { .. } => CompletionErrorKind::RemoteError,
            Self::NetworkError(_) => CompletionErrorKind::NetworkError,
            Self::UnknownError(_) => CompletionErrorKind::UnknownError,
        }
    }

    /// Text shown to the user in place of the assistant's reply.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "Invalid API key. Please check your Groq API key.".to_string(),
            Self::RateLimited => "Rate limit exceeded. Please try again later.".to_string(),
            Self::RemoteError { message, .. } => format!(
                "API Error: {}",
                message.as_deref().unwrap_or("Unknown error")
            ),
            Self::NetworkError(_) => {
                "Network error. Please check your internet connection.".to_string()
            }
            Self::UnknownError(_) => "Sorry, an error occurred.".to_string(),
        }
    }
}

fn remote_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["error"]["message"]
        .as_str()
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
