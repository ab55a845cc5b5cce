//! LLM error types.

use std::fmt;

/// Errors that can occur when making LLM API calls.
#[derive(Debug)]
pub enum LlmError {
    /// HTTP request failed
    Request(reqwest::Error),
    /// API returned an error response
    Api { status: u16, message: String },
    /// Credential exchange with the provider's auth endpoint failed
    Auth(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::Request(e) => write!(f, "HTTP request failed: {e}"),
            LlmError::Api { status, message } => {
                write!(f, "API error (status {status}): {message}")
            }
            LlmError::Auth(message) => write!(f, "authentication failed: {message}"),
        }
    }
}

impl std::error::Error for LlmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LlmError::Request(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Request(err)
    }
}
