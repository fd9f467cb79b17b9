//! Error handling for the application

use std::time::Duration;
use thiserror::Error;

/// Upstream source errors. Never leave an adapter; they are logged and
/// collapsed into an empty result.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Credential missing: {0}")]
    CredentialMissing(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            SourceError::Status(status.as_u16())
        } else {
            SourceError::Unavailable(err.to_string())
        }
    }
}

/// Generative backend errors. The advisory engine substitutes its rule-based
/// answer for every one of these.
#[derive(Error, Debug)]
pub enum AdvisoryError {
    #[error("Generative backend credential missing")]
    CredentialMissing,

    #[error("Backend request failed: {0}")]
    Backend(String),

    #[error("Backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend returned an empty reply")]
    EmptyReply,
}

impl From<reqwest::Error> for AdvisoryError {
    fn from(err: reqwest::Error) -> Self {
        AdvisoryError::Backend(err.to_string())
    }
}

/// Query-time parameter errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Illegal parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
