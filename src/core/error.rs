//! Error types for the vireo runtime

use thiserror::Error;

/// Main error type for the runtime
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Asset not found: {0}")]
    Asset(String),

    #[error("Parse error in {asset}: {message}")]
    Parse { asset: String, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Thread error: {0}")]
    Thread(String),

    #[error("Platform binding error: {0}")]
    Platform(String),
}

impl Error {
    /// Shorthand for a parser failure on `asset`.
    pub fn parse(asset: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            asset: asset.into(),
            message: message.to_string(),
        }
    }
}
