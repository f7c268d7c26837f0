//! Error types for the Ledger Core client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Structured error returned by the ledger service.
    #[error("API error {code}: {message}")]
    Api {
        code: String,
        message: String,
        detail: Option<String>,
    },

    #[error("HSM signer error: {0}")]
    Hsm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

pub type Result<T> = std::result::Result<T, Error>;
