//! Error types for q-keygen

use thiserror::Error;

/// Main error type for q-keygen operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("QRNG error: {0}")]
    Qrng(String),

    #[error("Invalid key length: {0}")]
    InvalidKeyLength(String),

    #[error("Could not allocate a unique API key after {0} attempts")]
    KeyExhausted(u32),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database unavailable: {0}")]
    DatabaseUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("An API key already exists for {0}")]
    DuplicateEmail(String),

    #[error("API key value already in use")]
    DuplicateKey,

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),
}

/// Result type alias for q-keygen operations
pub type Result<T> = std::result::Result<T, Error>;
