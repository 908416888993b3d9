use thiserror::Error;

/// Top-level error type shared by the easel tools.
#[derive(Error, Debug)]
pub enum EaselError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
