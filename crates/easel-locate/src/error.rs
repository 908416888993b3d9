//! Error types for the easel-locate crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("Scan tool not found at path: {path}")]
    ScannerNotFound { path: String },

    #[error("Scan exited with code {code}: {stderr}")]
    ScanFailed { code: i32, stderr: String },

    #[error("Scan timed out after {secs}s")]
    ScanTimeout { secs: u64 },

    #[error("Failed to parse scan XML output: {0}")]
    XmlParse(String),

    #[error("Deploy document error: {0}")]
    Registry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LocateError>;
