use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The media tool could not be started while probing a file.
    #[error("Stream discovery failed: {0}")]
    DiscoveryTool(String),

    #[error("Extraction of subtitle stream {index} to {} failed: {diagnostics}", output.display())]
    StreamExtraction {
        index: u32,
        output: PathBuf,
        diagnostics: String,
    },

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("{description} timed out after {seconds}s")]
    Timeout { description: String, seconds: u64 },

    #[error("Processing cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid hook input: {0}")]
    HookInput(String),
}

pub type Result<T> = std::result::Result<T, SubExtractError>;
