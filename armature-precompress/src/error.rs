//! Error types for precompression runs

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while precompressing a build directory
#[derive(Error, Debug)]
pub enum PrecompressError {
    /// IO error while reading a source or writing an artifact
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A single codec stream failed for one file
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    /// Every requested codec failed for one file
    #[error("All codecs failed for {}: {message}", path.display())]
    AllCodecsFailed { path: PathBuf, message: String },

    /// A file kept failing after every retry attempt
    #[error("Failed to compress {} after {attempts} attempts: {message}", path.display())]
    RetriesExhausted {
        path: PathBuf,
        attempts: u32,
        message: String,
    },

    /// Codec support was compiled out
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Settings could not be loaded or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The post-build hook was invoked more than once
    #[error("Precompression already ran for this build")]
    AlreadyRan,

    /// A blocking worker task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(String),
}

impl PrecompressError {
    /// Whether this is the terminal per-file error produced by the retry wrapper
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }
}

impl From<tokio::task::JoinError> for PrecompressError {
    fn from(err: tokio::task::JoinError) -> Self {
        PrecompressError::Task(err.to_string())
    }
}
