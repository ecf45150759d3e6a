//! Retry with exponential backoff for single-file compression
//!
//! A file is attempted `retry_attempts + 1` times. Between attempts the
//! wrapper sleeps `2^attempt * 100ms`, with `attempt` counting from zero.
//! When the last attempt fails the configured error callback is invoked once
//! with the terminal error before it is returned.

use crate::engine::FileCompressor;
use crate::{CompressionOptions, CompressionOutcome, CompressionRequest, PrecompressError, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// Base delay before the first retry.
pub const BASE_DELAY: Duration = Duration::from_millis(100);

/// Backoff schedule for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retry_attempts: u32,
    /// Delay before the first retry; doubles each time
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_attempts: 0,
            base_delay: BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(retry_attempts: u32) -> Self {
        Self {
            retry_attempts,
            ..Default::default()
        }
    }

    /// Policy for the configured retry count
    pub fn from_options(options: &CompressionOptions) -> Self {
        Self::new(options.retry_attempts)
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts.saturating_add(1)
    }

    /// Delay after the failed attempt with index `attempt` (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Compress one file, retrying whole-file failures with backoff.
pub async fn compress_with_retry<C>(
    compressor: &C,
    request: &CompressionRequest,
    options: &CompressionOptions,
) -> Result<CompressionOutcome>
where
    C: FileCompressor + ?Sized,
{
    let policy = RetryPolicy::from_options(options);
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;

    let last_error = loop {
        match compressor.compress(request).await {
            Ok(outcome) => {
                if attempt > 0 {
                    debug!(path = %request.path().display(), attempt = attempt + 1, "Retry succeeded");
                }
                return Ok(outcome);
            }
            Err(e) if attempt + 1 < max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                debug!(
                    path = %request.path().display(),
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Compression failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => break e,
        }
    };

    let error = PrecompressError::RetriesExhausted {
        path: request.path().to_path_buf(),
        attempts: max_attempts,
        message: last_error.to_string(),
    };
    warn!(path = %request.path().display(), attempts = max_attempts, error = %last_error, "Giving up on file");

    if let Some(callback) = options.on_error() {
        callback(&error, request.path());
    }

    Err(error)
}
