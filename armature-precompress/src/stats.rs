//! Per-file outcomes and run-wide statistics

use crate::{Codec, CompressionType};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One eligible file, as discovered by the walker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionRequest {
    path: PathBuf,
    size: u64,
    compression_type: CompressionType,
}

impl CompressionRequest {
    pub fn new(path: impl Into<PathBuf>, size: u64, compression_type: CompressionType) -> Self {
        Self {
            path: path.into(),
            size,
            compression_type,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source size in bytes at discovery time
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn compression_type(&self) -> CompressionType {
        self.compression_type
    }
}

/// What happened to one codec for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CodecResult {
    /// The codec was not part of the requested type
    #[default]
    NotRequested,
    /// The artifact was written; `size` is the number of bytes written
    Succeeded { size: u64 },
    /// The codec stream failed
    Failed,
}

impl CodecResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Artifact size, when written
    pub fn size(&self) -> u64 {
        match self {
            Self::Succeeded { size } => *size,
            _ => 0,
        }
    }
}

/// Result of compressing a single file across its requested codecs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressionOutcome {
    pub path: PathBuf,
    pub original_size: u64,
    pub brotli: CodecResult,
    pub gzip: CodecResult,
    /// Whether the source was removed after compression
    pub original_deleted: bool,
}

impl CompressionOutcome {
    pub fn new(path: impl Into<PathBuf>, original_size: u64) -> Self {
        Self {
            path: path.into(),
            original_size,
            brotli: CodecResult::NotRequested,
            gzip: CodecResult::NotRequested,
            original_deleted: false,
        }
    }

    pub fn codec(&self, codec: Codec) -> CodecResult {
        match codec {
            Codec::Brotli => self.brotli,
            Codec::Gzip => self.gzip,
        }
    }

    pub(crate) fn set(&mut self, codec: Codec, result: CodecResult) {
        match codec {
            Codec::Brotli => self.brotli = result,
            Codec::Gzip => self.gzip = result,
        }
    }

    /// Number of artifacts written
    pub fn succeeded(&self) -> u64 {
        [self.brotli, self.gzip]
            .iter()
            .filter(|r| r.is_success())
            .count() as u64
    }

    /// Number of codecs that failed
    pub fn failed(&self) -> u64 {
        [self.brotli, self.gzip]
            .iter()
            .filter(|r| r.is_failure())
            .count() as u64
    }

    /// Sum of artifact sizes across successful codecs
    pub fn compressed_size(&self) -> u64 {
        self.brotli.size() + self.gzip.size()
    }

    pub fn any_succeeded(&self) -> bool {
        self.succeeded() > 0
    }
}

/// Aggregate statistics for one batch.
///
/// Always carries both per-codec counters; the unused one stays zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    /// Eligible files handed to the scheduler
    pub total_files: u64,
    /// Artifacts written
    pub compressed_files: u64,
    /// Files with an allowed extension that the filter or skip-existing check rejected
    pub skipped_files: u64,
    /// Failed codec artifacts plus files whose retries were exhausted
    pub failed_files: u64,
    pub original_size: u64,
    pub compressed_size: u64,
    /// Percentage saved, `(original - compressed) / original * 100`
    pub compression_ratio: f64,
    pub elapsed_ms: u64,
    pub brotli_files: u64,
    pub gzip_files: u64,
    pub deleted_originals: u64,
}

impl RunStatistics {
    /// Empty statistics for a batch of `total_files` candidates
    pub fn new(total_files: u64) -> Self {
        Self {
            total_files,
            ..Default::default()
        }
    }

    /// Fold a settled outcome into the running totals
    pub fn record(&mut self, outcome: &CompressionOutcome) {
        self.compressed_files += outcome.succeeded();
        self.failed_files += outcome.failed();
        self.original_size += outcome.original_size;
        self.compressed_size += outcome.compressed_size();
        if outcome.brotli.is_success() {
            self.brotli_files += 1;
        }
        if outcome.gzip.is_success() {
            self.gzip_files += 1;
        }
        if outcome.original_deleted {
            self.deleted_originals += 1;
        }
    }

    /// Fold a file whose retries were exhausted
    pub fn record_failure(&mut self) {
        self.failed_files += 1;
    }

    /// Compute the ratio and attach the elapsed time
    pub fn finalize(&mut self, elapsed: Duration) {
        self.compression_ratio = if self.original_size > 0 {
            (self.original_size as f64 - self.compressed_size as f64) / self.original_size as f64
                * 100.0
        } else {
            0.0
        };
        self.elapsed_ms = elapsed.as_millis() as u64;
    }

    /// Bytes saved across all artifacts (zero if artifacts grew)
    pub fn savings(&self) -> u64 {
        self.original_size.saturating_sub(self.compressed_size)
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

/// Format a byte count for humans (B, KB, MB, GB)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(brotli: CodecResult, gzip: CodecResult) -> CompressionOutcome {
        let mut o = CompressionOutcome::new("a.js", 1000);
        o.brotli = brotli;
        o.gzip = gzip;
        o
    }

    #[test]
    fn test_outcome_counts() {
        let o = outcome(CodecResult::Succeeded { size: 200 }, CodecResult::Failed);
        assert_eq!(o.succeeded(), 1);
        assert_eq!(o.failed(), 1);
        assert_eq!(o.compressed_size(), 200);
        assert!(o.any_succeeded());
        assert_eq!(o.codec(Codec::Gzip), CodecResult::Failed);
    }

    #[test]
    fn test_record_and_finalize() {
        let mut stats = RunStatistics::new(3);
        stats.record(&outcome(
            CodecResult::Succeeded { size: 250 },
            CodecResult::Succeeded { size: 300 },
        ));
        stats.record(&outcome(CodecResult::Succeeded { size: 250 }, CodecResult::Failed));
        stats.record_failure();
        stats.finalize(Duration::from_millis(1500));

        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.compressed_files, 3);
        assert_eq!(stats.failed_files, 2);
        assert_eq!(stats.brotli_files, 2);
        assert_eq!(stats.gzip_files, 1);
        assert_eq!(stats.original_size, 2000);
        assert_eq!(stats.compressed_size, 800);
        assert!((stats.compression_ratio - 60.0).abs() < 1e-9);
        assert_eq!(stats.savings(), 1200);
        assert_eq!(stats.elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn test_ratio_is_zero_without_input() {
        let mut stats = RunStatistics::new(0);
        stats.finalize(Duration::ZERO);
        assert_eq!(stats.compression_ratio, 0.0);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }
}
