//! Build Output Precompression for Armature
//!
//! This crate walks a build output directory after the final assets are
//! written and stores compressed siblings (`app.js.br`, `app.js.gz`) next to
//! every eligible file, so a reverse proxy or static file server can serve
//! them without compressing on the fly.
//!
//! # Features
//!
//! - `brotli` - Enable `.br` artifacts (enabled by default)
//! - `gzip` - Enable `.gz` artifacts (enabled by default)
//! - `full` - Enable all codecs
//!
//! # Example
//!
//! ```rust,no_run
//! use armature_precompress::{CompressionOptions, CompressionType, Precompressor};
//!
//! # async fn example() -> armature_precompress::Result<()> {
//! let options = CompressionOptions::builder()
//!     .compression_type(CompressionType::Both)
//!     .min_size(1024)          // Skip files under 1KB
//!     .exclude(["**/*.map"])   // Never compress source maps
//!     .max_parallel(8)
//!     .retry_attempts(2)
//!     .build()?;
//!
//! let stats = Precompressor::new(options).run("dist").await?;
//! println!("saved {} bytes", stats.savings());
//! # Ok(())
//! # }
//! ```
//!
//! # Selecting Files
//!
//! A file is compressed when its name ends with an allowed extension and it
//! passes the eligibility checks, in order:
//!
//! 1. Size bounds (`min_size` and `max_size`, both inclusive)
//! 2. Include patterns, which decide alone when any are set
//! 3. Exclude patterns
//! 4. The custom predicate
//!
//! Patterns are matched against the path relative to the root, with `/`
//! separators: `**` spans directories, `*` and `?` stay within one segment.
//!
//! # Settings Files
//!
//! [`PrecompressSettings`] loads the same options from `precompress.toml` or
//! `precompress.json`, with `PRECOMPRESS_*` environment overrides.

mod algorithm;
mod config;
mod engine;
mod error;
mod filter;
mod pattern;
mod precompressor;
mod report;
mod retry;
mod scheduler;
mod settings;
mod stats;
pub mod streaming;
pub mod walker;

pub use algorithm::{Codec, CompressionType};
pub use config::{
    default_extensions, CompressionOptions, CompressionOptionsBuilder, EligibilityPredicate,
    ErrorCallback,
};
pub use engine::{CompressionEngine, FileCompressor};
pub use error::PrecompressError;
pub use filter::is_eligible;
pub use pattern::{GlobPattern, PatternSet};
pub use precompressor::Precompressor;
pub use report::{ConsoleReporter, Format, Level, ReportEvent, Reporter, SilentReporter};
pub use retry::{compress_with_retry, RetryPolicy, BASE_DELAY};
pub use scheduler::BatchScheduler;
pub use settings::{FileFormat, PrecompressSettings, ENV_PREFIX};
pub use stats::{format_bytes, CodecResult, CompressionOutcome, CompressionRequest, RunStatistics};
pub use streaming::{ChunkEncoder, EncoderFactory, StreamingEncoder, StreamingEncoderFactory};
pub use walker::walk;

/// Result type for precompression operations
pub type Result<T> = std::result::Result<T, PrecompressError>;
