//! Run configuration for precompression

use crate::report::{ConsoleReporter, Reporter, SilentReporter};
use crate::{Codec, CompressionType, PatternSet, PrecompressError, Result};
use std::path::Path;
use std::sync::Arc;

/// User-supplied eligibility check, called with the file path and its size.
pub type EligibilityPredicate = Arc<dyn Fn(&Path, u64) -> bool + Send + Sync>;

/// Called once per file whose retries are exhausted.
pub type ErrorCallback = Arc<dyn Fn(&PrecompressError, &Path) + Send + Sync>;

/// Read-only configuration for one precompression run.
///
/// Built once with [`CompressionOptions::builder`] and shared by reference
/// with every stage of the pipeline.
#[derive(Clone)]
pub struct CompressionOptions {
    /// Which artifacts to produce
    pub compression_type: CompressionType,

    /// File extensions (without the dot) eligible for compression
    pub extensions: Vec<String>,

    /// Whether to print the banner, warnings and summary
    pub verbose: bool,

    /// Brotli quality; clamped to 0..=11 when used
    pub brotli_quality: i64,

    /// Gzip level; clamped to 0..=9 when used
    pub gzip_level: i64,

    /// Files smaller than this many bytes are skipped (inclusive bound)
    pub min_size: u64,

    /// Files larger than this many bytes are skipped (inclusive bound)
    pub max_size: Option<u64>,

    /// Remove the source once at least one artifact was written
    pub delete_original: bool,

    /// Only these paths are compressed, when non-empty
    pub include: PatternSet,

    /// Paths skipped when no include patterns are set
    pub exclude: PatternSet,

    /// Compress files concurrently in groups of `max_parallel`
    pub parallel: bool,

    /// Peak number of files in flight when `parallel` is set (at least 1)
    pub max_parallel: usize,

    /// Skip files that already have a compressed sibling
    pub skip_existing: bool,

    /// Keep going after a file fails for good
    pub continue_on_error: bool,

    /// Extra attempts after the first failure
    pub retry_attempts: u32,

    pub(crate) filter: Option<EligibilityPredicate>,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) reporter: Arc<dyn Reporter>,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            compression_type: CompressionType::Brotli,
            extensions: default_extensions(),
            verbose: true,
            brotli_quality: Codec::Brotli.default_level() as i64,
            gzip_level: Codec::Gzip.default_level() as i64,
            min_size: 1024,
            max_size: None,
            delete_original: false,
            include: PatternSet::default(),
            exclude: PatternSet::default(),
            parallel: true,
            max_parallel: 10,
            skip_existing: false,
            continue_on_error: true,
            retry_attempts: 0,
            filter: None,
            on_error: None,
            reporter: Arc::new(ConsoleReporter::from_env()),
        }
    }
}

impl CompressionOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for options
    pub fn builder() -> CompressionOptionsBuilder {
        CompressionOptionsBuilder::new()
    }

    /// Configured level for a codec, clamped into its valid range
    pub fn effective_level(&self, codec: Codec) -> u32 {
        match codec {
            Codec::Brotli => codec.clamp_level(self.brotli_quality),
            Codec::Gzip => codec.clamp_level(self.gzip_level),
        }
    }

    /// Check a file name against the extension allow-list.
    ///
    /// Suffix match on `.` + extension, case-sensitive.
    pub fn has_allowed_extension(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| {
            file_name.len() > ext.len()
                && file_name.ends_with(ext.as_str())
                && file_name.as_bytes()[file_name.len() - ext.len() - 1] == b'.'
        })
    }

    /// The custom eligibility predicate, if any
    pub fn filter(&self) -> Option<&EligibilityPredicate> {
        self.filter.as_ref()
    }

    /// The error callback, if any
    pub fn on_error(&self) -> Option<&ErrorCallback> {
        self.on_error.as_ref()
    }

    /// Reporter receiving human-readable events; silent unless `verbose`
    pub fn reporter(&self) -> &dyn Reporter {
        if self.verbose {
            self.reporter.as_ref()
        } else {
            &SilentReporter
        }
    }
}

impl std::fmt::Debug for CompressionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionOptions")
            .field("compression_type", &self.compression_type)
            .field("extensions", &self.extensions)
            .field("verbose", &self.verbose)
            .field("brotli_quality", &self.brotli_quality)
            .field("gzip_level", &self.gzip_level)
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .field("delete_original", &self.delete_original)
            .field("include", &self.include.sources().collect::<Vec<_>>())
            .field("exclude", &self.exclude.sources().collect::<Vec<_>>())
            .field("parallel", &self.parallel)
            .field("max_parallel", &self.max_parallel)
            .field("skip_existing", &self.skip_existing)
            .field("continue_on_error", &self.continue_on_error)
            .field("retry_attempts", &self.retry_attempts)
            .field("filter", &self.filter.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Builder for CompressionOptions
#[derive(Clone)]
pub struct CompressionOptionsBuilder {
    options: CompressionOptions,
    include: Vec<String>,
    exclude: Vec<String>,
}

impl Default for CompressionOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionOptionsBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            options: CompressionOptions::default(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Set which artifacts to produce
    pub fn compression_type(mut self, compression_type: CompressionType) -> Self {
        self.options.compression_type = compression_type;
        self
    }

    /// Produce `.br` artifacts only
    pub fn brotli(self) -> Self {
        self.compression_type(CompressionType::Brotli)
    }

    /// Produce `.gz` artifacts only
    pub fn gzip(self) -> Self {
        self.compression_type(CompressionType::Gzip)
    }

    /// Produce both `.br` and `.gz` artifacts
    pub fn both(self) -> Self {
        self.compression_type(CompressionType::Both)
    }

    /// Replace the extension allow-list
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Add an extension to the allow-list
    pub fn add_extension(mut self, extension: impl Into<String>) -> Self {
        self.options.extensions.push(extension.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.options.verbose = verbose;
        self
    }

    /// Set the Brotli quality (clamped to 0..=11 when used)
    pub fn brotli_quality(mut self, quality: i64) -> Self {
        self.options.brotli_quality = quality;
        self
    }

    /// Set the gzip level (clamped to 0..=9 when used)
    pub fn gzip_level(mut self, level: i64) -> Self {
        self.options.gzip_level = level;
        self
    }

    /// Set the minimum file size to compress
    pub fn min_size(mut self, min_size: u64) -> Self {
        self.options.min_size = min_size;
        self
    }

    /// Set the maximum file size to compress
    pub fn max_size(mut self, max_size: Option<u64>) -> Self {
        self.options.max_size = max_size;
        self
    }

    pub fn delete_original(mut self, delete: bool) -> Self {
        self.options.delete_original = delete;
        self
    }

    /// Set a custom eligibility predicate
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Path, u64) -> bool + Send + Sync + 'static,
    {
        self.options.filter = Some(Arc::new(filter));
        self
    }

    /// Add include patterns
    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add exclude patterns
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.options.parallel = parallel;
        self
    }

    /// Set the concurrency cap (0 is treated as 1)
    pub fn max_parallel(mut self, max_parallel: usize) -> Self {
        self.options.max_parallel = max_parallel;
        self
    }

    pub fn skip_existing(mut self, skip: bool) -> Self {
        self.options.skip_existing = skip;
        self
    }

    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.options.continue_on_error = continue_on_error;
        self
    }

    /// Set how many times a failed file is retried
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.options.retry_attempts = attempts;
        self
    }

    /// Set the callback invoked when a file fails for good
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&PrecompressError, &Path) + Send + Sync + 'static,
    {
        self.options.on_error = Some(Arc::new(callback));
        self
    }

    /// Replace the console reporter
    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.options.reporter = reporter;
        self
    }

    /// Build the options, compiling include/exclude patterns.
    ///
    /// Requesting a codec that was compiled out is rejected here.
    pub fn build(self) -> Result<CompressionOptions> {
        let mut options = self.options;
        if let Some(codec) = options
            .compression_type
            .codecs()
            .iter()
            .find(|codec| !codec.is_available())
        {
            return Err(PrecompressError::UnsupportedCodec(format!(
                "{} support is not enabled",
                codec
            )));
        }
        options.include = PatternSet::new(self.include)?;
        options.exclude = PatternSet::new(self.exclude)?;
        options.max_parallel = options.max_parallel.max(1);
        Ok(options)
    }
}

/// Default extension allow-list
pub fn default_extensions() -> Vec<String> {
    ["js", "html", "css", "json", "ico", "svg", "wasm"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
