//! Run pipeline and post-build hook

use crate::engine::CompressionEngine;
use crate::report::ReportEvent;
use crate::scheduler::BatchScheduler;
use crate::streaming::{EncoderFactory, StreamingEncoderFactory};
use crate::walker::walk;
use crate::{CompressionOptions, CompressionRequest, PrecompressError, Result, RunStatistics};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info};

/// Compresses a build output directory in place.
///
/// ```rust,no_run
/// use armature_precompress::{CompressionOptions, Precompressor};
///
/// # async fn example() -> armature_precompress::Result<()> {
/// let options = CompressionOptions::builder().both().min_size(512).build()?;
/// let stats = Precompressor::new(options).on_build_complete("dist").await?;
/// println!("{} artifacts written", stats.compressed_files);
/// # Ok(())
/// # }
/// ```
pub struct Precompressor<F = StreamingEncoderFactory> {
    options: CompressionOptions,
    factory: F,
    fired: AtomicBool,
}

impl Precompressor {
    /// Precompressor using the real codecs
    pub fn new(options: CompressionOptions) -> Self {
        Self::with_encoder_factory(options, StreamingEncoderFactory)
    }
}

impl<F: EncoderFactory> Precompressor<F> {
    /// Precompressor using a custom encoder factory
    pub fn with_encoder_factory(options: CompressionOptions, factory: F) -> Self {
        Self {
            options,
            factory,
            fired: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &CompressionOptions {
        &self.options
    }

    /// Build-tool hook. Runs the pipeline once; later calls fail with
    /// [`PrecompressError::AlreadyRan`].
    pub async fn on_build_complete(&self, out_dir: impl AsRef<Path>) -> Result<RunStatistics> {
        if self.fired.swap(true, Ordering::SeqCst) {
            return Err(PrecompressError::AlreadyRan);
        }
        self.run(out_dir).await
    }

    /// Walk `root`, compress every eligible file and return the statistics.
    pub async fn run(&self, root: impl AsRef<Path>) -> Result<RunStatistics> {
        let start = Instant::now();
        let root = root.as_ref();
        let reporter = self.options.reporter();

        let (files, skipped) = match self.discover(root).await {
            Ok(found) => found,
            Err(e) => return self.abort(e, RunStatistics::new(0), start),
        };

        info!(
            root = %root.display(),
            compression_type = %self.options.compression_type,
            candidates = files.len(),
            skipped,
            "Starting precompression"
        );
        reporter.report(&ReportEvent::Started {
            root,
            compression_type: self.options.compression_type,
            candidates: files.len(),
        });

        let engine = CompressionEngine::with_factory(&self.options, &self.factory);
        let mut stats = BatchScheduler::new(&engine, &self.options)
            .run_batch(files)
            .await?;

        stats.skipped_files = skipped;
        stats.finalize(start.elapsed());

        info!(
            compressed = stats.compressed_files,
            failed = stats.failed_files,
            skipped = stats.skipped_files,
            elapsed_ms = stats.elapsed_ms,
            "Precompression finished"
        );
        reporter.report(&ReportEvent::Finished(&stats));
        Ok(stats)
    }

    /// Collect candidates off the async runtime.
    async fn discover(&self, root: &Path) -> Result<(Vec<CompressionRequest>, u64)> {
        let options = self.options.clone();
        let root: PathBuf = root.to_path_buf();

        let found = tokio::task::spawn_blocking(move || {
            let mut walker = walk(&root, &options);
            let files: Vec<CompressionRequest> = walker.by_ref().collect();
            (files, walker.skipped())
        })
        .await?;

        debug!(candidates = found.0.len(), skipped = found.1, "Walk complete");
        Ok(found)
    }

    /// Handle an error raised outside any single file.
    fn abort(&self, err: PrecompressError, mut stats: RunStatistics, start: Instant) -> Result<RunStatistics> {
        error!(error = %err, "Precompression stopped early");
        if !self.options.continue_on_error {
            return Err(err);
        }

        stats.finalize(start.elapsed());
        let reporter = self.options.reporter();
        reporter.report(&ReportEvent::Aborted { error: &err });
        reporter.report(&ReportEvent::Finished(&stats));
        Ok(stats)
    }
}
