//! Batch scheduling and statistics aggregation
//!
//! In parallel mode the candidate list is split into contiguous groups of
//! `max_parallel` files. Each group runs concurrently on the current task and
//! fully settles before the next one starts, which caps the number of files
//! in flight without a worker pool. Outcomes are folded on the driving task
//! only, so the statistics need no locking; folding is a sum, so the result
//! does not depend on completion order inside a group.

use crate::engine::FileCompressor;
use crate::report::ReportEvent;
use crate::retry::compress_with_retry;
use crate::{CompressionOptions, CompressionOutcome, CompressionRequest, Result, RunStatistics};
use futures::future::join_all;
use std::time::Instant;
use tracing::debug;

/// Drives a batch of files through a [`FileCompressor`].
pub struct BatchScheduler<'a, C: ?Sized> {
    compressor: &'a C,
    options: &'a CompressionOptions,
}

impl<'a, C> BatchScheduler<'a, C>
where
    C: FileCompressor + ?Sized,
{
    pub fn new(compressor: &'a C, options: &'a CompressionOptions) -> Self {
        Self {
            compressor,
            options,
        }
    }

    /// Compress every file and return the finalized statistics.
    ///
    /// With `continue_on_error` unset, the first file that fails for good
    /// aborts the batch with its error.
    pub async fn run_batch(&self, files: Vec<CompressionRequest>) -> Result<RunStatistics> {
        let start = Instant::now();
        let mut stats = RunStatistics::new(files.len() as u64);

        if self.options.parallel {
            self.run_grouped(&files, &mut stats).await?;
        } else {
            self.run_sequential(&files, &mut stats).await?;
        }

        stats.finalize(start.elapsed());
        Ok(stats)
    }

    async fn run_sequential(
        &self,
        files: &[CompressionRequest],
        stats: &mut RunStatistics,
    ) -> Result<()> {
        for request in files {
            let result = compress_with_retry(self.compressor, request, self.options).await;
            self.fold(stats, request, result)?;
        }
        Ok(())
    }

    async fn run_grouped(
        &self,
        files: &[CompressionRequest],
        stats: &mut RunStatistics,
    ) -> Result<()> {
        let group_size = self.options.max_parallel.max(1);

        for (index, group) in files.chunks(group_size).enumerate() {
            debug!(group = index, files = group.len(), "Starting group");

            let results = join_all(
                group
                    .iter()
                    .map(|request| compress_with_retry(self.compressor, request, self.options)),
            )
            .await;

            // The whole group has settled; report the first failure only now
            let mut first_error = None;
            for (request, result) in group.iter().zip(results) {
                if let Err(e) = self.fold(stats, request, result) {
                    first_error.get_or_insert(e);
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        Ok(())
    }

    /// Fold one settled result. Returns the error only when it should abort
    /// the batch.
    fn fold(
        &self,
        stats: &mut RunStatistics,
        request: &CompressionRequest,
        result: Result<CompressionOutcome>,
    ) -> Result<()> {
        let reporter = self.options.reporter();
        match result {
            Ok(outcome) => {
                reporter.report(&ReportEvent::Compressed(&outcome));
                stats.record(&outcome);
                Ok(())
            }
            Err(error) => {
                reporter.report(&ReportEvent::FileFailed {
                    path: request.path(),
                    error: &error,
                });
                stats.record_failure();
                if self.options.continue_on_error {
                    Ok(())
                } else {
                    Err(error)
                }
            }
        }
    }
}
