//! Per-file compression into sibling artifacts

use crate::report::ReportEvent;
use crate::streaming::{ChunkEncoder, EncoderFactory, StreamingEncoderFactory};
use crate::{
    Codec, CodecResult, CompressionOptions, CompressionOutcome, CompressionRequest,
    PrecompressError, Result,
};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

/// Read size for streaming sources.
const CHUNK_SIZE: usize = 64 * 1024;

/// Something that compresses one file.
///
/// An `Err` means the file failed as a whole and may be retried. Partial
/// codec failures are reported inside the returned outcome.
#[async_trait]
pub trait FileCompressor: Send + Sync {
    async fn compress(&self, request: &CompressionRequest) -> Result<CompressionOutcome>;
}

/// Writes `<file>.br` / `<file>.gz` next to each source.
pub struct CompressionEngine<'a, F: ?Sized = StreamingEncoderFactory> {
    options: &'a CompressionOptions,
    factory: &'a F,
}

impl<'a> CompressionEngine<'a> {
    /// Engine using the real codecs
    pub fn new(options: &'a CompressionOptions) -> Self {
        Self {
            options,
            factory: &StreamingEncoderFactory,
        }
    }
}

impl<'a, F: EncoderFactory + ?Sized> CompressionEngine<'a, F> {
    /// Engine using a custom encoder factory
    pub fn with_factory(options: &'a CompressionOptions, factory: &'a F) -> Self {
        Self { options, factory }
    }

    /// Compress one codec, removing a partial artifact on failure.
    ///
    /// Failures before the destination is created leave any existing
    /// artifact in place.
    async fn compress_codec(&self, source: &Path, codec: Codec) -> Result<u64> {
        let dest = codec.artifact_path(source);
        let level = self.options.effective_level(codec);

        let encoder = self.factory.create(codec, level)?;
        let input = File::open(source).await?;
        let output = File::create(&dest).await?;

        match write_artifact(encoder, input, output).await {
            Ok(written) => Ok(written),
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&dest).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        debug!(dest = %dest.display(), error = %cleanup, "Could not remove partial artifact");
                    }
                }
                Err(e)
            }
        }
    }
}

/// Stream `input` through the encoder into `output`, returning bytes written.
async fn write_artifact(
    mut encoder: Box<dyn ChunkEncoder>,
    mut input: File,
    mut output: File,
) -> Result<u64> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let read = input.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        let compressed = encoder.encode(&buffer[..read])?;
        if !compressed.is_empty() {
            output.write_all(&compressed).await?;
            written += compressed.len() as u64;
        }
    }

    let tail = encoder.finish()?;
    output.write_all(&tail).await?;
    written += tail.len() as u64;
    output.flush().await?;

    Ok(written)
}

#[async_trait]
impl<F: EncoderFactory + ?Sized> FileCompressor for CompressionEngine<'_, F> {
    async fn compress(&self, request: &CompressionRequest) -> Result<CompressionOutcome> {
        let path = request.path();
        let mut outcome = CompressionOutcome::new(path, request.size());
        let mut last_error: Option<PrecompressError> = None;

        for &codec in request.compression_type().codecs() {
            match self.compress_codec(path, codec).await {
                Ok(size) => {
                    debug!(path = %path.display(), %codec, size, "Wrote artifact");
                    outcome.set(codec, CodecResult::Succeeded { size });
                }
                Err(e) => {
                    warn!(path = %path.display(), %codec, error = %e, "Codec stream failed");
                    outcome.set(codec, CodecResult::Failed);
                    last_error = Some(e);
                }
            }
        }

        if !outcome.any_succeeded() {
            return Err(PrecompressError::AllCodecsFailed {
                path: path.to_path_buf(),
                message: last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no codec requested".to_string()),
            });
        }

        if self.options.delete_original {
            match tokio::fs::remove_file(path).await {
                Ok(()) => outcome.original_deleted = true,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not delete original");
                    self.options
                        .reporter()
                        .report(&ReportEvent::DeleteFailed { path, error: &e });
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Reporter;
    use bytes::Bytes;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Delegates to the real codecs except for `broken`, whose stream fails on write.
    struct BreakingFactory {
        broken: Codec,
    }

    struct BrokenEncoder;

    impl ChunkEncoder for BrokenEncoder {
        fn encode(&mut self, _chunk: &[u8]) -> Result<Bytes> {
            Ok(Bytes::from_static(b"partial"))
        }

        fn finish(self: Box<Self>) -> Result<Bytes> {
            Err(PrecompressError::CompressionFailed("write error".into()))
        }
    }

    impl EncoderFactory for BreakingFactory {
        fn create(&self, codec: Codec, level: u32) -> Result<Box<dyn ChunkEncoder>> {
            if codec == self.broken {
                Ok(Box::new(BrokenEncoder))
            } else {
                StreamingEncoderFactory.create(codec, level)
            }
        }
    }

    /// Refuses to open any encoder.
    struct UnsupportedFactory;

    impl EncoderFactory for UnsupportedFactory {
        fn create(&self, codec: Codec, _level: u32) -> Result<Box<dyn ChunkEncoder>> {
            Err(PrecompressError::UnsupportedCodec(codec.to_string()))
        }
    }

    /// Real encoders that remove the source file when the stream finishes.
    struct SourceRemovingFactory {
        source: PathBuf,
    }

    struct SourceRemovingEncoder {
        inner: Box<dyn ChunkEncoder>,
        source: PathBuf,
    }

    impl ChunkEncoder for SourceRemovingEncoder {
        fn encode(&mut self, chunk: &[u8]) -> Result<Bytes> {
            self.inner.encode(chunk)
        }

        fn finish(self: Box<Self>) -> Result<Bytes> {
            std::fs::remove_file(&self.source)?;
            self.inner.finish()
        }
    }

    impl EncoderFactory for SourceRemovingFactory {
        fn create(&self, codec: Codec, level: u32) -> Result<Box<dyn ChunkEncoder>> {
            Ok(Box::new(SourceRemovingEncoder {
                inner: StreamingEncoderFactory.create(codec, level)?,
                source: self.source.clone(),
            }))
        }
    }

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<String>>,
    }

    impl Reporter for Recorder {
        fn report(&self, event: &ReportEvent<'_>) {
            self.messages.lock().unwrap().push(event.message());
        }
    }

    fn source(dir: &TempDir, name: &str) -> CompressionRequest {
        let path = dir.path().join(name);
        let data: Vec<u8> = b"body { color: #333; margin: 0 auto; }\n"
            .iter()
            .copied()
            .cycle()
            .take(10_000)
            .collect();
        std::fs::write(&path, &data).unwrap();
        CompressionRequest::new(path, data.len() as u64, crate::CompressionType::Both)
    }

    fn options() -> CompressionOptions {
        CompressionOptions::builder()
            .verbose(false)
            .both()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_compress_writes_both_artifacts() {
        let dir = TempDir::new().unwrap();
        let request = source(&dir, "site.css");
        let options = options();

        let outcome = CompressionEngine::new(&options).compress(&request).await.unwrap();

        let br = std::fs::metadata(dir.path().join("site.css.br")).unwrap();
        let gz = std::fs::metadata(dir.path().join("site.css.gz")).unwrap();
        assert_eq!(outcome.brotli, CodecResult::Succeeded { size: br.len() });
        assert_eq!(outcome.gzip, CodecResult::Succeeded { size: gz.len() });
        assert_eq!(outcome.compressed_size(), br.len() + gz.len());
        assert_eq!(outcome.original_size, 10_000);
        assert!(!outcome.original_deleted);
        assert!(request.path().exists());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_outcome_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let request = source(&dir, "site.css");
        let options = CompressionOptions::builder()
            .verbose(false)
            .both()
            .delete_original(true)
            .build()
            .unwrap();
        let factory = BreakingFactory {
            broken: Codec::Gzip,
        };

        let outcome = CompressionEngine::with_factory(&options, &factory)
            .compress(&request)
            .await
            .unwrap();

        assert_eq!(outcome.succeeded(), 1);
        assert_eq!(outcome.failed(), 1);
        assert!(outcome.brotli.is_success());
        assert!(outcome.original_deleted);
        assert!(!request.path().exists());
        assert!(dir.path().join("site.css.br").exists());
        assert!(!dir.path().join("site.css.gz").exists());
    }

    #[tokio::test]
    async fn test_all_codecs_failing_is_an_error() {
        let dir = TempDir::new().unwrap();
        let request = CompressionRequest::new(
            source(&dir, "app.js").path(),
            10_000,
            crate::CompressionType::Brotli,
        );
        let options = CompressionOptions::builder()
            .verbose(false)
            .delete_original(true)
            .build()
            .unwrap();
        let factory = BreakingFactory {
            broken: Codec::Brotli,
        };

        let err = CompressionEngine::with_factory(&options, &factory)
            .compress(&request)
            .await
            .unwrap_err();

        assert!(matches!(err, PrecompressError::AllCodecsFailed { .. }));
        assert!(request.path().exists());
        assert!(!dir.path().join("app.js.br").exists());
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let request = CompressionRequest::new(
            dir.path().join("gone.js"),
            1,
            crate::CompressionType::Gzip,
        );
        let options = options();

        let result = CompressionEngine::new(&options).compress(&request).await;
        assert!(result.is_err());
        assert!(!dir.path().join("gone.js.gz").exists());
    }

    #[tokio::test]
    async fn test_early_failure_keeps_existing_artifact() {
        let dir = TempDir::new().unwrap();
        let request = CompressionRequest::new(
            source(&dir, "app.js").path(),
            10_000,
            crate::CompressionType::Brotli,
        );
        let existing = dir.path().join("app.js.br");
        std::fs::write(&existing, b"previous artifact").unwrap();
        let options = CompressionOptions::builder().verbose(false).build().unwrap();

        let result = CompressionEngine::with_factory(&options, &UnsupportedFactory)
            .compress(&request)
            .await;

        assert!(matches!(result, Err(PrecompressError::AllCodecsFailed { .. })));
        assert_eq!(std::fs::read(&existing).unwrap(), b"previous artifact");
    }

    #[tokio::test]
    async fn test_missing_source_keeps_existing_artifact() {
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join("gone.js.gz");
        std::fs::write(&existing, b"previous artifact").unwrap();
        let request = CompressionRequest::new(
            dir.path().join("gone.js"),
            1,
            crate::CompressionType::Gzip,
        );
        let options = options();

        assert!(CompressionEngine::new(&options).compress(&request).await.is_err());
        assert_eq!(std::fs::read(&existing).unwrap(), b"previous artifact");
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_successful_outcome() {
        let dir = TempDir::new().unwrap();
        let request = CompressionRequest::new(
            source(&dir, "app.js").path(),
            10_000,
            crate::CompressionType::Brotli,
        );
        let recorder = Arc::new(Recorder::default());
        let options = CompressionOptions::builder()
            .delete_original(true)
            .reporter(recorder.clone())
            .build()
            .unwrap();
        let factory = SourceRemovingFactory {
            source: request.path().to_path_buf(),
        };

        let outcome = CompressionEngine::with_factory(&options, &factory)
            .compress(&request)
            .await
            .unwrap();

        assert!(outcome.brotli.is_success());
        assert!(!outcome.original_deleted);
        assert!(dir.path().join("app.js.br").exists());
        let messages = recorder.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Could not delete original"));
    }

    #[cfg(feature = "gzip")]
    #[tokio::test]
    async fn test_gzip_artifact_round_trips() {
        use flate2::read::GzDecoder;
        use std::io::Read;

        let dir = TempDir::new().unwrap();
        let request = source(&dir, "site.css");
        let request =
            CompressionRequest::new(request.path(), request.size(), crate::CompressionType::Gzip);
        let options = CompressionOptions::builder()
            .verbose(false)
            .gzip()
            .gzip_level(99)
            .build()
            .unwrap();

        CompressionEngine::new(&options).compress(&request).await.unwrap();

        let compressed = std::fs::read(dir.path().join("site.css.gz")).unwrap();
        let mut decoded = Vec::new();
        GzDecoder::new(&compressed[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, std::fs::read(request.path()).unwrap());
    }
}
