//! Streaming codec encoders
//!
//! Sources are fed to an encoder chunk by chunk; each call returns whatever
//! compressed bytes the codec has produced so far, which the engine writes
//! straight to the artifact file. Nothing is buffered beyond one chunk of
//! codec output.
//!
//! ```rust,ignore
//! use armature_precompress::{Codec, EncoderFactory, StreamingEncoderFactory};
//!
//! let mut encoder = StreamingEncoderFactory.create(Codec::Brotli, 6)?;
//! let mut out = Vec::new();
//! out.extend_from_slice(&encoder.encode(b"hello")?);
//! out.extend_from_slice(&encoder.finish()?);
//! ```

use crate::{Codec, PrecompressError, Result};
use bytes::Bytes;

#[cfg(feature = "gzip")]
use flate2::Compression as GzipCompression;
#[cfg(feature = "gzip")]
use flate2::write::GzEncoder;

#[cfg(feature = "brotli")]
use brotli::CompressorWriter as BrotliEncoder;

#[cfg(any(feature = "gzip", feature = "brotli"))]
use std::io::Write;

/// Size of the codec's internal output buffer.
const BUFFER_SIZE: usize = 8192;

/// Brotli window size (log2).
#[cfg(feature = "brotli")]
const BROTLI_LGWIN: u32 = 22;

/// An incremental encoder for one artifact.
pub trait ChunkEncoder: Send {
    /// Feed a chunk of source bytes, returning any compressed output ready so far.
    fn encode(&mut self, chunk: &[u8]) -> Result<Bytes>;

    /// Terminate the stream and return the remaining compressed bytes.
    fn finish(self: Box<Self>) -> Result<Bytes>;
}

/// Opens encoders for a codec at a given (already clamped) level.
pub trait EncoderFactory: Send + Sync {
    fn create(&self, codec: Codec, level: u32) -> Result<Box<dyn ChunkEncoder>>;
}

/// Default factory backed by `flate2` and `brotli`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingEncoderFactory;

impl EncoderFactory for StreamingEncoderFactory {
    fn create(&self, codec: Codec, level: u32) -> Result<Box<dyn ChunkEncoder>> {
        Ok(Box::new(StreamingEncoder::new(codec, level)?))
    }
}

#[allow(clippy::large_enum_variant)]
enum EncoderState {
    #[cfg(feature = "gzip")]
    Gzip(GzEncoder<Vec<u8>>),
    #[cfg(feature = "brotli")]
    Brotli(BrotliEncoder<Vec<u8>>),
}

/// Encoder writing codec output into an in-memory buffer that is drained
/// after every chunk.
pub struct StreamingEncoder {
    encoder: EncoderState,
    bytes_in: u64,
}

impl StreamingEncoder {
    /// Create a new encoder. `level` is clamped into the codec's range.
    pub fn new(codec: Codec, level: u32) -> Result<Self> {
        let level = codec.clamp_level(level as i64);
        let encoder = match codec {
            #[cfg(feature = "gzip")]
            Codec::Gzip => EncoderState::Gzip(GzEncoder::new(
                Vec::with_capacity(BUFFER_SIZE),
                GzipCompression::new(level),
            )),

            #[cfg(feature = "brotli")]
            Codec::Brotli => EncoderState::Brotli(BrotliEncoder::new(
                Vec::with_capacity(BUFFER_SIZE),
                BUFFER_SIZE,
                level,
                BROTLI_LGWIN,
            )),

            #[allow(unreachable_patterns)]
            _ => {
                let _ = level;
                return Err(PrecompressError::UnsupportedCodec(format!(
                    "{} support not compiled in",
                    codec
                )));
            }
        };

        Ok(Self {
            encoder,
            bytes_in: 0,
        })
    }

    /// Total source bytes fed so far
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }
}

#[cfg(any(feature = "gzip", feature = "brotli"))]
fn drain(buffer: &mut Vec<u8>) -> Bytes {
    if buffer.is_empty() {
        return Bytes::new();
    }
    Bytes::from(std::mem::take(buffer))
}

impl ChunkEncoder for StreamingEncoder {
    fn encode(&mut self, chunk: &[u8]) -> Result<Bytes> {
        if chunk.is_empty() {
            return Ok(Bytes::new());
        }
        self.bytes_in += chunk.len() as u64;

        match &mut self.encoder {
            #[cfg(feature = "gzip")]
            EncoderState::Gzip(encoder) => {
                encoder
                    .write_all(chunk)
                    .map_err(|e| PrecompressError::CompressionFailed(e.to_string()))?;
                Ok(drain(encoder.get_mut()))
            }

            #[cfg(feature = "brotli")]
            EncoderState::Brotli(encoder) => {
                encoder
                    .write_all(chunk)
                    .map_err(|e| PrecompressError::CompressionFailed(e.to_string()))?;
                Ok(drain(encoder.get_mut()))
            }
        }
    }

    fn finish(self: Box<Self>) -> Result<Bytes> {
        match self.encoder {
            #[cfg(feature = "gzip")]
            EncoderState::Gzip(encoder) => {
                let output = encoder
                    .finish()
                    .map_err(|e| PrecompressError::CompressionFailed(e.to_string()))?;
                Ok(Bytes::from(output))
            }

            // into_inner finalizes the brotli stream
            #[cfg(feature = "brotli")]
            EncoderState::Brotli(encoder) => Ok(Bytes::from(encoder.into_inner())),
        }
    }
}
