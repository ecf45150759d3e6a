//! Codec and compression type definitions

use crate::PrecompressError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A byte-stream compression codec that produces a sibling artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Brotli, written as `<file>.br`
    Brotli,
    /// Gzip, written as `<file>.gz`
    Gzip,
}

impl Codec {
    /// File extension appended to the source name for this codec's artifact
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip => "gz",
        }
    }

    /// Get the minimum quality/level for this codec
    pub fn min_level(&self) -> u32 {
        0
    }

    /// Get the maximum quality/level for this codec
    pub fn max_level(&self) -> u32 {
        match self {
            Self::Brotli => 11,
            Self::Gzip => 9,
        }
    }

    /// Get the default quality/level for this codec
    pub fn default_level(&self) -> u32 {
        6
    }

    /// Clamp a configured level into the codec's valid range.
    ///
    /// Out-of-range values are never rejected.
    pub fn clamp_level(&self, level: i64) -> u32 {
        level.clamp(self.min_level() as i64, self.max_level() as i64) as u32
    }

    /// Check if this codec was compiled in
    pub fn is_available(&self) -> bool {
        match self {
            Self::Brotli => cfg!(feature = "brotli"),
            Self::Gzip => cfg!(feature = "gzip"),
        }
    }

    /// Path of the artifact this codec writes next to `source`
    pub fn artifact_path(&self, source: &Path) -> PathBuf {
        let mut name = OsString::from(source.as_os_str());
        name.push(".");
        name.push(self.extension());
        PathBuf::from(name)
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Brotli => write!(f, "brotli"),
            Self::Gzip => write!(f, "gzip"),
        }
    }
}

/// Which artifacts a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    /// Brotli only
    #[default]
    Brotli,
    /// Gzip only
    Gzip,
    /// Both a `.br` and a `.gz` artifact
    Both,
}

impl CompressionType {
    /// Requested codecs, Brotli first
    pub fn codecs(&self) -> &'static [Codec] {
        match self {
            Self::Brotli => &[Codec::Brotli],
            Self::Gzip => &[Codec::Gzip],
            Self::Both => &[Codec::Brotli, Codec::Gzip],
        }
    }

    /// Check if the given codec is part of this type
    pub fn includes(&self, codec: Codec) -> bool {
        self.codecs().contains(&codec)
    }
}

impl FromStr for CompressionType {
    type Err = PrecompressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "brotli" | "br" => Ok(Self::Brotli),
            "gzip" | "gz" => Ok(Self::Gzip),
            "both" => Ok(Self::Both),
            other => Err(PrecompressError::Config(format!(
                "unknown compression type '{}' (expected brotli, gzip or both)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Brotli => write!(f, "brotli"),
            Self::Gzip => write!(f, "gzip"),
            Self::Both => write!(f, "brotli+gzip"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_display() {
        assert_eq!(format!("{}", Codec::Brotli), "brotli");
        assert_eq!(format!("{}", Codec::Gzip), "gzip");
        assert_eq!(format!("{}", CompressionType::Both), "brotli+gzip");
    }

    #[test]
    fn test_clamp_level() {
        assert_eq!(Codec::Brotli.clamp_level(20), 11);
        assert_eq!(Codec::Brotli.clamp_level(-3), 0);
        assert_eq!(Codec::Brotli.clamp_level(6), 6);
        assert_eq!(Codec::Gzip.clamp_level(11), 9);
        assert_eq!(Codec::Gzip.clamp_level(0), 0);
    }

    #[test]
    fn test_artifact_path_appends_extension() {
        let source = Path::new("dist/assets/app.min.js");
        assert_eq!(
            Codec::Brotli.artifact_path(source),
            PathBuf::from("dist/assets/app.min.js.br")
        );
        assert_eq!(
            Codec::Gzip.artifact_path(source),
            PathBuf::from("dist/assets/app.min.js.gz")
        );
    }

    #[test]
    fn test_compression_type_codecs() {
        assert_eq!(CompressionType::Brotli.codecs(), &[Codec::Brotli]);
        assert_eq!(CompressionType::Gzip.codecs(), &[Codec::Gzip]);
        assert_eq!(CompressionType::Both.codecs(), &[Codec::Brotli, Codec::Gzip]);
        assert!(!CompressionType::Gzip.includes(Codec::Brotli));
    }

    #[test]
    fn test_compression_type_from_str() {
        assert_eq!("br".parse::<CompressionType>().unwrap(), CompressionType::Brotli);
        assert_eq!("GZIP".parse::<CompressionType>().unwrap(), CompressionType::Gzip);
        assert_eq!("both".parse::<CompressionType>().unwrap(), CompressionType::Both);
        assert!("zstd".parse::<CompressionType>().is_err());
    }
}
