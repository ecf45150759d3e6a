//! Settings loading from files and environment variables

use crate::config::default_extensions;
use crate::{CompressionOptions, CompressionOptionsBuilder, CompressionType, PrecompressError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "PRECOMPRESS";

/// Supported settings file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// The serializable part of [`CompressionOptions`].
///
/// Hooks (predicate, error callback, reporter) can only be set in code, on
/// the builder returned by [`into_builder`](Self::into_builder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PrecompressSettings {
    #[serde(rename = "type")]
    pub compression_type: CompressionType,
    pub extensions: Vec<String>,
    pub verbose: bool,
    pub brotli_quality: i64,
    pub gzip_level: i64,
    pub min_size: u64,
    pub max_size: Option<u64>,
    pub delete_original: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub parallel: bool,
    pub max_parallel: usize,
    pub skip_existing: bool,
    pub continue_on_error: bool,
    pub retry_attempts: u32,
}

impl Default for PrecompressSettings {
    fn default() -> Self {
        let options = CompressionOptions::default();
        Self {
            compression_type: options.compression_type,
            extensions: default_extensions(),
            verbose: options.verbose,
            brotli_quality: options.brotli_quality,
            gzip_level: options.gzip_level,
            min_size: options.min_size,
            max_size: options.max_size,
            delete_original: options.delete_original,
            include: Vec::new(),
            exclude: Vec::new(),
            parallel: options.parallel,
            max_parallel: options.max_parallel,
            skip_existing: options.skip_existing,
            continue_on_error: options.continue_on_error,
            retry_attempts: options.retry_attempts,
        }
    }
}

impl PrecompressSettings {
    /// Load settings from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = path
            .extension()
            .and_then(|s| s.to_str())
            .and_then(FileFormat::from_extension)
            .ok_or_else(|| {
                PrecompressError::Config(format!(
                    "Unsupported settings file: {}",
                    path.display()
                ))
            })?;

        let content = fs::read_to_string(path).map_err(|e| {
            PrecompressError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::parse(&content, format)
    }

    /// Parse settings from a string
    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        match format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| PrecompressError::Config(format!("JSON parse error: {}", e))),
            FileFormat::Toml => toml::from_str(content)
                .map_err(|e| PrecompressError::Config(format!("TOML parse error: {}", e))),
        }
    }

    /// Apply `PRECOMPRESS_*` variables from the process environment
    pub fn with_env(self) -> Result<Self> {
        let vars = env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| (rest.to_lowercase(), value))
            })
            .collect();
        self.with_overrides(&vars)
    }

    /// Apply overrides keyed by lowercase setting name (`min_size`, `type`, ...)
    pub fn with_overrides(mut self, vars: &HashMap<String, String>) -> Result<Self> {
        for (key, value) in vars {
            match key.as_str() {
                "type" => self.compression_type = value.parse()?,
                "extensions" => self.extensions = split_list(value),
                "verbose" => self.verbose = parse_bool(key, value)?,
                "brotli_quality" => self.brotli_quality = parse_value(key, value)?,
                "gzip_level" => self.gzip_level = parse_value(key, value)?,
                "min_size" => self.min_size = parse_value(key, value)?,
                "max_size" => {
                    self.max_size = if value.trim().is_empty() {
                        None
                    } else {
                        Some(parse_value(key, value)?)
                    }
                }
                "delete_original" => self.delete_original = parse_bool(key, value)?,
                "include" => self.include = split_list(value),
                "exclude" => self.exclude = split_list(value),
                "parallel" => self.parallel = parse_bool(key, value)?,
                "max_parallel" => self.max_parallel = parse_value(key, value)?,
                "skip_existing" => self.skip_existing = parse_bool(key, value)?,
                "continue_on_error" => self.continue_on_error = parse_bool(key, value)?,
                "retry_attempts" => self.retry_attempts = parse_value(key, value)?,
                // Reporter variables are read by the console reporter itself
                _ => {}
            }
        }
        Ok(self)
    }

    /// Builder seeded with these settings
    pub fn into_builder(self) -> CompressionOptionsBuilder {
        CompressionOptions::builder()
            .compression_type(self.compression_type)
            .extensions(self.extensions)
            .verbose(self.verbose)
            .brotli_quality(self.brotli_quality)
            .gzip_level(self.gzip_level)
            .min_size(self.min_size)
            .max_size(self.max_size)
            .delete_original(self.delete_original)
            .include(self.include)
            .exclude(self.exclude)
            .parallel(self.parallel)
            .max_parallel(self.max_parallel)
            .skip_existing(self.skip_existing)
            .continue_on_error(self.continue_on_error)
            .retry_attempts(self.retry_attempts)
    }

    /// Build options directly, without hooks
    pub fn build(self) -> Result<CompressionOptions> {
        self.into_builder().build()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(PrecompressError::Config(format!(
            "Invalid boolean for {}: {}",
            key, other
        ))),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PrecompressError::Config(format!("Invalid value for {}: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_match_options() {
        let settings = PrecompressSettings::default();
        assert_eq!(settings.compression_type, CompressionType::Brotli);
        assert_eq!(settings.min_size, 1024);
        assert_eq!(settings.max_parallel, 10);
        assert!(settings.continue_on_error);
        assert_eq!(settings.extensions.len(), 7);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            type = "both"
            extensions = ["js", "css"]
            min_size = 0
            max_size = 1048576
            exclude = ["**/*.map"]
            retry_attempts = 2
        "#;

        let settings = PrecompressSettings::parse(toml, FileFormat::Toml).unwrap();
        assert_eq!(settings.compression_type, CompressionType::Both);
        assert_eq!(settings.extensions, vec!["js", "css"]);
        assert_eq!(settings.min_size, 0);
        assert_eq!(settings.max_size, Some(1_048_576));
        assert_eq!(settings.exclude, vec!["**/*.map"]);
        assert_eq!(settings.retry_attempts, 2);
        assert!(settings.parallel);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"type": "gzip", "gzip_level": 9, "parallel": false}"#;
        let settings = PrecompressSettings::parse(json, FileFormat::Json).unwrap();
        assert_eq!(settings.compression_type, CompressionType::Gzip);
        assert_eq!(settings.gzip_level, 9);
        assert!(!settings.parallel);
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let result = PrecompressSettings::parse(r#"type = "zstd""#, FileFormat::Toml);
        assert!(matches!(result, Err(PrecompressError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let settings = PrecompressSettings::default()
            .with_overrides(&vars(&[
                ("type", "both"),
                ("extensions", "js, css ,,html"),
                ("min_size", "0"),
                ("max_size", "4096"),
                ("skip_existing", "yes"),
                ("verbose", "0"),
                ("log_format", "json"),
            ]))
            .unwrap();

        assert_eq!(settings.compression_type, CompressionType::Both);
        assert_eq!(settings.extensions, vec!["js", "css", "html"]);
        assert_eq!(settings.min_size, 0);
        assert_eq!(settings.max_size, Some(4096));
        assert!(settings.skip_existing);
        assert!(!settings.verbose);
    }

    #[test]
    fn test_override_errors() {
        let result = PrecompressSettings::default().with_overrides(&vars(&[("min_size", "big")]));
        assert!(matches!(result, Err(PrecompressError::Config(_))));

        let result = PrecompressSettings::default().with_overrides(&vars(&[("parallel", "maybe")]));
        assert!(matches!(result, Err(PrecompressError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("precompress.toml");
        fs::write(&path, "type = \"gzip\"\ninclude = [\"assets/**\"]\n").unwrap();

        let options = PrecompressSettings::from_file(&path).unwrap().build().unwrap();
        assert_eq!(options.compression_type, CompressionType::Gzip);
        assert_eq!(options.include.len(), 1);

        let bad = dir.path().join("precompress.yaml");
        fs::write(&bad, "type: gzip").unwrap();
        assert!(PrecompressSettings::from_file(&bad).is_err());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("yaml"), None);
    }
}
