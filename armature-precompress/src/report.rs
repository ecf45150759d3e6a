//! Human-facing run reporting
//!
//! The pipeline never writes to the console directly. It emits
//! [`ReportEvent`]s to the [`Reporter`] carried in the options, so output can
//! be silenced or captured without touching compression behavior.
//!
//! [`ConsoleReporter`] renders events to stderr in one of three formats,
//! selected with `PRECOMPRESS_LOG_FORMAT=pretty|compact|json`. The minimum
//! level comes from `PRECOMPRESS_LOG_LEVEL=debug|info|warn|error`.

use crate::stats::format_bytes;
use crate::{CompressionOutcome, CompressionType, PrecompressError, RunStatistics};
use serde::Serialize;
use std::env;
use std::io::Write;
use std::path::Path;

/// Target name used in rendered lines.
const TARGET: &str = "armature_precompress";

/// Something worth telling the user about during a run
#[derive(Debug)]
pub enum ReportEvent<'a> {
    /// The run is starting
    Started {
        root: &'a Path,
        compression_type: CompressionType,
        candidates: usize,
    },
    /// A file produced at least one artifact
    Compressed(&'a CompressionOutcome),
    /// A file failed for good
    FileFailed {
        path: &'a Path,
        error: &'a PrecompressError,
    },
    /// The source could not be removed after compression
    DeleteFailed {
        path: &'a Path,
        error: &'a std::io::Error,
    },
    /// The batch stopped early on an unexpected error
    Aborted { error: &'a PrecompressError },
    /// Final statistics
    Finished(&'a RunStatistics),
}

impl ReportEvent<'_> {
    /// Severity of the event
    pub fn level(&self) -> Level {
        match self {
            Self::Compressed(_) => Level::Debug,
            Self::Started { .. } | Self::Finished(_) => Level::Info,
            Self::FileFailed { .. } | Self::DeleteFailed { .. } => Level::Warn,
            Self::Aborted { .. } => Level::Error,
        }
    }

    /// Human-readable message
    pub fn message(&self) -> String {
        match self {
            Self::Started {
                root,
                compression_type,
                candidates,
            } => format!(
                "Compressing {} file(s) in {} with {}",
                candidates,
                root.display(),
                compression_type
            ),
            Self::Compressed(outcome) => format!(
                "{}: {} -> {} ({} artifact(s){})",
                outcome.path.display(),
                format_bytes(outcome.original_size),
                format_bytes(outcome.compressed_size()),
                outcome.succeeded(),
                if outcome.failed() > 0 {
                    format!(", {} failed", outcome.failed())
                } else {
                    String::new()
                }
            ),
            Self::FileFailed { path, error } => {
                format!("Failed to compress {}: {}", path.display(), error)
            }
            Self::DeleteFailed { path, error } => {
                format!("Could not delete original {}: {}", path.display(), error)
            }
            Self::Aborted { error } => format!("Compression stopped early: {}", error),
            Self::Finished(stats) => format!(
                "Compressed {} artifact(s), {} skipped, {} failed: {} -> {} ({:.2}% saved) in {}ms",
                stats.compressed_files,
                stats.skipped_files,
                stats.failed_files,
                format_bytes(stats.original_size),
                format_bytes(stats.compressed_size),
                stats.compression_ratio,
                stats.elapsed_ms
            ),
        }
    }
}

/// Receives report events. Implementations must not affect the run.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &ReportEvent<'_>);

    /// Whether this reporter discards everything
    fn is_silent(&self) -> bool {
        false
    }
}

/// Reporter that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn report(&self, _event: &ReportEvent<'_>) {}

    fn is_silent(&self) -> bool {
        true
    }
}

/// Severity of a report line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Get level from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debug" | "trace" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Output format for console lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Timestamp, padded level and target
    Pretty,
    /// Short time and one-letter level
    Compact,
    /// One JSON object per line
    Json,
}

impl Format {
    /// Get format from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Reporter writing to stderr
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    format: Format,
    min_level: Level,
    timestamps: bool,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(Format::Pretty)
    }
}

impl ConsoleReporter {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            min_level: Level::Info,
            timestamps: true,
        }
    }

    /// Read format and level from `PRECOMPRESS_LOG_FORMAT` / `PRECOMPRESS_LOG_LEVEL`
    pub fn from_env() -> Self {
        let format = env::var("PRECOMPRESS_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Pretty);

        let min_level = env::var("PRECOMPRESS_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(Level::Info);

        Self {
            format,
            min_level,
            timestamps: true,
        }
    }

    pub fn min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Render an event into a line, or `None` if it is below the minimum level
    pub fn render(&self, event: &ReportEvent<'_>) -> Option<String> {
        let level = event.level();
        if level < self.min_level {
            return None;
        }
        let message = event.message();

        let line = match self.format {
            Format::Pretty => {
                let mut line = String::new();
                if self.timestamps {
                    let now = chrono::Local::now();
                    line.push_str(&format!("{} ", now.format("%Y-%m-%d %H:%M:%S%.3f")));
                }
                line.push_str(&format!("{:5} [{}] {}", level.as_str(), TARGET, message));
                line
            }
            Format::Compact => {
                let mut line = String::new();
                if self.timestamps {
                    let now = chrono::Local::now();
                    line.push_str(&format!("{} ", now.format("%H:%M:%S")));
                }
                let initial = level.as_str().chars().next().unwrap_or('?');
                line.push_str(&format!("{} {}", initial, message));
                line
            }
            Format::Json => render_json(level, &message, event)?,
        };

        Some(line)
    }
}

fn render_json(level: Level, message: &str, event: &ReportEvent<'_>) -> Option<String> {
    #[derive(Serialize)]
    struct LogEntry<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        stats: Option<&'a RunStatistics>,
    }

    let stats = match event {
        ReportEvent::Finished(stats) => Some(*stats),
        _ => None,
    };

    let entry = LogEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: level.as_str(),
        target: TARGET,
        message,
        stats,
    };

    serde_json::to_string(&entry).ok()
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: &ReportEvent<'_>) {
        if let Some(line) = self.render(event) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
        }
    }
}
