//! Build directory traversal
//!
//! Built on `walkdir`, following symlinks and listing each directory in file
//! name order. Every directory is canonicalized when it is reached and
//! recorded in a visited set; a directory already seen through another path
//! has its contents skipped, so sibling symlinks and cycles are walked once.
//! Unreadable directories and unstatable entries are skipped without error.

use crate::filter::is_eligible;
use crate::{CompressionOptions, CompressionRequest};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

/// Lazily walk `root`, yielding one request per eligible file.
///
/// A missing root yields nothing.
pub fn walk<'a>(root: &Path, options: &'a CompressionOptions) -> Walk<'a> {
    Walk {
        root: root.to_path_buf(),
        options,
        entries: WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter(),
        visited: HashSet::new(),
        skipped: 0,
    }
}

/// Iterator over eligible files under a root directory.
///
/// Single pass; a new walk must be created to traverse again.
pub struct Walk<'a> {
    root: PathBuf,
    options: &'a CompressionOptions,
    entries: walkdir::IntoIter,
    visited: HashSet<PathBuf>,
    skipped: u64,
}

impl Walk<'_> {
    /// Files with an allowed extension that were rejected so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Canonical directories entered so far
    pub fn visited_dirs(&self) -> usize {
        self.visited.len()
    }

    /// Record a directory; returns `false` if it was already entered.
    fn enter_dir(&mut self, entry: &DirEntry) -> bool {
        match fs::canonicalize(entry.path()) {
            Ok(canonical) => self.visited.insert(canonical),
            Err(e) => {
                debug!(dir = %entry.path().display(), error = %e, "Skipping unresolvable directory");
                false
            }
        }
    }

    /// Inspect one file entry, returning it if eligible.
    fn visit(&mut self, entry: DirEntry) -> Option<CompressionRequest> {
        if !entry.file_type().is_file() {
            return None;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !self.options.has_allowed_extension(&file_name) {
            return None;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "Skipping unstatable entry");
                return None;
            }
        };

        let path = entry.into_path();
        let relative = path.strip_prefix(&self.root).unwrap_or(&path);
        if !is_eligible(relative, size, self.options) {
            trace!(path = %path.display(), size, "File not eligible");
            self.skipped += 1;
            return None;
        }

        if self.options.skip_existing && has_existing_artifact(&path, self.options) {
            trace!(path = %path.display(), "Compressed sibling already exists");
            self.skipped += 1;
            return None;
        }

        Some(CompressionRequest::new(
            path,
            size,
            self.options.compression_type,
        ))
    }
}

impl Iterator for Walk<'_> {
    type Item = CompressionRequest;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(result) = self.entries.next() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    // Dangling links, unreadable directories and ancestor loops
                    debug!(error = %e, "Skipping walk entry");
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if !self.enter_dir(&entry) {
                    trace!(dir = %entry.path().display(), "Directory already visited");
                    self.entries.skip_current_dir();
                }
                continue;
            }

            if let Some(request) = self.visit(entry) {
                return Some(request);
            }
        }
        None
    }
}

/// True if any requested codec's artifact already exists.
///
/// With both codecs requested, one existing sibling is enough to skip.
fn has_existing_artifact(path: &Path, options: &CompressionOptions) -> bool {
    options
        .compression_type
        .codecs()
        .iter()
        .any(|codec| codec.artifact_path(path).exists())
}
