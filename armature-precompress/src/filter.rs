//! Per-file eligibility decision

use crate::CompressionOptions;
use std::path::Path;

/// Decide whether a file should be compressed.
///
/// `path` is the root-relative path used for pattern matching; the custom
/// predicate receives the same path. Checks run in order and the first
/// failing one wins:
///
/// 1. `size < min_size`
/// 2. `size > max_size`, when set
/// 3. include patterns, when present, decide alone
/// 4. a matching exclude pattern rejects
/// 5. the custom predicate decides, when set
///
/// The extension allow-list is applied earlier, by the walker.
pub fn is_eligible(path: &Path, size: u64, options: &CompressionOptions) -> bool {
    if size < options.min_size {
        return false;
    }

    if let Some(max) = options.max_size {
        if size > max {
            return false;
        }
    }

    if !options.include.is_empty() {
        return options.include.matches(path);
    }

    if !options.exclude.is_empty() && options.exclude.matches(path) {
        return false;
    }

    match options.filter() {
        Some(predicate) => predicate(path, size),
        None => true,
    }
}
