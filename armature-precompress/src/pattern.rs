//! Minimal glob patterns for include/exclude lists
//!
//! Supported syntax:
//!
//! - `**` matches any sequence of path segments, including none
//! - `*` matches any run of characters except `/`
//! - `?` matches exactly one character except `/`
//!
//! Everything else is literal. Patterns are anchored and matched against the
//! path relative to the build directory, using `/` as the separator on every
//! platform. There is no negation syntax and no case folding.

use crate::{PrecompressError, Result};
use regex::Regex;
use std::path::Path;

/// A single compiled glob pattern
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob pattern.
    ///
    /// Regex metacharacters are escaped before translation; compiling only
    /// fails when the pattern exceeds the regex size limit.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let source = pattern.into();
        let regex = Regex::new(&translate(&source)).map_err(|e| {
            PrecompressError::Config(format!("invalid pattern '{}': {}", source, e))
        })?;
        Ok(Self { source, regex })
    }

    /// The original pattern text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check a `/`-separated relative path against this pattern
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Translate a glob into an anchored regex.
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    // "**/" may also match zero segments
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }

    out.push('$');
    out
}

/// An OR-combined list of patterns
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<GlobPattern>,
}

impl PatternSet {
    /// Compile a list of patterns
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns
            .into_iter()
            .map(GlobPattern::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Whether the set holds no patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Iterate over the source text of each pattern
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(GlobPattern::as_str)
    }

    /// True if any pattern matches. An empty set matches everything; callers
    /// using a set as an exclude list must check [`is_empty`](Self::is_empty)
    /// first.
    pub fn matches(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let normalized = normalize(path);
        self.patterns.iter().any(|p| p.is_match(&normalized))
    }
}

/// Render a path with `/` separators.
pub(crate) fn normalize(path: &Path) -> String {
    let text = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(p: &str) -> GlobPattern {
        GlobPattern::new(p).unwrap()
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        assert!(glob("*.js").is_match("app.js"));
        assert!(!glob("*.js").is_match("assets/app.js"));
        assert!(glob("assets/*.js").is_match("assets/app.js"));
        assert!(!glob("assets/*.js").is_match("assets/vendor/app.js"));
    }

    #[test]
    fn test_double_star_spans_segments() {
        let p = glob("**/*.map");
        assert!(p.is_match("app.js.map"));
        assert!(p.is_match("assets/app.js.map"));
        assert!(p.is_match("a/b/c/app.js.map"));
        assert!(!p.is_match("a/b/c/app.js"));

        assert!(glob("assets/**").is_match("assets/x/y.css"));
        assert!(glob("assets/**/x.css").is_match("assets/x.css"));
    }

    #[test]
    fn test_question_mark_matches_one_char() {
        let p = glob("chunk-?.js");
        assert!(p.is_match("chunk-a.js"));
        assert!(!p.is_match("chunk-ab.js"));
        assert!(!p.is_match("chunk-.js"));
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let p = glob("vendor.(min)+[1].js");
        assert!(p.is_match("vendor.(min)+[1].js"));
        assert!(!p.is_match("vendorx(min)+[1].js"));
        assert!(glob("a|b").is_match("a|b"));
        assert!(!glob("a|b").is_match("a"));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(!glob("*.JS").is_match("app.js"));
    }

    #[test]
    fn test_set_is_logical_or() {
        let set = PatternSet::new(["*.css", "**/*.svg"]).unwrap();
        assert!(set.matches(Path::new("main.css")));
        assert!(set.matches(Path::new("icons/logo.svg")));
        assert!(!set.matches(Path::new("main.js")));
        assert_eq!(set.len(), 2);
        assert_eq!(set.sources().collect::<Vec<_>>(), vec!["*.css", "**/*.svg"]);
    }

    #[test]
    fn test_empty_set_matches_everything() {
        let set = PatternSet::default();
        assert!(set.is_empty());
        assert!(set.matches(Path::new("anything/at/all.js")));
    }
}
