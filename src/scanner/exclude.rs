//! Exclusion rules.
//!
//! A rule is a wildcard pattern where `*` matches any run of characters,
//! including path separators. Every other character is literal. Rules are
//! matched against the full path of an entry and are not anchored, so
//! `*.tmp` vetoes `/data/big.tmp` as well as `/data/x.tmp.bak`.
//!
//! Patterns are usually loaded from a plain text file with one pattern per
//! line. A missing file is not an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

/// Errors that can occur while loading or compiling exclusion rules.
#[derive(thiserror::Error, Debug)]
pub enum ExcludeError {
    /// A pattern could not be compiled.
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as written by the user
        pattern: String,
        /// The underlying regex error
        #[source]
        source: regex::Error,
    },

    /// The pattern file exists but could not be read.
    #[error("Failed to read exclude file {path}: {source}")]
    Io {
        /// Path of the pattern file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// A single compiled exclusion pattern.
#[derive(Debug, Clone)]
pub struct ExclusionRule {
    pattern: String,
    regex: Regex,
}

impl ExclusionRule {
    /// Compile a wildcard pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ExcludeError::InvalidPattern`] if the expanded expression
    /// cannot be compiled.
    ///
    /// # Example
    ///
    /// ```
    /// use favscan::scanner::exclude::ExclusionRule;
    ///
    /// let rule = ExclusionRule::new("*.tmp").unwrap();
    /// assert!(rule.matches("/data/big.tmp"));
    /// assert!(!rule.matches("/data/big.iso"));
    /// ```
    pub fn new(pattern: &str) -> Result<Self, ExcludeError> {
        let expr = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let regex = Regex::new(&expr).map_err(|source| ExcludeError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether this rule matches anywhere in `path`.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// An ordered set of exclusion rules; any match vetoes a path.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    rules: Vec<ExclusionRule>,
}

impl ExclusionSet {
    /// An empty set that excludes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile every pattern, failing on the first invalid one.
    ///
    /// # Errors
    ///
    /// Returns the first [`ExcludeError::InvalidPattern`] encountered.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, ExcludeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|p| ExclusionRule::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Load and compile the pattern file at `path`.
    ///
    /// A missing file yields an empty set with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is unreadable, or if any
    /// pattern fails to compile.
    pub fn load(path: &Path) -> Result<Self, ExcludeError> {
        let patterns = load_patterns(path)?;
        Self::from_patterns(&patterns)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The compiled rules, in load order.
    #[must_use]
    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    /// First rule matching `path`, if any.
    #[must_use]
    pub fn matching_rule(&self, path: &str) -> Option<&ExclusionRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    /// Whether any rule vetoes `path`.
    #[must_use]
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        self.matching_rule(&path.to_string_lossy()).is_some()
    }
}

/// Read raw patterns from a text file, one per line.
///
/// Trailing whitespace (including `\r`) is trimmed and blank lines are
/// dropped; a blank pattern would otherwise exclude every path.
///
/// # Errors
///
/// Returns [`ExcludeError::Io`] for read failures other than not-found.
pub fn load_patterns(path: &Path) -> Result<Vec<String>, ExcludeError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!(
                "Could not read exclude patterns from {}: file not found",
                path.display()
            );
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ExcludeError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let patterns: Vec<String> = content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(|line| {
            log::info!("Loaded exclude pattern: {}", line);
            line.to_string()
        })
        .collect();

    Ok(patterns)
}
