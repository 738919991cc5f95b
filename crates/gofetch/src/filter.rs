//! Path filters
//!
//! Predicates over path-like strings (import paths and absolute file paths).
//! Filters are plain values that can be combined with [`PathFilter::and`],
//! [`PathFilter::or`] and [`PathFilter::negate`], so the domain heuristic and
//! the private-path heuristic stay independently testable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Not;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::vcs::VcsKind;

/// First segment looks like `label(-label)*.tld`
static DOMAIN_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9\-]*[a-zA-Z0-9])\.([a-zA-Z0-9]{2,20})")
        .expect("domain prefix pattern is valid")
});

/// Any segment that is hidden, underscored, or reserved by a dependency manager
static PRIVATE_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|/)([_.][^/]*|(?i:godep|godeps|vendor|testdata))($|/)")
        .expect("private segment pattern is valid")
});

/// Directory names reserved by dependency managers and the Go tool.
pub const RESERVED_NAMES: &[&str] = &["Godep", "Godeps", "vendor", "testdata"];

/// Suffix of test sources, which never contribute to a package's imports.
pub const TEST_SUFFIX: &str = "_test.go";

/// A predicate over a path-like string
///
/// Returns `true` when the path should be kept.
#[derive(Clone)]
pub struct PathFilter(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl PathFilter {
    /// Wrap a closure as a filter
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Evaluate the filter
    pub fn matches(&self, path: &str) -> bool {
        (self.0)(path)
    }

    /// Keep paths accepted by both filters
    pub fn and(self, other: PathFilter) -> Self {
        Self::new(move |p| self.matches(p) && other.matches(p))
    }

    /// Keep paths accepted by either filter
    pub fn or(self, other: PathFilter) -> Self {
        Self::new(move |p| self.matches(p) || other.matches(p))
    }

    /// Invert the filter
    pub fn negate(self) -> Self {
        Self::new(move |p| !self.matches(p))
    }

    /// Reject import paths equal to, or nested under, any of `prefixes`
    ///
    /// A prefix ending in `/` matches by plain string prefix.
    pub fn deny_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        Self::new(move |p| !prefixes.iter().any(|prefix| has_path_prefix(p, prefix)))
    }

    /// Keep import paths that start with something that looks like a domain
    pub fn domain() -> Self {
        Self::new(looks_like_a_domain_name)
    }

    /// Keep import paths that name a host and have no private or reserved segment
    pub fn public_import() -> Self {
        Self::new(|p| is_remote_import_path(p) && !has_private_segment(p))
    }

    /// Keep source entries that are not private, reserved, or tests
    pub fn public_source() -> Self {
        Self::new(is_public_source)
    }

    /// Keep only VCS metadata directories
    pub fn vcs_metadata() -> Self {
        Self::new(is_vcs_metadata)
    }
}

impl Not for PathFilter {
    type Output = PathFilter;

    fn not(self) -> PathFilter {
        self.negate()
    }
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PathFilter(..)")
    }
}

/// Which imports are followed when traversing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Only imports whose first segment looks like a domain name
    #[default]
    Domain,
    /// Every non-private import that names a host, however its host is spelled
    All,
}

impl FilterKind {
    /// Build the import filter for this kind, rejecting the denied prefixes
    pub fn import_filter(self, deny: &[String]) -> PathFilter {
        let base = match self {
            FilterKind::Domain => PathFilter::domain(),
            FilterKind::All => PathFilter::public_import(),
        };
        if deny.is_empty() {
            base
        } else {
            base.and(PathFilter::deny_prefixes(deny.iter().cloned()))
        }
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "domain" => Ok(FilterKind::Domain),
            "all" => Ok(FilterKind::All),
            other => Err(format!("unknown filter '{}' (expected 'domain' or 'all')", other)),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Domain => f.write_str("domain"),
            FilterKind::All => f.write_str("all"),
        }
    }
}

/// Exclude imports that don't start with what looks like a `domain.name`
///
/// Paths containing a private or reserved segment are rejected regardless.
pub fn looks_like_a_domain_name(path: &str) -> bool {
    DOMAIN_PREFIX.is_match(path) && !has_private_segment(path)
}

/// Whether the first path element looks like a host name
///
/// Standard library packages and relative paths fail this check.
pub fn is_remote_import_path(import_path: &str) -> bool {
    let host = import_path.split('/').next().unwrap_or("");
    !host.is_empty()
        && host.contains('.')
        && !host.starts_with('.')
        && !host.ends_with('.')
        && !import_path.contains("..")
        && !import_path.contains('\\')
}

/// Whether any segment of `path` is hidden, underscored, or reserved
pub fn has_private_segment(path: &str) -> bool {
    PRIVATE_SEGMENT.is_match(path)
}

/// Whether a source entry should be scanned
///
/// Only the final component is examined, so this works on absolute paths.
pub fn is_public_source(path: &str) -> bool {
    let name = base_name(path);
    if name.is_empty() || name.starts_with('.') || name.starts_with('_') {
        return false;
    }
    if RESERVED_NAMES.iter().any(|r| name.eq_ignore_ascii_case(r)) {
        return false;
    }
    let lower = name.to_ascii_lowercase();
    !lower.ends_with(TEST_SUFFIX)
}

/// Whether `path` names a VCS metadata directory (`.git`, `.hg`, ...)
pub fn is_vcs_metadata(path: &str) -> bool {
    let name = base_name(path);
    VcsKind::ALL.iter().any(|kind| kind.metadata_dir() == name)
}

fn base_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
}

fn has_path_prefix(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    if prefix.ends_with('/') {
        return path.starts_with(prefix);
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
