//! Import path remapping
//!
//! A remap table substitutes one import path for another before resolution,
//! e.g. to fetch a fork in place of the upstream repository. Substitution is
//! applied once; the replacement is never looked up again.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while building a remap table
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemapError {
    /// Entry is not of the form `FROM=TO` with both sides non-empty
    #[error("invalid mapping '{0}': expected FROM=TO")]
    InvalidMapping(String),
}

/// Explicit `import path -> import path` substitutions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemapTable {
    entries: BTreeMap<String, String>,
}

impl RemapTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `FROM=TO` entries
    pub fn from_entries<I, S>(entries: I) -> Result<Self, RemapError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for entry in entries {
            let (from, to) = parse_entry(entry.as_ref())?;
            table.insert(from, to)?;
        }
        Ok(table)
    }

    /// Add a substitution, replacing any existing one for `from`
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) -> Result<(), RemapError> {
        let from = from.into();
        let to = to.into();
        if from.is_empty() || to.is_empty() {
            return Err(RemapError::InvalidMapping(format!("{}={}", from, to)));
        }
        self.entries.insert(from, to);
        Ok(())
    }

    /// Merge `other` into this table; entries in `other` win
    pub fn extend(&mut self, other: &RemapTable) {
        for (from, to) in &other.entries {
            self.entries.insert(from.clone(), to.clone());
        }
    }

    /// Check every entry; tables loaded from configuration bypass [`insert`](Self::insert)
    pub fn validate(&self) -> Result<(), RemapError> {
        for (from, to) in &self.entries {
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(RemapError::InvalidMapping(format!("{}={}", from, to)));
            }
        }
        Ok(())
    }

    /// Substitute `path` if it has an entry, otherwise return it unchanged
    pub fn apply<'a>(&'a self, path: &'a str) -> &'a str {
        self.entries.get(path).map(String::as_str).unwrap_or(path)
    }

    /// Replacement for `path`, if any
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Parse a single `FROM=TO` entry
pub fn parse_entry(entry: &str) -> Result<(String, String), RemapError> {
    let invalid = || RemapError::InvalidMapping(entry.to_string());
    let (from, to) = entry.split_once('=').ok_or_else(invalid)?;
    let (from, to) = (from.trim(), to.trim());
    if from.is_empty() || to.is_empty() || to.contains('=') {
        return Err(invalid());
    }
    if from.contains(char::is_whitespace) || to.contains(char::is_whitespace) {
        return Err(invalid());
    }
    Ok((from.to_string(), to.to_string()))
}
