//! Configuration file (gofetch.toml)
//!
//! Every setting can also be given on the command line, which takes
//! precedence. An absent file means all defaults.
//!
//! ```toml
//! output = "/src/go"
//! update = true
//! keep_vcs = false
//! filter = "domain"
//! deny = ["example.com/internal"]
//!
//! [remap]
//! "github.com/upstream/lib" = "github.com/fork/lib"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::filter::{FilterKind, PathFilter};
use crate::remap::{RemapError, RemapTable};

/// File looked for in the working directory when no path is given
pub const CONFIG_FILE_NAME: &str = "gofetch.toml";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid remap table: {0}")]
    Remap(#[from] RemapError),
}

/// Settings shared by `fetch` and `infer`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory repositories are checked out into
    pub output: Option<PathBuf>,
    /// Directory package sources are looked up in when inferring
    pub source: Option<PathBuf>,
    /// Refresh repositories that are already checked out
    pub update: bool,
    /// Leave VCS metadata in checked-out trees
    pub keep_vcs: bool,
    /// Allow plain-HTTP discovery
    pub insecure: bool,
    /// Which imports are followed
    pub filter: FilterKind,
    /// Import path prefixes never followed
    pub deny: Vec<String>,
    pub remap: RemapTable,
}

impl Config {
    /// Parse a config from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse a config from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.remap.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given, otherwise `gofetch.toml` in `dir` if present
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let implicit = dir.join(CONFIG_FILE_NAME);
        if implicit.is_file() {
            Self::from_file(&implicit)
        } else {
            Ok(Self::default())
        }
    }

    /// The import filter for the configured kind and deny list
    pub fn import_filter(&self) -> PathFilter {
        self.filter.import_filter(&self.deny)
    }
}
