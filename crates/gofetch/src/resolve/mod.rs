//! Repository resolution
//!
//! Maps an import path to the repository that serves it. Resolution is
//! done by a [`RepoResolver`]; [`RepoCache`] sits in front of one and makes
//! sure each repository is resolved once per run, whichever of its import
//! paths is asked for first.
//!
//! The default resolver tries, in order:
//! - well-known hosting services (`github.com/user/repo`, ...)
//! - paths that name their VCS explicitly (`host/path/repo.git/sub`)
//! - vanity discovery through `<meta name="go-import">` over HTTP(S)

mod cache;
mod hosts;
mod vanity;

pub use cache::{RepoCache, ResolvedRepo};
pub use hosts::match_known_host;
pub use vanity::{
    parse_go_import_meta, select_meta_import, MetaImport, VanityResolver, REQUEST_TIMEOUT,
};

use std::path::PathBuf;
use thiserror::Error;

use crate::filter::is_remote_import_path;
use crate::vcs::VcsKind;

/// Errors that can occur during resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No repository could be identified for the import path
    #[error("could not determine repo root for {0}")]
    RepoRootNotFound(String),

    /// The import path cannot name a remote repository
    #[error("invalid import path: {0}")]
    InvalidImportPath(String),

    /// Vanity discovery returned something unusable
    #[error("could not discover repo for {path}: {message}")]
    Discovery { path: String, message: String },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The local output directory could not be inspected
    #[error("could not read directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A repository, as identified by a resolver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRoot {
    /// Import path prefix the whole repository lives under
    pub root: String,
    /// Remote URL to check out from
    pub repo: String,
    /// Version control system serving the repository
    pub vcs: VcsKind,
}

impl RepoRoot {
    pub fn new(root: impl Into<String>, repo: impl Into<String>, vcs: VcsKind) -> Self {
        Self {
            root: root.into(),
            repo: repo.into(),
            vcs,
        }
    }
}

/// Identifies the repository serving an import path
pub trait RepoResolver {
    /// Resolve `import_path`; `insecure` permits plain-HTTP discovery
    fn resolve_repo_root(&self, import_path: &str, insecure: bool) -> Result<RepoRoot, ResolveError>;
}

impl<T: RepoResolver + ?Sized> RepoResolver for &T {
    fn resolve_repo_root(&self, import_path: &str, insecure: bool) -> Result<RepoRoot, ResolveError> {
        (**self).resolve_repo_root(import_path, insecure)
    }
}

impl<T: RepoResolver + ?Sized> RepoResolver for Box<T> {
    fn resolve_repo_root(&self, import_path: &str, insecure: bool) -> Result<RepoRoot, ResolveError> {
        (**self).resolve_repo_root(import_path, insecure)
    }
}

/// Known hosts first, then vanity discovery
pub struct DefaultResolver {
    vanity: VanityResolver,
}

impl DefaultResolver {
    pub fn new() -> Result<Self, ResolveError> {
        Ok(Self {
            vanity: VanityResolver::new()?,
        })
    }
}

impl RepoResolver for DefaultResolver {
    fn resolve_repo_root(&self, import_path: &str, insecure: bool) -> Result<RepoRoot, ResolveError> {
        if let Some(repo) = match_known_host(import_path)? {
            return Ok(repo);
        }
        if !is_remote_import_path(import_path) {
            return Err(ResolveError::RepoRootNotFound(import_path.to_string()));
        }
        self.vanity.resolve_repo_root(import_path, insecure)
    }
}
