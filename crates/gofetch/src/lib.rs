//! gofetch library
//!
//! Fetches Go packages and everything they import:
//! - Import scanning of Go source trees (imports-only parsing)
//! - Repository resolution (well-known hosts, vanity discovery) with a per-run cache
//! - Checkout and refresh through git, hg, svn and bzr
//! - Optional removal of VCS metadata from fetched trees
//! - Read-only discovery of the import closure of packages already on disk

pub mod config;
pub mod fetch;
pub mod filter;
pub mod infer;
pub mod prune;
pub mod remap;
pub mod resolve;
pub mod scanner;
pub mod vcs;

pub use config::{Config, ConfigError, CONFIG_FILE_NAME};
pub use fetch::{FetchAction, FetchError, FetchOptions, FetchReport, FetchedRepo, Fetcher};
pub use filter::{looks_like_a_domain_name, FilterKind, PathFilter};
pub use infer::{InferError, InferOutput, Inferrer};
pub use prune::{prune_path, PruneError};
pub use remap::{RemapError, RemapTable};
pub use resolve::{
    DefaultResolver, RepoCache, RepoResolver, RepoRoot, ResolveError, ResolvedRepo,
};
pub use scanner::{scan_imports, ScanError, ScanOptions};
pub use vcs::{CommandVcs, Vcs, VcsError, VcsKind};
