//! Fetching the transitive closure of a set of packages
//!
//! [`Fetcher`] resolves each requested import path to a repository, checks
//! it out (or refreshes it) under the output base, optionally strips its VCS
//! metadata, scans it for imports and recurses into them. A set of visited
//! output directories guarantees that each repository is handled once per
//! run, so import cycles terminate.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::filter::{FilterKind, PathFilter};
use crate::prune::{prune_path, PruneError};
use crate::remap::RemapTable;
use crate::resolve::{RepoCache, RepoResolver, ResolveError};
use crate::scanner::{scan_imports, ScanError, ScanOptions};
use crate::vcs::{Vcs, VcsError};

/// Errors that abort a fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Prune(#[from] PruneError),

    #[error("could not prepare {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What happens to repositories that are already on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Refresh existing checkouts
    pub allow_update: bool,
    /// Remove VCS metadata after checkout; combined with `allow_update`,
    /// existing checkouts are deleted and checked out again
    pub strip_vcs: bool,
    /// Allow plain-HTTP discovery
    pub insecure: bool,
}

/// What was done to a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchAction {
    /// Checked out for the first time
    Created,
    /// Deleted and checked out again
    Recreated,
    /// Existing checkout refreshed in place
    Updated,
    /// Existing checkout left as it was
    Existing,
}

impl fmt::Display for FetchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchAction::Created => "created",
            FetchAction::Recreated => "recreated",
            FetchAction::Updated => "updated",
            FetchAction::Existing => "existing",
        })
    }
}

/// One repository handled during a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRepo {
    /// The import path that led to the repository, before remapping
    pub import_path: String,
    /// Repository root
    pub root: String,
    /// Local checkout directory
    pub output: PathBuf,
    pub action: FetchAction,
}

/// Repositories handled by one [`Fetcher::fetch_all`] call, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub repos: Vec<FetchedRepo>,
}

impl FetchReport {
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Number of repositories that had `action` applied
    pub fn count(&self, action: FetchAction) -> usize {
        self.repos.iter().filter(|r| r.action == action).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FetchedRepo> {
        self.repos.iter()
    }
}

/// Scan options used when none are configured
///
/// Test sources, hidden and reserved entries are skipped, and only imports
/// that start with a domain name are followed.
pub fn default_scan_options() -> ScanOptions {
    ScanOptions::new()
        .with_exclude(PathFilter::public_source())
        .with_include(FilterKind::Domain.import_filter(&[]))
}

/// Materializes packages and everything they import
pub struct Fetcher<R, V> {
    cache: RepoCache<R>,
    vcs: V,
    base: PathBuf,
    remap: RemapTable,
    options: FetchOptions,
    scan: ScanOptions,
    visited: HashSet<PathBuf>,
}

impl<R: RepoResolver, V: Vcs> Fetcher<R, V> {
    /// Fetch into `base` using `resolver` and `vcs`
    pub fn new(resolver: R, vcs: V, base: impl Into<PathBuf>) -> Self {
        Self {
            cache: RepoCache::new(resolver),
            vcs,
            base: base.into(),
            remap: RemapTable::new(),
            options: FetchOptions::default(),
            scan: default_scan_options(),
            visited: HashSet::new(),
        }
    }

    pub fn with_remap(mut self, remap: RemapTable) -> Self {
        self.remap = remap;
        self
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self.cache = self.cache.insecure(options.insecure);
        self
    }

    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    /// Fetch `paths` and their transitive imports
    ///
    /// Paths are processed in order; the first error aborts the run.
    pub fn fetch_all<S: AsRef<str>>(&mut self, paths: &[S]) -> Result<FetchReport, FetchError> {
        self.visited.clear();
        let mut report = FetchReport::default();
        for path in paths {
            self.fetch_inc(path.as_ref(), &mut report)?;
        }
        Ok(report)
    }

    fn fetch_inc(&mut self, import_path: &str, report: &mut FetchReport) -> Result<(), FetchError> {
        let resolved = self.cache.resolve(import_path, &self.remap, &self.base)?;
        let output = resolved.output.clone();
        if !self.visited.insert(output.clone()) {
            debug!("{} already handled via {}", import_path, output.display());
            return Ok(());
        }

        let repo = resolved.repo;
        let mut exists = resolved.metadata.is_some();
        let mut recreated = false;

        if exists && self.options.allow_update && self.options.strip_vcs {
            debug!("deleting {} for a fresh checkout", output.display());
            fs::remove_dir_all(&output).map_err(|source| FetchError::Io {
                path: output.clone(),
                source,
            })?;
            self.cache.forget(&output);
            exists = false;
            recreated = true;
        }

        let action = if !exists {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent).map_err(|source| FetchError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            self.vcs.create(repo.vcs, &output, &repo.repo)?;
            self.cache.refresh(&output)?;
            if recreated {
                FetchAction::Recreated
            } else {
                FetchAction::Created
            }
        } else if self.options.allow_update {
            self.vcs.download(repo.vcs, &output)?;
            FetchAction::Updated
        } else {
            debug!("{} exists, not updating", output.display());
            FetchAction::Existing
        };
        info!("{} {} ({}) in {}", action, repo.root, repo.vcs, output.display());

        if self.options.strip_vcs {
            prune_path(&output, &PathFilter::vcs_metadata(), true)?;
        }

        let imports = scan_imports(&output, &self.scan)?;
        report.repos.push(FetchedRepo {
            import_path: import_path.to_string(),
            root: repo.root.clone(),
            output,
            action,
        });

        for import in &imports {
            self.fetch_inc(import, report)?;
        }
        Ok(())
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn cache(&self) -> &RepoCache<R> {
        &self.cache
    }

    /// Output directories handled by the last run
    pub fn visited(&self) -> &HashSet<PathBuf> {
        &self.visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(path: &str, action: FetchAction) -> FetchedRepo {
        FetchedRepo {
            import_path: path.to_string(),
            root: path.to_string(),
            output: PathBuf::from("/out").join(path),
            action,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = FetchReport {
            repos: vec![
                repo("a.com/x/y", FetchAction::Created),
                repo("b.com/x/y", FetchAction::Existing),
                repo("c.com/x/y", FetchAction::Created),
            ],
        };
        assert_eq!(report.len(), 3);
        assert_eq!(report.count(FetchAction::Created), 2);
        assert_eq!(report.count(FetchAction::Updated), 0);
    }

    #[test]
    fn test_default_scan_options() {
        let options = default_scan_options();
        let include = options.include.unwrap();
        assert!(include.matches("example.org/b/util"));
        assert!(!include.matches("fmt"));

        let exclude = options.exclude.unwrap();
        assert!(exclude.matches("/out/example.org/a/lib/lib.go"));
        assert!(!exclude.matches("/out/example.org/a/lib/lib_test.go"));
        assert!(!exclude.matches("/out/example.org/a/lib/vendor"));
    }

    #[test]
    fn test_action_display() {
        assert_eq!(FetchAction::Recreated.to_string(), "recreated");
        assert_eq!(FetchAction::Existing.to_string(), "existing");
    }
}
