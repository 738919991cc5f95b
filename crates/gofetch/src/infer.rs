//! Listing the transitive imports of packages already on disk
//!
//! [`Inferrer`] is the read-only counterpart of [`crate::fetch::Fetcher`]: it
//! resolves and scans, never checks out or deletes anything, and reports
//! every import path it discovers.
//!
//! Two sets keep the traversal finite and the output free of duplicates:
//! `visited` holds the directories that have been scanned, `listed` the
//! import paths that have been reported. Several import paths can share one
//! repository directory, so neither set can stand in for the other.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::fetch::default_scan_options;
use crate::remap::RemapTable;
use crate::resolve::{RepoCache, RepoResolver, ResolveError};
use crate::scanner::{scan_imports, ScanError, ScanOptions};

/// Errors that abort discovery
#[derive(Debug, Error)]
pub enum InferError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How discovered packages are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InferOutput {
    /// The import path itself
    #[default]
    Packages,
    /// The import path joined onto the source base
    Paths,
}

/// Enumerates the import closure of packages without touching the disk
pub struct Inferrer<R> {
    cache: RepoCache<R>,
    source: PathBuf,
    remap: RemapTable,
    scan: ScanOptions,
    output: InferOutput,
    visited: HashSet<PathBuf>,
    listed: HashSet<String>,
}

impl<R: RepoResolver> Inferrer<R> {
    /// Look for package sources under `source`
    pub fn new(resolver: R, source: impl Into<PathBuf>) -> Self {
        Self {
            cache: RepoCache::new(resolver),
            source: source.into(),
            remap: RemapTable::new(),
            scan: default_scan_options(),
            output: InferOutput::default(),
            visited: HashSet::new(),
            listed: HashSet::new(),
        }
    }

    pub fn with_remap(mut self, remap: RemapTable) -> Self {
        self.remap = remap;
        self
    }

    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    pub fn with_output(mut self, output: InferOutput) -> Self {
        self.output = output;
        self
    }

    pub fn insecure(mut self, insecure: bool) -> Self {
        self.cache = self.cache.insecure(insecure);
        self
    }

    /// Report every import reachable from `paths` to `sink`
    ///
    /// Each import path is reported once, when first discovered. The
    /// requested paths themselves are not reported.
    pub fn infer_all<S, F>(&mut self, paths: &[S], mut sink: F) -> Result<(), InferError>
    where
        S: AsRef<str>,
        F: FnMut(&str),
    {
        self.visited.clear();
        self.listed.clear();
        self.listed
            .extend(paths.iter().map(|p| p.as_ref().to_string()));

        for path in paths {
            self.infer_inc(path.as_ref(), &mut sink)?;
        }
        Ok(())
    }

    /// Like [`Inferrer::infer_all`], collecting the reported lines
    pub fn collect<S: AsRef<str>>(&mut self, paths: &[S]) -> Result<Vec<String>, InferError> {
        let mut found = Vec::new();
        self.infer_all(paths, |line| found.push(line.to_string()))?;
        Ok(found)
    }

    fn infer_inc(&mut self, import_path: &str, sink: &mut dyn FnMut(&str)) -> Result<(), InferError> {
        let Some(dir) = self.locate(import_path)? else {
            return Ok(());
        };
        if !self.visited.insert(dir.clone()) {
            debug!("{} already scanned", dir.display());
            return Ok(());
        }

        let imports = scan_imports(&dir, &self.scan)?;
        for import in &imports {
            if self.listed.insert(import.clone()) {
                match self.output {
                    InferOutput::Packages => sink(import),
                    InferOutput::Paths => sink(&self.source.join(import).to_string_lossy()),
                }
            }
        }

        for import in &imports {
            self.infer_inc(import, sink)?;
        }
        Ok(())
    }

    /// The directory holding `import_path`, or `None` if there is nothing on disk
    fn locate(&mut self, import_path: &str) -> Result<Option<PathBuf>, InferError> {
        match self.cache.resolve(import_path, &self.remap, &self.source) {
            Ok(resolved) if resolved.exists() => Ok(Some(resolved.output)),
            Ok(resolved) => {
                debug!("{} is not present at {}", import_path, resolved.output.display());
                Ok(None)
            }
            Err(ResolveError::RepoRootNotFound(_)) => {
                warn!("no repository for {}, treating it as a local path", import_path);
                let dir = Path::new(import_path);
                match fs::metadata(dir) {
                    Ok(metadata) if metadata.is_dir() => Ok(Some(dir.to_path_buf())),
                    Ok(_) => Ok(None),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(source) => Err(InferError::Io {
                        path: dir.to_path_buf(),
                        source,
                    }),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn cache(&self) -> &RepoCache<R> {
        &self.cache
    }

    /// Directories scanned by the last run
    pub fn visited(&self) -> &HashSet<PathBuf> {
        &self.visited
    }

    /// Import paths reported (or requested) in the last run
    pub fn listed(&self) -> &HashSet<String> {
        &self.listed
    }
}
