//! Per-run resolution cache
//!
//! Every resolved repository is stored under the import path that was looked
//! up and under the repository root. A later lookup of any package beneath a
//! cached root is answered from the cache without calling the resolver.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::{RepoResolver, RepoRoot, ResolveError};
use crate::remap::RemapTable;

/// A repository and where it lives on disk
#[derive(Debug, Clone)]
pub struct ResolvedRepo {
    /// `base` joined with the repository root
    pub output: PathBuf,
    /// Metadata of `output` when the cache entry was made, `None` if absent
    pub metadata: Option<fs::Metadata>,
    /// The repository itself
    pub repo: Arc<RepoRoot>,
}

impl ResolvedRepo {
    /// Whether the output directory existed when last checked
    pub fn exists(&self) -> bool {
        self.metadata.is_some()
    }
}

/// Memoizes a [`RepoResolver`] for the duration of one run
pub struct RepoCache<R> {
    resolver: R,
    insecure: bool,
    entries: HashMap<String, ResolvedRepo>,
}

impl<R: RepoResolver> RepoCache<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            insecure: false,
            entries: HashMap::new(),
        }
    }

    /// Allow the resolver to fall back to plain HTTP
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Resolve `import_path` to its repository under `base`
    ///
    /// The remap table is consulted once, before the cache.
    pub fn resolve(
        &mut self,
        import_path: &str,
        remap: &RemapTable,
        base: &Path,
    ) -> Result<ResolvedRepo, ResolveError> {
        let path = remap.apply(import_path);
        if path != import_path {
            debug!("remapped {} -> {}", import_path, path);
        }

        if let Some(cached) = self.entries.get(path) {
            debug!("cache hit for {}", path);
            return Ok(cached.clone());
        }
        if let Some(cached) = self.cached_root_of(path) {
            debug!("{} is in cached repo {}", path, cached.repo.root);
            self.entries.insert(path.to_string(), cached.clone());
            return Ok(cached);
        }

        let repo = self.resolver.resolve_repo_root(path, self.insecure)?;
        let output = base.join(&repo.root);
        let metadata = stat(&output)?;
        debug!("{} -> {} ({}) at {}", path, repo.root, repo.vcs, output.display());

        let resolved = ResolvedRepo {
            output,
            metadata,
            repo: Arc::new(repo),
        };
        self.entries
            .insert(resolved.repo.root.clone(), resolved.clone());
        self.entries.insert(path.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// The entry of the longest cached root that `path` lies beneath
    fn cached_root_of(&self, path: &str) -> Option<ResolvedRepo> {
        path.rmatch_indices('/')
            .map(|(i, _)| &path[..i])
            .find_map(|prefix| {
                self.entries
                    .get(prefix)
                    .filter(|entry| entry.repo.root == prefix)
            })
            .cloned()
    }

    /// Mark every entry stored for `output` as absent from disk
    pub fn forget(&mut self, output: &Path) {
        for entry in self.entries.values_mut().filter(|e| e.output == output) {
            entry.metadata = None;
        }
    }

    /// Re-read the metadata of every entry stored for `output`
    pub fn refresh(&mut self, output: &Path) -> Result<(), ResolveError> {
        let metadata = stat(output)?;
        for entry in self.entries.values_mut().filter(|e| e.output == output) {
            entry.metadata = metadata.clone();
        }
        Ok(())
    }

    /// Number of cache keys (import paths and roots)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn stat(path: &Path) -> Result<Option<fs::Metadata>, ResolveError> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ResolveError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
