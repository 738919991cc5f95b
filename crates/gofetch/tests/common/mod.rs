//! Fakes shared by the integration tests

#![allow(dead_code)]

use gofetch::{RepoResolver, RepoRoot, ResolveError, Vcs, VcsError, VcsKind};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Scratch directory whose name is not hidden
pub fn scratch() -> tempfile::TempDir {
    tempfile::Builder::new().prefix("gofetch").tempdir().unwrap()
}

/// Go source importing `imports`
pub fn go_source(package: &str, imports: &[&str]) -> String {
    let mut src = format!("package {}\n\nimport (\n", package);
    for import in imports {
        src.push_str(&format!("\t\"{}\"\n", import));
    }
    src.push_str(")\n\nfunc main() {}\n");
    src
}

/// Repository roots are the first three path elements of host-like paths
#[derive(Default)]
pub struct FakeResolver {
    pub calls: RefCell<Vec<String>>,
}

impl FakeResolver {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl RepoResolver for FakeResolver {
    fn resolve_repo_root(&self, import_path: &str, _insecure: bool) -> Result<RepoRoot, ResolveError> {
        self.calls.borrow_mut().push(import_path.to_string());
        let parts: Vec<&str> = import_path.split('/').collect();
        if parts.len() < 3 || !parts[0].contains('.') {
            return Err(ResolveError::RepoRootNotFound(import_path.to_string()));
        }
        let root = parts[..3].join("/");
        Ok(RepoRoot::new(root.clone(), format!("https://{}", root), VcsKind::Git))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsOp {
    Create { dir: PathBuf, remote: String },
    Download { dir: PathBuf },
}

/// Materializes canned file trees instead of running a VCS
#[derive(Default)]
pub struct FakeVcs {
    /// Remote URL -> (relative path, contents)
    trees: HashMap<String, Vec<(String, String)>>,
    pub ops: RefCell<Vec<VcsOp>>,
    /// Remotes for which every operation fails
    pub failing: Vec<String>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a package at `dir` (relative to the repository) of `root`
    pub fn with_package(mut self, root: &str, dir: &str, imports: &[&str]) -> Self {
        let name = dir.rsplit('/').next().filter(|n| !n.is_empty()).unwrap_or("main");
        let path = if dir.is_empty() {
            format!("{}.go", name)
        } else {
            format!("{}/{}.go", dir, name)
        };
        self.trees
            .entry(format!("https://{}", root))
            .or_default()
            .push((path, go_source(name, imports)));
        self
    }

    pub fn failing(mut self, root: &str) -> Self {
        self.failing.push(format!("https://{}", root));
        self
    }

    pub fn ops(&self) -> Vec<VcsOp> {
        self.ops.borrow().clone()
    }

    pub fn creates(&self) -> usize {
        self.ops().iter().filter(|op| matches!(op, VcsOp::Create { .. })).count()
    }

    pub fn downloads(&self) -> usize {
        self.ops().iter().filter(|op| matches!(op, VcsOp::Download { .. })).count()
    }

    fn failure(dir: &Path) -> VcsError {
        VcsError::CommandFailed {
            cmd: "git",
            args: "clone".to_string(),
            dir: dir.to_path_buf(),
            stderr: "fatal: repository not found".to_string(),
        }
    }
}

impl Vcs for FakeVcs {
    fn create(&self, _kind: VcsKind, dir: &Path, remote: &str) -> Result<(), VcsError> {
        self.ops.borrow_mut().push(VcsOp::Create {
            dir: dir.to_path_buf(),
            remote: remote.to_string(),
        });
        if self.failing.iter().any(|r| r == remote) {
            return Err(Self::failure(dir));
        }
        assert!(!dir.exists(), "create into existing {}", dir.display());

        fs::create_dir_all(dir.join(".git")).unwrap();
        fs::write(dir.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
        for (rel, contents) in self.trees.get(remote).into_iter().flatten() {
            let path = dir.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        Ok(())
    }

    fn download(&self, _kind: VcsKind, dir: &Path) -> Result<(), VcsError> {
        self.ops.borrow_mut().push(VcsOp::Download { dir: dir.to_path_buf() });
        Ok(())
    }
}
