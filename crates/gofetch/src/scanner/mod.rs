//! Import scanning
//!
//! Walks a source tree and collects the import paths declared by the Go files
//! in it. Hidden directories are never entered. Every entry is offered to the
//! exclude filter as an absolute path before it is read or descended into, and
//! every import path found is offered to the include filter before it is kept.

mod imports;
mod lexer;

pub use imports::{parse_imports, ImportSpec, SyntaxError};

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::filter::PathFilter;

/// File extensions (compared case-insensitively) that are parsed for imports
pub const SOURCE_EXTENSIONS: &[&str] = &["go"];

/// Errors that can occur while scanning a source tree
#[derive(Debug, Error)]
pub enum ScanError {
    /// A directory or file could not be read
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The scan root exists but is not a directory
    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A source file has a malformed package clause or import declaration
    #[error("could not parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: SyntaxError,
    },
}

impl ScanError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> ScanError + '_ {
        move |source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// How a tree is scanned
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Entries (absolute paths) for which this returns `false` are skipped
    pub exclude: Option<PathFilter>,
    /// Import paths for which this returns `false` are dropped
    pub include: Option<PathFilter>,
    /// Descend into subdirectories
    pub recursive: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclude: None,
            include: None,
            recursive: true,
        }
    }
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclude(mut self, filter: PathFilter) -> Self {
        self.exclude = Some(filter);
        self
    }

    pub fn with_include(mut self, filter: PathFilter) -> Self {
        self.include = Some(filter);
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    fn excludes(&self, path: &Path) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|f| !f.matches(&path.to_string_lossy()))
    }

    fn includes(&self, import: &str) -> bool {
        !import.is_empty() && self.include.as_ref().map_or(true, |f| f.matches(import))
    }
}

/// Collect the distinct import paths declared under `dir`
///
/// The result is sorted. A parse failure in any file fails the whole scan.
pub fn scan_imports(dir: &Path, options: &ScanOptions) -> Result<Vec<String>, ScanError> {
    let root = std::path::absolute(dir).map_err(ScanError::io(dir))?;
    let mut found = BTreeSet::new();
    scan_dir(&mut found, &root, options)?;
    Ok(found.into_iter().collect())
}

fn scan_dir(found: &mut BTreeSet<String>, dir: &Path, options: &ScanOptions) -> Result<(), ScanError> {
    if is_hidden(dir) {
        debug!("skipping hidden directory {}", dir.display());
        return Ok(());
    }

    let metadata = fs::metadata(dir).map_err(ScanError::io(dir))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let mut sources = Vec::new();
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(ScanError::io(dir))? {
        let entry = entry.map_err(ScanError::io(dir))?;
        let path = entry.path();
        if options.excludes(&path) {
            debug!("excluded {}", path.display());
            continue;
        }

        let file_type = entry.file_type().map_err(ScanError::io(&path))?;
        if file_type.is_dir() {
            if options.recursive {
                subdirs.push(path);
            }
        } else if file_type.is_file() && is_source_file(&path) {
            let len = entry.metadata().map_err(ScanError::io(&path))?.len();
            if len > 0 {
                sources.push(path);
            }
        }
    }
    sources.sort();
    subdirs.sort();

    for source in &sources {
        let bytes = fs::read(source).map_err(ScanError::io(source))?;
        let text = String::from_utf8_lossy(&bytes);
        let specs = parse_imports(&text).map_err(|e| ScanError::Parse {
            path: source.clone(),
            source: e,
        })?;
        for spec in specs {
            if options.includes(&spec.path) {
                found.insert(spec.path);
            }
        }
    }

    for subdir in &subdirs {
        scan_dir(found, subdir, options)?;
    }
    Ok(())
}

fn is_hidden(dir: &Path) -> bool {
    dir.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // tempfile's default ".tmp" prefix would make the scan root hidden
    fn scratch() -> tempfile::TempDir {
        tempfile::Builder::new().prefix("scan").tempdir().unwrap()
    }

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_is_source_file() {
        assert!(is_source_file(Path::new("/a/b.go")));
        assert!(is_source_file(Path::new("/a/B.GO")));
        assert!(!is_source_file(Path::new("/a/b.rs")));
        assert!(!is_source_file(Path::new("/a/go")));
    }

    #[test]
    fn test_scan_collects_sorted_unique() {
        let temp = scratch();
        let root = temp.path();
        write(root, "a.go", "package a\nimport (\"z.com/x\"\n\"fmt\")\n");
        write(root, "b.go", "package a\nimport \"b.com/y\"\nimport \"z.com/x\"\n");
        write(root, "sub/c.go", "package sub\nimport \"c.com/w\"\n");

        let found = scan_imports(root, &ScanOptions::new()).unwrap();
        assert_eq!(found, vec!["b.com/y", "c.com/w", "fmt", "z.com/x"]);
    }

    #[test]
    fn test_scan_not_recursive() {
        let temp = scratch();
        write(temp.path(), "a.go", "package a\nimport \"a.com/x\"\n");
        write(temp.path(), "sub/b.go", "package b\nimport \"b.com/y\"\n");

        let found = scan_imports(temp.path(), &ScanOptions::new().recursive(false)).unwrap();
        assert_eq!(found, vec!["a.com/x"]);
    }

    #[test]
    fn test_scan_skips_hidden_empty_and_foreign_files() {
        let temp = scratch();
        let root = temp.path();
        write(root, ".git/hooks/x.go", "package x\nimport \"hidden.com/x\"\n");
        write(root, "empty.go", "");
        write(root, "notes.txt", "package x\nimport \"text.com/x\"\n");
        write(root, "real.GO", "package x\nimport \"real.com/x\"\n");

        let found = scan_imports(root, &ScanOptions::new()).unwrap();
        assert_eq!(found, vec!["real.com/x"]);
    }

    #[test]
    fn test_hidden_root_is_skipped() {
        let temp = scratch();
        write(temp.path(), ".hidden/a.go", "package a\nimport \"a.com/x\"\n");

        let found = scan_imports(&temp.path().join(".hidden"), &ScanOptions::new()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_exclude_sees_absolute_paths() {
        let temp = scratch();
        write(temp.path(), "keep/a.go", "package a\nimport \"a.com/x\"\n");
        write(temp.path(), "drop/b.go", "package b\nimport \"b.com/y\"\n");

        let exclude = PathFilter::new(|p| {
            assert!(Path::new(p).is_absolute(), "{} is not absolute", p);
            !p.ends_with("/drop")
        });
        let found = scan_imports(temp.path(), &ScanOptions::new().with_exclude(exclude)).unwrap();
        assert_eq!(found, vec!["a.com/x"]);
    }

    #[test]
    fn test_include_filter() {
        let temp = scratch();
        write(
            temp.path(),
            "a.go",
            "package a\nimport (\n\"fmt\"\n\"example.org/b/util\"\n\"\"\n)\n",
        );

        let options = ScanOptions::new().with_include(PathFilter::domain());
        let found = scan_imports(temp.path(), &options).unwrap();
        assert_eq!(found, vec!["example.org/b/util"]);
    }

    #[test]
    fn test_parse_failure_is_fatal() {
        let temp = scratch();
        write(temp.path(), "good.go", "package a\nimport \"a.com/x\"\n");
        write(temp.path(), "sub/bad.go", "import \"b.com/y\"\n");

        let err = scan_imports(temp.path(), &ScanOptions::new()).unwrap_err();
        match err {
            ScanError::Parse { path, source } => {
                assert!(path.ends_with("sub/bad.go"));
                assert_eq!(source.line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_and_file_roots() {
        let temp = scratch();
        let missing = scan_imports(&temp.path().join("nope"), &ScanOptions::new());
        assert!(matches!(missing, Err(ScanError::Io { .. })));

        write(temp.path(), "file.go", "package a\n");
        let file = scan_imports(&temp.path().join("file.go"), &ScanOptions::new());
        assert!(matches!(file, Err(ScanError::NotADirectory(_))));
    }
}
