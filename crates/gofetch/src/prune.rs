//! Removal of VCS metadata from checked-out trees

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::filter::PathFilter;

/// Errors that can occur while pruning
#[derive(Debug, Error)]
pub enum PruneError {
    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("could not prune {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PruneError + '_ {
    move |source| PruneError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Delete every entry under `dir` whose path `filter` accepts
///
/// Matching directories are removed with their contents and not descended
/// into. Symbolic links are removed as links, never followed. Returns the
/// removed paths in the order they were deleted.
pub fn prune_path(dir: &Path, filter: &PathFilter, recursive: bool) -> Result<Vec<PathBuf>, PruneError> {
    let metadata = fs::metadata(dir).map_err(io_error(dir))?;
    if !metadata.is_dir() {
        return Err(PruneError::NotADirectory(dir.to_path_buf()));
    }

    let mut pruned = Vec::new();
    prune_dir(&mut pruned, dir, filter, recursive)?;
    Ok(pruned)
}

fn prune_dir(
    pruned: &mut Vec<PathBuf>,
    dir: &Path,
    filter: &PathFilter,
    recursive: bool,
) -> Result<(), PruneError> {
    let mut entries = fs::read_dir(dir)
        .map_err(io_error(dir))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error(dir))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_error(&path))?;

        if filter.matches(&path.to_string_lossy()) {
            if file_type.is_dir() {
                fs::remove_dir_all(&path).map_err(io_error(&path))?;
            } else {
                fs::remove_file(&path).map_err(io_error(&path))?;
            }
            info!("pruned {}", path.display());
            pruned.push(path);
        } else if recursive && file_type.is_dir() {
            prune_dir(pruned, &path, filter, recursive)?;
        } else {
            debug!("kept {}", path.display());
        }
    }
    Ok(())
}
