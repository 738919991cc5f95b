//! Version control systems
//!
//! [`VcsKind`] is the closed set of supported systems. The [`Vcs`] trait is the
//! capability the fetcher drives: exactly a full checkout (`create`) and an
//! incremental refresh (`download`). [`CommandVcs`] implements it by running
//! the system's command-line tool.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while running a VCS operation
#[derive(Debug, Error)]
pub enum VcsError {
    /// The tool could not be started
    #[error("could not run {cmd}: {source}")]
    Spawn {
        cmd: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and reported failure
    #[error("{cmd} {args} failed in {}: {stderr}", .dir.display())]
    CommandFailed {
        cmd: &'static str,
        args: String,
        dir: PathBuf,
        stderr: String,
    },

    /// The target directory could not be made absolute
    #[error("invalid checkout directory {}: {source}", .dir.display())]
    InvalidDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Supported version control systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    Git,
    Mercurial,
    Subversion,
    Bazaar,
}

impl VcsKind {
    /// Every supported system
    pub const ALL: [VcsKind; 4] = [
        VcsKind::Git,
        VcsKind::Mercurial,
        VcsKind::Subversion,
        VcsKind::Bazaar,
    ];

    /// Command-line tool name, also the tag used in `go-import` meta tags
    pub fn cmd(self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Mercurial => "hg",
            VcsKind::Subversion => "svn",
            VcsKind::Bazaar => "bzr",
        }
    }

    /// Name of the bookkeeping directory inside a checkout
    pub fn metadata_dir(self) -> &'static str {
        match self {
            VcsKind::Git => ".git",
            VcsKind::Mercurial => ".hg",
            VcsKind::Subversion => ".svn",
            VcsKind::Bazaar => ".bzr",
        }
    }

    /// Look a system up by its command name
    pub fn from_cmd(cmd: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.cmd() == cmd)
    }

    fn create_args(self, remote: &str, dir: &Path) -> Vec<String> {
        let dir = dir.display().to_string();
        let remote = remote.to_string();
        match self {
            VcsKind::Git => vec!["clone".into(), remote, dir],
            VcsKind::Mercurial => vec!["clone".into(), remote, dir],
            VcsKind::Subversion => vec!["checkout".into(), remote, dir],
            VcsKind::Bazaar => vec!["branch".into(), remote, dir],
        }
    }

    fn download_args(self) -> &'static [&'static str] {
        match self {
            VcsKind::Git => &["pull", "--ff-only"],
            VcsKind::Mercurial => &["pull", "-u"],
            VcsKind::Subversion => &["update"],
            VcsKind::Bazaar => &["pull", "--overwrite"],
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cmd())
    }
}

impl FromStr for VcsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cmd(s).ok_or_else(|| format!("unsupported version control system: {}", s))
    }
}

/// Operations the fetcher needs from a version control system
pub trait Vcs {
    /// Check out `remote` into `dir`, which must not exist yet
    fn create(&self, kind: VcsKind, dir: &Path, remote: &str) -> Result<(), VcsError>;

    /// Bring the checkout in `dir` up to date
    fn download(&self, kind: VcsKind, dir: &Path) -> Result<(), VcsError>;
}

impl<T: Vcs + ?Sized> Vcs for &T {
    fn create(&self, kind: VcsKind, dir: &Path, remote: &str) -> Result<(), VcsError> {
        (**self).create(kind, dir, remote)
    }

    fn download(&self, kind: VcsKind, dir: &Path) -> Result<(), VcsError> {
        (**self).download(kind, dir)
    }
}

/// Runs `git`, `hg`, `svn` and `bzr` as subprocesses
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandVcs;

impl CommandVcs {
    pub fn new() -> Self {
        Self
    }

    fn run<S: AsRef<str>>(kind: VcsKind, cwd: &Path, args: &[S]) -> Result<(), VcsError> {
        let cmd = kind.cmd();
        let joined = args
            .iter()
            .map(|a| a.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        debug!("cd {}; {} {}", cwd.display(), cmd, joined);

        let output = Command::new(cmd)
            .args(args.iter().map(|a| a.as_ref()))
            .current_dir(cwd)
            .output()
            .map_err(|source| VcsError::Spawn { cmd, source })?;

        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                cmd,
                args: joined,
                dir: cwd.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Vcs for CommandVcs {
    fn create(&self, kind: VcsKind, dir: &Path, remote: &str) -> Result<(), VcsError> {
        // the target is passed to the tool from inside its parent, so it must be absolute
        let dir = std::path::absolute(dir).map_err(|source| VcsError::InvalidDir {
            dir: dir.to_path_buf(),
            source,
        })?;
        let parent = dir.parent().unwrap_or(&dir);
        Self::run(kind, parent, &kind.create_args(remote, &dir))
    }

    fn download(&self, kind: VcsKind, dir: &Path) -> Result<(), VcsError> {
        Self::run(kind, dir, kind.download_args())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_cmd_round_trip() {
        for kind in VcsKind::ALL {
            assert_eq!(VcsKind::from_cmd(kind.cmd()), Some(kind));
            assert_eq!(kind.to_string().parse::<VcsKind>().unwrap(), kind);
        }
        assert_eq!(VcsKind::from_cmd("cvs"), None);
        assert!("cvs".parse::<VcsKind>().is_err());
    }

    #[test]
    fn test_metadata_dirs_are_hidden() {
        for kind in VcsKind::ALL {
            assert!(kind.metadata_dir().starts_with('.'));
        }
    }

    #[test]
    fn test_create_args() {
        let args = VcsKind::Git.create_args("https://example.com/a/b", Path::new("/out/b"));
        assert_eq!(args, vec!["clone", "https://example.com/a/b", "/out/b"]);

        let args = VcsKind::Subversion.create_args("svn://example.com/r", Path::new("/out/r"));
        assert_eq!(args[0], "checkout");
    }

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn git(cwd: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(["-c", "user.name=gofetch", "-c", "user.email=gofetch@example.com"])
            .args(args)
            .current_dir(cwd)
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    /// A local repository with one commit holding `README`
    fn remote_repo(root: &Path) -> PathBuf {
        let remote = root.join("remote");
        fs::create_dir_all(&remote).unwrap();
        git(&remote, &["init", "-q"]);
        fs::write(remote.join("README"), "one\n").unwrap();
        git(&remote, &["add", "README"]);
        git(&remote, &["commit", "-q", "-m", "first"]);
        remote
    }

    #[test]
    fn test_git_create_absolute_target() {
        if !git_available() {
            return;
        }
        let temp = tempfile::tempdir().unwrap();
        let remote = remote_repo(temp.path());
        let dir = temp.path().join("out/example.org/u/r");
        fs::create_dir_all(dir.parent().unwrap()).unwrap();

        CommandVcs::new()
            .create(VcsKind::Git, &dir, &remote.to_string_lossy())
            .unwrap();
        assert!(dir.join("README").is_file());
        assert!(dir.join(".git").is_dir());
    }

    #[test]
    fn test_git_create_relative_target() {
        if !git_available() {
            return;
        }
        let remote_root = tempfile::tempdir().unwrap();
        let remote = remote_repo(remote_root.path());

        let temp = tempfile::Builder::new().prefix("vcs").tempdir_in(".").unwrap();
        let base = PathBuf::from(temp.path().file_name().unwrap());
        let dir = base.join("example.org/u/r");
        assert!(dir.is_relative());
        fs::create_dir_all(dir.parent().unwrap()).unwrap();

        CommandVcs::new()
            .create(VcsKind::Git, &dir, &remote.to_string_lossy())
            .unwrap();
        assert!(dir.join("README").is_file());
        assert!(!dir.parent().unwrap().join(&base).exists());
    }

    #[test]
    fn test_git_download_pulls_new_commits() {
        if !git_available() {
            return;
        }
        let temp = tempfile::tempdir().unwrap();
        let remote = remote_repo(temp.path());
        let dir = temp.path().join("checkout");
        let vcs = CommandVcs::new();
        vcs.create(VcsKind::Git, &dir, &remote.to_string_lossy()).unwrap();

        fs::write(remote.join("NEWS"), "two\n").unwrap();
        git(&remote, &["add", "NEWS"]);
        git(&remote, &["commit", "-q", "-m", "second"]);
        assert!(!dir.join("NEWS").exists());

        vcs.download(VcsKind::Git, &dir).unwrap();
        assert!(dir.join("NEWS").is_file());
    }

    #[test]
    fn test_git_failure_captures_stderr() {
        if !git_available() {
            return;
        }
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("checkout");
        let missing = temp.path().join("no-such-remote");

        let err = CommandVcs::new()
            .create(VcsKind::Git, &dir, &missing.to_string_lossy())
            .unwrap_err();
        match err {
            VcsError::CommandFailed { cmd, args, dir: cwd, stderr } => {
                assert_eq!(cmd, "git");
                assert!(args.starts_with("clone "));
                assert_eq!(cwd, temp.path());
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.exists());
    }

    #[test]
    fn test_missing_tool_reports_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CommandVcs::run(VcsKind::Git, &dir.path().join("missing"), &["status"]);
        assert!(matches!(err, Err(VcsError::Spawn { cmd: "git", .. })));
    }
}
