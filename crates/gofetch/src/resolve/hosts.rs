//! Static resolution for well-known hosting services and for import paths
//! that spell out their VCS with a `.git`, `.hg`, `.svn` or `.bzr` element.

use regex::Regex;
use std::sync::LazyLock;

use super::{RepoRoot, ResolveError};
use crate::vcs::VcsKind;

struct KnownHost {
    /// Import paths starting with this are handled by this entry
    prefix: &'static str,
    pattern: Regex,
    /// `None` when the pattern captures the VCS itself
    vcs: Option<VcsKind>,
}

static KNOWN_HOSTS: LazyLock<Vec<KnownHost>> = LazyLock::new(|| {
    let host = |prefix, pattern: &str, vcs| KnownHost {
        prefix,
        pattern: Regex::new(pattern).expect("known host pattern is valid"),
        vcs,
    };
    vec![
        host(
            "github.com/",
            r"^(?P<root>github\.com/[A-Za-z0-9_.\-]+/[A-Za-z0-9_.\-]+)(/[\p{L}0-9_.\-]+)*$",
            Some(VcsKind::Git),
        ),
        host(
            "bitbucket.org/",
            r"^(?P<root>bitbucket\.org/[A-Za-z0-9_.\-]+/[A-Za-z0-9_.\-]+)(/[A-Za-z0-9_.\-]+)*$",
            Some(VcsKind::Git),
        ),
        host(
            "hub.jazz.net/",
            r"^(?P<root>hub\.jazz\.net/git/[a-z0-9]+/[A-Za-z0-9_.\-]+)(/[A-Za-z0-9_.\-]+)*$",
            Some(VcsKind::Git),
        ),
        host(
            "git.apache.org/",
            r"^(?P<root>git\.apache\.org/[a-z0-9_.\-]+\.git)(/[A-Za-z0-9_.\-]+)*$",
            Some(VcsKind::Git),
        ),
        host(
            "git.openstack.org/",
            r"^(?P<root>git\.openstack\.org/[A-Za-z0-9_.\-]+/[A-Za-z0-9_.\-]+)(\.git)?(/[A-Za-z0-9_.\-]+)*$",
            Some(VcsKind::Git),
        ),
        host(
            "launchpad.net/",
            r"^(?P<root>launchpad\.net/([A-Za-z0-9_.\-]+|~[A-Za-z0-9_.\-]+/(\+junk|[A-Za-z0-9_.\-]+)/[A-Za-z0-9_.\-]+))(/[A-Za-z0-9_.\-]+)*$",
            Some(VcsKind::Bazaar),
        ),
        host(
            "",
            r"^(?P<root>(?P<repo>([a-z0-9.\-]+\.)+[a-z0-9.\-]+(:[0-9]+)?(/~?[A-Za-z0-9_.\-]+)+?)\.(?P<vcs>bzr|git|hg|svn))(/~?[A-Za-z0-9_.\-]+)*$",
            None,
        ),
    ]
});

/// Resolve `import_path` without touching the network, if its form allows it
///
/// Returns `Ok(None)` when no static rule applies, and an error when the path
/// is on a known host but malformed for it.
pub fn match_known_host(import_path: &str) -> Result<Option<RepoRoot>, ResolveError> {
    for host in KNOWN_HOSTS.iter() {
        if !import_path.starts_with(host.prefix) {
            continue;
        }
        let Some(caps) = host.pattern.captures(import_path) else {
            if host.prefix.is_empty() {
                return Ok(None);
            }
            return Err(ResolveError::InvalidImportPath(import_path.to_string()));
        };

        let root = &caps["root"];
        let repo = match host.vcs {
            Some(vcs) => RepoRoot::new(root, format!("https://{}", root), vcs),
            None => {
                let vcs = VcsKind::from_cmd(&caps["vcs"])
                    .ok_or_else(|| ResolveError::InvalidImportPath(import_path.to_string()))?;
                RepoRoot::new(root, format!("https://{}", &caps["repo"]), vcs)
            }
        };
        return Ok(Some(repo));
    }
    Ok(None)
}
