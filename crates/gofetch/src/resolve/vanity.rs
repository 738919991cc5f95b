//! Vanity import discovery
//!
//! An import path that is not on a known host is fetched as
//! `https://<import path>?go-get=1`, and the page's
//! `<meta name="go-import" content="prefix vcs repo">` tags say which
//! repository serves it.

use regex::Regex;
use reqwest::blocking::Client;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{RepoResolver, RepoRoot, ResolveError};
use crate::vcs::VcsKind;

/// HTTP request timeout for discovery
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("meta tag pattern is valid"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(name|content)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern is valid")
});

/// One `go-import` meta tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaImport {
    pub prefix: String,
    pub vcs: String,
    pub repo: String,
}

/// Extract the `go-import` meta tags from an HTML page
///
/// Only the document head is considered when it is closed.
pub fn parse_go_import_meta(html: &str) -> Vec<MetaImport> {
    let head = match html.to_ascii_lowercase().find("</head>") {
        Some(end) => &html[..end],
        None => html,
    };

    let mut imports = Vec::new();
    for tag in META_TAG.find_iter(head) {
        let mut name = None;
        let mut content = None;
        for attr in ATTRIBUTE.captures_iter(tag.as_str()) {
            let value = attr.get(2).or_else(|| attr.get(3)).map(|m| m.as_str());
            match attr[1].to_ascii_lowercase().as_str() {
                "name" => name = value,
                "content" => content = value,
                _ => {}
            }
        }
        if name != Some("go-import") {
            continue;
        }
        let fields: Vec<&str> = content.unwrap_or("").split_whitespace().collect();
        if let &[prefix, vcs, repo] = fields.as_slice() {
            imports.push(MetaImport {
                prefix: prefix.to_string(),
                vcs: vcs.to_string(),
                repo: repo.to_string(),
            });
        }
    }
    imports
}

/// Pick the meta tag that covers `import_path`
pub fn select_meta_import(import_path: &str, imports: &[MetaImport]) -> Result<RepoRoot, ResolveError> {
    let discovery = |message: String| ResolveError::Discovery {
        path: import_path.to_string(),
        message,
    };

    let matching: Vec<&MetaImport> = imports
        .iter()
        .filter(|m| m.vcs != "mod")
        .filter(|m| {
            import_path == m.prefix
                || import_path
                    .strip_prefix(m.prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .collect();

    let meta = match matching.as_slice() {
        [] => return Err(ResolveError::RepoRootNotFound(import_path.to_string())),
        [meta] => *meta,
        _ => return Err(discovery("multiple go-import meta tags match".to_string())),
    };

    let vcs = VcsKind::from_cmd(&meta.vcs)
        .ok_or_else(|| discovery(format!("unsupported version control system '{}'", meta.vcs)))?;
    if !meta.repo.contains("://") {
        return Err(discovery(format!("invalid repo url '{}'", meta.repo)));
    }
    Ok(RepoRoot::new(meta.prefix.clone(), meta.repo.clone(), vcs))
}

/// Resolves import paths by fetching their discovery page
pub struct VanityResolver {
    client: Client,
}

impl VanityResolver {
    pub fn new() -> Result<Self, ResolveError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("gofetch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn discovery_url(scheme: &str, import_path: &str) -> Result<Url, ResolveError> {
        let mut url = Url::parse(&format!("{}://{}", scheme, import_path))
            .map_err(|_| ResolveError::InvalidImportPath(import_path.to_string()))?;
        url.query_pairs_mut().append_pair("go-get", "1");
        Ok(url)
    }

    fn fetch_page(&self, import_path: &str, insecure: bool) -> Result<String, ResolveError> {
        let url = Self::discovery_url("https", import_path)?;
        match self.get(url) {
            Ok(body) => Ok(body),
            Err(e) if insecure => {
                debug!("https discovery for {} failed ({}), trying http", import_path, e);
                self.get(Self::discovery_url("http", import_path)?)
            }
            Err(e) => Err(e),
        }
    }

    fn get(&self, url: Url) -> Result<String, ResolveError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        // error pages may still carry the meta tags
        Ok(response.text()?)
    }
}

impl RepoResolver for VanityResolver {
    fn resolve_repo_root(&self, import_path: &str, insecure: bool) -> Result<RepoRoot, ResolveError> {
        let page = self.fetch_page(import_path, insecure)?;
        select_meta_import(import_path, &parse_go_import_meta(&page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="go-import" content="example.org/tool git https://code.example.org/tool">
  <meta name='go-source' content='example.org/tool _ _ _'>
  <META CONTENT="example.org/other hg https://hg.example.org/other" NAME="go-import" />
</head>
<body><meta name="go-import" content="example.org/body git https://x/y"></body>
</html>"#;

    #[test]
    fn test_parse_meta() {
        let imports = parse_go_import_meta(PAGE);
        assert_eq!(imports.len(), 2);
        assert_eq!(
            imports[0],
            MetaImport {
                prefix: "example.org/tool".into(),
                vcs: "git".into(),
                repo: "https://code.example.org/tool".into(),
            }
        );
        assert_eq!(imports[1].vcs, "hg");
    }

    #[test]
    fn test_select_by_prefix() {
        let imports = parse_go_import_meta(PAGE);
        let repo = select_meta_import("example.org/tool/cmd/x", &imports).unwrap();
        assert_eq!(repo.root, "example.org/tool");
        assert_eq!(repo.vcs, VcsKind::Git);

        let repo = select_meta_import("example.org/other", &imports).unwrap();
        assert_eq!(repo.vcs, VcsKind::Mercurial);

        assert!(matches!(
            select_meta_import("example.org/toolbox", &imports),
            Err(ResolveError::RepoRootNotFound(_))
        ));
    }

    #[test]
    fn test_select_rejects_ambiguous_and_bad_entries() {
        let meta = |prefix: &str, vcs: &str, repo: &str| MetaImport {
            prefix: prefix.into(),
            vcs: vcs.into(),
            repo: repo.into(),
        };

        let twice = [meta("a.org/x", "git", "https://a/x"), meta("a.org/x", "hg", "https://a/x")];
        assert!(matches!(
            select_meta_import("a.org/x", &twice),
            Err(ResolveError::Discovery { .. })
        ));

        let with_mod = [meta("a.org/x", "mod", "https://proxy"), meta("a.org/x", "git", "https://a/x")];
        assert_eq!(select_meta_import("a.org/x", &with_mod).unwrap().vcs, VcsKind::Git);

        let cvs = [meta("a.org/x", "cvs", "https://a/x")];
        assert!(select_meta_import("a.org/x", &cvs).is_err());

        let bare = [meta("a.org/x", "git", "a/x")];
        assert!(select_meta_import("a.org/x", &bare).is_err());
    }

    #[test]
    fn test_discovery_url() {
        let url = VanityResolver::discovery_url("https", "example.org/tool/cmd").unwrap();
        assert_eq!(url.as_str(), "https://example.org/tool/cmd?go-get=1");
    }
}
