//! URL and ref helpers for flake references
//!
//! All functions here are pure string transformations.

use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::LazyLock;

/// Gitea/Forgejo/GitHub style archive downloads
static ARCHIVE_TARBALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://(?<domain>[^/]+)/(?<owner>[^/]+)/(?<repo>[^/]+)/archive/(?<rev>.+)\.tar\.gz$")
        .expect("valid regex")
});

static CHANNEL_TARBALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://(?:channels\.nixos\.org|nixos\.org/channels)/(?<channel>[^/]+)/nixexprs\.tar\.xz$",
    )
    .expect("valid regex")
});

static FLAKEHUB_TARBALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://flakehub\.com/f/(?<owner>[^/]+)/(?<repo>[^/]+)/(?<version>[^/]+)$")
        .expect("valid regex")
});

static REF_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^refs/(?:heads|tags)/").expect("valid regex"));

/// `git@host:owner/repo` scp-like syntax
static SCP_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^/@:]+@(?<host>[^/:]+):(?<path>.+)$").expect("valid regex"));

/// `ssh://git@host:22/owner/repo`, `git://host/owner/repo`, ...
static SCHEME_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<scheme>[a-z][a-z0-9+.-]*)://(?:[^/@]+@)?(?<host>[^/:]+)(?::\d+)?(?<path>/.*)?$")
        .expect("valid regex")
});

pub const TARBALL_SUFFIX: &str = ".tar.gz";

/// A `https://flakehub.com/f/<owner>/<repo>/<version>[.tar.gz]` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlakeHubTarball {
    pub owner: String,
    pub repo: String,
    /// Version token with `.tar.gz` removed
    pub version: String,
}

impl FlakeHubTarball {
    pub fn package_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Strip a leading `refs/heads/` or `refs/tags/`
pub fn strip_ref_prefix(git_ref: &str) -> String {
    REF_PREFIX.replace(git_ref, "").into_owned()
}

/// Normalize a git clone URL into a stable package identity
///
/// Drops the `git+` transport prefix nix accepts, query/fragment parameters
/// (`?ref=...&rev=...`) and trailing slashes.
pub fn normalize_git_url(url: &str) -> String {
    let mut url = url.trim();
    url = url.strip_prefix("git+").unwrap_or(url);
    if let Some(idx) = url.find(|c| c == '?' || c == '#') {
        url = &url[..idx];
    }
    url.trim_end_matches('/').to_string()
}

/// Convert a repository URL into something a browser can open
///
/// Any git transport (ssh, scp-like, `git://`, `http://`) becomes `https://`
/// and a trailing `.git` is removed.
pub fn browsable_url(url: &str) -> String {
    let url = normalize_git_url(url);

    let https = if let Some(caps) = SCHEME_URL.captures(&url) {
        let path = caps.name("path").map_or("", |m| m.as_str());
        format!("https://{}{}", &caps["host"], path)
    } else if let Some(caps) = SCP_LIKE.captures(&url) {
        format!(
            "https://{}/{}",
            &caps["host"],
            caps["path"].trim_start_matches('/')
        )
    } else {
        url
    };

    let trimmed = https.trim_end_matches('/');
    trimmed.strip_suffix(".git").unwrap_or(trimmed).to_string()
}

/// Rewrite an archive download URL into its repository URL
///
/// URLs that are not archive downloads are returned unchanged.
pub fn tarball_repo_url(url: &str) -> String {
    ARCHIVE_TARBALL
        .replace(url, "https://$domain/$owner/$repo")
        .into_owned()
}

/// Channel name of a `channels.nixos.org` tarball URL
pub fn channel_name(url: &str) -> Option<String> {
    CHANNEL_TARBALL
        .captures(url)
        .map(|caps| caps["channel"].to_string())
}

pub fn parse_flakehub_tarball(url: &str) -> Option<FlakeHubTarball> {
    let caps = FLAKEHUB_TARBALL.captures(url)?;
    let token = &caps["version"];
    let version = token.strip_suffix(TARBALL_SUFFIX).unwrap_or(token);
    if version.is_empty() {
        return None;
    }

    Some(FlakeHubTarball {
        owner: caps["owner"].to_string(),
        repo: caps["repo"].to_string(),
        version: version.to_string(),
    })
}

/// Whether a FlakeHub version token is a range rather than a pinned release
///
/// Tokens with at most two numeric components (`0.1`, `1`, `0.1.*`) and the
/// wildcard are ranges; `3.13.1` or `0.2511.5835` are pinned. A two-component
/// release such as `1.0` is therefore treated as a range.
pub fn is_version_range(token: &str) -> bool {
    if is_wildcard(token) {
        return true;
    }

    let numeric = token
        .split('.')
        .filter(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
        .count();
    numeric <= 2
}

fn is_wildcard(token: &str) -> bool {
    token == "*" || token.eq_ignore_ascii_case("%2a")
}

/// Percent-decode a path segment (gitlab group paths encode `/` as `%2F`)
pub fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}
