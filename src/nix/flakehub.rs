//! FlakeHub registry integration
//!
//! FlakeHub resolves a version constraint server-side: `GET
//! /version/<owner>/<repo>/<constraint>` answers with the single best
//! matching release, so a lookup yields at most one release.

use crate::cache::PackageCache;
use crate::datasource::{DatasourceError, handle_generic_error};
use crate::http::{JsonFetch, fetch_json, join_url};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};

pub const DEFAULT_REGISTRY_URL: &str = "https://api.flakehub.com";

const CACHE_NAMESPACE: &str = "datasource-flakehub";

/// Constraint sent when the caller has none
pub const WILDCARD: &str = "*";

/// Release record returned by `/version/...`
#[derive(Debug, Deserialize)]
struct FlakeHubRelease {
    /// Full version, e.g. `1.1.0+rev-ff81ac96...`
    version: String,
    simplified_version: Option<String>,
    revision: String,
    repo_url: Option<String>,
    #[serde(default)]
    yanked_at: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

/// Releases known for a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub releases: Vec<Release>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub version: String,
    /// Commit the release was built from
    pub git_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_timestamp: Option<String>,
    pub is_deprecated: bool,
}

/// Parameters for `FlakeHubDatasource::get_releases`
#[derive(Debug, Clone, Copy)]
pub struct GetReleasesConfig<'a> {
    /// `owner/repo`
    pub package_name: &'a str,
    /// Registry base URL, `DEFAULT_REGISTRY_URL` when `None`
    pub registry_url: Option<&'a str>,
    /// Version constraint such as `0.1` or `3.13.1`
    pub current_value: Option<&'a str>,
}

pub struct FlakeHubDatasource {
    http: Arc<dyn JsonFetch>,
    cache: Arc<PackageCache>,
}

impl FlakeHubDatasource {
    pub fn new(http: Arc<dyn JsonFetch>, cache: Arc<PackageCache>) -> Self {
        Self { http, cache }
    }

    /// Look up the release matching `current_value` (or the latest release)
    ///
    /// Returns `Ok(None)` when the registry has no matching release.
    pub fn get_releases(
        &self,
        config: GetReleasesConfig<'_>,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let constraint = config.current_value.unwrap_or(WILDCARD);
        // different constraints resolve to different releases
        let cache_key = format!("{}:{}", config.package_name, constraint);

        self.cache
            .with_cache(CACHE_NAMESPACE, &cache_key, true, || {
                self.fetch_release(config, constraint)
            })
    }

    fn fetch_release(
        &self,
        config: GetReleasesConfig<'_>,
        constraint: &str,
    ) -> Result<Option<ReleaseResult>, DatasourceError> {
        let registry_url = config.registry_url.unwrap_or(DEFAULT_REGISTRY_URL);
        let url = join_url(
            registry_url,
            &format!("/version/{}/{}", config.package_name, constraint),
        );

        match fetch_json::<FlakeHubRelease>(self.http.as_ref(), &url) {
            Ok(Some(release)) => Ok(Some(to_release_result(release))),
            Ok(None) => Ok(None),
            Err(err) if err.is_not_found() => {
                tracing::debug!(
                    package = config.package_name,
                    constraint,
                    "FlakeHub package not found"
                );
                Ok(None)
            }
            Err(err) => Err(handle_generic_error(config.package_name, err)),
        }
    }

    /// Revision of the release matching `new_value` (or the latest release)
    pub fn get_digest(
        &self,
        package_name: &str,
        registry_url: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<Option<String>, DatasourceError> {
        let result = self.get_releases(GetReleasesConfig {
            package_name,
            registry_url,
            current_value: Some(new_value.unwrap_or(WILDCARD)),
        })?;

        Ok(result
            .and_then(|r| r.releases.into_iter().next())
            .map(|release| release.git_ref))
    }
}

fn to_release_result(release: FlakeHubRelease) -> ReleaseResult {
    let version = match release.simplified_version {
        Some(simplified) => simplified,
        // drop `+rev-...` build metadata
        None => display_version(&release.version).to_string(),
    };

    ReleaseResult {
        source_url: release.repo_url,
        releases: vec![Release {
            version,
            git_ref: release.revision,
            release_timestamp: release.published_at.as_deref().and_then(normalize_timestamp),
            is_deprecated: release.yanked_at.is_some(),
        }],
    }
}

/// Version up to the first `+`
fn display_version(version: &str) -> &str {
    version.split('+').next().unwrap_or(version)
}

/// Normalize an RFC 3339 timestamp to UTC with millisecond precision
fn normalize_timestamp(raw: &str) -> Option<String> {
    let parsed = OffsetDateTime::parse(raw, &Rfc3339).ok()?;
    parsed
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .ok()
}
