//! Dependency descriptors shared by lock file extraction and release lookup
//!
//! A descriptor names the datasource that can answer "what is newer than this?"
//! and carries the current value/digest an updater compares against.

use serde::Serialize;
use std::fmt;

/// Datasources a descriptor can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Datasource {
    /// Plain git refs (branches, tags, commits) of a repository URL
    #[serde(rename = "git-refs")]
    GitRefs,
    /// The FlakeHub registry, queried by `owner/repo`
    #[serde(rename = "flakehub")]
    FlakeHub,
}

impl Datasource {
    pub fn id(self) -> &'static str {
        match self {
            Datasource::GitRefs => "git-refs",
            Datasource::FlakeHub => "flakehub",
        }
    }
}

impl fmt::Display for Datasource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Version ordering schemes applied to `current_value` by the updater
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Versioning {
    /// nixpkgs branch names (`nixos-24.05`, `nixpkgs-unstable`), not semver
    #[serde(rename = "nixpkgs")]
    Nixpkgs,
    /// npm-style ranges: `0.1` means `>=0.1.0 <0.2.0`
    #[serde(rename = "npm")]
    Npm,
}

impl Versioning {
    pub fn id(self) -> &'static str {
        match self {
            Versioning::Nixpkgs => "nixpkgs",
            Versioning::Npm => "npm",
        }
    }
}

impl fmt::Display for Versioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// One updatable dependency found in a lock file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDependency {
    /// Alias the root flake uses for this input
    pub dep_name: String,
    pub datasource: Datasource,
    /// Repository URL, or `owner/repo` for FlakeHub
    pub package_name: String,
    /// Branch/tag name or version constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,
    /// Locked commit hash
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versioning: Option<Versioning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl PackageDependency {
    /// A git-refs descriptor with no identity yet
    pub fn new(dep_name: &str) -> Self {
        Self {
            dep_name: dep_name.to_string(),
            datasource: Datasource::GitRefs,
            package_name: String::new(),
            current_value: None,
            current_digest: None,
            versioning: None,
            source_url: None,
        }
    }
}
