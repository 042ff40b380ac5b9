//! flake.lock schema and discovery
//!
//! A flake.lock is JSON with a `nodes` map. The node named `root` lists the
//! flake's own inputs as `alias -> node name`; every other node records an
//! input as requested (`original`) and as resolved (`locked`).

use crate::lockfile::{find_nearest_file_from, sibling_file};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LOCKFILE_NAME: &str = "flake.lock";

/// Name of the node holding the flake's own inputs
pub const ROOT_NODE: &str = "root";

/// The only lock format version understood
pub const SUPPORTED_VERSION: u32 = 7;

#[derive(Error, Debug)]
pub enum LockfileError {
    #[error("No flake.lock found. Run `nix flake lock` first.")]
    NotFound,

    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {details}")]
    Parse { path: PathBuf, details: String },

    #[error("Unsupported flake.lock version {version} in {path} (expected 7)")]
    UnsupportedVersion { path: PathBuf, version: u32 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlakeLock {
    pub nodes: BTreeMap<String, LockNode>,
    pub version: u32,
}

impl FlakeLock {
    /// Inputs declared by the root node, if any
    pub fn root_inputs(&self) -> Option<&BTreeMap<String, InputRef>> {
        self.nodes.get(ROOT_NODE).and_then(|root| root.inputs.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockNode {
    pub inputs: Option<BTreeMap<String, InputRef>>,
    pub locked: Option<FlakeRef>,
    pub original: Option<FlakeRef>,
    pub flake: Option<bool>,
}

/// Target of an input: a node name, or a `follows` path through other inputs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InputRef {
    Node(String),
    Follows(Vec<String>),
}

/// Source types a flake reference can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Git,
    Github,
    Gitlab,
    /// Resolved through the flake registry
    Indirect,
    Path,
    Sourcehut,
    Tarball,
    /// Any other type Nix knows about, such as `file` or `mercurial`
    #[serde(other)]
    Unsupported,
}

/// A flake reference, either as requested or as locked
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlakeRef {
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub host: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub rev: Option<String>,
    pub id: Option<String>,
    pub nar_hash: Option<String>,
    pub last_modified: Option<u64>,
}

/// Parse and validate flake.lock content
///
/// `path` is only used for error reporting.
pub fn parse(content: &str, path: &Path) -> Result<FlakeLock, LockfileError> {
    let lock: FlakeLock = serde_json::from_str(content).map_err(|e| LockfileError::Parse {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    if lock.version != SUPPORTED_VERSION {
        return Err(LockfileError::UnsupportedVersion {
            path: path.to_path_buf(),
            version: lock.version,
        });
    }

    Ok(lock)
}

/// Locate the flake.lock for a user-supplied path
///
/// - a `flake.lock` file is used as-is
/// - any other file (usually `flake.nix`) resolves to its sibling `flake.lock`
/// - a directory, or no path at all, walks up looking for `flake.lock`
pub fn find_lockfile_path(path: Option<&Path>) -> Result<PathBuf, LockfileError> {
    let start = match path {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().map_err(|_| LockfileError::NotFound)?,
    };

    if start.is_file() {
        if start.file_name().is_some_and(|name| name == LOCKFILE_NAME) {
            return Ok(start);
        }
        let sibling = sibling_file(&start, LOCKFILE_NAME);
        return if sibling.is_file() {
            Ok(sibling)
        } else {
            Err(LockfileError::NotFound)
        };
    }

    find_nearest_file_from(&start, &[LOCKFILE_NAME]).ok_or(LockfileError::NotFound)
}

pub fn read_lockfile(path: &Path) -> Result<String, LockfileError> {
    fs::read_to_string(path).map_err(|source| LockfileError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}
