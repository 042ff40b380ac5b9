//! Nix flake support
//!
//! Handles:
//! - Lockfile parsing: flake.lock
//! - Input classification into git-refs / FlakeHub dependencies
//! - FlakeHub release lookup via the registry API

pub mod extract;
pub mod flakehub;
pub mod lockfile;
pub mod url;

pub use extract::extract_package_file;
pub use flakehub::{FlakeHubDatasource, Release, ReleaseResult};
pub use lockfile::{LockfileError, find_lockfile_path, read_lockfile};
