//! Dependency extraction from flake.lock
//!
//! Only inputs declared by the root node are reported: transitive inputs are
//! pinned by the flakes that declare them and cannot be updated from here.

use super::lockfile::{self, FlakeRef, InputRef, InputType, ROOT_NODE};
use super::url::{
    browsable_url, channel_name, decode_segment, is_version_range, normalize_git_url,
    parse_flakehub_tarball, strip_ref_prefix, tarball_repo_url,
};
use crate::dependency::{Datasource, PackageDependency, Versioning};
use std::collections::HashMap;
use std::path::Path;

pub const NIXPKGS_URL: &str = "https://github.com/NixOS/nixpkgs";

const GITHUB_HOST: &str = "github.com";
const GITLAB_HOST: &str = "gitlab.com";
const SOURCEHUT_HOST: &str = "git.sr.ht";

/// Extract updatable dependencies from flake.lock content
///
/// Returns `None` when the lock file is malformed, has no root inputs, or
/// yields no dependencies. `lock_file` is only used in log messages.
pub fn extract_package_file(content: &str, lock_file: &Path) -> Option<Vec<PackageDependency>> {
    tracing::trace!(lock_file = %lock_file.display(), "nix::extract_package_file()");

    let lock = match lockfile::parse(content, lock_file) {
        Ok(lock) => lock,
        Err(err) => {
            tracing::debug!(lock_file = %lock_file.display(), %err, "invalid flake.lock file");
            return None;
        }
    };

    let Some(root_inputs) = lock.root_inputs() else {
        tracing::debug!(lock_file = %lock_file.display(), "flake.lock is missing \"root\" node");
        return None;
    };

    // node name -> alias; follows paths point at other flakes' inputs and are skipped
    let aliases: HashMap<&str, &str> = root_inputs
        .iter()
        .filter_map(|(alias, target)| match target {
            InputRef::Node(node) => Some((node.as_str(), alias.as_str())),
            InputRef::Follows(_) => None,
        })
        .collect();

    let mut deps = Vec::new();

    for (node_name, node) in &lock.nodes {
        if node_name == ROOT_NODE {
            continue;
        }
        let Some(&alias) = aliases.get(node_name.as_str()) else {
            continue;
        };

        let Some(locked) = &node.locked else {
            skip(lock_file, alias, "input is missing locked");
            continue;
        };
        let Some(original) = &node.original else {
            skip(lock_file, alias, "input is missing original");
            continue;
        };

        // indirect inputs depend on the flake registry
        if original.input_type == InputType::Indirect || locked.input_type == InputType::Indirect {
            skip(lock_file, alias, "input is of type indirect");
            continue;
        }
        if original.input_type == InputType::Path || locked.input_type == InputType::Path {
            skip(lock_file, alias, "input is of type path");
            continue;
        }
        let Some(rev) = &locked.rev else {
            skip(lock_file, alias, "locked input is not tracking a rev");
            continue;
        };

        let mut dep = PackageDependency::new(alias);
        dep.current_value = original.git_ref.as_deref().map(strip_ref_prefix);
        dep.current_digest = Some(rev.clone());

        match classify(&mut dep, locked.input_type, original) {
            Ok(()) => deps.push(dep),
            Err(reason) => skip(lock_file, alias, reason),
        }
    }

    if deps.is_empty() {
        return None;
    }

    Some(deps)
}

fn skip(lock_file: &Path, input: &str, reason: &str) {
    tracing::debug!(lock_file = %lock_file.display(), input, "{reason}, skipping");
}

/// Fill in the package identity for a dependency based on its locked type
///
/// Returns the skip reason when `original` lacks a field the type needs.
fn classify(
    dep: &mut PackageDependency,
    locked_type: InputType,
    original: &FlakeRef,
) -> Result<(), &'static str> {
    match locked_type {
        InputType::Git => {
            let url = original.url.as_deref().ok_or("git input is missing url")?;
            dep.package_name = normalize_git_url(url);
        }
        InputType::Github => {
            let (owner, repo) = owner_repo(original)?;
            if owner.eq_ignore_ascii_case("nixos") && repo.eq_ignore_ascii_case("nixpkgs") {
                dep.package_name = NIXPKGS_URL.to_string();
                dep.versioning = Some(Versioning::Nixpkgs);
            } else {
                dep.package_name = hosted_url(original, GITHUB_HOST, owner, repo);
            }
        }
        InputType::Gitlab => {
            let (owner, repo) = owner_repo(original)?;
            let owner = decode_segment(owner);
            dep.package_name = hosted_url(original, GITLAB_HOST, &owner, repo);
        }
        InputType::Sourcehut => {
            let (owner, repo) = owner_repo(original)?;
            dep.package_name = hosted_url(original, SOURCEHUT_HOST, owner, repo);
        }
        InputType::Tarball => {
            let url = original.url.as_deref().ok_or("tarball input is missing url")?;
            classify_tarball(dep, url);
            return Ok(());
        }
        InputType::Indirect | InputType::Path | InputType::Unsupported => {
            return Err("input type cannot be updated");
        }
    }

    dep.source_url = Some(browsable_url(&dep.package_name));
    Ok(())
}

/// Tarball inputs: FlakeHub first, then nixos channels, then archive URLs
fn classify_tarball(dep: &mut PackageDependency, url: &str) {
    if let Some(flakehub) = parse_flakehub_tarball(url) {
        dep.datasource = Datasource::FlakeHub;
        dep.package_name = flakehub.package_name();
        if is_version_range(&flakehub.version) {
            dep.versioning = Some(Versioning::Npm);
        } else {
            // Pinned versions are tracked by value only
            dep.current_digest = None;
        }
        dep.current_value = Some(flakehub.version);
        return;
    }

    if let Some(channel) = channel_name(url) {
        dep.package_name = NIXPKGS_URL.to_string();
        dep.current_value = Some(channel);
        dep.versioning = Some(Versioning::Nixpkgs);
        return;
    }

    dep.package_name = tarball_repo_url(url);
}

fn owner_repo(original: &FlakeRef) -> Result<(&str, &str), &'static str> {
    match (original.owner.as_deref(), original.repo.as_deref()) {
        (Some(owner), Some(repo)) => Ok((owner, repo)),
        _ => Err("input is missing owner or repo"),
    }
}

fn hosted_url(original: &FlakeRef, default_host: &str, owner: &str, repo: &str) -> String {
    let host = original.host.as_deref().unwrap_or(default_host);
    format!("https://{host}/{owner}/{repo}")
}
