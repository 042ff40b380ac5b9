//! Output formatting for JSON and text modes
//!
//! Provides types for structured output that can be serialized to JSON
//! for machine-readable output, or displayed as text for human consumption.

use crate::dependency::PackageDependency;
use crate::nix::ReleaseResult;
use serde::Serialize;

/// Result of an extract operation
#[derive(Debug, Serialize)]
pub struct ExtractResult {
    pub lock_file: String,
    pub deps: Vec<PackageDependency>,
}

/// Result of a releases lookup
#[derive(Debug, Serialize)]
pub struct ReleasesOutput {
    pub package: String,
    pub constraint: String,
    /// `null` when the registry has no matching release
    pub result: Option<ReleaseResult>,
}

/// Result of a digest lookup
#[derive(Debug, Serialize)]
pub struct DigestOutput {
    pub package: String,
    pub version: String,
    pub digest: Option<String>,
}

impl ExtractResult {
    pub fn new(lock_file: &str, deps: Vec<PackageDependency>) -> Self {
        Self {
            lock_file: lock_file.to_string(),
            deps,
        }
    }
}

/// One line per dependency: name, datasource, package, value and digest
pub fn format_dependency(dep: &PackageDependency) -> String {
    let mut line = format!("{} ({}) {}", dep.dep_name, dep.datasource, dep.package_name);
    if let Some(value) = &dep.current_value {
        line.push_str(&format!(" @ {}", value));
    }
    if let Some(digest) = &dep.current_digest {
        line.push_str(&format!(" [{}]", short_digest(digest)));
    }
    if let Some(versioning) = dep.versioning {
        line.push_str(&format!(" versioning={}", versioning));
    }
    line
}

fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

/// Print JSON output to stdout
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing JSON: {}", e);
            std::process::exit(1);
        }
    }
}
