use clap::{ArgAction, Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Extracts Nix flake inputs and resolves FlakeHub releases
#[derive(Parser, Debug)]
#[command(name = "flakedeps")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// FlakeHub API base URL (overrides config)
    #[arg(long, global = true)]
    pub registry_url: Option<String>,

    /// Do not read or write the on-disk registry cache
    #[arg(long, global = true)]
    pub no_cache: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List updatable inputs from a flake.lock
    Extract {
        /// flake.lock, flake.nix or directory (default: nearest flake.lock)
        path: Option<PathBuf>,
    },
    /// Show the FlakeHub release matching a constraint
    Releases {
        /// FlakeHub package: <owner>/<repo>
        package: FlakeHubPackage,

        /// Version constraint such as `0.1` or `3.13.1` (default: latest)
        #[arg(long)]
        constraint: Option<String>,
    },
    /// Show the revision of a FlakeHub release
    Digest {
        /// FlakeHub package: <owner>/<repo>
        package: FlakeHubPackage,

        /// Release version (default: latest)
        version: Option<String>,
    },
}

/// A FlakeHub package name: owner/repo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlakeHubPackage {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for FlakeHubPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for FlakeHubPackage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid package '{}'. Expected: <owner>/<repo>", s);

        let Some((owner, repo)) = s.split_once('/') else {
            return Err(invalid());
        };

        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(invalid());
        }

        Ok(FlakeHubPackage {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}
