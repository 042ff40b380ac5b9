use clap::Parser;
use flakedeps::cache::{DiskStore, PackageCache};
use flakedeps::cli::{Cli, Command, FlakeHubPackage};
use flakedeps::config::Config;
use flakedeps::http::UreqFetcher;
use flakedeps::nix::flakehub::{FlakeHubDatasource, GetReleasesConfig, WILDCARD};
use flakedeps::nix::{self, lockfile};
use flakedeps::output::{self, DigestOutput, ExtractResult, ReleasesOutput};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Some(Command::Extract { path }) => run_extract(path.as_deref(), cli.json),
        Some(Command::Releases {
            package,
            constraint,
        }) => run_releases(&cli, package, constraint.as_deref()),
        Some(Command::Digest { package, version }) => {
            run_digest(&cli, package, version.as_deref())
        }
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("flakedeps={level}")));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run_extract(path: Option<&Path>, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let lock_path = lockfile::find_lockfile_path(path)?;
    let content = lockfile::read_lockfile(&lock_path)?;

    // Surface structural problems to the user; extraction itself only logs them
    lockfile::parse(&content, &lock_path)?;

    let deps = nix::extract_package_file(&content, &lock_path).unwrap_or_default();
    let lock_display = lock_path.display().to_string();

    if json_output {
        output::print_json(&ExtractResult::new(&lock_display, deps));
    } else if deps.is_empty() {
        println!("No updatable inputs found in {}", lock_display);
    } else {
        println!("{}:", lock_display);
        for dep in &deps {
            println!("  {}", output::format_dependency(dep));
        }
    }

    Ok(())
}

fn run_releases(
    cli: &Cli,
    package: &FlakeHubPackage,
    constraint: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (datasource, registry_url) = flakehub(cli)?;
    let package_name = package.to_string();

    let result = datasource.get_releases(GetReleasesConfig {
        package_name: &package_name,
        registry_url: Some(&registry_url),
        current_value: constraint,
    })?;

    if cli.json {
        output::print_json(&ReleasesOutput {
            package: package_name,
            constraint: constraint.unwrap_or(WILDCARD).to_string(),
            result,
        });
        return Ok(());
    }

    match result {
        Some(result) => {
            for release in &result.releases {
                let mut line =
                    format!("{} {} {}", package_name, release.version, release.git_ref);
                if let Some(timestamp) = &release.release_timestamp {
                    line.push_str(&format!(" ({})", timestamp));
                }
                if release.is_deprecated {
                    line.push_str(" [yanked]");
                }
                println!("{}", line);
            }
            if let Some(source_url) = &result.source_url {
                println!("source: {}", source_url);
            }
        }
        None => println!(
            "No release of {} matches '{}'",
            package_name,
            constraint.unwrap_or(WILDCARD)
        ),
    }

    Ok(())
}

fn run_digest(
    cli: &Cli,
    package: &FlakeHubPackage,
    version: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (datasource, registry_url) = flakehub(cli)?;
    let package_name = package.to_string();

    let digest = datasource.get_digest(&package_name, Some(&registry_url), version)?;

    if cli.json {
        output::print_json(&DigestOutput {
            package: package_name,
            version: version.unwrap_or(WILDCARD).to_string(),
            digest,
        });
        return Ok(());
    }

    match digest {
        Some(digest) => println!("{}", digest),
        None => println!(
            "No release of {} matches '{}'",
            package_name,
            version.unwrap_or(WILDCARD)
        ),
    }

    Ok(())
}

/// Build the FlakeHub datasource from config and CLI overrides
fn flakehub(cli: &Cli) -> Result<(FlakeHubDatasource, String), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let registry_url = cli
        .registry_url
        .clone()
        .unwrap_or_else(|| config.registry_url.clone());

    let http = Arc::new(UreqFetcher::new(&config.user_agent, config.timeout()));
    let cache = if cli.no_cache || config.cache_ttl_minutes == 0 {
        PackageCache::memory(config.cache_ttl())
    } else {
        match DiskStore::open_default() {
            Ok(store) => PackageCache::new(Box::new(store), config.cache_ttl()),
            Err(err) => {
                tracing::warn!(%err, "disk cache unavailable, caching in memory");
                PackageCache::memory(config.cache_ttl())
            }
        }
    };

    Ok((
        FlakeHubDatasource::new(http, Arc::new(cache)),
        registry_url,
    ))
}
