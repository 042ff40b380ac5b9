use super::harness::{TestContext, ensure_dir, parse_json, write_file};

pub struct Scenario {
    pub name: &'static str,
    pub run: fn(&TestContext) -> Result<(), String>,
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "help_output",
            run: scenario_help,
        },
        Scenario {
            name: "no_args_error",
            run: scenario_no_args,
        },
        Scenario {
            name: "extract_text",
            run: scenario_extract_text,
        },
        Scenario {
            name: "extract_json",
            run: scenario_extract_json,
        },
        Scenario {
            name: "extract_from_flake_nix",
            run: scenario_extract_from_flake_nix,
        },
        Scenario {
            name: "extract_nearest_lockfile",
            run: scenario_extract_nearest_lockfile,
        },
        Scenario {
            name: "extract_missing_lockfile",
            run: scenario_extract_missing_lockfile,
        },
        Scenario {
            name: "extract_malformed_lockfile",
            run: scenario_extract_malformed_lockfile,
        },
        Scenario {
            name: "extract_no_updatable_inputs",
            run: scenario_extract_no_updatable_inputs,
        },
        Scenario {
            name: "releases_invalid_package",
            run: scenario_releases_invalid_package,
        },
        Scenario {
            name: "releases_unreachable_registry",
            run: scenario_releases_unreachable_registry,
        },
    ]
}

const FLAKE_LOCK: &str = r#"{
  "nodes": {
    "flake-compat": {
      "flake": false,
      "locked": {
        "lastModified": 1733328505,
        "narHash": "sha256-NeCCThCEP3eCl2l/+27kNNK7QrwZB1IJCrXfrbv5oqU=",
        "rev": "ff81ac966bb2cae68946d5ed5fc4994f96d0ffec",
        "revCount": 69,
        "type": "tarball",
        "url": "https://api.flakehub.com/f/pinned/edolstra/flake-compat/1.1.0/01234567-89ab-cdef-0123-456789abcdef/source.tar.gz"
      },
      "original": {
        "type": "tarball",
        "url": "https://flakehub.com/f/edolstra/flake-compat/1.1.0.tar.gz"
      }
    },
    "local-overlay": {
      "locked": { "lastModified": 1, "path": "./overlay", "type": "path" },
      "original": { "path": "./overlay", "type": "path" }
    },
    "nixpkgs": {
      "locked": {
        "lastModified": 1720542800,
        "narHash": "sha256-ZgnNHuKV6h2+fQ5LuqnUaqZey1Lqqt5dTUAiAnqH0QQ=",
        "owner": "NixOS",
        "repo": "nixpkgs",
        "rev": "feb2849fdeb70028c70d73b848214b00d324a497",
        "type": "github"
      },
      "original": {
        "owner": "NixOS",
        "ref": "nixos-unstable",
        "repo": "nixpkgs",
        "type": "github"
      }
    },
    "root": {
      "inputs": {
        "flake-compat": "flake-compat",
        "local-overlay": "local-overlay",
        "nixpkgs": "nixpkgs"
      }
    }
  },
  "root": "root",
  "version": 7
}"#;

fn scenario_help(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("help")?;
    let output = ctx.run_flakedeps(&env, &["--help"], &env.root)?;
    output.assert_success()?;
    output.assert_stdout_contains("extract")?;
    output.assert_stdout_contains("releases")?;
    output.assert_stdout_contains("digest")?;
    Ok(())
}

fn scenario_no_args(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("no-args")?;
    let output = ctx.run_flakedeps(&env, &[], &env.root)?;
    output.assert_failure()?;
    output.assert_stderr_contains("No command specified")?;
    Ok(())
}

fn scenario_extract_text(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("extract-text")?;
    write_file(&env.root.join("flake.lock"), FLAKE_LOCK)?;

    let output = ctx.run_flakedeps(&env, &["extract", "flake.lock"], &env.root)?;
    output.assert_success()?;
    output.assert_stdout_contains(
        "nixpkgs (git-refs) https://github.com/NixOS/nixpkgs @ nixos-unstable [feb2849fdeb7] versioning=nixpkgs",
    )?;
    output.assert_stdout_contains("flake-compat (flakehub) edolstra/flake-compat @ 1.1.0")?;
    if output.stdout.contains("local-overlay") {
        return Err(format!(
            "Path input should not be listed.\nstdout: {}",
            output.stdout
        ));
    }
    Ok(())
}

fn scenario_extract_json(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("extract-json")?;
    write_file(&env.root.join("flake.lock"), FLAKE_LOCK)?;

    let output = ctx.run_flakedeps(&env, &["extract", "--json", "flake.lock"], &env.root)?;
    output.assert_success()?;
    let value = parse_json(&output.stdout)?;
    let deps = value
        .get("deps")
        .and_then(|v| v.as_array())
        .ok_or("Expected deps array")?;
    if deps.len() != 2 {
        return Err(format!("Expected 2 deps, got {}", deps.len()));
    }

    let flake_compat = &deps[0];
    if flake_compat["depName"] != "flake-compat"
        || flake_compat["datasource"] != "flakehub"
        || flake_compat["packageName"] != "edolstra/flake-compat"
        || flake_compat["currentValue"] != "1.1.0"
        || flake_compat.get("currentDigest").is_some()
    {
        return Err(format!("Unexpected flake-compat entry: {}", flake_compat));
    }

    let nixpkgs = &deps[1];
    if nixpkgs["depName"] != "nixpkgs"
        || nixpkgs["currentDigest"] != "feb2849fdeb70028c70d73b848214b00d324a497"
        || nixpkgs["sourceUrl"] != "https://github.com/NixOS/nixpkgs"
    {
        return Err(format!("Unexpected nixpkgs entry: {}", nixpkgs));
    }
    Ok(())
}

fn scenario_extract_from_flake_nix(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("extract-flake-nix")?;
    let project = env.root.join("project");
    write_file(&project.join("flake.nix"), "{ outputs = _: { }; }")?;
    write_file(&project.join("flake.lock"), FLAKE_LOCK)?;

    let output = ctx.run_flakedeps(&env, &["extract", "project/flake.nix"], &env.root)?;
    output.assert_success()?;
    output.assert_stdout_contains("nixpkgs (git-refs)")?;
    Ok(())
}

fn scenario_extract_nearest_lockfile(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("extract-nearest")?;
    write_file(&env.root.join("flake.lock"), FLAKE_LOCK)?;
    let nested = env.root.join("nested").join("dir");
    ensure_dir(&nested)?;

    let output = ctx.run_flakedeps(&env, &["extract"], &nested)?;
    output.assert_success()?;
    output.assert_stdout_contains("flake-compat (flakehub)")?;
    Ok(())
}

fn scenario_extract_missing_lockfile(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("extract-missing")?;
    let project = env.root.join("project");
    write_file(&project.join("flake.nix"), "{ }")?;

    let output = ctx.run_flakedeps(&env, &["extract", "project/flake.nix"], &env.root)?;
    output.assert_failure()?;
    output.assert_stderr_contains("No flake.lock found")?;
    Ok(())
}

fn scenario_extract_malformed_lockfile(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("extract-malformed")?;
    write_file(&env.root.join("flake.lock"), "{ \"nodes\": [] }")?;

    let output = ctx.run_flakedeps(&env, &["extract", "flake.lock"], &env.root)?;
    output.assert_failure()?;
    output.assert_stderr_contains("Failed to parse")?;
    Ok(())
}

fn scenario_extract_no_updatable_inputs(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("extract-empty")?;
    write_file(
        &env.root.join("flake.lock"),
        r#"{ "nodes": { "root": {} }, "root": "root", "version": 7 }"#,
    )?;

    let output = ctx.run_flakedeps(&env, &["extract", "--json", "flake.lock"], &env.root)?;
    output.assert_success()?;
    let value = parse_json(&output.stdout)?;
    if value
        .get("deps")
        .and_then(|v| v.as_array())
        .map(|arr| arr.is_empty())
        != Some(true)
    {
        return Err("Expected empty deps array".to_string());
    }
    Ok(())
}

fn scenario_releases_invalid_package(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("releases-invalid")?;
    let output = ctx.run_flakedeps(&env, &["releases", "flake-compat"], &env.root)?;
    output.assert_failure()?;
    output.assert_stderr_contains("Invalid package")?;
    Ok(())
}

fn scenario_releases_unreachable_registry(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("releases-unreachable")?;
    let output = ctx.run_flakedeps(
        &env,
        &[
            "releases",
            "edolstra/flake-compat",
            "--no-cache",
            "--registry-url",
            "http://127.0.0.1:9",
        ],
        &env.root,
    )?;
    output.assert_failure()?;
    output.assert_stderr_contains("Temporary failure looking up 'edolstra/flake-compat'")?;
    Ok(())
}
