use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone)]
pub struct TestContext {
    pub bin_path: PathBuf,
    pub tmp_root: PathBuf,
}

pub struct TestEnv {
    pub root: PathBuf,
    pub home: PathBuf,
    pub xdg_cache: PathBuf,
    pub xdg_config: PathBuf,
}

pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestContext {
    pub fn new() -> Result<Self, String> {
        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_flakedeps"));

        let tmp_root = std::env::temp_dir().join("flakedeps-e2e");
        fs::create_dir_all(&tmp_root).map_err(|e| format!("Failed to create temp root: {}", e))?;

        Ok(Self { bin_path, tmp_root })
    }

    pub fn create_env(&self, name: &str) -> Result<TestEnv, String> {
        let dir = self.unique_temp_dir(name)?;
        let home = dir.join("home");
        let xdg_cache = home.join(".cache");
        let xdg_config = home.join(".config");
        fs::create_dir_all(&xdg_cache).map_err(|e| format!("Failed to create cache dir: {}", e))?;
        fs::create_dir_all(&xdg_config)
            .map_err(|e| format!("Failed to create config dir: {}", e))?;

        Ok(TestEnv {
            root: dir,
            home,
            xdg_cache,
            xdg_config,
        })
    }

    fn unique_temp_dir(&self, name: &str) -> Result<PathBuf, String> {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| e.to_string())?
            .as_nanos();
        let dir = self
            .tmp_root
            .join(format!("{}-{}-{}", name, nanos, counter));
        fs::create_dir_all(&dir).map_err(|e| format!("Failed to create temp dir: {}", e))?;
        Ok(dir)
    }

    pub fn run_flakedeps(
        &self,
        env: &TestEnv,
        args: &[&str],
        cwd: &Path,
    ) -> Result<CommandOutput, String> {
        if std::env::var("FLAKEDEPS_E2E_LOG").is_ok() {
            eprintln!("command: flakedeps {:?} (cwd: {})", args, cwd.display());
        }
        let output = Command::new(&self.bin_path)
            .args(args)
            .current_dir(cwd)
            .env("HOME", &env.home)
            .env("XDG_CACHE_HOME", &env.xdg_cache)
            .env("XDG_CONFIG_HOME", &env.xdg_config)
            .env_remove("RUST_LOG")
            .output()
            .map_err(|e| format!("Failed to run command: {}", e))?;

        Ok(CommandOutput::from_output(output))
    }
}

impl CommandOutput {
    pub fn from_output(output: Output) -> Self {
        let status = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Self {
            status,
            stdout,
            stderr,
        }
    }

    pub fn assert_success(&self) -> Result<(), String> {
        if self.status == 0 {
            Ok(())
        } else {
            Err(format!(
                "Expected success, got exit {}: {}",
                self.status, self.stderr
            ))
        }
    }

    pub fn assert_failure(&self) -> Result<(), String> {
        if self.status != 0 {
            Ok(())
        } else {
            Err("Expected failure, got success".to_string())
        }
    }

    pub fn assert_stdout_contains(&self, needle: &str) -> Result<(), String> {
        if self.stdout.contains(needle) {
            Ok(())
        } else {
            Err(format!(
                "Expected stdout to contain '{}'.\nstdout: {}",
                needle, self.stdout
            ))
        }
    }

    pub fn assert_stderr_contains(&self, needle: &str) -> Result<(), String> {
        if self.stderr.contains(needle) {
            Ok(())
        } else {
            Err(format!(
                "Expected stderr to contain '{}'.\nstderr: {}",
                needle, self.stderr
            ))
        }
    }
}

pub fn write_file(path: &Path, content: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create parent dirs: {}", e))?;
    }
    fs::write(path, content).map_err(|e| format!("Failed to write file: {}", e))
}

pub fn ensure_dir(path: &Path) -> Result<(), String> {
    fs::create_dir_all(path).map_err(|e| format!("Failed to create dir: {}", e))
}

pub fn parse_json(output: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(output).map_err(|e| format!("Invalid JSON output: {}", e))
}
