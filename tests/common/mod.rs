//! Shared test infrastructure for `benrich` integration tests.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Isolated config directory plus helpers for running the binary against it.
pub struct TestFixture {
    pub dir: TempDir,
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("enrich_log.jsonl")
    }

    /// Returns true (and logs) when `sh` is unavailable for fake LM scripts.
    pub fn skip_if_no_shell(&self) -> bool {
        if which::which("sh").is_err() {
            eprintln!("Skipping: sh not found in PATH");
            return true;
        }
        false
    }

    /// Write a fake LM that drains the prompt and prints `reply`.
    /// Returns the command string to pass via `--lm`.
    pub fn fake_lm(&self, name: &str, reply: &str) -> String {
        let reply_path = self.dir.path().join(format!("{name}.reply"));
        fs::write(&reply_path, reply).expect("write reply");
        let script_path = self.dir.path().join(format!("{name}.sh"));
        let script = format!("cat >/dev/null\ncat '{}'\n", reply_path.display());
        fs::write(&script_path, script).expect("write script");
        format!("sh '{}'", script_path.display())
    }

    /// Run `benrich --config <tmp>/config.json <args...>` with a clean env.
    pub fn run(&self, args: &[&str], stdin: Option<&str>) -> Output {
        let mut command = Command::new(env!("CARGO_BIN_EXE_benrich"));
        command
            .arg("--config")
            .arg(self.config_path())
            .args(args)
            .env_remove("BENRICH_LM_COMMAND")
            .env_remove("BENRICH_LOG")
            .env_remove("RUST_LOG")
            .env_remove("LC_ALL")
            .env_remove("LC_MESSAGES")
            .env("LANG", "en_US.UTF-8")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().expect("spawn benrich");
        if let Some(mut pipe) = child.stdin.take() {
            if let Some(text) = stdin {
                pipe.write_all(text.as_bytes()).expect("write stdin");
            }
        }
        child.wait_with_output().expect("wait for benrich")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}):\n{}\nstderr:\n{}",
            stdout(output),
            stderr(output)
        )
    })
}
