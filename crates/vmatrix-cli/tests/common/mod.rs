//! Shared E2E test helpers for `vmatrix` binary tests.

#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default timeout for CLI tests.
pub const TIMEOUT_BASIC: Duration = Duration::from_secs(10);

/// Environment variables that would leak the developer's settings into
/// a test run.
const VMATRIX_VARS: &[&str] = &[
    "VMATRIX_DEBUG",
    "VMATRIX_STATE_FILE",
    "VMATRIX_BUILTIN_PERMISSIONS",
    "RUST_LOG",
];

/// An isolated project directory. Keep it alive for the test's duration.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    /// Creates an empty project in a fresh temp directory.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Default state file location for this project.
    pub fn state_file(&self) -> PathBuf {
        self.root().join(".vmatrix").join("state.json")
    }

    /// Writes `.vmatrix/config.toml`.
    pub fn write_config(&self, content: &str) {
        let dir = self.root().join(".vmatrix");
        std::fs::create_dir_all(&dir).expect("create .vmatrix");
        std::fs::write(dir.join("config.toml"), content).expect("write config");
    }

    /// Writes the state file directly.
    pub fn write_state(&self, state: &serde_json::Value) {
        let path = self.state_file();
        std::fs::create_dir_all(path.parent().expect("has parent")).expect("create .vmatrix");
        std::fs::write(path, state.to_string()).expect("write state");
    }

    /// Reads the state file back as JSON.
    pub fn read_state(&self) -> serde_json::Value {
        let content = std::fs::read_to_string(self.state_file()).expect("read state");
        serde_json::from_str(&content).expect("state is json")
    }

    /// Writes an arbitrary file under the project root.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        std::fs::write(&path, content).expect("write file");
        path
    }

    /// Builds a `vmatrix` command rooted at this project.
    ///
    /// HOME points at an empty directory inside the project so no
    /// global config is picked up.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd: assert_cmd::Command = cargo_bin_cmd!("vmatrix");
        cmd.timeout(TIMEOUT_BASIC);
        for var in VMATRIX_VARS {
            cmd.env_remove(var);
        }
        cmd.env("HOME", self.root().join("home"));
        cmd.args(["-C", self.root().to_str().expect("valid utf8")]);
        cmd
    }

    /// Runs a command that must succeed.
    pub fn run_ok(&self, args: &[&str]) {
        self.cmd().args(args).assert().success();
    }
}
