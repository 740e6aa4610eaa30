//! Common test utilities for mailagent CLI tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Isolated home directory so commands never touch the real config
pub struct TestEnv {
    pub home: TempDir,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self { home: tempdir()? })
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.path().join(".mailagent").join("config.json")
    }

    /// The binary with HOME pointed at the temp dir and credentials cleared
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mailagent"));
        cmd.env("HOME", self.home.path())
            .env_remove("OPENROUTER_API_KEY")
            .env_remove("GMAIL_ACCESS_TOKEN")
            .env_remove("GOOGLE_CLIENT_ID")
            .env_remove("GOOGLE_CLIENT_SECRET")
            .env_remove("COOKIE_SECRET");
        cmd
    }
}
