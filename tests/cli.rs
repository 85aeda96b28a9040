//! CLI integration tests for the oohdesk binary.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use oohdesk::store::{SqliteStore, Store};
use predicates::prelude::*;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("oohdesk").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--non-interactive",
            ])
            .assert()
    }

    fn admin_token(&self) -> String {
        std::fs::read_to_string(self.data_dir().join(".admin_token"))
            .expect("failed to read token file")
            .trim()
            .to_string()
    }
}

// ============================================================================
// Init Command Tests
// ============================================================================

#[test]
fn init_creates_database_file_and_admin_token_file() {
    let ctx = TestContext::new();

    ctx.init().success();

    assert!(ctx.data_dir().join("oohdesk.db").exists());
    assert!(ctx.data_dir().join(".admin_token").exists());
    assert!(ctx.admin_token().starts_with("oohdesk_"));
}

#[test]
fn init_prints_admin_token_once() {
    let ctx = TestContext::new();

    let assert = ctx.init().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();

    assert!(stdout.contains(&ctx.admin_token()));
}

#[cfg(unix)]
#[test]
fn init_restricts_admin_token_file_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let ctx = TestContext::new();
    ctx.init().success();

    let mode = std::fs::metadata(ctx.data_dir().join(".admin_token"))
        .expect("token metadata")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn init_rejects_second_initialization_with_existing_database() {
    let ctx = TestContext::new();

    ctx.init().success();
    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn init_registers_admin_token_in_store() {
    let ctx = TestContext::new();
    ctx.init().success();

    let store = SqliteStore::new(ctx.data_dir().join("oohdesk.db")).expect("open store");
    assert!(store.has_admin_token().expect("query admin token"));
}

// ============================================================================
// Serve Command Tests
// ============================================================================

#[test]
fn serve_refuses_to_start_before_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("oohdesk admin init"));
}

#[test]
fn serve_rejects_invalid_config_file() {
    let ctx = TestContext::new();
    ctx.init().success();

    std::fs::write(
        ctx.data_dir().join("oohdesk.toml"),
        "[inventory]\nlow_stock_threshold = \"lots\"\n",
    )
    .expect("write config");

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure();
}

#[test]
fn help_lists_commands() {
    let ctx = TestContext::new();

    ctx.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("admin"));
}
