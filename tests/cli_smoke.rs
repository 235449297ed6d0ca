//! CLI smoke tests for kodegen_bundler_layer.
//!
//! These cover argument handling and configuration errors, which are
//! reported before any Python tooling runs.

mod common;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use common::write_file;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn layer_cmd(cwd: &TempDir) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("kodegen_bundler_layer");
    cmd.current_dir(cwd.path());
    cmd.env_remove("KODEGEN_LAYER_SOURCE");
    cmd.env_remove("KODEGEN_LAYER_PROJECT");
    cmd.env("NO_COLOR", "1");
    cmd
}

fn fixture_source() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("mylib")
}

#[test]
fn help_flag_works() {
    let temp = TempDir::new().unwrap();
    layer_cmd(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--layer-prefix"));
}

#[test]
fn version_flag_works() {
    let temp = TempDir::new().unwrap();
    layer_cmd(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kodegen_bundler_layer"));
}

#[test]
fn missing_source_is_an_invalid_argument() {
    let temp = TempDir::new().unwrap();
    layer_cmd(&temp)
        .args(["--source", "does-not-exist"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn errors_are_reported_on_stderr_with_a_hint() {
    let temp = TempDir::new().unwrap();
    layer_cmd(&temp)
        .args(["--source", "does-not-exist"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("✗ "))
        .stderr(predicate::str::contains("hint: "));
}

#[test]
fn unnamed_project_requires_project_name() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "src/setup.py", "from setuptools import setup\nsetup()\n");

    layer_cmd(&temp)
        .args(["--source", "src"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--project-name"));
}

#[test]
fn escaping_layer_prefix_is_rejected() {
    let temp = TempDir::new().unwrap();
    layer_cmd(&temp)
        .arg("--source")
        .arg(fixture_source())
        .args(["--layer-prefix", "../outside", "--output", "mylib-layer.zip"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("layer prefix"));

    assert!(!temp.path().join(".layer-build").exists());
}

#[test]
fn unknown_layer_config_key_is_rejected() {
    let temp = TempDir::new().unwrap();
    write_file(
        temp.path(),
        "src/pyproject.toml",
        "[project]\nname = \"mylib\"\n\n[tool.kodegen-layer]\nprefix = \"python\"\n",
    );

    layer_cmd(&temp)
        .args(["--source", "src"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("tool.kodegen-layer"));
}

#[test]
fn unknown_frontend_is_rejected() {
    let temp = TempDir::new().unwrap();
    layer_cmd(&temp)
        .args(["--frontend", "poetry"])
        .assert()
        .code(2);
}

#[test]
fn zero_stage_timeout_is_rejected() {
    let temp = TempDir::new().unwrap();
    layer_cmd(&temp)
        .arg("--source")
        .arg(fixture_source())
        .args(["--stage-timeout", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("timeout"));
}
