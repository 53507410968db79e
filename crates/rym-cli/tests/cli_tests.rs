//! End-to-end tests for the rym binary
//!
//! The JDK toolchain and artifact resolver are external programs, so these
//! cover argument handling, failure exits and the self-contained commands.

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn rym() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("rym");
    cmd.env_remove("RYM_CONFIG_DIR")
        .env_remove("RYM_LOCK_DIR")
        .env_remove("RYM_CACHE_DIR")
        .env_remove("RYM_JSON")
        .env_remove("RYM_OUTPUT_DIR")
        .env_remove("RYM_LAUNCHER_DIR")
        .env_remove("RYM_RESOLVER")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_lists_commands() {
    rym()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("clean"))
        .stdout(predicate::str::contains("wrap"));
}

#[test]
fn test_install_without_manifest_fails() {
    let temp = TempDir::new().unwrap();

    rym()
        .current_dir(temp.path())
        .args(["install", "--silent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("ry.deps"));

    assert!(!temp.path().join(".rym").join("modules").exists());
}

#[test]
fn test_install_with_malformed_manifest_fails() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("ry.deps"), "{ \"dependencies\": [\"a:b:c:d\"] }").unwrap();

    rym()
        .current_dir(temp.path())
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Manifest error"));
}

#[test]
fn test_install_with_unavailable_resolver_stages_nothing() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("ry.deps"),
        r#"{ "dependencies": ["org.example:foo:1.0"] }"#,
    )
    .unwrap();

    rym()
        .current_dir(temp.path())
        .args(["install", "--silent"])
        .env("RYM_RESOLVER", temp.path().join("no-such-resolver"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));

    assert!(!temp.path().join(".rym").join("modules").exists());
    assert!(!temp.path().join("ry.deps.lock").exists());
    assert!(!temp.path().join("ry").exists());
}

#[test]
fn test_clean_removes_output_directory() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out");
    fs::create_dir_all(output.join("image").join("bin")).unwrap();

    rym()
        .current_dir(temp.path())
        .args(["clean", "--output-directory", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));

    assert!(!output.exists());
}

#[test]
fn test_clean_reads_output_directory_from_env() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("build");
    fs::create_dir_all(&output).unwrap();

    rym()
        .current_dir(temp.path())
        .args(["clean", "--silent"])
        .env("RYM_OUTPUT_DIR", &output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(!output.exists());
}

#[test]
fn test_wrap_generates_wrapper() {
    let temp = TempDir::new().unwrap();

    rym()
        .current_dir(temp.path())
        .args(["wrap", "--version", "1.2.3", "--launcher-directory", "bin"])
        .assert()
        .success();

    let script = fs::read_to_string(temp.path().join("bin").join("rymw")).unwrap();
    assert!(script.starts_with("#!/bin/sh\n"));
    assert!(script.contains(
        "https://repo.maven.apache.org/maven2/org/reaktivity/rym/1.2.3/rym-1.2.3"
    ));
}

#[test]
fn test_wrap_version_option_pins_release() {
    let temp = TempDir::new().unwrap();

    rym()
        .current_dir(temp.path())
        .args(["wrap", "--version", "0.1.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated"));

    let script = fs::read_to_string(temp.path().join("rymw")).unwrap();
    assert!(script.contains("wrappedPath=\".rym/wrapper/rym-0.1.0\""));
}

#[test]
fn test_top_level_version_flag() {
    rym()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
