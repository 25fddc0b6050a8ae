// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Command-line behavior

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
paths:
  fonts: { src: src/fonts, dest: dist/fonts }
  css: { src: src/styles, dest: dist/css }
  html: { src: src/templates, dest: dist }
"#;

fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("assetflow.yaml"), CONFIG).unwrap();
    for sub in ["src/fonts", "src/styles", "src/templates"] {
        fs::create_dir_all(root.join(sub)).unwrap();
    }
    fs::write(root.join("src/fonts/a.woff"), "font").unwrap();
    fs::write(root.join("src/styles/a.scss"), ".a{color:red}").unwrap();
    fs::write(root.join("src/templates/index.html"), "<p>{{ mode }}</p>").unwrap();
    dir
}

fn assetflow(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("assetflow").unwrap();
    cmd.current_dir(dir)
        .env_remove("ASSETFLOW_CONFIG")
        .env_remove("NODE_ENV")
        .env("ASSETFLOW_ENV", "production")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();

    assetflow(dir.path())
        .args(["--config", "missing.yaml", "build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.yaml"));
}

#[test]
fn test_build_writes_outputs() {
    let dir = site();

    assetflow(dir.path()).arg("build").assert().success();

    let root = dir.path();
    assert!(root.join("dist/fonts/a.woff").exists());
    assert!(root.join("dist/css/custom.min.css").exists());
    assert_eq!(
        fs::read_to_string(root.join("dist/index.html")).unwrap(),
        "<p>production</p>"
    );
}

#[test]
fn test_build_fails_on_broken_stage() {
    let dir = site();
    fs::write(dir.path().join("src/styles/b.scss"), ".b{").unwrap();

    assetflow(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("b.scss"));

    // Independent stages still ran
    assert!(dir.path().join("dist/fonts/a.woff").exists());
}

const MISORDERED: &str = r#"
paths:
  css:
    src: src/styles
    dest: dist/css
    steps:
      - type: concat
        output: all.css
      - type: style-compile
"#;

#[test]
fn test_build_rejects_invalid_config() {
    let dir = site();
    fs::write(dir.path().join("assetflow.yaml"), MISORDERED).unwrap();

    assetflow(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("last step"));

    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_watch_rejects_invalid_config() {
    let dir = site();
    fs::write(dir.path().join("assetflow.yaml"), MISORDERED).unwrap();

    assetflow(dir.path())
        .arg("watch")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .stderr(predicate::str::contains("last step"));
}

#[test]
fn test_empty_node_env_builds_for_development() {
    let dir = site();

    assetflow(dir.path())
        .env_remove("ASSETFLOW_ENV")
        .env("NODE_ENV", "")
        .arg("build")
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(dir.path().join("dist/index.html")).unwrap(),
        "<p>development</p>"
    );
}

#[test]
fn test_clean_empties_destination() {
    let dir = site();
    fs::create_dir_all(dir.path().join("dist/old")).unwrap();
    fs::write(dir.path().join("dist/old/file.txt"), "x").unwrap();

    assetflow(dir.path()).arg("clean").assert().success();

    assert!(dir.path().join("dist").exists());
    assert_eq!(fs::read_dir(dir.path().join("dist")).unwrap().count(), 0);
}

#[test]
fn test_graph_dot() {
    let dir = site();

    assetflow(dir.path())
        .args(["graph", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digraph pipeline"))
        .stdout(predicate::str::contains("\"fonts\" -> \"css\""));
}

#[test]
fn test_validate_reports_valid_table() {
    let dir = site();

    assetflow(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn test_config_from_environment() {
    let dir = site();
    fs::rename(dir.path().join("assetflow.yaml"), dir.path().join("site.yaml")).unwrap();

    assetflow(dir.path())
        .env("ASSETFLOW_CONFIG", "site.yaml")
        .args(["graph", "--format", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("graph TD"));
}
