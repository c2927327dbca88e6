use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_render_reads_stdin() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("senko")
        .env("SENKO_HOME", dir.path())
        .arg("render")
        .write_stdin("**hi** *smiles* <b>")
        .assert()
        .success()
        .stdout("<strong>hi</strong> <em>smiles</em> &lt;b&gt;\n");
}

#[test]
fn test_render_reads_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("message.md");
    fs::write(&input, "# Title\nsee [docs](https://example.com)").unwrap();

    cargo_bin_cmd!("senko")
        .env("SENKO_HOME", dir.path())
        .arg("render")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("<h1>Title</h1><br>"))
        .stdout(predicate::str::contains(r#"rel="noopener noreferrer""#));
}

#[test]
fn test_render_plain_shows_visible_text() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("senko")
        .env("SENKO_HOME", dir.path())
        .args(["render", "--plain"])
        .write_stdin("*waves* 1 < 2")
        .assert()
        .success()
        .stdout("waves 1 < 2\n");
}

#[test]
fn test_render_missing_file_fails() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("senko")
        .env("SENKO_HOME", dir.path())
        .args(["render", "does-not-exist.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.md"));
}
