// ABOUTME: Integration tests for the papersoup CLI binary.
// ABOUTME: Covers single and multiple files, paragraph output, recipe files and per-file failures.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::CommandCargoExt;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn papersoup_cmd() -> Command {
    Command::cargo_bin("papersoup").unwrap()
}

const NATURE_HTML: &str = r#"<html><head><meta name="citation_doi" content="10.1038/abc"></head>
<body><article><div data-article-body="true">
<section><h2>Results</h2><p>It works.</p><p>Twice.</p></section>
<section><h2>References</h2><p>Ref.</p></section>
</div></article></body></html>"#;

#[test]
fn single_file_prints_one_record() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("paper.html");
    fs::write(&path, NATURE_HTML).unwrap();

    let output = papersoup_cmd()
        .arg("--recipe")
        .arg("nature")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"DOI\": \"10.1038/abc\""))
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(value.is_object());
    assert_eq!(value["Sections"][0]["name"], "Results");
    assert_eq!(value["Sections"].as_array().unwrap().len(), 1);
}

#[test]
fn paragraphs_mode_compact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("paper.html");
    fs::write(&path, NATURE_HTML).unwrap();

    let output = papersoup_cmd()
        .args(["--recipe", "springer_nature", "--paragraphs", "--compact"])
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    assert_eq!(stdout.trim().lines().count(), 1);
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    let paragraphs = value.as_array().unwrap();
    assert_eq!(paragraphs.len(), 2);
    assert_eq!(paragraphs[1]["order_root"], 1);
    assert_eq!(paragraphs[1]["path"], "Results");
    assert_eq!(paragraphs[1]["text"], "Twice.");
}

#[test]
fn multiple_files_print_array_and_failure_sets_exit_code() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.html");
    let bad = dir.path().join("bad.html");
    fs::write(&good, NATURE_HTML).unwrap();
    fs::write(&bad, "<html><body><p>no article here</p></body></html>").unwrap();

    let output = papersoup_cmd()
        .args(["--recipe", "nature"])
        .arg(&good)
        .arg(&bad)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("focus"))
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 1);
}

#[test]
fn recipe_file_and_output_path() {
    let dir = TempDir::new().unwrap();
    let recipe = dir.path().join("recipe.json");
    fs::write(
        &recipe,
        r#"{"name": "mini", "markup": "xml", "stages": [
            {"op": "remove", "rules": {"name": "fig"}},
            {"op": "collect", "sections": {"heading_rules": {"name": "title"}}}
        ]}"#,
    )
    .unwrap();
    let paper = dir.path().join("paper.xml");
    fs::write(
        &paper,
        "<body><sec><title>1. Intro</title><p>Hello.</p><fig>x</fig></sec></body>",
    )
    .unwrap();
    let out = dir.path().join("out.json");

    papersoup_cmd()
        .arg("--recipe")
        .arg(&recipe)
        .arg("-o")
        .arg(&out)
        .arg(&paper)
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["Sections"][0]["name"], "Intro");
    assert_eq!(value["Sections"][0]["content"][0], "Hello.");
}

#[test]
fn unknown_recipe_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("paper.html");
    fs::write(&path, NATURE_HTML).unwrap();

    papersoup_cmd()
        .args(["--recipe", "elsevier"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown recipe"));
}

#[test]
fn missing_file_is_reported() {
    papersoup_cmd()
        .args(["--recipe", "iop", "/no/such/paper.xml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("/no/such/paper.xml"));
}
