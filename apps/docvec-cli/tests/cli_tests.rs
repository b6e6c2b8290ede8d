use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn docvec(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("docvec").unwrap();
    cmd.current_dir(root)
        .env_remove("RUST_ENV")
        .env_remove("RUST_LOG")
        .env("APP_STORE__DIR", root.join("stores"))
        .env("APP_EMBEDDING__PROVIDER", "hash")
        .env("APP_EMBEDDING__DIMENSION", "64");
    cmd
}

fn write_doc(root: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = root.join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn ingest_then_query_json() {
    let tmp = TempDir::new().unwrap();
    let doc = write_doc(tmp.path(), "notes.txt", "keep the seed potatoes cool and dark");

    docvec(tmp.path())
        .arg("ingest")
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("as 'notes' (1 chunks, dimension 64"));

    docvec(tmp.path())
        .args(["query", "notes", "keep the seed potatoes cool and dark", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"hits\""))
        .stdout(predicate::str::contains("\"rank\": 0"));
}

#[test]
fn query_missing_document_fails() {
    let tmp = TempDir::new().unwrap();
    docvec(tmp.path())
        .args(["query", "ghost", "anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no store for document 'ghost'"));
}

#[test]
fn threshold_can_empty_the_result() {
    let tmp = TempDir::new().unwrap();
    let doc = write_doc(tmp.path(), "a.md", "water the beans at dusk");
    docvec(tmp.path()).arg("ingest").arg(&doc).arg("--doc-id").arg("beans").assert().success();

    docvec(tmp.path())
        .args(["query", "beans", "water the beans at dusk", "--min-similarity", "1.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no results"));

    docvec(tmp.path())
        .args(["query", "beans", "x", "--min-similarity", "0.1", "--max-distance", "1.0"])
        .assert()
        .failure();
}

#[test]
fn ingest_dir_list_inspect_remove() {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    fs::create_dir_all(docs.join("nested")).unwrap();
    write_doc(&docs, "first.txt", "one two three");
    write_doc(&docs.join("nested"), "second.md", "four five six");
    write_doc(&docs, "image.png", "not text");

    docvec(tmp.path())
        .arg("ingest-dir")
        .arg(&docs)
        .assert()
        .success()
        .stdout(predicate::str::contains("ingested 2 of 2 files"));

    docvec(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("first\t1 chunks").and(predicate::str::contains("second\t1 chunks")));

    docvec(tmp.path())
        .args(["inspect", "second"])
        .assert()
        .success()
        .stdout(predicate::str::contains("normalized: true"))
        .stdout(predicate::str::contains("four five six"));

    docvec(tmp.path()).args(["remove", "first"]).assert().success();
    docvec(tmp.path()).args(["remove", "first"]).assert().failure();
    docvec(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("first").not());
}

#[test]
fn invalid_doc_id_is_rejected_by_parser() {
    let tmp = TempDir::new().unwrap();
    docvec(tmp.path())
        .args(["query", "../etc", "q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not start with '.'"));
}

#[test]
fn explicit_config_file_relative_store_dir() {
    let tmp = TempDir::new().unwrap();
    let cfg = tmp.path().join("conf");
    fs::create_dir_all(&cfg).unwrap();
    fs::write(cfg.join("docvec.toml"), "[store]\ndir = \"my_stores\"\nnormalize = false\n").unwrap();
    let doc = write_doc(tmp.path(), "raw.txt", "unnormalized vectors here");

    let mut cmd = Command::cargo_bin("docvec").unwrap();
    cmd.current_dir(tmp.path())
        .env_remove("APP_STORE__DIR")
        .env("APP_EMBEDDING__DIMENSION", "32")
        .arg("--config")
        .arg(cfg.join("docvec.toml"))
        .arg("ingest")
        .arg(&doc)
        .assert()
        .success();

    assert!(cfg.join("my_stores").join("raw.dvs").is_file());
}
