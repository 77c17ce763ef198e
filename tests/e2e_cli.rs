//! CLI end-to-end tests.
//!
//! Runs the versionmerge binary against a file-backed catalog in a temp dir.

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

use common::{full_snapshot, MovieFixture};

#[allow(deprecated)]
fn versionmerge_cmd() -> Command {
    Command::cargo_bin("versionmerge").unwrap()
}

fn import_fixture(db: &Path, dir: &Path) -> MovieFixture {
    let movies = MovieFixture::new();
    let snapshot = dir.join("snapshot.json");
    fs::write(&snapshot, serde_json::to_string(&full_snapshot(&movies)).unwrap()).unwrap();

    versionmerge_cmd()
        .arg("--db")
        .arg(db)
        .arg("import")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""items": 6"#));
    movies
}

#[test]
fn test_cli_no_args_shows_help() {
    versionmerge_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_flag() {
    versionmerge_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("versionmerge"));
}

#[test]
fn test_cli_validate_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"merge": {"provider": "Imdb"}, "server": {"port": 9001}}"#).unwrap();

    versionmerge_cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Provider: Imdb"))
        .stdout(predicate::str::contains(":9001"));
}

#[test]
fn test_cli_validate_rejects_bad_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();

    versionmerge_cmd().arg("validate").arg(&path).assert().failure();
}

#[test]
fn test_cli_merge_then_split_movies() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("catalog.db");
    import_fixture(&db, dir.path());

    versionmerge_cmd()
        .arg("--db")
        .arg(&db)
        .arg("merge-movies")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""groups_merged": 1"#));

    versionmerge_cmd()
        .arg("--db")
        .arg(&db)
        .arg("split-movies")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""items_released": 3"#));
}

#[test]
fn test_cli_split_item() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("catalog.db");
    let movies = import_fixture(&db, dir.path());

    versionmerge_cmd()
        .args(["--db", db.to_str().unwrap(), "merge-movies"])
        .assert()
        .success();

    versionmerge_cmd()
        .args(["--db", db.to_str().unwrap(), "split-item", &movies.hd.id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains(movies.uhd.id.to_string()));
}

#[test]
fn test_cli_split_item_rejects_bad_id() {
    versionmerge_cmd()
        .args(["split-item", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid item ID"));
}
