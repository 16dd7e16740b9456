// Integration tests for the orden binary.
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use assert_cmd::Command;
use predicates::prelude::*;

const FIXTURE: &str = "tests/fixtures/coldstart.csv";

fn orden() -> Command {
    Command::cargo_bin("orden").unwrap()
}

#[test]
fn test_layout_orders_hot_methods_first() {
    let output = orden().arg(FIXTURE).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let on_create = stdout.find("Lcom/app/Main;.onCreate:()V").unwrap();
    let feed_load = stdout.find("Lcom/app/Feed;.load:()V").unwrap();
    let settings = stdout.find("Lcom/app/Settings;.open:()V").unwrap();

    // onCreate (rank 5) before Feed.load (rank 80); Settings (12% appear)
    // has no placement and goes last.
    assert!(on_create < feed_load);
    assert!(feed_load < settings);
}

#[test]
fn test_whitelist_lifts_unplaced_method() {
    let output = orden()
        .arg("-w")
        .arg("Settings")
        .arg(FIXTURE)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let on_create = stdout.find("Lcom/app/Main;.onCreate:()V").unwrap();
    let feed_load = stdout.find("Lcom/app/Feed;.load:()V").unwrap();
    let settings = stdout.find("Lcom/app/Settings;.open:()V").unwrap();

    // Whitelisted Settings parks mid cold-start range: after onCreate
    // (0.05) but before Feed.load (0.80).
    assert!(on_create < settings);
    assert!(settings < feed_load);
}

#[test]
fn test_summary_table() {
    orden()
        .arg("-c")
        .arg(FIXTURE)
        .assert()
        .success()
        .stdout(predicate::str::contains("ColdStart"))
        .stdout(predicate::str::contains("1000"))
        .stdout(predicate::str::contains("3 rows; 0 unresolved lines"));
}

#[test]
fn test_summary_json_is_machine_readable() {
    let output = orden()
        .arg("-c")
        .arg("--format")
        .arg("json")
        .arg(FIXTURE)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("summary output is valid JSON");
    assert_eq!(value["total_rows"], 3);
    assert_eq!(value["interactions"][0]["interaction_id"], "ColdStart");
    assert_eq!(value["interactions"][0]["appear_count"], 1000);
}

#[test]
fn test_layout_json_lists_every_method() {
    let output = orden()
        .arg("--format")
        .arg("json")
        .arg(FIXTURE)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("layout output is valid JSON");
    assert_eq!(value.as_array().unwrap().len(), 3);
    assert!(value[0]["sort_key"].is_number());
}

#[test]
fn test_legacy_flag_accepted() {
    orden().arg("--legacy").arg(FIXTURE).assert().success();
}

#[test]
fn test_missing_file_fails_with_diagnostic() {
    orden()
        .arg("no_such_profile.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no_such_profile.csv"));
}

#[test]
fn test_malformed_profile_fails_with_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.csv");
    std::fs::write(
        &path,
        "index,name,appear100,appear#,avg_call,avg_order,avg_rank100,min_api_level\n\
         0,La;.a:()V,not_a_number,990,5.0,900,10.0,15\n",
    )
    .unwrap();

    orden()
        .arg(path.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not_a_number"));
}
