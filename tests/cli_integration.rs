mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `chart` renders offline and prints the written path
#[test]
fn test_chart_command_writes_svg() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("request.json");
    std::fs::write(
        &input,
        r#"{"series":[{"name":"Canopy","value":"60%"},{"name":"Lawn","value":40}],"metric_name":"Cover","title":"Site cover"}"#,
    )
    .unwrap();
    let out = dir.path().join("charts");

    let mut cmd = Command::cargo_bin("ecooptima").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .arg("chart")
        .arg("--input")
        .arg(&input)
        .arg("--kind")
        .arg("pie")
        .arg("--output-dir")
        .arg(&out);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("site-cover-").and(predicate::str::contains(".svg")));
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);
}

#[test]
fn test_missing_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("request.json");
    std::fs::write(&input, r#"{"series":[{"label":"Oak","value":3}],"metric_name":"Height"}"#)
        .unwrap();

    let mut cmd = Command::cargo_bin("ecooptima").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .arg("chart")
        .arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(dir.path().join("charts"));

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_chart_command_reports_empty_series() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("request.json");
    std::fs::write(&input, r#"{"series":[],"metric_name":"Height"}"#).unwrap();

    let mut cmd = Command::cargo_bin("ecooptima").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .arg("chart")
        .arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(dir.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("at least one (label, value) pair"));
}

#[test]
fn test_invalid_conversation_limits_fail_validation() {
    let (_temp_dir, config_path) = common::temp_config_file(
        "conversation:\n  history_limit: 4\n  context_turns: 8\n",
    );

    let mut cmd = Command::cargo_bin("ecooptima").unwrap();
    cmd.arg("--config")
        .arg(config_path)
        .arg("analyze")
        .arg("--text")
        .arg("Street trees");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot exceed"));
}

#[test]
fn test_unknown_provider_fails_validation() {
    let (_temp_dir, config_path) = common::temp_config_file("provider:\n  type: bedrock\n");

    let mut cmd = Command::cargo_bin("ecooptima").unwrap();
    cmd.arg("--config").arg(config_path).arg("serve");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid provider type"));
}
