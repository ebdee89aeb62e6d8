//! CLI integration tests for the `verdant` binary.
//!
//! Uses `assert_cmd` to spawn the binary and verify exit codes, stdout
//! content, and stderr content. All tests run from the workspace root so
//! that `fixtures/rice_catalog.json` resolves.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CATALOG: &str = "fixtures/rice_catalog.json";

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `verdant` binary, rooted at workspace.
fn verdant() -> Command {
    let mut cmd = cargo_bin_cmd!("verdant");
    cmd.current_dir(workspace_root());
    cmd.env_remove("VERDANT_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    verdant()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Plant disease diagnosis with certainty factors",
        ));
}

#[test]
fn version_exits_0() {
    verdant()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("verdant"));
}

#[test]
fn unknown_subcommand_fails() {
    verdant().arg("prescribe").assert().failure();
}

// ──────────────────────────────────────────────
// 2. diagnose
// ──────────────────────────────────────────────

#[test]
fn diagnose_full_match_reports_rule_certainty() {
    verdant()
        .args(["diagnose", "--catalog", CATALOG, "--symptoms", "1,2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Rice blast (#1): 80.0% from 1 rule(s)"))
        .stdout(predicate::str::contains(
            "Diamond lesions with grey centres are typical of blast",
        ))
        .stdout(predicate::str::contains("signed_mycin combination, partial matching"));
}

#[test]
fn diagnose_combines_partial_and_full_matches() {
    // Rule 1 half matched (0.4) combined with rule 5 fully matched (0.4).
    verdant()
        .args(["diagnose", "--catalog", CATALOG, "--symptoms", "1,8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rice blast (#1): 64.0% from 2 rule(s)"));
}

#[test]
fn diagnose_ranks_by_certainty() {
    let output = verdant()
        .args([
            "--output",
            "json",
            "diagnose",
            "--catalog",
            CATALOG,
            "--symptoms",
            "1,2,7",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    let conclusions = json["conclusions"].as_array().unwrap();
    assert_eq!(conclusions.len(), 2);
    assert_eq!(conclusions[0]["disease_name"], "Rice blast");
    assert_eq!(conclusions[0]["rank"], 1);
    assert_eq!(conclusions[1]["disease_name"], "Sheath blight");
    assert_eq!(conclusions[1]["certainty_percentage"], 75.0);
}

#[test]
fn diagnose_json_reports_exclusions_and_trace() {
    let output = verdant()
        .args([
            "--output",
            "json",
            "diagnose",
            "--catalog",
            CATALOG,
            "--symptoms",
            "3",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);

    // Tungro is inactive and rule 7 has no conditions.
    let excluded = json["excluded"].as_array().unwrap();
    assert_eq!(excluded.len(), 2);
    assert_eq!(excluded[0]["rule_id"], 6);
    assert_eq!(excluded[0]["reason"], "inactive_disease");
    assert_eq!(excluded[1]["rule_id"], 7);
    assert_eq!(excluded[1]["reason"], "empty_conditions");

    // Bacterial leaf blight half matched: 0.7 * 1/2.
    let trace = &json["trace"]["2"];
    assert_eq!(trace.as_array().unwrap().len(), 1);
    assert_eq!(trace[0]["rule_id"], 2);
    assert_eq!(json["metadata"]["combination"], "signed_mycin");
}

#[test]
fn diagnose_without_matches_says_so() {
    verdant()
        .args(["diagnose", "--catalog", CATALOG])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No disease matched the observed symptoms.",
        ))
        .stdout(predicate::str::contains("Observed: (none)"));
}

#[test]
fn diagnose_show_skipped_lists_unobserved_symptoms() {
    verdant()
        .args([
            "diagnose",
            "--catalog",
            CATALOG,
            "--symptoms",
            "1,2",
            "--show-skipped",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "skipped rule 4 (Sheath blight): missing Lesions near the waterline",
        ));
}

#[test]
fn diagnose_quiet_prints_only_results() {
    verdant()
        .args([
            "--quiet",
            "diagnose",
            "--catalog",
            CATALOG,
            "--symptoms",
            "1,2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rice blast"))
        .stdout(predicate::str::contains("Knowledge base").not())
        .stdout(predicate::str::contains("excluded as malformed").not());
}

#[test]
fn diagnose_logs_exclusions_to_stderr_without_colour() {
    verdant()
        .args(["diagnose", "--catalog", CATALOG, "--symptoms", "1,2"])
        .assert()
        .success()
        .stderr(predicate::str::contains("malformed rules excluded from evaluation"))
        .stderr(predicate::str::contains("\x1b[").not());
}

#[test]
fn diagnose_quiet_silences_warnings() {
    verdant()
        .args([
            "--quiet",
            "diagnose",
            "--catalog",
            CATALOG,
            "--symptoms",
            "1,2",
        ])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn diagnose_exact_subset_config_ignores_partial_matches() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("verdant.toml");
    fs::write(
        &config,
        "[engine]\ncombination = \"signed_mycin\"\npolicy = \"exact_subset\"\n",
    )
    .unwrap();

    verdant()
        .args(["diagnose", "--catalog", CATALOG, "--symptoms", "1,8", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rice blast (#1): 40.0% from 1 rule(s)"))
        .stdout(predicate::str::contains("exact_subset matching"));
}

#[test]
fn diagnose_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("verdant.toml");
    fs::write(&config, "[engine]\npolicy = \"sometimes\"\n").unwrap();

    verdant()
        .args(["diagnose", "--catalog", CATALOG, "--symptoms", "1", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid engine config"));
}

#[test]
fn diagnose_missing_config_file_fails() {
    verdant()
        .args([
            "diagnose",
            "--catalog",
            CATALOG,
            "--config",
            "nonexistent/verdant.toml",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn diagnose_missing_catalog_fails() {
    verdant()
        .args(["diagnose", "--catalog", "nonexistent/catalog.json", "--symptoms", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("knowledge base unavailable"));
}

#[test]
fn diagnose_missing_catalog_json_error() {
    verdant()
        .args([
            "--output",
            "json",
            "diagnose",
            "--catalog",
            "nonexistent/catalog.json",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""));
}

#[test]
fn diagnose_malformed_catalog_fails() {
    let dir = TempDir::new().unwrap();
    let catalog = dir.path().join("catalog.json");
    fs::write(&catalog, "{ \"rules\": [ { \"id\": \"one\" } ] }").unwrap();

    verdant()
        .args(["diagnose", "--symptoms", "1", "--catalog"])
        .arg(&catalog)
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed catalog"));
}

#[test]
fn diagnose_rejects_non_numeric_symptom() {
    verdant()
        .args(["diagnose", "--catalog", CATALOG, "--symptoms", "1,leaf"])
        .assert()
        .failure();
}

// ──────────────────────────────────────────────
// 3. Recording and history
// ──────────────────────────────────────────────

#[test]
fn record_then_history_round_trip() {
    let dir = TempDir::new().unwrap();
    let history = dir.path().join("history.jsonl");

    verdant()
        .args([
            "diagnose",
            "--catalog",
            CATALOG,
            "--symptoms",
            "1,2",
            "--user",
            "farmer",
            "--record",
        ])
        .arg(&history)
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded diagnosis #1"));

    verdant()
        .args(["diagnose", "--catalog", CATALOG, "--symptoms", "3,4", "--record"])
        .arg(&history)
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded diagnosis #2"));

    let output = verdant()
        .args(["--output", "json", "history", "--history"])
        .arg(&history)
        .output()
        .unwrap();
    assert!(output.status.success());
    let records = stdout_json(&output);
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], 2);
    assert_eq!(records[0]["disease_id"], 2);
    assert_eq!(records[1]["user_name"], "farmer");
    assert_eq!(
        records[1]["notes"],
        "Matched: Diamond-shaped leaf lesions, Grey lesion centres"
    );
    assert_eq!(records[1]["selected_symptoms"], serde_json::json!([1, 2]));
}

#[test]
fn record_with_no_conclusion_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let history = dir.path().join("history.jsonl");

    verdant()
        .args(["diagnose", "--catalog", CATALOG, "--record"])
        .arg(&history)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to record."));
    assert!(!history.exists());
}

#[test]
fn history_text_lists_newest_first() {
    let dir = TempDir::new().unwrap();
    let history = dir.path().join("history.jsonl");
    for symptoms in ["1,2", "7"] {
        verdant()
            .args(["diagnose", "--catalog", CATALOG, "--symptoms", symptoms, "--record"])
            .arg(&history)
            .assert()
            .success();
    }

    let output = verdant()
        .args(["history", "--history"])
        .arg(&history)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let first = stdout.find("#2").unwrap();
    let second = stdout.find("#1").unwrap();
    assert!(first < second);
    assert!(stdout.contains("disease 4 at 75.0%"));
}

#[test]
fn history_of_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    verdant()
        .args(["history", "--history"])
        .arg(dir.path().join("none.jsonl"))
        .assert()
        .success()
        .stdout(predicate::str::contains("No diagnoses recorded."));
}

// ──────────────────────────────────────────────
// 4. explain
// ──────────────────────────────────────────────

#[test]
fn explain_renders_cause_and_effect() {
    verdant()
        .args([
            "explain",
            "--catalog",
            CATALOG,
            "--symptoms",
            "1,8",
            "--disease",
            "1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Rice blast (#1): certainty 0.640 via 2 rule(s), signed_mycin combination",
        ))
        .stdout(predicate::str::contains(
            "1. rule 1 matched 1/2 [Diamond-shaped leaf lesions]: contributes 0.400, certainty 0.000 -> 0.400",
        ))
        .stdout(predicate::str::contains(
            "2. rule 5 matched 1/1 [Stunted growth]: contributes 0.400, certainty 0.400 -> 0.640",
        ));
}

#[test]
fn explain_json_is_consistent_with_trace() {
    let output = verdant()
        .args([
            "--output",
            "json",
            "explain",
            "--catalog",
            CATALOG,
            "--symptoms",
            "1,2,8",
            "--disease",
            "1",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["consistent"], true);
    assert_eq!(json["disease_name"], "Rice blast");
    assert_eq!(json["explanation"]["steps"].as_array().unwrap().len(), 2);
    assert_eq!(json["entries"][0]["rule_id"], 1);
}

#[test]
fn explain_disease_not_in_trace_fails() {
    verdant()
        .args([
            "explain",
            "--catalog",
            CATALOG,
            "--symptoms",
            "1",
            "--disease",
            "4",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("disease 4 not found in trace"));
}

#[test]
fn explain_unknown_disease_fails() {
    verdant()
        .args([
            "explain",
            "--catalog",
            CATALOG,
            "--symptoms",
            "1",
            "--disease",
            "99",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown disease: 99"));
}

/// Save a `diagnose --output json` session for symptoms 1,2 against a
/// private copy of the fixture catalog.
fn saved_session(tmp: &TempDir) -> (PathBuf, PathBuf) {
    let catalog = tmp.path().join("catalog.json");
    fs::copy(workspace_root().join(CATALOG), &catalog).unwrap();

    let output = verdant()
        .args(["--output", "json", "diagnose", "--catalog"])
        .arg(&catalog)
        .args(["--symptoms", "1,2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let session = tmp.path().join("session.json");
    fs::write(&session, &output.stdout).unwrap();
    (catalog, session)
}

#[test]
fn explain_trace_replays_saved_session_after_catalog_edit() {
    let tmp = TempDir::new().unwrap();
    let (catalog, session) = saved_session(&tmp);

    let text = fs::read_to_string(&catalog).unwrap();
    let edited = text.replace("\"certainty\": 0.8,", "\"certainty\": 0.5,");
    assert_ne!(text, edited);
    fs::write(&catalog, edited).unwrap();

    verdant()
        .args(["explain", "--trace"])
        .arg(&session)
        .args(["--disease", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Rice blast (#1): certainty 0.800 via 1 rule(s), signed_mycin combination",
        ));

    // Without a saved trace, explain reflects the catalog as it is now.
    verdant()
        .args(["explain", "--catalog"])
        .arg(&catalog)
        .args(["--symptoms", "1,2", "--disease", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rice blast (#1): certainty 0.500"));
}

#[test]
fn explain_trace_json_is_consistent() {
    let tmp = TempDir::new().unwrap();
    let (_catalog, session) = saved_session(&tmp);

    let output = verdant()
        .args(["--output", "json", "explain", "--trace"])
        .arg(&session)
        .args(["--disease", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["consistent"], true);
    assert_eq!(json["disease_name"], "Rice blast");
    assert_eq!(json["explanation"]["certainty"], 0.8);
}

#[test]
fn explain_trace_disease_not_in_session_fails() {
    let tmp = TempDir::new().unwrap();
    let (_catalog, session) = saved_session(&tmp);

    verdant()
        .args(["explain", "--trace"])
        .arg(&session)
        .args(["--disease", "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("disease 4 not found in trace"));
}

#[test]
fn explain_without_catalog_or_trace_fails() {
    verdant()
        .args(["explain", "--disease", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--catalog"));
}

// ──────────────────────────────────────────────
// 5. Catalog views
// ──────────────────────────────────────────────

#[test]
fn treatments_lists_active_rows_in_id_order() {
    let output = verdant()
        .args(["treatments", "--catalog", CATALOG, "--disease", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Treatments for Rice blast (#1):"));
    assert!(stdout.contains(
        "- Tricyclazole spray [Chemical]: Spray at late tillering and again at heading"
    ));
    assert!(stdout.contains("- Remove infected stubble [Cultural]"));
    assert!(!stdout.contains("Discontinued fungicide"));
    assert!(stdout.find("Tricyclazole").unwrap() < stdout.find("Remove infected").unwrap());
}

#[test]
fn treatments_for_disease_without_rows() {
    verdant()
        .args(["treatments", "--catalog", CATALOG, "--disease", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(none)"));
}

#[test]
fn treatments_unknown_disease_fails() {
    verdant()
        .args(["treatments", "--catalog", CATALOG, "--disease", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown disease: 42"));
}

#[test]
fn preventions_json() {
    let output = verdant()
        .args([
            "--output",
            "json",
            "preventions",
            "--catalog",
            CATALOG,
            "--disease",
            "1",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["disease"]["name"], "Rice blast");
    let preventions = json["preventions"].as_array().unwrap();
    assert_eq!(preventions.len(), 2);
    assert_eq!(preventions[0]["description"], "Avoid excess nitrogen fertiliser");
}

#[test]
fn rules_lists_active_rules_and_exclusions() {
    verdant()
        .args(["rules", "--catalog", CATALOG])
        .assert()
        .success()
        .stdout(predicate::str::contains("7 active rule(s):"))
        .stdout(predicate::str::contains(
            "rule 1 -> Rice blast (cf 0.80): Diamond-shaped leaf lesions + Grey lesion centres",
        ))
        .stdout(predicate::str::contains("rule 7 -> Brown spot (cf 0.30): (no conditions)"))
        .stdout(predicate::str::contains("rule 6: inactive_disease"))
        .stdout(predicate::str::contains("rule 7: empty_conditions"))
        .stdout(predicate::str::contains("Retired rule").not());
}

#[test]
fn rules_json_carries_metadata() {
    let output = verdant()
        .args(["--output", "json", "rules", "--catalog", CATALOG])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["metadata"]["policy"], "partial");
    assert_eq!(json["rules"].as_array().unwrap().len(), 7);
    assert_eq!(json["rules"][0]["conditions"], serde_json::json!([1, 2]));
    assert_eq!(json["excluded"].as_array().unwrap().len(), 2);
}
