// Integration tests for `rgrid recon`: the --json stdout contract and exit codes.
//
// Each test copies the engine's CSV fixtures into a fresh temp directory so
// config edits and output files never touch the source tree.
//
// Run with: cargo test -p rulegrid-cli --test recon_cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn rgrid() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rgrid"))
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures")
}

/// Temp directory holding a copy of every fixture file.
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for entry in std::fs::read_dir(fixtures_dir()).unwrap() {
        let path = entry.unwrap().path();
        std::fs::copy(&path, dir.path().join(path.file_name().unwrap())).unwrap();
    }
    dir
}

fn run_in(dir: &TempDir, args: &[&str]) -> Output {
    rgrid()
        .current_dir(dir.path())
        .args(args)
        .output()
        .expect("rgrid")
}

fn exit_code(output: &Output) -> i32 {
    output.status.code().expect("exit code")
}

/// Assert stdout is a single, parseable JSON value with no extra lines.
fn assert_single_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    assert!(
        !trimmed.is_empty(),
        "stdout should not be empty\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_str(trimmed).unwrap_or_else(|e| {
        panic!("stdout must be valid JSON.\nParse error: {e}\nstdout:\n{trimmed}")
    })
}

// ===========================================================================
// rgrid recon run (single)
// ===========================================================================

#[test]
fn payroll_run_passes() {
    let dir = workspace();
    let output = run_in(&dir, &["recon", "run", "payroll.recon.toml", "--json"]);
    assert_eq!(exit_code(&output), 0, "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let val = assert_single_json(&output);
    assert_eq!(val["meta"]["domain"], "payroll");
    assert_eq!(val["meta"]["config_name"], "Monthly Payroll");
    assert_eq!(val["meta"]["report_sha256"].as_str().unwrap().len(), 64);
    assert_eq!(val["report"]["summary"]["accepted"], 4);

    let e002 = val["report"]["rows"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["fact"]["key"] == "E002")
        .expect("E002 row");
    assert_eq!(e002["verdict"]["kind"], "accepted");
    assert_eq!(e002["verdict"]["value"]["net_cents"], 6_480_000);
    assert_eq!(e002["verdict"]["value"]["deduction_applied"], true);
}

#[test]
fn risk_run_exits_on_high_flags() {
    let dir = workspace();
    let output = run_in(&dir, &["recon", "run", "risk.recon.toml", "--json"]);
    assert_eq!(exit_code(&output), 1);

    let val = assert_single_json(&output);
    let summary = &val["report"]["summary"];
    assert_eq!(summary["flagged_high"], 1);
    assert_eq!(summary["flagged_medium"], 2);
    assert_eq!(summary["excluded"], 3);
    assert_eq!(val["report"]["rejected"].as_array().unwrap().len(), 3);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: high-severity flags found"), "stderr: {stderr}");
}

#[test]
fn medium_flags_only_is_warn() {
    let dir = workspace();
    let config = std::fs::read_to_string(dir.path().join("risk.recon.toml")).unwrap();
    std::fs::write(
        dir.path().join("risk.recon.toml"),
        config.replace("high_risk_amount = 100000", "high_risk_amount = 500000"),
    )
    .unwrap();

    let output = run_in(&dir, &["recon", "run", "risk.recon.toml"]);
    assert_eq!(exit_code(&output), 60);
    assert!(output.stdout.is_empty(), "no --json, no stdout");
}

#[test]
fn compliance_run_flags_unauthorized() {
    let dir = workspace();
    let output = run_in(&dir, &["recon", "run", "compliance.recon.toml", "--json"]);
    assert_eq!(exit_code(&output), 1);
    let val = assert_single_json(&output);
    assert_eq!(val["report"]["summary"]["flagged_high"], 2);
    assert_eq!(val["report"]["summary"]["accepted"], 3);
}

#[test]
fn parallel_flag_gives_same_digest() {
    let dir = workspace();
    let sequential =
        assert_single_json(&run_in(&dir, &["recon", "run", "risk.recon.toml", "--json"]));
    let parallel = assert_single_json(&run_in(
        &dir,
        &["recon", "run", "risk.recon.toml", "--json", "--parallel"],
    ));
    assert_eq!(sequential["meta"]["report_sha256"], parallel["meta"]["report_sha256"]);
    assert_eq!(sequential["report"], parallel["report"]);
}

#[test]
fn output_and_csv_files_written() {
    let dir = workspace();
    let output = run_in(
        &dir,
        &["recon", "run", "risk.recon.toml", "--output", "out.json", "--csv", "rows.csv"],
    );
    assert_eq!(exit_code(&output), 1);
    assert!(output.stdout.is_empty());

    let text = std::fs::read_to_string(dir.path().join("out.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["meta"]["domain"], "risk");

    let csv = std::fs::read_to_string(dir.path().join("rows.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "row,key,kind,reason,severity,value,gross,detail");
    assert_eq!(lines[1], "1,T002,flagged,high_risk,high,,,");
    // 3 verdicts + 3 excluded rows
    assert_eq!(lines.len(), 7);
    assert!(lines.iter().any(|l| l.starts_with("3,T005,excluded,invalid_value")));
}

#[test]
fn output_section_sets_default_files() {
    let dir = workspace();
    let config = std::fs::read_to_string(dir.path().join("risk.recon.toml")).unwrap();
    std::fs::write(
        dir.path().join("risk.recon.toml"),
        format!("{config}\n[output]\njson = \"risk.json\"\ncsv = \"risk.csv\"\n"),
    )
    .unwrap();

    let output = run_in(&dir, &["recon", "run", "risk.recon.toml"]);
    assert_eq!(exit_code(&output), 1);
    let text = std::fs::read_to_string(dir.path().join("risk.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["report"]["summary"]["flagged_high"], 1);
    assert!(dir.path().join("risk.csv").exists());

    // Command-line paths take precedence over [output]
    std::fs::remove_file(dir.path().join("risk.json")).unwrap();
    let output = run_in(&dir, &["recon", "run", "risk.recon.toml", "--output", "flag.json"]);
    assert_eq!(exit_code(&output), 1);
    assert!(dir.path().join("flag.json").exists());
    assert!(!dir.path().join("risk.json").exists());
}

// ===========================================================================
// Error exit codes
// ===========================================================================

#[test]
fn invalid_config_exits_61() {
    let dir = workspace();
    std::fs::write(
        dir.path().join("bad.recon.toml"),
        "name = \"Bad\"\ndomain = \"inventory\"\n",
    )
    .unwrap();
    let output = run_in(&dir, &["recon", "run", "bad.recon.toml", "--json"]);
    assert_eq!(exit_code(&output), 61);
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_required_table_exits_61() {
    let dir = workspace();
    std::fs::write(
        dir.path().join("nomaster.recon.toml"),
        "name = \"Risk\"\ndomain = \"risk\"\n[tables.transactions]\nfile = \"Transactions.csv\"\n",
    )
    .unwrap();
    let output = run_in(&dir, &["recon", "validate", "nomaster.recon.toml"]);
    assert_eq!(exit_code(&output), 61);
}

#[test]
fn missing_csv_exits_62() {
    let dir = workspace();
    std::fs::remove_file(dir.path().join("Master_Data.csv")).unwrap();
    let output = run_in(&dir, &["recon", "run", "risk.recon.toml"]);
    assert_eq!(exit_code(&output), 62);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Master_Data.csv"), "stderr: {stderr}");
}

#[test]
fn duplicate_reference_exits_62() {
    let dir = workspace();
    let master = dir.path().join("Master_Data.csv");
    let mut data = std::fs::read_to_string(&master).unwrap();
    data.push_str("C100,Alice Again\n");
    std::fs::write(&master, data).unwrap();

    let output = run_in(&dir, &["recon", "run", "risk.recon.toml"]);
    assert_eq!(exit_code(&output), 62);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("duplicate definition for key 'C100'"), "stderr: {stderr}");
}

// ===========================================================================
// Composite
// ===========================================================================

#[test]
fn composite_runs_every_step() {
    let dir = workspace();
    let output = run_in(&dir, &["recon", "run", "month-end.composite.toml", "--json"]);
    assert_eq!(exit_code(&output), 1);

    let val = assert_single_json(&output);
    assert_eq!(val["name"], "Month End");
    assert_eq!(val["verdict"], "fail");
    assert_eq!(val["exit_code"], 1);
    let statuses: Vec<&str> = val["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["pass", "fail", "fail"]);
}

#[test]
fn composite_fail_fast_stops_early() {
    let dir = workspace();
    let output = run_in(
        &dir,
        &["recon", "run", "month-end.composite.toml", "--json", "--fail-fast"],
    );
    assert_eq!(exit_code(&output), 1);
    let val = assert_single_json(&output);
    assert_eq!(val["steps"].as_array().unwrap().len(), 2);
}

#[test]
fn composite_step_error_is_reported() {
    let dir = workspace();
    std::fs::remove_file(dir.path().join("User_Access.csv")).unwrap();
    let output = run_in(&dir, &["recon", "run", "month-end.composite.toml", "--json"]);
    assert_eq!(exit_code(&output), 1);

    let val = assert_single_json(&output);
    let step = &val["steps"][2];
    assert_eq!(step["status"], "error");
    assert!(step.get("result").is_none());
    assert!(step["error"].as_str().unwrap().contains("User_Access.csv"));
}

#[test]
fn composite_rejects_csv_flag() {
    let dir = workspace();
    let output = run_in(
        &dir,
        &["recon", "run", "month-end.composite.toml", "--csv", "rows.csv"],
    );
    assert_eq!(exit_code(&output), 2);
}

// ===========================================================================
// validate / explain
// ===========================================================================

#[test]
fn validate_accepts_fixture_configs() {
    let dir = workspace();
    for config in [
        "payroll.recon.toml",
        "risk.recon.toml",
        "compliance.recon.toml",
        "month-end.composite.toml",
    ] {
        let output = run_in(&dir, &["recon", "validate", config]);
        assert_eq!(
            exit_code(&output),
            0,
            "{config}: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        assert!(String::from_utf8_lossy(&output.stderr).starts_with("valid:"));
    }
}

#[test]
fn explain_prints_decision_table() {
    let dir = workspace();
    let output = run_in(&dir, &["recon", "explain", "risk"]);
    assert_eq!(exit_code(&output), 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("risk: fact table 'transactions', keyed by Transaction_ID"));
    assert!(stdout.contains("100000.00"), "stdout: {stdout}");
}

#[test]
fn explain_rejects_mismatched_config() {
    let dir = workspace();
    let output = run_in(&dir, &["recon", "explain", "payroll", "--config", "risk.recon.toml"]);
    assert_eq!(exit_code(&output), 2);
}
