// End-to-end tests for the `refaudit` binary.
// Run with: cargo test -p refaudit-cli --test cli_tests

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn refaudit() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_refaudit"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("REFAUDIT_LOG");
    cmd
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn run_into(out_dir: &Path, extra: &[&str]) -> Output {
    refaudit()
        .arg("run")
        .arg("--data-dir")
        .arg(fixtures_dir())
        .arg("--output-dir")
        .arg(out_dir)
        .args(extra)
        .output()
        .unwrap()
}

/// Copy the fixture tables into `dir`, then let the caller edit them.
fn copy_fixtures(dir: &Path) {
    for entry in std::fs::read_dir(fixtures_dir()).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            std::fs::copy(&path, dir.join(path.file_name().unwrap())).unwrap();
        }
    }
}

// -------------------------------------------------------------------------
// run
// -------------------------------------------------------------------------

#[test]
fn run_writes_report() {
    let tmp = tempfile::tempdir().unwrap();
    let out_dir = tmp.path().join("reports");
    let out = run_into(&out_dir, &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let report = out_dir.join("referral_report.csv");
    let mut reader = csv::Reader::from_path(&report).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.get(0), Some("referral_id"));
    assert_eq!(headers.get(19), Some("is_business_logic_valid"));

    let flags: Vec<String> = reader
        .records()
        .map(|r| r.unwrap().get(19).unwrap().to_string())
        .collect();
    assert_eq!(flags, vec!["true", "false", "true", "false", "false", "true"]);

    let err = stderr(&out);
    assert!(err.contains("report written:"), "stderr: {err}");
    assert!(err.contains("(6 rows)"), "stderr: {err}");
    assert!(err.contains("validity: 3 valid, 2 invalid, 1 uncomputable"), "stderr: {err}");
}

#[test]
fn run_with_config_file() {
    let tmp = tempfile::tempdir().unwrap();
    let out = refaudit()
        .arg("run")
        .arg("--config")
        .arg(fixtures_dir().join("audit.toml"))
        .arg("--output-dir")
        .arg(tmp.path())
        .arg("--quiet")
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(tmp.path().join("referral_report.csv").exists());
}

#[test]
fn json_summary_to_stdout_and_file() {
    let tmp = tempfile::tempdir().unwrap();
    let summary_path = tmp.path().join("summary.json");
    let out = run_into(tmp.path(), &["--json", "--summary", summary_path.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let stdout: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(stdout["summary"]["total_rows"], 6);
    assert_eq!(stdout["summary"]["valid"], 3);
    assert_eq!(stdout["summary"]["by_category"]["(none)"], 1);
    assert_eq!(stdout["meta"]["config_name"], "referral audit");

    let file: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(file["summary"], stdout["summary"]);
}

#[test]
fn rerun_is_byte_identical() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    assert!(run_into(a.path(), &["-q"]).status.success());
    assert!(run_into(b.path(), &["-q"]).status.success());
    let first = std::fs::read(a.path().join("referral_report.csv")).unwrap();
    let second = std::fs::read(b.path().join("referral_report.csv")).unwrap();
    assert_eq!(first, second);
}

// -------------------------------------------------------------------------
// Failures
// -------------------------------------------------------------------------

#[test]
fn missing_input_file_exits_61() {
    let tmp = tempfile::tempdir().unwrap();
    let out_dir = tmp.path().join("out");
    let out = refaudit()
        .arg("run")
        .arg("--data-dir")
        .arg(tmp.path().join("nowhere"))
        .arg("--output-dir")
        .arg(&out_dir)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(61));
    let err = stderr(&out);
    assert!(err.contains("error: IO error: cannot read"), "stderr: {err}");
    assert!(err.contains("user_referrals.csv"), "stderr: {err}");
    assert!(!out_dir.exists());
}

#[test]
fn missing_column_exits_61() {
    let tmp = tempfile::tempdir().unwrap();
    copy_fixtures(tmp.path());
    std::fs::write(tmp.path().join("referral_rewards.csv"), "id,value\nrw30,30\n").unwrap();

    let out = refaudit()
        .arg("run")
        .arg("--data-dir")
        .arg(tmp.path())
        .arg("--output-dir")
        .arg(tmp.path().join("out"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(61));
    assert!(stderr(&out).contains("table 'referral_rewards': missing column 'reward_value'"));
}

#[test]
fn duplicate_keys_under_error_policy_exit_62() {
    let tmp = tempfile::tempdir().unwrap();
    copy_fixtures(tmp.path());
    std::fs::write(tmp.path().join("referral_rewards.csv"), "id,reward_value\nrw30,30\nrw0,0\nrw30,60\n").unwrap();
    let config = tmp.path().join("strict.toml");
    std::fs::write(&config, "[input]\ndir = \".\"\n\n[output]\ndir = \"out\"\n\n[join]\non_duplicate = \"error\"\n").unwrap();

    let out = refaudit().arg("run").arg("--config").arg(&config).output().unwrap();
    assert_eq!(out.status.code(), Some(62));
    let err = stderr(&out);
    assert!(err.contains("duplicate join keys found:"), "stderr: {err}");
    assert!(err.contains("reward key \"rw30\" appears 2 times"), "stderr: {err}");
    assert!(err.contains("hint:"), "stderr: {err}");
    // Nothing written on a fatal error
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn unwritable_summary_exits_63_without_report() {
    let tmp = tempfile::tempdir().unwrap();
    let out_dir = tmp.path().join("out");
    let summary = tmp.path().join("missing-dir/summary.json");
    let out = run_into(&out_dir, &["--summary", summary.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(63));
    assert!(stderr(&out).contains("cannot write summary"), "stderr: {}", stderr(&out));
    assert!(!out_dir.join("referral_report.csv").exists());
}

#[test]
fn version_prints_package_version() {
    let out = refaudit().arg("--version").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")), "stdout: {stdout}");
}

#[test]
fn unknown_flag_exits_2() {
    let out = refaudit().args(["run", "--bogus"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
}

// -------------------------------------------------------------------------
// validate
// -------------------------------------------------------------------------

#[test]
fn validate_accepts_fixture_config() {
    let out = refaudit().arg("validate").arg(fixtures_dir().join("audit.toml")).output().unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("config OK: \"May referral audit\""));
}

#[test]
fn validate_rejects_bad_config_with_60() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("bad.toml");
    std::fs::write(&config, "[output]\nreport = \"reports/out.csv\"\n").unwrap();

    let out = refaudit().arg("validate").arg(&config).output().unwrap();
    assert_eq!(out.status.code(), Some(60));
    assert!(stderr(&out).contains("must be a file name"));

    let out = refaudit().arg("validate").arg(tmp.path().join("absent.toml")).output().unwrap();
    assert_eq!(out.status.code(), Some(60));
}
