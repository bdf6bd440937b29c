//! CLI end-to-end tests for cm-core.
//!
//! Each test runs the binary with an isolated configuration environment so
//! no user or system analysis.json leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a Command for the cm-core binary with config discovery isolated.
fn cm_core(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cm-core").expect("cm-core binary should exist");
    cmd.env_remove("COHORT_METRICS_CONFIG")
        .env_remove("COHORT_METRICS_CONFIG_DIR")
        .env_remove("CM_LOG")
        .env_remove("CM_LOG_FORMAT")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("HOME", home);
    cmd
}

const ROWS: &str = r#"[
  {"registered_at": "2025-06-23 08:00:00", "first_paid_at": "2025-06-23 10:00:00"},
  {"registered_at": "2025-06-23 09:00:00", "first_paid_at": "2025-06-24 15:00:00"},
  {"registered_at": "2025-06-23 10:00:00", "first_paid_at": null}
]"#;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

// ============================================================================
// Presets and configuration
// ============================================================================

mod config_commands {
    use super::*;

    #[test]
    fn presets_lists_all() {
        let home = TempDir::new().unwrap();
        cm_core(home.path())
            .args(["-f", "summary", "presets"])
            .assert()
            .success()
            .stdout(predicate::str::contains("conversion retention pay_time"));
    }

    #[test]
    fn presets_json_is_array() {
        let home = TempDir::new().unwrap();
        let out = cm_core(home.path())
            .arg("presets")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value.as_array().map(|a| a.len()), Some(3));
    }

    #[test]
    fn check_builtin_preset_ok() {
        let home = TempDir::new().unwrap();
        cm_core(home.path())
            .args(["check", "--preset", "retention"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"status\": \"ok\""));
    }

    #[test]
    fn check_invalid_config_exits_11() {
        let home = TempDir::new().unwrap();
        let cfg = write(
            home.path(),
            "bad.json",
            r#"{
              "schema_version": "1.0.0",
              "fields": {"registration": "registered_at", "target": "first_paid_at"},
              "windows": [{"label": "w", "unit": "hour", "comparison": "within", "bound": -5}]
            }"#,
        );
        cm_core(home.path())
            .args(["check", "--config"])
            .arg(&cfg)
            .assert()
            .code(11)
            .stderr(predicate::str::contains("\"category\""));
    }

    #[test]
    fn missing_config_file_exits_11() {
        let home = TempDir::new().unwrap();
        cm_core(home.path())
            .args(["check", "--config"])
            .arg(home.path().join("nope.json"))
            .assert()
            .code(11);
    }

    #[test]
    fn config_show_defaults_to_conversion() {
        let home = TempDir::new().unwrap();
        cm_core(home.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"first_paid_at\""))
            .stdout(predicate::str::contains("\"D90\""));
    }

    #[test]
    fn config_found_in_xdg_dir() {
        let home = TempDir::new().unwrap();
        let dir = home.path().join("config").join("cohort-metrics");
        fs::create_dir_all(&dir).unwrap();
        write(
            &dir,
            "analysis.json",
            r#"{
              "schema_version": "1.0.0",
              "fields": {"registration": "signup", "target": "paid"}
            }"#,
        );
        cm_core(home.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"signup\""));
    }
}

// ============================================================================
// Analysis runs
// ============================================================================

mod run {
    use super::*;

    #[test]
    fn summary_line_for_three_users() {
        let home = TempDir::new().unwrap();
        let input = write(home.path(), "rows.json", ROWS);
        cm_core(home.path())
            .args(["-f", "summary", "run", "-i"])
            .arg(&input)
            .assert()
            .success()
            .stdout(predicate::str::contains("cohorts=1 records=3 rejected=0"))
            .stdout(predicate::str::contains("D12h=33.3%"))
            .stdout(predicate::str::contains("D7=66.7%"));
    }

    #[test]
    fn json_report_is_deterministic() {
        let home = TempDir::new().unwrap();
        let input = write(home.path(), "rows.json", ROWS);
        let first = cm_core(home.path())
            .args(["run", "-i"])
            .arg(&input)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let second = cm_core(home.path())
            .args(["run", "-i"])
            .arg(&input)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        assert_eq!(first, second);

        let report: serde_json::Value = serde_json::from_slice(&first).unwrap();
        assert_eq!(report["cohort_count"], 1);
        assert_eq!(report["windows"]["rows"][0]["cohort_size"], 3);
    }

    #[test]
    fn jsonl_input_and_markdown_output() {
        let home = TempDir::new().unwrap();
        let input = write(
            home.path(),
            "rows.jsonl",
            "{\"registered_at\": \"2025-06-23 08:00:00\", \"first_paid_at\": \"2025-06-23 10:00:00\"}\n\
             {\"registered_at\": \"2025-06-24 08:00:00\"}\n",
        );
        cm_core(home.path())
            .args(["-f", "md", "run", "-i"])
            .arg(&input)
            .assert()
            .success()
            .stdout(predicate::str::contains("# Cohort metrics report"))
            .stdout(predicate::str::contains("| 2025-06-24 | 1 |"));
    }

    #[test]
    fn output_file_is_written() {
        let home = TempDir::new().unwrap();
        let input = write(home.path(), "rows.json", ROWS);
        let out = home.path().join("report.json");
        cm_core(home.path())
            .args(["run", "-i"])
            .arg(&input)
            .arg("-o")
            .arg(&out)
            .assert()
            .success();
        let written = fs::read_to_string(&out).unwrap();
        assert!(written.contains("\"schema_version\""));
    }

    #[test]
    fn stdin_input() {
        let home = TempDir::new().unwrap();
        cm_core(home.path())
            .args(["-f", "summary", "run", "-i", "-", "--preset", "conversion"])
            .write_stdin(ROWS)
            .assert()
            .success()
            .stdout(predicate::str::contains("records=3"));
    }

    #[test]
    fn empty_input_exits_1() {
        let home = TempDir::new().unwrap();
        let input = write(home.path(), "rows.json", "[]");
        cm_core(home.path())
            .args(["-f", "summary", "run", "-i"])
            .arg(&input)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("cohorts=0"));
    }

    #[test]
    fn unsupported_extension_exits_12() {
        let home = TempDir::new().unwrap();
        let input = write(home.path(), "rows.xlsx", "not really a workbook");
        cm_core(home.path())
            .args(["run", "-i"])
            .arg(&input)
            .assert()
            .code(12);
    }

    #[test]
    fn malformed_json_exits_12() {
        let home = TempDir::new().unwrap();
        let input = write(home.path(), "rows.json", "[{\"registered_at\": ");
        cm_core(home.path())
            .args(["run", "-i"])
            .arg(&input)
            .assert()
            .code(12);
    }

    #[test]
    fn missing_input_exits_12() {
        let home = TempDir::new().unwrap();
        cm_core(home.path())
            .args(["run", "-i"])
            .arg(home.path().join("absent.json"))
            .assert()
            .code(12);
    }

    #[test]
    fn jsonl_logs_carry_run_id() {
        let home = TempDir::new().unwrap();
        let input = write(home.path(), "rows.json", ROWS);
        cm_core(home.path())
            .args(["--log-format", "jsonl", "--log-level", "info", "run", "-i"])
            .arg(&input)
            .assert()
            .success()
            .stderr(predicate::str::contains("\"event\":\"run.finished\""))
            .stderr(predicate::str::contains("\"run_id\":\"run-"));
    }
}

// ============================================================================
// Argument errors
// ============================================================================

mod args {
    use super::*;

    #[test]
    fn unknown_command_exits_10() {
        let home = TempDir::new().unwrap();
        cm_core(home.path())
            .arg("nonexistent-command")
            .assert()
            .code(10)
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn preset_and_config_conflict() {
        let home = TempDir::new().unwrap();
        cm_core(home.path())
            .args(["check", "--preset", "conversion", "--config", "x.json"])
            .assert()
            .code(10);
    }

    #[test]
    fn unknown_preset_exits_10() {
        let home = TempDir::new().unwrap();
        cm_core(home.path())
            .args(["check", "--preset", "churn"])
            .assert()
            .code(10);
    }

    #[test]
    fn help_exits_0() {
        let home = TempDir::new().unwrap();
        cm_core(home.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run"));
    }
}
