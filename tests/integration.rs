//! End-to-end integration tests for the conformance harness
//!
//! These tests run the built `conform` binary against the `mock_engine`
//! binary, which speaks the engine's line protocol with a tiny built-in
//! dictionary, and check exit codes, console output and saved reports.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Test context with an isolated temp directory
struct TestContext {
    /// Temporary directory for this test (removed on drop)
    temp_dir: tempfile::TempDir,
    /// Config directory (XDG_CONFIG_HOME), kept empty so user config never leaks in
    config_dir: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_dir = temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");
        Self {
            temp_dir,
            config_dir,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Write a fixture file and return its path
    fn fixture(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).expect("Failed to write fixture");
        path
    }

    /// Run the harness with an explicit engine and report path
    fn run(&self, fixture: &Path, report: &Path, extra: &[&str]) -> ConformOutput {
        let mut args: Vec<String> = vec![
            "run".into(),
            fixture.display().to_string(),
            "--program".into(),
            mock_engine().display().to_string(),
            "--report".into(),
            report.display().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        self.conform(&args.iter().map(String::as_str).collect::<Vec<_>>())
    }

    fn conform(&self, args: &[&str]) -> ConformOutput {
        let output = Command::new(env!("CARGO_BIN_EXE_conform"))
            .args(args)
            .current_dir(self.temp_dir.path())
            .env("XDG_CONFIG_HOME", &self.config_dir)
            .env("NO_COLOR", "1")
            .output()
            .expect("Failed to run conform");

        ConformOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        }
    }
}

/// Output from a harness invocation
#[derive(Debug)]
struct ConformOutput {
    stdout: String,
    stderr: String,
    code: Option<i32>,
}

fn mock_engine() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mock_engine"))
}

fn load_report(path: &Path) -> Value {
    let content = fs::read_to_string(path).expect("Failed to read report");
    serde_json::from_str(&content).expect("Report is not JSON")
}

fn verdict<'a>(report: &'a Value, id: &str) -> &'a Value {
    report["verdicts"]
        .as_array()
        .expect("verdicts array")
        .iter()
        .find(|v| v["id"] == id)
        .unwrap_or_else(|| panic!("no verdict for {}", id))
}

const BASIC: &str = r#"
- id: basic-1
  description: "Basic: 你好"
  rounds:
    - input: nihao
      selections: [0]
      expect: { exact: "你好" }
"#;

const PREFIXED: &str = r#"
- id: 2
  description: "Prefix + 2 rounds"
  prefix: "我认为"
  rounds:
    - input: zhongguorenmin
      selections: [0]
      expect: { contains: "中国人民" }
    - input: henqinlao
      selections: [0]
      expect: { contains: "中国人民很勤劳" }
"#;

const PREFIXED_WRONG_CHOICE: &str = r#"
- id: 2
  description: "Prefix + 2 rounds"
  prefix: "我认为"
  rounds:
    - input: zhongguorenmin
      selections: [0]
      expect: { contains: "中国人民" }
    - input: henqinlao
      selections: [1]
      expect: { contains: "中国人民很勤劳" }
"#;

// ============== Tests ==============

#[test]
fn test_single_round_exact_passes() {
    let ctx = TestContext::new();
    let fixture = ctx.fixture("basic.yaml", BASIC);
    let report_path = ctx.path("report.json");

    let out = ctx.run(&fixture, &report_path, &[]);
    assert_eq!(out.code, Some(0), "stdout: {}\nstderr: {}", out.stdout, out.stderr);
    assert!(out.stdout.contains("✓ Test #basic-1"), "{}", out.stdout);
    assert!(out.stdout.contains("All tests passed!"));

    let report = load_report(&report_path);
    assert_eq!(report["totals"]["passed"], 1);
    assert_eq!(report["totals"]["total"], 1);
    let v = verdict(&report, "basic-1");
    assert_eq!(v["status"], "passed");
    assert_eq!(v["outcomes"][0]["actual"], "你好");
    assert_eq!(v["exit"]["kind"], "exited");
    assert_eq!(v["exit"]["code"], 0);
}

#[test]
fn test_prefix_state_carries_across_rounds() {
    let ctx = TestContext::new();
    let fixture = ctx.fixture("prefixed.yaml", PREFIXED);
    let report_path = ctx.path("report.json");

    let out = ctx.run(&fixture, &report_path, &[]);
    assert_eq!(out.code, Some(0), "stdout: {}\nstderr: {}", out.stdout, out.stderr);

    let report = load_report(&report_path);
    let v = verdict(&report, "2");
    assert_eq!(v["status"], "passed");
    assert_eq!(v["prefix"], "我认为");
    assert_eq!(v["outcomes"][1]["actual"], "我认为中国人民很勤劳");
}

#[test]
fn test_wrong_second_round_fails_with_diagnostics() {
    let ctx = TestContext::new();
    let fixture = ctx.fixture("wrong.yaml", PREFIXED_WRONG_CHOICE);
    let report_path = ctx.path("report.json");

    let out = ctx.run(&fixture, &report_path, &[]);
    assert_eq!(out.code, Some(1));
    assert!(out.stdout.contains("✗ Test #2"), "{}", out.stdout);
    assert!(out.stdout.contains("round(s) [2] failed"));
    assert!(out.stdout.contains("got '我认为中国人民很'"), "{}", out.stdout);

    let report = load_report(&report_path);
    let v = verdict(&report, "2");
    assert_eq!(v["status"], "failed");
    assert_eq!(v["outcomes"][0]["matched"], true);
    assert_eq!(v["outcomes"][1]["matched"], false);
    assert_eq!(v["outcomes"][1]["failure"], "mismatch");
}

#[test]
fn test_hanging_engine_times_out() {
    let ctx = TestContext::new();
    let fixture = ctx.fixture(
        "hang.yaml",
        r#"
- id: hang
  description: engine stops responding
  rounds:
    - input: nihao
      selections: [0]
      expect: { exact: "你好" }
    - input: hang
      selections: [0]
"#,
    );
    let report_path = ctx.path("report.json");

    let started = Instant::now();
    let out = ctx.run(&fixture, &report_path, &["--timeout", "1"]);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(out.code, Some(1));
    assert!(out.stdout.contains("E Test #hang"), "{}", out.stdout);

    let report = load_report(&report_path);
    let v = verdict(&report, "hang");
    assert_eq!(v["status"], "error");
    assert_eq!(v["error"], "timeout");
    assert_eq!(v["exit"]["kind"], "killed_on_timeout");
    // Partial output is kept for diagnosis
    assert_eq!(v["outcomes"][0]["actual"], "你好");
    assert_eq!(report["totals"]["error"], 1);
}

#[test]
fn test_engine_without_commits_fails() {
    let ctx = TestContext::new();
    let fixture = ctx.fixture(
        "crash.yaml",
        r#"
- id: crash
  description: engine dies before committing
  rounds:
    - input: crash
      selections: [0]
"#,
    );
    let report_path = ctx.path("report.json");

    let out = ctx.run(&fixture, &report_path, &[]);
    assert_eq!(out.code, Some(1));

    let report = load_report(&report_path);
    let v = verdict(&report, "crash");
    assert_eq!(v["status"], "failed");
    assert_eq!(v["reason"], "expected 1 results, got 0");
    assert_eq!(v["exit"]["code"], 3);
    assert_eq!(v["outcomes"][0]["failure"], "missing result");
}

#[test]
fn test_over_long_composition_passes_with_note() {
    let ctx = TestContext::new();
    let fixture = ctx.fixture(
        "long.yaml",
        r#"
- id: long
  description: over-long sentence
  prefix: ""
  over_long: true
  rounds:
    - input: changchangdejuzi
      selections: [0]
      expect: { exact: "这是一个非常非常长的句子用来测试" }
"#,
    );
    let report_path = ctx.path("report.json");

    let out = ctx.run(&fixture, &report_path, &[]);
    assert_eq!(out.code, Some(0), "stdout: {}\nstderr: {}", out.stdout, out.stderr);
    assert!(out.stdout.contains("Note: accepted despite exceeding phrase length bound"));

    let report = load_report(&report_path);
    assert_eq!(verdict(&report, "long")["too_long_accepted"], true);
    assert_eq!(report["totals"]["too_long_accepted"], 1);
}

#[test]
fn test_missing_engine_does_not_stop_batch() {
    let ctx = TestContext::new();
    let fixture = ctx.fixture("basic.yaml", BASIC);
    let report_path = ctx.path("report.json");

    let out = ctx.conform(&[
        "run",
        fixture.to_str().unwrap(),
        "--program",
        "/nonexistent/test_pinyin",
        "--report",
        report_path.to_str().unwrap(),
    ]);
    assert_eq!(out.code, Some(1));

    let report = load_report(&report_path);
    let v = verdict(&report, "basic-1");
    assert_eq!(v["status"], "error");
    assert_eq!(v["error"], "launch_failure");
    assert_eq!(v["exit"]["kind"], "not_started");
}

#[test]
fn test_invalid_fixture_is_command_error() {
    let ctx = TestContext::new();
    let fixture = ctx.fixture(
        "bad.yaml",
        r#"
- id: bad
  description: empty input
  rounds:
    - input: ""
      selections: [0]
"#,
    );
    let report_path = ctx.path("report.json");

    let out = ctx.run(&fixture, &report_path, &[]);
    assert_eq!(out.code, Some(2));
    assert!(out.stderr.contains("Error:"), "{}", out.stderr);
    assert!(!report_path.exists());
}

#[test]
fn test_check_validates_without_running() {
    let ctx = TestContext::new();
    let basic = ctx.fixture("basic.yaml", BASIC);
    let prefixed = ctx.fixture("prefixed.yaml", PREFIXED);

    let out = ctx.conform(&["check", basic.to_str().unwrap(), prefixed.to_str().unwrap()]);
    assert_eq!(out.code, Some(0), "{}", out.stderr);
    assert!(out.stdout.contains("2 scenario(s) in 2 file(s) are valid"));
    assert!(out.stdout.contains("1-round: 1"));
    assert!(out.stdout.contains("2-round: 1"));
    assert!(out.stdout.contains("With prefix: 1"));
}

#[test]
fn test_duplicate_ids_across_files_rejected() {
    let ctx = TestContext::new();
    let first = ctx.fixture("a.yaml", BASIC);
    let second = ctx.fixture("b.yaml", BASIC);

    let out = ctx.conform(&["check", first.to_str().unwrap(), second.to_str().unwrap()]);
    assert_eq!(out.code, Some(2));
    assert!(out.stderr.contains("duplicate scenario id 'basic-1'"), "{}", out.stderr);
}

#[test]
fn test_legacy_single_shot_fixture() {
    let ctx = TestContext::new();
    let fixture = ctx.fixture(
        "legacy.json",
        r#"[
  {"id": 1, "prefix": "", "pinyin": "nihao", "expected_contains": "你好", "description": "legacy"},
  {"id": 2, "prefix": "今天", "pinyin": "tianqi", "expected_contains": null, "description": "liveness"}
]"#,
    );
    let report_path = ctx.path("report.json");

    let out = ctx.run(&fixture, &report_path, &[]);
    assert_eq!(out.code, Some(0), "stdout: {}\nstderr: {}", out.stdout, out.stderr);

    let report = load_report(&report_path);
    assert_eq!(verdict(&report, "1")["outcomes"][0]["policy"], "contains");
    assert_eq!(verdict(&report, "2")["outcomes"][0]["policy"], "liveness");
    assert_eq!(verdict(&report, "2")["outcomes"][0]["actual"], "今天天气");
}

#[test]
fn test_parallel_jobs_keep_fixture_order() {
    let ctx = TestContext::new();
    let mut fixture = String::new();
    for (i, (pinyin, word)) in [
        ("nihao", "你好"),
        ("women", "我们"),
        ("beijing", "北京"),
        ("zaijian", "再见"),
        ("jintian", "今天"),
    ]
    .iter()
    .enumerate()
    {
        fixture.push_str(&format!(
            "- id: {}\n  description: word {}\n  rounds:\n    - input: {}\n      selections: [0]\n      expect: {{ exact: \"{}\" }}\n",
            i + 1,
            i + 1,
            pinyin,
            word
        ));
    }
    let fixture = ctx.fixture("many.yaml", &fixture);
    let report_path = ctx.path("report.json");

    let out = ctx.run(&fixture, &report_path, &["--jobs", "3"]);
    assert_eq!(out.code, Some(0), "stdout: {}\nstderr: {}", out.stdout, out.stderr);

    let report = load_report(&report_path);
    let ids: Vec<&str> = report["verdicts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
}

#[test]
fn test_json_output_is_the_report() {
    let ctx = TestContext::new();
    let fixture = ctx.fixture("basic.yaml", BASIC);
    let report_path = ctx.path("report.json");

    let out = ctx.run(&fixture, &report_path, &["--json"]);
    assert_eq!(out.code, Some(0));

    let printed: Value = serde_json::from_str(&out.stdout).expect("stdout is not JSON");
    assert_eq!(printed["totals"]["passed"], 1);
    assert_eq!(printed, load_report(&report_path));
}

#[test]
fn test_summary_of_saved_report() {
    let ctx = TestContext::new();
    let fixture = ctx.fixture("wrong.yaml", PREFIXED_WRONG_CHOICE);
    let report_path = ctx.path("report.json");
    ctx.run(&fixture, &report_path, &[]);

    let out = ctx.conform(&["summary", report_path.to_str().unwrap()]);
    assert_eq!(out.code, Some(1));
    assert!(out.stdout.contains("Total:    1"));
    assert!(out.stdout.contains("Failed/Error Tests (1):"));
    assert!(out.stdout.contains("With prefix: 0/1 passed (0.0%)"));
}

#[test]
fn test_diff_reports_regressions() {
    let ctx = TestContext::new();
    let good = ctx.fixture("good.yaml", PREFIXED);
    let bad = ctx.fixture("bad.yaml", PREFIXED_WRONG_CHOICE);
    let baseline = ctx.path("baseline.json");
    let current = ctx.path("current.json");

    assert_eq!(ctx.run(&good, &baseline, &[]).code, Some(0));
    assert_eq!(ctx.run(&bad, &current, &[]).code, Some(1));

    let out = ctx.conform(&["diff", baseline.to_str().unwrap(), current.to_str().unwrap()]);
    assert_eq!(out.code, Some(1));
    assert!(out.stdout.contains("Regressions (1):"), "{}", out.stdout);
    assert!(out.stdout.contains("#2: passed -> failed"));

    let out = ctx.conform(&["diff", current.to_str().unwrap(), baseline.to_str().unwrap()]);
    assert_eq!(out.code, Some(0));
    assert!(out.stdout.contains("Fixed (1):"));

    let out = ctx.conform(&[
        "diff",
        baseline.to_str().unwrap(),
        baseline.to_str().unwrap(),
        "--json",
    ]);
    assert_eq!(out.code, Some(0));
    let diff: Value = serde_json::from_str(&out.stdout).unwrap();
    assert_eq!(diff["regressions"].as_array().unwrap().len(), 0);
}

#[test]
fn test_config_file_sets_engine() {
    let ctx = TestContext::new();
    let fixture = ctx.fixture("basic.yaml", BASIC);
    let config = ctx.fixture(
        "conform.toml",
        &format!(
            "[target]\nprogram = {:?}\n\n[report]\npath = \"from-config.json\"\n",
            mock_engine().display().to_string()
        ),
    );

    let out = ctx.conform(&[
        "--config",
        config.to_str().unwrap(),
        "run",
        fixture.to_str().unwrap(),
    ]);
    assert_eq!(out.code, Some(0), "stdout: {}\nstderr: {}", out.stdout, out.stderr);
    assert!(ctx.path("from-config.json").exists());
}
