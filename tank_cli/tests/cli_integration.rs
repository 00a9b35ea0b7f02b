use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid TOML config for sim mode, with a fast cycle so runs finish quickly
fn write_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let toml = format!(
        r#"
[pins]
# pins are unused in sim backend but must be present
trigger = 23
echo = 24
relay = 17

[filter]
window = 1

[control]
cycle_ms = 5
dwell_ms = 20
override_hold_ms = 20

{extra}
"#
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn tank_cmd(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("tank_cli").unwrap();
    cmd.arg("--log-level").arg("error").arg("--config").arg(cfg);
    cmd
}

fn json_line(stdout: &[u8], key: &str) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout
        .lines()
        .find(|l| l.contains(&format!("\"{key}\"")))
        .unwrap_or_else(|| panic!("no JSON line with {key}; stdout was: {stdout}"));
    serde_json::from_str(line).expect("valid JSON")
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--cycles", "5"], 0, "run complete: 5 cycles, 1 starts", "stdout")]
#[case(&["self-check"], 0, "self-check ok: surface at 60 cm", "stdout")]
#[case(&["run", "--remote-set", "percent=5"], 2, "unknown remote path", "stderr")]
#[case(&["run", "--remote-set", "tankFullLevel"], 2, "PATH=VALUE", "stderr")]
#[case(&["run", "--cycles", "nope"], 2, "invalid value", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let mut cmd = tank_cmd(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case("[filter]\nwindow = 0\n", "filter.window")]
#[case("[calibration]\nempty_level = 5\nfull_level = 7\n", "empty_level")]
#[case("[remote]\nbase_path = \"Test\"\n", "remote.base_path")]
fn invalid_config_is_explained(#[case] body: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(
        &path,
        format!("[pins]\ntrigger = 23\necho = 24\nrelay = 17\n{body}"),
    )
    .unwrap();

    tank_cmd(&path)
        .arg("self-check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains(needle));
}

#[rstest]
fn missing_pins_fail_to_parse() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, "[filter]\nwindow = 3\n").unwrap();

    tank_cmd(&path)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("pins"));
}

#[rstest]
fn missing_echo_bubbles_to_cli() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    tank_cmd(&cfg)
        .arg("self-check")
        .env("TANK_TEST_NO_ECHO", "1")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("What happened: No echo"));
}

#[rstest]
fn missing_echo_is_not_fatal_for_a_run() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let out = tank_cmd(&cfg)
        .arg("--json")
        .args(["run", "--cycles", "4"])
        .env("TANK_TEST_NO_ECHO", "1")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "cycles");
    assert_eq!(v["cycles"], 4);
    assert_eq!(v["echo_misses"], 4);
    assert_eq!(v["starts"], 0);
    assert!(v["last_level"].is_null());
}

/// Validate the JSON summary schema for a run.
#[rstest]
fn json_summary_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let out = tank_cmd(&cfg)
        .arg("--json")
        .args(["run", "--cycles", "3"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "cycles");

    assert!(v.get("timestamp").and_then(|x| x.as_i64()).is_some());
    for key in [
        "cycles",
        "starts",
        "stops",
        "remote_stops",
        "echo_misses",
        "publish_failures",
        "overrides_rejected",
    ] {
        assert!(
            v.get(key).and_then(|x| x.as_u64()).is_some(),
            "{key} should be an unsigned number"
        );
    }
    assert_eq!(v["cycles"], 3);
    assert_eq!(v["final_state"], "off");
    let level = v["last_level"].as_i64().expect("level after a clean run");
    assert!((55..=60).contains(&level), "level {level}");
    let percent = v["last_percent"].as_u64().expect("percent");
    assert!(percent <= 100);
}

#[rstest]
fn remote_failure_is_counted_not_fatal() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let out = tank_cmd(&cfg)
        .arg("--json")
        .args(["run", "--cycles", "2"])
        .env("TANK_TEST_REMOTE_FAIL", "1")
        .env("TANK_TEST_STREAM_TIMEOUT", "1")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "cycles");
    // three snapshot values per cycle
    assert_eq!(v["publish_failures"], 6);
}

#[rstest]
fn invalid_remote_level_is_rejected() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let out = tank_cmd(&cfg)
        .arg("--json")
        .args(["run", "--cycles", "2", "--remote-set", "tankFullLevel=90"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "cycles");
    assert_eq!(v["overrides_rejected"], 1);
}

#[rstest]
fn remote_stop_is_counted() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let out = tank_cmd(&cfg)
        .arg("--json")
        .args(["run", "--cycles", "2", "--remote-set", "motorStat=false"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "cycles");
    assert_eq!(v["remote_stops"], 1);
}

#[rstest]
fn accepted_override_is_persisted_and_reused() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("state").join("calibration.toml");
    let extra = format!(
        "[calibration]\npersist_file = {:?}\n",
        state.to_string_lossy()
    );
    let cfg = write_config(&dir, &extra);

    tank_cmd(&cfg)
        .args(["run", "--cycles", "2", "--remote-set", "tankEmptyLevel=90"])
        .assert()
        .success();
    let saved = fs::read_to_string(&state).unwrap();
    assert!(saved.contains("empty_level = 90"), "saved: {saved}");

    // (90 - 60) * 100 / 83 = 36
    tank_cmd(&cfg)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("(36%)"));
}

#[rstest]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let out = tank_cmd(&cfg)
        .arg("--json")
        .arg("self-check")
        .env("TANK_TEST_NO_ECHO", "1")
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "reason");
    assert_eq!(v["reason"], "NoEcho");
    assert!(v["message"].as_str().unwrap().contains("No echo"));
}
