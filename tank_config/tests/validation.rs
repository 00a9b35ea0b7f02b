use rstest::rstest;
use tank_config::{PersistedCalibration, load_toml};

const PINS: &str = r#"
[pins]
trigger = 5
echo = 4
relay = 16
"#;

fn with_pins(extra: &str) -> String {
    format!("{PINS}\n{extra}")
}

#[test]
fn minimal_config_gets_reference_defaults() {
    let cfg = load_toml(PINS).expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.filter.window, 5);
    assert_eq!(cfg.control.cycle_ms, 100);
    assert_eq!(cfg.control.dwell_ms, 3000);
    assert_eq!(cfg.control.start_below_percent, 100);
    assert_eq!(cfg.calibration.empty_level, 78);
    assert_eq!(cfg.calibration.full_level, 7);
    assert_eq!(cfg.remote.base_path, "/Test");
    assert!(cfg.relay.active_low);
    assert!(cfg.calibration.persist_file.is_none());
}

#[test]
fn missing_pins_is_a_parse_error() {
    assert!(load_toml("[filter]\nwindow = 5\n").is_err());
}

#[rstest]
#[case("[filter]\nwindow = 0", "filter.window")]
#[case("[filter]\nwindow = 65", "filter.window")]
#[case("[control]\ncycle_ms = 0", "control.cycle_ms")]
#[case("[control]\nstart_below_percent = 0", "start_below_percent")]
#[case("[control]\nstart_below_percent = 101", "start_below_percent")]
#[case("[calibration]\nempty_level = 7\nfull_level = 78", "must be greater than")]
#[case("[calibration]\nempty_level = 20\nfull_level = 20", "must be greater than")]
#[case("[calibration]\nempty_level = 20000", "calibration.empty_level")]
#[case("[calibration]\nfull_level = -1", "calibration.full_level")]
#[case("[calibration]\npersist_file = \"  \"", "persist_file")]
#[case("[timeouts]\necho_ms = 0", "timeouts.echo_ms")]
#[case("[timeouts]\nremote_ms = 0", "timeouts.remote_ms")]
#[case("[remote]\nbase_path = \"Test\"", "remote.base_path")]
#[case("[remote]\nbase_path = \"/Test/\"", "remote.base_path")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
fn rejects_invalid_sections(#[case] section: &str, #[case] needle: &str) {
    let cfg = load_toml(&with_pins(section)).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "error {err} does not mention {needle}"
    );
}

#[test]
fn rejects_shared_pins() {
    let cfg = load_toml("[pins]\ntrigger = 5\necho = 5\nrelay = 16\n").expect("parse TOML");
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_full_config() {
    let toml = with_pins(
        r#"
[filter]
window = 8

[control]
cycle_ms = 250
dwell_ms = 5000
start_below_percent = 80
override_hold_ms = 10000
max_echo_misses = 0

[calibration]
empty_level = 120
full_level = 15
persist_file = "/var/lib/tank/calibration.toml"

[timeouts]
echo_ms = 40
remote_ms = 2000

[remote]
base_path = "/Tanks/roof"

[relay]
active_low = false

[logging]
file = "/tmp/tank.log"
level = "debug"
rotation = "daily"
"#,
    );
    let cfg = load_toml(&toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.control.start_below_percent, 80);
    assert!(!cfg.relay.active_low);
}

#[test]
fn persisted_calibration_round_trips_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cal.toml");
    assert_eq!(PersistedCalibration::load(&path).unwrap(), None);

    let cal = PersistedCalibration {
        empty_level: 90,
        full_level: 10,
    };
    std::fs::write(&path, cal.to_toml().unwrap()).unwrap();
    assert_eq!(PersistedCalibration::load(&path).unwrap(), Some(cal));
}

#[test]
fn persisted_calibration_is_validated_on_load() {
    let err = PersistedCalibration::from_toml("empty_level = 5\nfull_level = 9\n").unwrap_err();
    assert!(format!("{err}").contains("must be greater than"));
}

#[test]
fn shipped_config_is_valid() {
    let cfg = load_toml(include_str!("../../etc/tank_config.toml")).expect("parse shipped config");
    cfg.validate().expect("shipped config validates");
    assert_eq!(cfg.logging.rotation.as_deref(), Some("never"));
}
