//! Human-readable error descriptions and structured JSON error formatting.

use tank_core::error::{BuildError, TankError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No range sensor was provided to the controller.\nLikely causes: The HC-SR04 failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor is created successfully and passed via with_sensor(...).".to_string()
            }
            BuildError::MissingRelay => {
                "What happened: No pump relay was provided to the controller.\nLikely causes: The relay output failed to initialize or was not wired into the builder.\nHow to fix: Ensure the relay is created successfully and passed via with_relay(...).".to_string()
            }
            BuildError::MissingStore => {
                "What happened: No remote store was provided to the controller.\nLikely causes: The remote link was not wired into the builder.\nHow to fix: Pass a store via with_store(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See README for a sample."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TankError>() {
        return match te {
            TankError::NoEcho => "What happened: No echo within the configured timeout.\nLikely causes: Trigger/echo pins swapped or miswired, sensor unpowered, or nothing within range.\nHow to fix: Verify [pins] trigger/echo and 5V/GND, and consider increasing timeouts.echo_ms in the config.".to_string(),
            TankError::Hardware(m) | TankError::HardwareFault(m) => format!(
                "What happened: Hardware failure ({m}).\nLikely causes: Relay or sensor pin not accessible, or a wiring fault.\nHow to fix: Check [pins] and wiring; ensure the process has permission to access GPIO."
            ),
            TankError::Remote(m) => format!(
                "What happened: Remote store unavailable ({m}).\nLikely causes: Network down or the store rejected the write.\nHow to fix: Check connectivity; the controller keeps running without the remote link."
            ),
            TankError::InvalidOverride(m) => format!(
                "What happened: Remote override rejected ({m}).\nLikely causes: A non-integer level, or an empty level not beyond the full level.\nHow to fix: Write integer levels with tankEmptyLevel > tankFullLevel, both within 0..=10000 cm."
            ),
            TankError::Config(m) => format!(
                "What happened: Calibration is invalid ({m}).\nLikely causes: empty_level not greater than full_level, or a corrupt persisted calibration.\nHow to fix: Fix [calibration] in the config or delete the persist_file."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open hc-sr04") || lower.contains("open relay pin") {
        return "What happened: Failed to initialize hardware pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("invalid configuration")
        || lower.contains("parse config")
        || lower.contains("must be")
    {
        let cause = err
            .chain()
            .last()
            .map(ToString::to_string)
            .unwrap_or_default();
        return format!(
            "What happened: Configuration is invalid or incomplete ({cause}).\nLikely causes: Missing [pins] (trigger, echo, relay), or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes by failure kind; anything unclassified returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<TankError>() {
        Some(TankError::NoEcho) => 3,
        Some(TankError::Hardware(_) | TankError::HardwareFault(_)) => 4,
        Some(TankError::Config(_)) => 2,
        _ => 1,
    }
}

/// Stable reason name for the JSON `reason` field.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<TankError>() {
        Some(TankError::NoEcho) => "NoEcho",
        Some(TankError::Hardware(_) | TankError::HardwareFault(_)) => "Hardware",
        Some(TankError::Remote(_)) => "Remote",
        Some(TankError::InvalidOverride(_)) => "InvalidOverride",
        Some(TankError::Config(_)) => "Config",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_echo_is_explained_through_context() {
        let err = eyre::Report::new(TankError::NoEcho).wrap_err("range once");
        assert!(humanize(&err).starts_with("What happened: No echo"));
        assert_eq!(exit_code_for_error(&err), 3);
        assert_eq!(reason_name(&err), "NoEcho");
    }

    #[test]
    fn relay_failure_has_its_own_code() {
        let err = eyre::Report::new(TankError::Hardware("coil open".into()));
        assert_eq!(exit_code_for_error(&err), 4);
        assert!(humanize(&err).contains("coil open"));
    }

    #[test]
    fn config_errors_mention_the_cause() {
        let err = eyre::eyre!("filter.window must be in [1, 64]");
        let text = humanize(&err);
        assert!(text.contains("Configuration is invalid"));
        assert!(text.contains("filter.window"));
        assert_eq!(exit_code_for_error(&err), 1);
    }

    #[test]
    fn json_error_is_an_object_with_reason() {
        let err = eyre::Report::new(BuildError::MissingRelay);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Build");
        assert_eq!(v["exit_code"], 2);
        assert!(v["message"].as_str().unwrap().contains("pump relay"));
    }
}
