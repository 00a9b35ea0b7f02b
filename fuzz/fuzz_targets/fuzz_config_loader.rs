#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validate arbitrary TOML; errors are fine, panics are not.
    if let Ok(cfg) = tank_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // a validated calibration must always map to a core calibration
            let cal = tank_core::Calibration::try_from(&cfg.calibration);
            assert!(cal.is_ok(), "validated config rejected by core: {cal:?}");
        }
    }
    let _ = tank_config::PersistedCalibration::from_toml(data);
});
