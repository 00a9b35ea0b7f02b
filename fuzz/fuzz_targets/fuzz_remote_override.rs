#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use tank_core::inbox::{EMPTY_LEVEL, FULL_LEVEL, MOTOR_STAT};
use tank_core::{Calibration, RemoteOverride};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    path: u8,
    value: &'a str,
    level: i32,
}

fuzz_target!(|input: Input<'_>| {
    let path = match input.path % 4 {
        0 => MOTOR_STAT,
        1 => EMPTY_LEVEL,
        2 => FULL_LEVEL,
        _ => "/percent",
    };
    let Ok(Some(o)) = RemoteOverride::parse(path, input.value) else {
        return;
    };
    let base = Calibration::default();
    let candidate = match o {
        RemoteOverride::Stop => return,
        RemoteOverride::EmptyLevel(v) => base.with_empty(v),
        RemoteOverride::FullLevel(v) => base.with_full(v),
    };
    if let Ok(cal) = candidate {
        let p = cal.percent(input.level);
        assert!(p <= 100);
    }
});
