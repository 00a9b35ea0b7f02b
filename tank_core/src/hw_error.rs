//! Maps `Box<dyn Error>` from trait boundaries to typed `TankError`.
//!
//! The traits in `tank_traits` use `Box<dyn Error + Send + Sync>`; this module converts
//! those to our typed error enum, with an optional feature-gated path for
//! `tank_hardware::HwError` downcasting.

use crate::error::TankError;

/// Map an echo sensor error to a typed `TankError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> TankError {
    #[cfg(feature = "hardware-errors")]
    {
        use tank_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::EchoTimeout | HwError::EchoStuck => TankError::NoEcho,
                HwError::RemoteUnavailable(s) => TankError::Remote(s.clone()),
                other => TankError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        TankError::NoEcho
    } else {
        TankError::Hardware(s)
    }
}

/// Map a relay error. A relay that fails to switch is always a hardware fault, never a
/// missed echo, whatever its message says.
pub fn map_relay_error(e: &(dyn std::error::Error + 'static)) -> TankError {
    #[cfg(feature = "hardware-errors")]
    {
        use tank_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return TankError::HardwareFault(hw.to_string());
        }
    }
    TankError::Hardware(e.to_string())
}

/// Map a remote store error. Every failure on this boundary is a `Remote` error,
/// timeouts included.
pub fn map_remote_error(e: &(dyn std::error::Error + 'static)) -> TankError {
    match map_hw_error(e) {
        TankError::Remote(s) => TankError::Remote(s),
        _ => TankError::Remote(e.to_string()),
    }
}
