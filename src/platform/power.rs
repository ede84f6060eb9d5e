use battery::units::ratio::ratio;
use battery::State;

use crate::error::{GuardError, Result};

/// Fallback when no battery can be read: full and plugged in
pub const BATTERY_FALLBACK: (f64, bool) = (1.0, true);

/// Read `(level 0-1, is_charging)` from the first battery.
///
/// Machines without a battery report the fallback.
pub fn read_battery() -> (f64, bool) {
    match probe_battery() {
        Ok(Some(reading)) => reading,
        Ok(None) => BATTERY_FALLBACK,
        Err(e) => {
            log::warn!("Battery probe failed, assuming external power: {}", e);
            BATTERY_FALLBACK
        }
    }
}

fn probe_battery() -> Result<Option<(f64, bool)>> {
    let manager = battery::Manager::new()
        .map_err(|e| GuardError::probe(format!("Failed to open battery manager: {}", e)))?;

    let mut batteries = manager
        .batteries()
        .map_err(|e| GuardError::probe(format!("Failed to list batteries: {}", e)))?;

    let Some(first) = batteries.next() else {
        return Ok(None);
    };

    let battery =
        first.map_err(|e| GuardError::probe(format!("Failed to read battery: {}", e)))?;

    let level = f64::from(battery.state_of_charge().get::<ratio>()).clamp(0.0, 1.0);

    // Full on AC is reported as "full", not "charging"
    let is_charging = matches!(battery.state(), State::Charging | State::Full);

    Ok(Some((level, is_charging)))
}
