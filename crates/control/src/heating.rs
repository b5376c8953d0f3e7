//! Battery heater policy
//!
//! Decides once per tick whether the pack heater should run. Kept apart from
//! the current limit evaluation so that computing a limit never changes
//! pack state.

use electrical::Pack;
use electrical::pack::{HEATER_OFF_ABOVE_C, HEATER_ON_BELOW_C};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatingController {
    pub on_below_c: f64,
    pub off_above_c: f64,
}

impl Default for HeatingController {
    fn default() -> Self {
        HeatingController {
            on_below_c: HEATER_ON_BELOW_C,
            off_above_c: HEATER_OFF_ABOVE_C,
        }
    }
}

impl HeatingController {
    /// Heater state wanted for the given average temperature and current state.
    pub fn desired(&self, heating_allowed: bool, currently_on: bool, average_temperature_c: f64) -> bool {
        if !heating_allowed {
            return false;
        }
        if currently_on {
            average_temperature_c < self.off_above_c
        } else {
            average_temperature_c < self.on_below_c
        }
    }

    /// Applies the policy to `pack`. Returns the new heater state if it changed.
    pub fn update(&self, pack: &mut Pack) -> Option<bool> {
        let on = pack.is_heating();
        let average = pack.average_temperature();
        let wanted = self.desired(pack.config().battery_heating_enabled, on, average);
        if wanted == on {
            return None;
        }
        pack.set_heating(wanted);
        log::info!(
            "battery heater {} at {:.1} °C",
            if wanted { "on" } else { "off" },
            average
        );
        Some(wanted)
    }
}
