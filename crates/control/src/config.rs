use serde::{Deserialize, Serialize};

use electrical::PackConfig;
use simcore::{ConfigError, clamp_logged};

use crate::charger::ChargerType;

/// Everything needed to set up a charging session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    #[serde(flatten)]
    pub pack: PackConfig,
    pub charger_type: ChargerType,
    /// Simulated seconds per wall-clock second
    pub time_acceleration: u32,
    /// Average SoC (percent) at which the session counts as fully charged
    pub end_soc_percent: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            pack: PackConfig::default(),
            charger_type: ChargerType::Fast,
            time_acceleration: 60,
            end_soc_percent: 99.5,
        }
    }
}

impl SessionConfig {
    pub fn new(pack: PackConfig, charger_type: ChargerType) -> Self {
        SessionConfig {
            pack,
            charger_type,
            ..Default::default()
        }
    }

    pub fn with_time_acceleration(mut self, factor: u32) -> Self {
        self.time_acceleration = factor;
        self
    }

    pub fn with_end_soc_percent(mut self, percent: f64) -> Self {
        self.end_soc_percent = percent;
        self
    }

    pub fn validate(&self) -> Result<SessionConfig, ConfigError> {
        let pack = self.pack.validate()?;
        let end_soc_percent = ConfigError::require_finite("end_soc_percent", self.end_soc_percent)?;

        if self.time_acceleration == 0 {
            log::warn!("time_acceleration = 0 is out of range, clamped to 1");
        }

        Ok(SessionConfig {
            pack,
            charger_type: self.charger_type,
            time_acceleration: self.time_acceleration.max(1),
            end_soc_percent: clamp_logged("end_soc_percent", end_soc_percent, 1.0, 100.0),
        })
    }
}
