//! Pack configuration
//!
//! Values a user can adjust while the simulator is live are clamped into a
//! safe range with a warning. Values with no meaningful fallback (capacity,
//! C-rate, car power cap) are rejected.

use serde::{Deserialize, Serialize};
use simcore::{ConfigError, clamp_logged};

use crate::cell::{CELL_CAPACITY_AH, CELL_NOMINAL_VOLTAGE};

pub const MIN_CELLS_IN_PARALLEL: usize = 1;
pub const MAX_CELLS_IN_PARALLEL: usize = 100;

/// Cooling coefficient (1/h) contributed by each kW of cooling power.
pub const COOLING_COEFFICIENT_PER_KW: f64 = 0.5;

const MIN_TEMPERATURE_C: f64 = -40.0;
const MAX_TEMPERATURE_C: f64 = 80.0;

/// Nominal pack architecture. Fixes the number of cells in series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SystemVoltage {
    #[default]
    V400,
    V800,
}

impl SystemVoltage {
    pub fn cells_in_series(self) -> usize {
        match self {
            SystemVoltage::V400 => 108,
            SystemVoltage::V800 => 216,
        }
    }

    pub fn volts(self) -> u32 {
        match self {
            SystemVoltage::V400 => 400,
            SystemVoltage::V800 => 800,
        }
    }
}

impl TryFrom<u32> for SystemVoltage {
    type Error = ConfigError;

    fn try_from(volts: u32) -> Result<Self, Self::Error> {
        match volts {
            400 => Ok(SystemVoltage::V400),
            800 => Ok(SystemVoltage::V800),
            other => Err(ConfigError::UnsupportedSystemVoltage(other)),
        }
    }
}

impl From<SystemVoltage> for u32 {
    fn from(voltage: SystemVoltage) -> Self {
        voltage.volts()
    }
}

/// Construction-time parameters of a [`Pack`](crate::Pack).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    pub system_voltage: SystemVoltage,
    /// Target energy content; determines the number of parallel strings
    pub battery_capacity_kwh: f64,
    /// Maximum charge current as a multiple of pack capacity
    pub max_c_rate: f64,
    /// Cooling loop capacity (kW)
    pub cooling_power_kw: f64,
    /// Vehicle-side charge power cap, if any
    pub max_car_power_kw: Option<f64>,
    pub initial_temperature_c: f64,
    pub ambient_temperature_c: f64,
    pub battery_heating_enabled: bool,
    /// Initial state of charge of every cell (0..1)
    pub initial_soc: f64,
    /// Seed for per-cell manufacturing spread and thermal jitter
    pub seed: u64,
    pub temperature_jitter: bool,
}

impl Default for PackConfig {
    fn default() -> Self {
        PackConfig {
            system_voltage: SystemVoltage::V400,
            battery_capacity_kwh: 80.0,
            max_c_rate: 2.0,
            cooling_power_kw: 5.0,
            max_car_power_kw: None,
            initial_temperature_c: 25.0,
            ambient_temperature_c: 25.0,
            battery_heating_enabled: false,
            initial_soc: 0.10,
            seed: 42,
            temperature_jitter: true,
        }
    }
}

impl PackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_voltage(mut self, voltage: SystemVoltage) -> Self {
        self.system_voltage = voltage;
        self
    }

    pub fn with_capacity_kwh(mut self, kwh: f64) -> Self {
        self.battery_capacity_kwh = kwh;
        self
    }

    pub fn with_max_c_rate(mut self, c_rate: f64) -> Self {
        self.max_c_rate = c_rate;
        self
    }

    pub fn with_cooling_power_kw(mut self, kw: f64) -> Self {
        self.cooling_power_kw = kw;
        self
    }

    pub fn with_max_car_power_kw(mut self, kw: Option<f64>) -> Self {
        self.max_car_power_kw = kw;
        self
    }

    pub fn with_initial_temperature_c(mut self, celsius: f64) -> Self {
        self.initial_temperature_c = celsius;
        self
    }

    pub fn with_ambient_temperature_c(mut self, celsius: f64) -> Self {
        self.ambient_temperature_c = celsius;
        self
    }

    pub fn with_battery_heating(mut self, enabled: bool) -> Self {
        self.battery_heating_enabled = enabled;
        self
    }

    pub fn with_initial_soc(mut self, soc: f64) -> Self {
        self.initial_soc = soc;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_temperature_jitter(mut self, enabled: bool) -> Self {
        self.temperature_jitter = enabled;
        self
    }

    /// Returns a sanitized copy, or the first parameter that cannot be used.
    pub fn validate(&self) -> Result<PackConfig, ConfigError> {
        let battery_capacity_kwh =
            ConfigError::require_positive("battery_capacity_kwh", self.battery_capacity_kwh)?;
        let max_c_rate = ConfigError::require_positive("max_c_rate", self.max_c_rate)?;
        let max_car_power_kw = self
            .max_car_power_kw
            .map(|kw| ConfigError::require_positive("max_car_power_kw", kw))
            .transpose()?;

        let cooling_power_kw = ConfigError::require_finite("cooling_power_kw", self.cooling_power_kw)?;
        let initial_temperature_c =
            ConfigError::require_finite("initial_temperature_c", self.initial_temperature_c)?;
        let ambient_temperature_c =
            ConfigError::require_finite("ambient_temperature_c", self.ambient_temperature_c)?;
        let initial_soc = ConfigError::require_finite("initial_soc", self.initial_soc)?;

        Ok(PackConfig {
            system_voltage: self.system_voltage,
            battery_capacity_kwh,
            max_c_rate,
            cooling_power_kw: clamp_logged("cooling_power_kw", cooling_power_kw, 0.0, f64::MAX),
            max_car_power_kw,
            initial_temperature_c: clamp_logged(
                "initial_temperature_c",
                initial_temperature_c,
                MIN_TEMPERATURE_C,
                MAX_TEMPERATURE_C,
            ),
            ambient_temperature_c: clamp_logged(
                "ambient_temperature_c",
                ambient_temperature_c,
                MIN_TEMPERATURE_C,
                MAX_TEMPERATURE_C,
            ),
            battery_heating_enabled: self.battery_heating_enabled,
            initial_soc: clamp_logged("initial_soc", initial_soc, 0.0, 1.0),
            seed: self.seed,
            temperature_jitter: self.temperature_jitter,
        })
    }

    pub fn cells_in_series(&self) -> usize {
        self.system_voltage.cells_in_series()
    }

    /// Parallel strings needed to reach the target energy with reference cells.
    pub fn cells_in_parallel(&self) -> usize {
        let cell_energy_wh = CELL_CAPACITY_AH * CELL_NOMINAL_VOLTAGE;
        let string_energy_wh = cell_energy_wh * self.cells_in_series() as f64;
        let raw = (self.battery_capacity_kwh * 1000.0 / string_energy_wh).round();

        let parallel = if raw.is_finite() && raw >= 0.0 {
            raw as usize
        } else {
            MIN_CELLS_IN_PARALLEL
        };
        let clamped = parallel.clamp(MIN_CELLS_IN_PARALLEL, MAX_CELLS_IN_PARALLEL);
        if clamped != parallel {
            log::warn!(
                "{} kWh needs {} parallel strings, clamped to {}",
                self.battery_capacity_kwh,
                parallel,
                clamped
            );
        }
        clamped
    }

    /// Per-cell passive cooling coefficient (1/h).
    pub fn cooling_coefficient(&self) -> f64 {
        self.cooling_power_kw.max(0.0) * COOLING_COEFFICIENT_PER_KW
    }
}
