use rand::Rng;
use serde::Serialize;

use simcore::SECONDS_PER_HOUR;

pub const CELL_CAPACITY_AH: f64 = 10.0;
pub const CELL_MIN_VOLTAGE: f64 = 3.0;
pub const CELL_MAX_VOLTAGE: f64 = 4.2;
pub const CELL_NOMINAL_VOLTAGE: f64 = 3.7;

const NOMINAL_RESISTANCE_OHM: f64 = 0.002;
const BASE_CHARGE_EFFICIENCY: f64 = 0.94;
/// Heat capacity of one cell (J/K)
const THERMAL_MASS_J_PER_K: f64 = 200.0;
const HEATER_POWER_W: f64 = 2.0;
/// Below this per-cell current the Joule heating is negligible and skipped
const RESISTIVE_HEATING_THRESHOLD_A: f64 = 1.0;
/// Relative resistance rise per degree below the reference temperature
const COLD_RESISTANCE_COEFF: f64 = 0.03;
const RESISTANCE_REFERENCE_C: f64 = 25.0;
/// Rate (1/h) at which a cell drifts towards ambient through the enclosure
const AMBIENT_EXCHANGE_COEFF: f64 = 0.2;

const JITTER_PROBABILITY: f64 = 0.005;
const JITTER_AMPLITUDE_C: f64 = 0.25;

/// Converts a heat flow in watts into a temperature rate in °C per hour.
fn watts_to_celsius_per_hour(watts: f64) -> f64 {
    watts * SECONDS_PER_HOUR / THERMAL_MASS_J_PER_K
}

/// A single lithium-ion cell.
///
/// Each cell carries a fixed manufacturing spread drawn once at construction
/// (internal resistance, charge efficiency and a general random factor), so
/// that cells fed the same current slowly drift apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    state_of_charge: f64,
    capacity_ah: f64,
    temperature_c: f64,
    internal_resistance: f64,
    charge_efficiency: f64,
    random_factor: f64,
    heating_enabled: bool,
    was_balanced: bool,
}

impl Cell {
    /// Creates a reference cell with spread drawn from `rng`.
    pub fn new<R: Rng + ?Sized>(initial_soc: f64, initial_temperature_c: f64, rng: &mut R) -> Self {
        let internal_resistance = NOMINAL_RESISTANCE_OHM * rng.gen_range(0.8..=1.2);
        let charge_efficiency = BASE_CHARGE_EFFICIENCY * rng.gen_range(0.99..=1.01);
        let random_factor = rng.gen_range(0.95..=1.05);
        Cell::with_parameters(
            CELL_CAPACITY_AH,
            initial_soc,
            initial_temperature_c,
            internal_resistance,
            charge_efficiency,
            random_factor,
        )
    }

    /// Creates a cell with explicit parameters and no random spread.
    pub fn with_parameters(
        capacity_ah: f64,
        initial_soc: f64,
        initial_temperature_c: f64,
        internal_resistance: f64,
        charge_efficiency: f64,
        random_factor: f64,
    ) -> Self {
        Cell {
            state_of_charge: initial_soc.clamp(0.0, 1.0),
            capacity_ah,
            temperature_c: initial_temperature_c,
            internal_resistance,
            charge_efficiency,
            random_factor,
            heating_enabled: false,
            was_balanced: false,
        }
    }

    pub fn state_of_charge(&self) -> f64 {
        self.state_of_charge
    }

    pub fn set_state_of_charge(&mut self, soc: f64) {
        self.state_of_charge = soc.clamp(0.0, 1.0);
    }

    pub fn capacity_ah(&self) -> f64 {
        self.capacity_ah
    }

    pub fn charge_ah(&self) -> f64 {
        self.state_of_charge * self.capacity_ah
    }

    pub fn temperature_c(&self) -> f64 {
        self.temperature_c
    }

    pub fn set_temperature_c(&mut self, celsius: f64) {
        self.temperature_c = celsius;
    }

    pub fn internal_resistance(&self) -> f64 {
        self.internal_resistance
    }

    pub fn random_factor(&self) -> f64 {
        self.random_factor
    }

    /// Efficiency actually applied to incoming charge.
    pub fn effective_efficiency(&self) -> f64 {
        self.charge_efficiency * self.random_factor
    }

    /// Terminal voltage, linear in state of charge.
    pub fn voltage(&self) -> f64 {
        CELL_MIN_VOLTAGE + (CELL_MAX_VOLTAGE - CELL_MIN_VOLTAGE) * self.state_of_charge
    }

    /// Capacity weighted by present voltage (Wh at the current terminal voltage).
    pub fn energy_weight(&self) -> f64 {
        self.capacity_ah * self.voltage()
    }

    pub fn nominal_energy_wh(&self) -> f64 {
        self.capacity_ah * CELL_NOMINAL_VOLTAGE
    }

    /// Internal resistance including the rise in the cold.
    pub fn effective_resistance(&self) -> f64 {
        let below_reference = (RESISTANCE_REFERENCE_C - self.temperature_c).max(0.0);
        self.internal_resistance * (1.0 + COLD_RESISTANCE_COEFF * below_reference)
    }

    pub fn heating_enabled(&self) -> bool {
        self.heating_enabled
    }

    pub fn set_heating_enabled(&mut self, enabled: bool) {
        self.heating_enabled = enabled;
    }

    pub fn was_balanced(&self) -> bool {
        self.was_balanced
    }

    pub fn set_was_balanced(&mut self, balanced: bool) {
        self.was_balanced = balanced;
    }

    /// Adds `current_a` for `delta_hours`, clipping at full capacity.
    pub fn update_charge(&mut self, current_a: f64, delta_hours: f64) {
        let added_ah = current_a * self.effective_efficiency() * delta_hours;
        let charge = (self.charge_ah() + added_ah).clamp(0.0, self.capacity_ah);
        self.state_of_charge = if self.capacity_ah > 0.0 {
            (charge / self.capacity_ah).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Removes `amount` of state of charge (fraction of capacity).
    pub fn bleed(&mut self, amount: f64) {
        self.set_state_of_charge(self.state_of_charge - amount.max(0.0));
    }

    /// Temperature rate (°C/h) for the given operating point.
    pub fn temperature_rate(&self, current_a: f64, cooling_coefficient: f64, ambient_c: f64) -> f64 {
        let resistive = if current_a.abs() > RESISTIVE_HEATING_THRESHOLD_A {
            watts_to_celsius_per_hour(current_a * current_a * self.effective_resistance())
                * self.random_factor
        } else {
            0.0
        };

        let (heater, cooling) = if self.heating_enabled {
            (watts_to_celsius_per_hour(HEATER_POWER_W), 0.0)
        } else {
            // The cooling loop can only carry heat away.
            (0.0, cooling_coefficient * (self.temperature_c - ambient_c).max(0.0))
        };

        let equilibration = AMBIENT_EXCHANGE_COEFF * (ambient_c - self.temperature_c);

        resistive + heater - cooling + equilibration
    }

    pub fn update_temperature(
        &mut self,
        current_a: f64,
        delta_hours: f64,
        cooling_coefficient: f64,
        ambient_c: f64,
    ) {
        self.temperature_c += self.temperature_rate(current_a, cooling_coefficient, ambient_c) * delta_hours;
    }

    /// Occasional small sensor-like disturbance.
    pub fn jitter_temperature<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if rng.gen_bool(JITTER_PROBABILITY) {
            self.temperature_c += rng.gen_range(-JITTER_AMPLITUDE_C..=JITTER_AMPLITUDE_C);
        }
    }

    pub fn reset(&mut self, initial_soc: f64, initial_temperature_c: f64) {
        self.set_state_of_charge(initial_soc);
        self.temperature_c = initial_temperature_c;
        self.heating_enabled = false;
        self.was_balanced = false;
    }
}
