//! Battery pack
//!
//! A fixed series × parallel grid of cells stored in one flat arena.
//! Pack-level quantities are always computed from the cells on demand, so
//! they cannot drift from the cell state.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use simcore::{ConfigError, Model, SimContext};

use crate::balancing::{self, BalancingOutcome};
use crate::cell::Cell;
use crate::config::PackConfig;
use crate::limits::{self, CurrentLimit, LimitInputs, LimitingFactor};

/// The heater switches on below this average temperature
pub const HEATER_ON_BELOW_C: f64 = 15.0;
/// and back off above this one.
pub const HEATER_OFF_ABOVE_C: f64 = 20.0;

/// Separates the jitter stream from the manufacturing-spread stream.
const JITTER_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Energy-weighted average state of charge of `cells`, in percent.
///
/// Each cell is weighted by `capacity × voltage`. Since voltage rises with
/// SoC this is not the arithmetic mean of the cell SoCs.
pub fn energy_weighted_soc_percent(cells: &[Cell]) -> f64 {
    let (weighted, total) = cells.iter().fold((0.0, 0.0), |(weighted, total), cell| {
        let weight = cell.energy_weight();
        (weighted + cell.state_of_charge() * weight, total + weight)
    });
    if total > 0.0 { 100.0 * weighted / total } else { 0.0 }
}

/// Presentation-facing view of the pack at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackSnapshot {
    pub cells_in_series: usize,
    pub cells_in_parallel: usize,
    pub total_voltage: f64,
    pub total_capacity_ah: f64,
    pub energy_capacity_kwh: f64,
    pub average_soc_percent: f64,
    pub min_soc: f64,
    pub max_soc: f64,
    pub average_temperature_c: f64,
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
    pub min_cell_voltage: f64,
    pub max_cell_voltage: f64,
    pub voltage_delta: f64,
    pub balancing_intensity: f64,
    pub balanced_cells: usize,
    pub heating: bool,
    pub limiting_factor: Option<LimitingFactor>,
}

#[derive(Debug, Clone)]
pub struct Pack {
    config: PackConfig,
    cells_in_series: usize,
    cells_in_parallel: usize,
    cells: Vec<Cell>,
    balancing: BalancingOutcome,
    limiting_factor: Option<LimitingFactor>,
    jitter_rng: StdRng,
}

impl Pack {
    pub fn new(config: PackConfig) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let cells_in_series = config.cells_in_series();
        let cells_in_parallel = config.cells_in_parallel();
        let count = cells_in_series * cells_in_parallel;
        if count == 0 {
            return Err(ConfigError::EmptyPack);
        }

        let mut spread_rng = StdRng::seed_from_u64(config.seed);
        let cells = (0..count)
            .map(|_| Cell::new(config.initial_soc, config.initial_temperature_c, &mut spread_rng))
            .collect();

        log::debug!(
            "built {}s{}p pack ({} cells) for {} V / {} kWh",
            cells_in_series,
            cells_in_parallel,
            count,
            config.system_voltage.volts(),
            config.battery_capacity_kwh
        );

        let mut pack = Pack {
            jitter_rng: StdRng::seed_from_u64(config.seed ^ JITTER_STREAM),
            config,
            cells_in_series,
            cells_in_parallel,
            cells,
            balancing: BalancingOutcome::default(),
            limiting_factor: None,
        };
        pack.apply_heating_configuration();
        Ok(pack)
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    pub fn cells_in_series(&self) -> usize {
        self.cells_in_series
    }

    pub fn cells_in_parallel(&self) -> usize {
        self.cells_in_parallel
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Arena index of the cell at a grid position.
    pub fn index(&self, series_pos: usize, parallel_pos: usize) -> usize {
        series_pos + parallel_pos * self.cells_in_series
    }

    pub fn cell(&self, series_pos: usize, parallel_pos: usize) -> Option<&Cell> {
        if series_pos >= self.cells_in_series || parallel_pos >= self.cells_in_parallel {
            return None;
        }
        self.cells.get(self.index(series_pos, parallel_pos))
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    fn series_group(&self, series_pos: usize) -> impl Iterator<Item = &Cell> + '_ {
        (0..self.cells_in_parallel).map(move |p| &self.cells[self.index(series_pos, p)])
    }

    // === Aggregates ===

    /// Sum over series groups of the mean voltage of each parallel group.
    pub fn total_voltage(&self) -> f64 {
        let parallel = self.cells_in_parallel as f64;
        (0..self.cells_in_series)
            .map(|s| self.series_group(s).map(Cell::voltage).sum::<f64>() / parallel)
            .sum()
    }

    /// Ampere-hour capacity seen at the pack terminals.
    pub fn total_capacity_ah(&self) -> f64 {
        let cell_capacity = self.cells.first().map_or(0.0, Cell::capacity_ah);
        cell_capacity * self.cells_in_parallel as f64
    }

    pub fn energy_capacity_kwh(&self) -> f64 {
        self.cells.iter().map(Cell::nominal_energy_wh).sum::<f64>() / 1000.0
    }

    /// Energy-weighted average SoC, in percent.
    pub fn average_state_of_charge(&self) -> f64 {
        energy_weighted_soc_percent(&self.cells)
    }

    pub fn min_state_of_charge(&self) -> f64 {
        self.cells.iter().map(Cell::state_of_charge).fold(f64::INFINITY, f64::min)
    }

    pub fn max_state_of_charge(&self) -> f64 {
        self.cells.iter().map(Cell::state_of_charge).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn soc_spread(&self) -> f64 {
        self.max_state_of_charge() - self.min_state_of_charge()
    }

    pub fn average_temperature(&self) -> f64 {
        self.cells.iter().map(Cell::temperature_c).sum::<f64>() / self.cells.len() as f64
    }

    pub fn max_temperature(&self) -> f64 {
        self.cells.iter().map(Cell::temperature_c).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_temperature(&self) -> f64 {
        self.cells.iter().map(Cell::temperature_c).fold(f64::INFINITY, f64::min)
    }

    pub fn min_cell_voltage(&self) -> f64 {
        self.cells.iter().map(Cell::voltage).fold(f64::INFINITY, f64::min)
    }

    pub fn max_cell_voltage(&self) -> f64 {
        self.cells.iter().map(Cell::voltage).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn voltage_delta(&self) -> f64 {
        self.max_cell_voltage() - self.min_cell_voltage()
    }

    pub fn balancing(&self) -> &BalancingOutcome {
        &self.balancing
    }

    pub fn balancing_intensity(&self) -> f64 {
        self.balancing.intensity
    }

    pub fn balanced_cell_count(&self) -> usize {
        self.cells.iter().filter(|c| c.was_balanced()).count()
    }

    // === Current limiting ===

    pub fn limit_inputs(&self, charger_max_current_a: f64) -> LimitInputs {
        LimitInputs {
            charger_max_a: charger_max_current_a,
            max_c_rate: self.config.max_c_rate,
            total_capacity_ah: self.total_capacity_ah(),
            max_car_power_kw: self.config.max_car_power_kw,
            total_voltage: self.total_voltage(),
            max_temperature_c: self.max_temperature(),
            average_temperature_c: self.average_temperature(),
            average_soc: self.average_state_of_charge() / 100.0,
            balancing_intensity: self.balancing.intensity,
        }
    }

    /// Allowed current and the binding constraint, without recording it.
    pub fn current_limit(&self, charger_max_current_a: f64) -> CurrentLimit {
        limits::limit(&self.limit_inputs(charger_max_current_a))
    }

    /// Allowed charging current; remembers the binding constraint for observers.
    pub fn calculate_limited_current(&mut self, charger_max_current_a: f64) -> f64 {
        let limit = self.current_limit(charger_max_current_a);
        if self.limiting_factor != Some(limit.factor) {
            log::debug!("charge current now limited by {} ({:.1} A)", limit.factor, limit.current);
        }
        self.limiting_factor = Some(limit.factor);
        limit.current
    }

    pub fn limiting_factor(&self) -> Option<LimitingFactor> {
        self.limiting_factor
    }

    // === Charging ===

    /// Charges with `current_a` at the pack terminals for `delta_hours`,
    /// then balances and updates cell temperatures.
    pub fn apply_charge(&mut self, current_a: f64, delta_hours: f64) {
        let cell_current = current_a / self.cells_in_parallel as f64;

        for cell in self.cells.iter_mut() {
            cell.update_charge(cell_current, delta_hours);
        }

        let was_active = self.balancing.is_active();
        let average_soc = self.average_state_of_charge();
        self.balancing = balancing::balance(&mut self.cells, average_soc);
        if self.balancing.is_active() != was_active {
            log::debug!(
                "balancing {} (spread {:.4}, threshold {:.4})",
                if self.balancing.is_active() { "engaged" } else { "released" },
                self.balancing.spread,
                self.balancing.threshold
            );
        }

        let cooling = self.config.cooling_coefficient();
        let ambient = self.config.ambient_temperature_c;
        let jitter = self.config.temperature_jitter;
        for cell in self.cells.iter_mut() {
            cell.update_temperature(cell_current, delta_hours, cooling, ambient);
            if jitter {
                cell.jitter_temperature(&mut self.jitter_rng);
            }
        }
    }

    /// [`apply_charge`](Self::apply_charge) over one simulation step.
    pub fn step(&mut self, ctx: SimContext, current_a: f64) {
        self.apply_charge(current_a, ctx.dt_hours());
    }

    // === Heating ===

    pub fn set_heating(&mut self, enabled: bool) {
        for cell in self.cells.iter_mut() {
            cell.set_heating_enabled(enabled);
        }
    }

    pub fn is_heating(&self) -> bool {
        self.cells.iter().any(Cell::heating_enabled)
    }

    /// Heater state implied by the configuration at the present temperature.
    fn apply_heating_configuration(&mut self) {
        let heat = self.config.battery_heating_enabled && self.average_temperature() < HEATER_ON_BELOW_C;
        self.set_heating(heat);
    }

    pub fn snapshot(&self) -> PackSnapshot {
        PackSnapshot {
            cells_in_series: self.cells_in_series,
            cells_in_parallel: self.cells_in_parallel,
            total_voltage: self.total_voltage(),
            total_capacity_ah: self.total_capacity_ah(),
            energy_capacity_kwh: self.energy_capacity_kwh(),
            average_soc_percent: self.average_state_of_charge(),
            min_soc: self.min_state_of_charge(),
            max_soc: self.max_state_of_charge(),
            average_temperature_c: self.average_temperature(),
            min_temperature_c: self.min_temperature(),
            max_temperature_c: self.max_temperature(),
            min_cell_voltage: self.min_cell_voltage(),
            max_cell_voltage: self.max_cell_voltage(),
            voltage_delta: self.voltage_delta(),
            balancing_intensity: self.balancing.intensity,
            balanced_cells: self.balanced_cell_count(),
            heating: self.is_heating(),
            limiting_factor: self.limiting_factor,
        }
    }
}

impl Model for Pack {
    fn reset(&mut self) {
        let soc = self.config.initial_soc;
        let temperature = self.config.initial_temperature_c;
        for cell in self.cells.iter_mut() {
            cell.reset(soc, temperature);
        }
        self.balancing = BalancingOutcome::default();
        self.limiting_factor = None;
        self.jitter_rng = StdRng::seed_from_u64(self.config.seed ^ JITTER_STREAM);
        self.apply_heating_configuration();
    }
}
