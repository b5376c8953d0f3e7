//! Simulation driver
//!
//! Owns one pack and advances it in fixed one-second ticks. The host decides
//! when to call in: either with the wall-clock time that passed
//! ([`SimulationDriver::advance`]) or with its current clock reading
//! ([`SimulationDriver::poll`]). Each call runs a batch of ticks sized by the
//! time acceleration, so irregular call cadence does not lose simulated time.

use serde::Serialize;

use electrical::{Pack, PackSnapshot};
use simcore::{ConfigError, Model, TickBudget, WallClock};

use crate::charger::ChargerType;
use crate::config::SessionConfig;
use crate::heating::HeatingController;
use crate::history::{DataPoint, SampleHistory};

/// Simulated length of one tick (s)
pub const TICK_SECONDS: f64 = 1.0;

/// Presentation-facing view of the whole session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub is_running: bool,
    pub elapsed_sim_seconds: f64,
    pub time_acceleration: u32,
    pub charger: ChargerType,
    pub charger_max_current_a: f64,
    pub current_a: f64,
    pub power_kw: f64,
    pub pack: PackSnapshot,
}

#[derive(Debug, Clone)]
pub struct SimulationDriver {
    config: SessionConfig,
    pack: Pack,
    heating: HeatingController,
    budget: TickBudget,
    elapsed_sim_seconds: f64,
    running: bool,
    time_acceleration: u32,
    history: SampleHistory,
    last_soc_bucket: i64,
    last_current_a: f64,
    wall_reference: Option<f64>,
}

impl SimulationDriver {
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let pack = Pack::new(config.pack.clone())?;

        let mut driver = SimulationDriver {
            time_acceleration: config.time_acceleration,
            config,
            pack,
            heating: HeatingController::default(),
            budget: TickBudget::new(TICK_SECONDS),
            elapsed_sim_seconds: 0.0,
            running: false,
            history: SampleHistory::default(),
            last_soc_bucket: 0,
            last_current_a: 0.0,
            wall_reference: None,
        };
        driver.record_initial_sample();
        Ok(driver)
    }

    /// Replaces the sample cap. Clears nothing beyond what no longer fits.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        let mut history = SampleHistory::with_capacity(capacity);
        for point in self.history.points() {
            history.push(*point);
        }
        self.history = history;
        self
    }

    pub fn with_heating_controller(mut self, heating: HeatingController) -> Self {
        self.heating = heating;
        self
    }

    // === Run state ===

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.wall_reference = None;
        log::info!(
            "charging started at {:.1}% ({} charger, x{})",
            self.pack.average_state_of_charge(),
            self.config.charger_type,
            self.time_acceleration
        );
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        log::info!(
            "charging stopped at {:.1}% after {:.0} s",
            self.pack.average_state_of_charge(),
            self.elapsed_sim_seconds
        );
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn time_acceleration(&self) -> u32 {
        self.time_acceleration
    }

    /// Changes the acceleration. A running session recalibrates its wall
    /// reference on the next poll instead of catching up on stale time.
    pub fn set_time_acceleration(&mut self, factor: u32) {
        self.time_acceleration = factor.max(1);
        if self.running {
            self.wall_reference = None;
        }
    }

    // === Stepping ===

    /// Runs the ticks covering `wall_delta_seconds` of host time. Returns the
    /// number of ticks executed; zero when stopped.
    pub fn advance(&mut self, wall_delta_seconds: f64) -> usize {
        if !self.running {
            return 0;
        }
        let virtual_seconds = wall_delta_seconds.max(0.0) * self.time_acceleration as f64;
        let ticks = self.budget.ticks_for(virtual_seconds);

        let mut executed = 0;
        for _ in 0..ticks {
            if !self.running {
                break;
            }
            self.tick();
            executed += 1;
        }
        executed
    }

    /// Advances by the time elapsed since the previous poll, given a host
    /// clock reading in seconds. The first poll after a (re)start only
    /// establishes the reference and runs a single tick.
    pub fn poll(&mut self, now_seconds: f64) -> usize {
        if !self.running {
            return 0;
        }
        let delta = match self.wall_reference {
            Some(previous) => (now_seconds - previous).max(0.0),
            None => 0.0,
        };
        self.wall_reference = Some(now_seconds);
        self.advance(delta)
    }

    pub fn poll_clock<C: WallClock + ?Sized>(&mut self, clock: &C) -> usize {
        self.poll(clock.now_seconds())
    }

    /// One fixed simulation step, regardless of the run state.
    pub fn tick(&mut self) {
        self.heating.update(&mut self.pack);

        let charger_max = self.config.charger_type.max_current_a();
        let current = self.pack.calculate_limited_current(charger_max);
        let ctx = self.budget.context(self.elapsed_sim_seconds);
        self.pack.step(ctx, current);

        self.elapsed_sim_seconds += ctx.dt;
        self.last_current_a = current;

        let soc = self.pack.average_state_of_charge();
        let bucket = soc.floor() as i64;
        if bucket > self.last_soc_bucket {
            self.last_soc_bucket = bucket;
            self.history.push(self.sample());
        }

        log::trace!(
            "t={:.0}s soc={:.3}% I={:.1}A T={:.2}°C",
            self.elapsed_sim_seconds,
            soc,
            current,
            self.pack.average_temperature()
        );

        if self.running && soc >= self.config.end_soc_percent {
            self.running = false;
            log::info!(
                "fully charged: {:.1}% after {:.0} s",
                soc,
                self.elapsed_sim_seconds
            );
        }
    }

    fn sample(&self) -> DataPoint {
        let voltage = self.pack.total_voltage();
        DataPoint {
            time_s: self.elapsed_sim_seconds,
            soc_percent: self.pack.average_state_of_charge(),
            power_kw: self.last_current_a * voltage / 1000.0,
            current_a: self.last_current_a,
            voltage_v: voltage,
            temperature_c: self.pack.average_temperature(),
        }
    }

    fn record_initial_sample(&mut self) {
        self.last_soc_bucket = self.pack.average_state_of_charge().floor() as i64;
        self.history.push(self.sample());
    }

    // === Configuration ===

    /// Swaps in a freshly built pack and charger. On error nothing changes.
    pub fn replace_config(&mut self, config: SessionConfig) -> Result<(), ConfigError> {
        let config = config.validate()?;
        let pack = Pack::new(config.pack.clone())?;

        self.time_acceleration = config.time_acceleration;
        self.config = config;
        self.pack = pack;
        self.wall_reference = None;
        self.clear_progress();
        Ok(())
    }

    fn clear_progress(&mut self) {
        self.elapsed_sim_seconds = 0.0;
        self.last_current_a = 0.0;
        self.history.clear();
        self.record_initial_sample();
    }

    // === Observation ===

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn pack(&self) -> &Pack {
        &self.pack
    }

    pub fn charger(&self) -> ChargerType {
        self.config.charger_type
    }

    pub fn elapsed_sim_seconds(&self) -> f64 {
        self.elapsed_sim_seconds
    }

    pub fn last_current_a(&self) -> f64 {
        self.last_current_a
    }

    pub fn data_points(&self) -> &[DataPoint] {
        self.history.points()
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            is_running: self.running,
            elapsed_sim_seconds: self.elapsed_sim_seconds,
            time_acceleration: self.time_acceleration,
            charger: self.config.charger_type,
            charger_max_current_a: self.config.charger_type.max_current_a(),
            current_a: self.last_current_a,
            power_kw: self.last_current_a * self.pack.total_voltage() / 1000.0,
            pack: self.pack.snapshot(),
        }
    }
}

impl Model for SimulationDriver {
    /// Resets the pack and clears the elapsed time and history. Leaves the
    /// run state alone.
    fn reset(&mut self) {
        self.pack.reset();
        self.wall_reference = None;
        self.clear_progress();
    }
}
