use serde::{Deserialize, Serialize};

use crate::SECONDS_PER_HOUR;

/// Timing information for a single simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimContext {
    /// Step length in seconds
    pub dt: f64,
    /// Simulated time at the start of the step, in seconds
    pub t: f64,
}

impl SimContext {
    pub fn new(dt: f64, t: f64) -> Self {
        SimContext { dt, t }
    }

    /// Step length expressed in hours, the unit used by the Ah bookkeeping.
    pub fn dt_hours(&self) -> f64 {
        self.dt / SECONDS_PER_HOUR
    }
}

pub trait Model {
    /// Returns the model to the state it had right after construction.
    fn reset(&mut self);
}
