use crate::SimContext;

/// Fixed-tick budgeting for a host that calls in at irregular intervals.
///
/// The host reports how much virtual time has passed; the budget turns that
/// into a whole number of fixed-length ticks. Partial ticks are not carried
/// over, and every call grants at least one tick so a host polling faster
/// than the tick length still makes progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickBudget {
    pub fixed_dt: f64,
}

impl TickBudget {
    pub fn new(fixed_dt: f64) -> Self {
        TickBudget { fixed_dt }
    }

    /// Number of ticks to run for `virtual_dt` seconds of simulated time.
    pub fn ticks_for(&self, virtual_dt: f64) -> usize {
        if !virtual_dt.is_finite() || virtual_dt <= 0.0 || self.fixed_dt <= 0.0 {
            return 1;
        }
        ((virtual_dt / self.fixed_dt).floor() as usize).max(1)
    }

    /// Context for a tick starting at simulated time `t`.
    pub fn context(&self, t: f64) -> SimContext {
        SimContext {
            dt: self.fixed_dt,
            t,
        }
    }
}
