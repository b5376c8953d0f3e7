//! Shared simulation vocabulary for the charging engine.
//!
//! Everything here is independent of batteries: the step context handed to
//! models, the reset contract, fixed-tick budgeting, wall clocks and the
//! configuration error type.

pub mod clock;
pub mod error;
pub mod stepping;
pub mod traits;

pub use clock::{ManualClock, SystemClock, WallClock};
pub use error::{ConfigError, clamp_logged};
pub use stepping::TickBudget;
pub use traits::{Model, SimContext};

pub const SECONDS_PER_HOUR: f64 = 3600.0;
