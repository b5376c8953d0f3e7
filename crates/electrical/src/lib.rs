//! Cell and pack models for the charging simulator.
//!
//! - [`Cell`]: charge bookkeeping, voltage curve and thermal balance of one cell
//! - [`Pack`]: the series × parallel grid, its aggregates, current ceilings and balancing

pub mod balancing;
pub mod cell;
pub mod config;
pub mod limits;
pub mod pack;

pub use balancing::BalancingOutcome;
pub use cell::Cell;
pub use config::{PackConfig, SystemVoltage};
pub use limits::{Ceiling, CurrentLimit, LimitInputs, LimitingFactor};
pub use pack::{Pack, PackSnapshot, energy_weighted_soc_percent};
