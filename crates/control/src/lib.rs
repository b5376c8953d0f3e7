//! Charging session control: charger profiles, heater policy and the
//! time-stepped simulation driver with its recorded charge curve.

pub mod charger;
pub mod config;
pub mod driver;
pub mod heating;
pub mod history;

pub use charger::ChargerType;
pub use config::SessionConfig;
pub use driver::{SessionSnapshot, SimulationDriver, TICK_SECONDS};
pub use heating::HeatingController;
pub use history::{DataPoint, SampleHistory};
