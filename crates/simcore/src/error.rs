use thiserror::Error;

/// Reasons a pack or session configuration is rejected at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported system voltage {0} V (expected 400 or 800)")]
    UnsupportedSystemVoltage(u32),

    #[error("{name} must be a finite positive number, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("pack must contain at least one cell")]
    EmptyPack,
}

impl ConfigError {
    /// Checks that `value` is finite and strictly positive.
    pub fn require_positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(ConfigError::NonPositive { name, value })
        }
    }

    pub fn require_finite(name: &'static str, value: f64) -> Result<f64, ConfigError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ConfigError::NonFinite { name, value })
        }
    }
}

/// Clamps `value` into `[min, max]`, logging when the caller's value was changed.
pub fn clamp_logged(name: &'static str, value: f64, min: f64, max: f64) -> f64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        log::warn!("{name} = {value} is out of range, clamped to {clamped}");
    }
    clamped
}
