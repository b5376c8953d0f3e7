//! Charging current ceilings
//!
//! Every physical or policy constraint proposes its own ceiling on the
//! charging current; the pack charges at the lowest one. Each ceiling is
//! evaluated together with the constraint that produced it, so the binding
//! constraint is known without comparing values after the fact.

use std::fmt;

use serde::Serialize;

/// Above this maximum cell temperature the current tapers linearly
pub const HOT_THRESHOLD_C: f64 = 40.0;
/// Temperature span over which the hot taper reaches zero
pub const HOT_TAPER_RANGE_C: f64 = 15.0;
/// Below this average temperature the current ramps down quadratically
pub const COLD_CUTOFF_C: f64 = 20.0;
pub const COLD_OFFSET_C: f64 = 2.0;
/// Fraction of the charger current always allowed in the cold
pub const COLD_FLOOR: f64 = 0.05;
/// Average SoC (fraction) where the exponential taper starts
pub const SOC_TAPER_KNEE: f64 = 0.70;
pub const SOC_TAPER_RATE: f64 = 5.0;
/// Current penalty per unit of balancing intensity
pub const BALANCING_PENALTY_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LimitingFactor {
    Charger,
    CRate,
    CarPower,
    HighTemperature,
    LowTemperature,
    StateOfCharge,
    Balancing,
}

impl LimitingFactor {
    /// All constraints, in the order used to break exact ties.
    pub const PRIORITY: [LimitingFactor; 7] = [
        LimitingFactor::Charger,
        LimitingFactor::CRate,
        LimitingFactor::CarPower,
        LimitingFactor::HighTemperature,
        LimitingFactor::LowTemperature,
        LimitingFactor::StateOfCharge,
        LimitingFactor::Balancing,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LimitingFactor::Charger => "Charger limit",
            LimitingFactor::CRate => "Battery C-rate",
            LimitingFactor::CarPower => "Vehicle power limit",
            LimitingFactor::HighTemperature => "High temperature",
            LimitingFactor::LowTemperature => "Low temperature",
            LimitingFactor::StateOfCharge => "High state of charge",
            LimitingFactor::Balancing => "Cell balancing",
        }
    }
}

impl fmt::Display for LimitingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One candidate upper bound on the charging current.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ceiling {
    pub factor: LimitingFactor,
    /// Amperes; `f64::INFINITY` when the constraint is not active
    pub value: f64,
}

impl Ceiling {
    pub fn new(factor: LimitingFactor, value: f64) -> Self {
        Ceiling { factor, value }
    }
}

/// The allowed current and the constraint that set it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurrentLimit {
    pub current: f64,
    pub factor: LimitingFactor,
}

/// Pack quantities the ceilings depend on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LimitInputs {
    pub charger_max_a: f64,
    pub max_c_rate: f64,
    pub total_capacity_ah: f64,
    pub max_car_power_kw: Option<f64>,
    pub total_voltage: f64,
    pub max_temperature_c: f64,
    pub average_temperature_c: f64,
    /// Energy-weighted average SoC as a fraction
    pub average_soc: f64,
    pub balancing_intensity: f64,
}

pub fn c_rate_ceiling(max_c_rate: f64, total_capacity_ah: f64) -> f64 {
    max_c_rate * total_capacity_ah
}

pub fn car_power_ceiling(max_car_power_kw: Option<f64>, total_voltage: f64) -> f64 {
    match max_car_power_kw {
        Some(kw) if total_voltage > 0.0 => kw * 1000.0 / total_voltage,
        _ => f64::INFINITY,
    }
}

pub fn high_temperature_ceiling(charger_max_a: f64, max_temperature_c: f64) -> f64 {
    if max_temperature_c <= HOT_THRESHOLD_C {
        return f64::INFINITY;
    }
    let over = (max_temperature_c - HOT_THRESHOLD_C) / HOT_TAPER_RANGE_C;
    charger_max_a * (1.0 - over).max(0.0)
}

pub fn low_temperature_ceiling(charger_max_a: f64, average_temperature_c: f64) -> f64 {
    if average_temperature_c >= COLD_CUTOFF_C {
        return f64::INFINITY;
    }
    let ramp = ((average_temperature_c.max(0.0) + COLD_OFFSET_C) / COLD_CUTOFF_C).powi(2);
    charger_max_a * ramp.max(COLD_FLOOR)
}

pub fn state_of_charge_ceiling(charger_max_a: f64, average_soc: f64) -> f64 {
    if average_soc <= SOC_TAPER_KNEE {
        return f64::INFINITY;
    }
    charger_max_a * (-SOC_TAPER_RATE * (average_soc - SOC_TAPER_KNEE)).exp().min(1.0)
}

pub fn balancing_ceiling(charger_max_a: f64, balancing_intensity: f64) -> f64 {
    if balancing_intensity <= 0.0 {
        return f64::INFINITY;
    }
    charger_max_a * (1.0 - balancing_intensity * BALANCING_PENALTY_SCALE).max(0.0)
}

/// Evaluates every ceiling, in [`LimitingFactor::PRIORITY`] order.
pub fn ceilings(inputs: &LimitInputs) -> [Ceiling; 7] {
    let charger = inputs.charger_max_a.max(0.0);
    [
        Ceiling::new(LimitingFactor::Charger, charger),
        Ceiling::new(
            LimitingFactor::CRate,
            c_rate_ceiling(inputs.max_c_rate, inputs.total_capacity_ah),
        ),
        Ceiling::new(
            LimitingFactor::CarPower,
            car_power_ceiling(inputs.max_car_power_kw, inputs.total_voltage),
        ),
        Ceiling::new(
            LimitingFactor::HighTemperature,
            high_temperature_ceiling(charger, inputs.max_temperature_c),
        ),
        Ceiling::new(
            LimitingFactor::LowTemperature,
            low_temperature_ceiling(charger, inputs.average_temperature_c),
        ),
        Ceiling::new(
            LimitingFactor::StateOfCharge,
            state_of_charge_ceiling(charger, inputs.average_soc),
        ),
        Ceiling::new(
            LimitingFactor::Balancing,
            balancing_ceiling(charger, inputs.balancing_intensity),
        ),
    ]
}

/// Lowest ceiling. On an exact tie the earlier constraint in priority order wins.
pub fn select(ceilings: &[Ceiling; 7]) -> CurrentLimit {
    let binding = ceilings[1..]
        .iter()
        .fold(ceilings[0], |best, candidate| {
            if candidate.value < best.value {
                *candidate
            } else {
                best
            }
        });
    CurrentLimit {
        current: binding.value,
        factor: binding.factor,
    }
}

pub fn limit(inputs: &LimitInputs) -> CurrentLimit {
    select(&ceilings(inputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn nominal() -> LimitInputs {
        LimitInputs {
            charger_max_a: 500.0,
            max_c_rate: 3.0,
            total_capacity_ah: 200.0,
            max_car_power_kw: None,
            total_voltage: 400.0,
            max_temperature_c: 25.0,
            average_temperature_c: 25.0,
            average_soc: 0.3,
            balancing_intensity: 0.0,
        }
    }

    #[test]
    fn test_charger_binds_when_nothing_else_does() {
        let result = limit(&nominal());
        assert_relative_eq!(result.current, 500.0);
        assert_eq!(result.factor, LimitingFactor::Charger);
    }

    #[test]
    fn test_inactive_constraints_are_infinite() {
        let all = ceilings(&nominal());
        assert_relative_eq!(all[0].value, 500.0);
        assert_relative_eq!(all[1].value, 600.0);
        assert!(all[2..].iter().all(|c| c.value == f64::INFINITY));
    }

    #[test]
    fn test_c_rate_binds() {
        let inputs = LimitInputs { max_c_rate: 1.5, ..nominal() };
        let result = limit(&inputs);
        assert_relative_eq!(result.current, 300.0);
        assert_eq!(result.factor, LimitingFactor::CRate);
    }

    #[test]
    fn test_car_power_binds() {
        let inputs = LimitInputs { max_car_power_kw: Some(100.0), ..nominal() };
        let result = limit(&inputs);
        assert_relative_eq!(result.current, 250.0);
        assert_eq!(result.factor, LimitingFactor::CarPower);
    }

    #[test]
    fn test_car_power_ignores_dead_pack() {
        assert!(car_power_ceiling(Some(100.0), 0.0).is_infinite());
        assert!(car_power_ceiling(None, 400.0).is_infinite());
    }

    #[test]
    fn test_hot_taper() {
        assert!(high_temperature_ceiling(500.0, 40.0).is_infinite());
        assert_relative_eq!(high_temperature_ceiling(500.0, 47.5), 250.0);
        assert_relative_eq!(high_temperature_ceiling(500.0, 55.0), 0.0);
        assert_relative_eq!(high_temperature_ceiling(500.0, 80.0), 0.0);
    }

    #[test]
    fn test_hot_taper_is_monotone() {
        let mut previous = f64::INFINITY;
        let mut t = 30.0;
        while t < 70.0 {
            let result = limit(&LimitInputs { max_temperature_c: t, ..nominal() });
            assert!(result.current <= previous + 1e-12, "current rose at {t} °C");
            assert!(result.current <= 500.0);
            previous = result.current;
            t += 0.5;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn test_cold_ramp_has_floor() {
        assert!(low_temperature_ceiling(500.0, 20.0).is_infinite());
        // ((10 + 2) / 20)^2 = 0.36
        assert_relative_eq!(low_temperature_ceiling(500.0, 10.0), 180.0, epsilon = 1e-9);
        assert_relative_eq!(low_temperature_ceiling(500.0, 0.0), 25.0);
        assert_relative_eq!(low_temperature_ceiling(500.0, -40.0), 25.0);
        assert!(low_temperature_ceiling(500.0, -273.0) > 0.0);
    }

    #[test]
    fn test_soc_taper() {
        assert!(state_of_charge_ceiling(500.0, 0.70).is_infinite());
        assert_relative_eq!(state_of_charge_ceiling(500.0, 0.80), 500.0 * (-0.5f64).exp(), epsilon = 1e-9);
        assert!(state_of_charge_ceiling(500.0, 1.0) < state_of_charge_ceiling(500.0, 0.9));
    }

    #[test]
    fn test_balancing_penalty() {
        assert!(balancing_ceiling(500.0, 0.0).is_infinite());
        assert_relative_eq!(balancing_ceiling(500.0, 1e-4), 450.0, epsilon = 1e-9);
        assert_relative_eq!(balancing_ceiling(500.0, 1.0), 0.0);
    }

    #[test]
    fn test_binding_factor_is_the_true_minimum() {
        let inputs = LimitInputs {
            average_temperature_c: 10.0,
            average_soc: 0.95,
            ..nominal()
        };
        // cold: 180 A, soc: 500 * exp(-1.25) = 143 A
        let result = limit(&inputs);
        assert_eq!(result.factor, LimitingFactor::StateOfCharge);
        assert_relative_eq!(result.current, 500.0 * (-1.25f64).exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_exact_tie_goes_to_higher_priority() {
        let inputs = LimitInputs { max_c_rate: 2.5, ..nominal() };
        let result = limit(&inputs);
        assert_relative_eq!(result.current, 500.0);
        assert_eq!(result.factor, LimitingFactor::Charger);
    }

    #[test]
    fn test_ceilings_follow_priority_order() {
        let all = ceilings(&nominal());
        let factors: Vec<_> = all.iter().map(|c| c.factor).collect();
        assert_eq!(factors, LimitingFactor::PRIORITY.to_vec());
    }
}
