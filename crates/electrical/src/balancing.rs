//! Passive cell balancing
//!
//! Cells that run ahead of the pack are bled down a little every tick. The
//! tolerated spread tightens as the pack fills, so balancing is mostly
//! active in the upper part of the charge.

use serde::Serialize;

use crate::cell::Cell;

/// Tolerated SoC spread at an empty pack (fraction)
const BASE_SPREAD_THRESHOLD: f64 = 0.1;
/// Scale of the bleed applied per tick, relative to `avg_soc * spread`
const BLEED_COEFFICIENT: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BalancingOutcome {
    /// SoC removed from each balanced cell this tick (0 when inactive)
    pub intensity: f64,
    pub spread: f64,
    pub threshold: f64,
    pub balanced_cells: usize,
}

impl BalancingOutcome {
    pub fn is_active(&self) -> bool {
        self.intensity > 0.0
    }
}

/// Spread tolerated at the given average SoC (percent).
pub fn spread_threshold(average_soc_percent: f64) -> f64 {
    (BASE_SPREAD_THRESHOLD - average_soc_percent / 1000.0).max(0.0)
}

/// Runs one balancing pass over `cells`, with the pack's energy-weighted
/// average SoC in percent.
pub fn balance(cells: &mut [Cell], average_soc_percent: f64) -> BalancingOutcome {
    if cells.is_empty() {
        return BalancingOutcome::default();
    }

    let (min, max, sum) = cells.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), cell| {
            let soc = cell.state_of_charge();
            (min.min(soc), max.max(soc), sum + soc)
        },
    );
    let mean = sum / cells.len() as f64;
    let spread = max - min;
    let threshold = spread_threshold(average_soc_percent);

    if spread <= threshold {
        for cell in cells.iter_mut() {
            cell.set_was_balanced(false);
        }
        return BalancingOutcome {
            intensity: 0.0,
            spread,
            threshold,
            balanced_cells: 0,
        };
    }

    let intensity = (average_soc_percent / 100.0) * spread * BLEED_COEFFICIENT;
    let cutoff = mean + threshold;
    let mut balanced_cells = 0;
    for cell in cells.iter_mut() {
        let over = cell.state_of_charge() > cutoff;
        if over {
            cell.bleed(intensity);
            balanced_cells += 1;
        }
        cell.set_was_balanced(over);
    }

    BalancingOutcome {
        intensity,
        spread,
        threshold,
        balanced_cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cells(socs: &[f64]) -> Vec<Cell> {
        socs.iter()
            .map(|&soc| Cell::with_parameters(10.0, soc, 25.0, 0.002, 1.0, 1.0))
            .collect()
    }

    #[test]
    fn test_threshold_tightens_with_soc() {
        assert_relative_eq!(spread_threshold(0.0), 0.1);
        assert_relative_eq!(spread_threshold(50.0), 0.05);
        assert_relative_eq!(spread_threshold(100.0), 0.0);
        assert!(spread_threshold(80.0) < spread_threshold(20.0));
    }

    #[test]
    fn test_small_spread_is_left_alone() {
        let mut pack = cells(&[0.50, 0.52, 0.51]);
        let outcome = balance(&mut pack, 51.0);
        assert!(!outcome.is_active());
        assert_eq!(outcome.balanced_cells, 0);
        assert!(pack.iter().all(|c| !c.was_balanced()));
        assert_relative_eq!(pack[1].state_of_charge(), 0.52);
    }

    #[test]
    fn test_leading_cells_are_bled() {
        let mut pack = cells(&[0.80, 0.80, 0.80, 0.90]);
        let outcome = balance(&mut pack, 82.5);
        // threshold = 0.1 - 0.0825 = 0.0175, mean = 0.825, cutoff = 0.8425
        assert!(outcome.is_active());
        assert_eq!(outcome.balanced_cells, 1);
        assert_relative_eq!(outcome.intensity, 0.825 * 0.1 * 0.001, epsilon = 1e-12);
        assert!(pack[3].was_balanced());
        assert!(!pack[0].was_balanced());
        assert_relative_eq!(pack[3].state_of_charge(), 0.90 - outcome.intensity, epsilon = 1e-12);
        assert_relative_eq!(pack[0].state_of_charge(), 0.80);
    }

    #[test]
    fn test_flags_clear_when_spread_recovers() {
        let mut pack = cells(&[0.80, 0.90]);
        balance(&mut pack, 85.0);
        assert!(pack[1].was_balanced());

        pack[1].set_state_of_charge(0.801);
        let outcome = balance(&mut pack, 80.0);
        assert!(!outcome.is_active());
        assert!(pack.iter().all(|c| !c.was_balanced()));
    }
}
