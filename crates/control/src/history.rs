use serde::Serialize;

pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// One recorded point of the charge curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    pub time_s: f64,
    pub soc_percent: f64,
    pub power_kw: f64,
    pub current_a: f64,
    pub voltage_v: f64,
    pub temperature_c: f64,
}

/// Insertion-ordered sample series with a soft size bound.
///
/// When a push takes the series over capacity every other sample is
/// dropped, halving the resolution but keeping the full time span.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleHistory {
    points: Vec<DataPoint>,
    capacity: usize,
}

impl Default for SampleHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SampleHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        SampleHistory {
            points: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, point: DataPoint) {
        self.points.push(point);
        if self.points.len() > self.capacity {
            self.downsample();
        }
    }

    /// Keeps the samples at even positions.
    fn downsample(&mut self) {
        let before = self.points.len();
        let mut index = 0;
        self.points.retain(|_| {
            let keep = index % 2 == 0;
            index += 1;
            keep
        });
        log::debug!("sample history down-sampled {} -> {}", before, self.points.len());
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn last(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(t: f64) -> DataPoint {
        DataPoint {
            time_s: t,
            soc_percent: 0.0,
            power_kw: 0.0,
            current_a: 0.0,
            voltage_v: 0.0,
            temperature_c: 0.0,
        }
    }

    #[test]
    fn test_grows_until_capacity() {
        let mut history = SampleHistory::with_capacity(10);
        for i in 0..10 {
            history.push(point(i as f64));
        }
        assert_eq!(history.len(), 10);
    }

    #[test]
    fn test_overflow_drops_every_other_sample() {
        let mut history = SampleHistory::with_capacity(10);
        for i in 0..11 {
            history.push(point(i as f64));
        }
        let times: Vec<f64> = history.points().iter().map(|p| p.time_s).collect();
        assert_eq!(times, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn test_default_cap_bounds_growth() {
        let mut history = SampleHistory::default();
        for i in 0..5000 {
            history.push(point(i as f64));
            assert!(history.len() <= DEFAULT_HISTORY_CAPACITY);
        }
        let times: Vec<f64> = history.points().iter().map(|p| p.time_s).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(times[0], 0.0);
    }

    #[test]
    fn test_exact_downsample_at_default_cap() {
        let mut history = SampleHistory::default();
        for i in 0..=1000 {
            history.push(point(i as f64));
        }
        assert_eq!(history.len(), 501);
        assert_eq!(history.last().map(|p| p.time_s), Some(1000.0));
    }
}
