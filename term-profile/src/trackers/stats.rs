//! Running count, extrema, mean and variance.

/// Welford's online algorithm for mean and variance in O(1) memory.
///
/// Two instances combine with Chan's parallel formula, so statistics over
/// disjoint partitions merge into the statistics of their union.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericStats {
    count: u64,
    mean: f64,
    /// Sum of squared differences from the current mean
    m2: f64,
    min: f64,
    max: f64,
}

impl NumericStats {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Rebuilds statistics from their stored parts.
    pub(crate) fn from_parts(count: u64, mean: f64, m2: f64, min: f64, max: f64) -> Self {
        if count == 0 {
            return Self::new();
        }
        Self {
            count,
            mean,
            m2: m2.max(0.0),
            min,
            max,
        }
    }

    /// Adds a value to the running statistics.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;

        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Combines `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }

        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let count = self.count + other.count;
        let n = count as f64;
        let delta = other.mean - self.mean;

        self.mean = (n_a * self.mean + n_b * other.mean) / n;
        self.m2 = self.m2 + other.m2 + delta * delta * (n_a * n_b) / n;
        self.count = count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    pub(crate) fn m2(&self) -> f64 {
        self.m2
    }

    /// Sample variance (n - 1 denominator), `None` below two values.
    pub fn variance(&self) -> Option<f64> {
        (self.count > 1).then(|| (self.m2 / (self.count - 1) as f64).max(0.0))
    }

    /// Sample standard deviation; 0.0 below two values.
    pub fn stddev(&self) -> f64 {
        self.variance().map_or(0.0, f64::sqrt)
    }
}

impl Default for NumericStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_of(values: &[f64]) -> NumericStats {
        let mut stats = NumericStats::new();
        for &v in values {
            stats.update(v);
        }
        stats
    }

    #[test]
    fn test_empty_has_no_extrema() {
        let stats = NumericStats::new();
        assert!(stats.min().is_none());
        assert!(stats.max().is_none());
        assert!(stats.mean().is_none());
        assert_eq!(stats.stddev(), 0.0);
    }

    #[test]
    fn test_running_values() {
        let stats = stats_of(&[1.0, 2.0, 3.0]);
        assert_eq!(stats.count(), 3);
        assert_eq!(stats.min(), Some(1.0));
        assert_eq!(stats.max(), Some(3.0));
        assert_eq!(stats.mean(), Some(2.0));
        assert!((stats.stddev() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_merge_matches_sequential() {
        let values: Vec<f64> = (0..100).map(|i| (i as f64 * 0.37).sin() * 10.0).collect();
        let sequential = stats_of(&values);

        let mut merged = stats_of(&values[..40]);
        merged.merge(&stats_of(&values[40..]));

        assert_eq!(merged.count(), sequential.count());
        assert!((merged.mean().unwrap() - sequential.mean().unwrap()).abs() < 1e-9);
        assert!((merged.stddev() - sequential.stddev()).abs() < 1e-9);
        assert_eq!(merged.min(), sequential.min());
        assert_eq!(merged.max(), sequential.max());
    }

    #[test]
    fn test_merge_with_empty() {
        let mut stats = NumericStats::new();
        stats.merge(&stats_of(&[4.0]));
        assert_eq!(stats.mean(), Some(4.0));
        stats.merge(&NumericStats::new());
        assert_eq!(stats.count(), 1);
    }
}
