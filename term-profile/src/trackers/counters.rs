//! Exact totals of a column.

use super::InferredType;
use crate::summary::CountersSummary;

/// Exact counts of all, boolean `true` and null observations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    count: u64,
    true_count: u64,
    null_count: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(count: u64, true_count: u64, null_count: u64) -> Self {
        Self {
            count,
            true_count,
            null_count,
        }
    }

    /// Records one observation. Boolean observations also count towards
    /// `true_count`.
    pub(crate) fn observe(&mut self, inferred_type: InferredType) {
        self.count += 1;
        match inferred_type {
            InferredType::Null => self.null_count += 1,
            InferredType::Boolean => self.true_count += 1,
            _ => {}
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn true_count(&self) -> u64 {
        self.true_count
    }

    pub fn null_count(&self) -> u64 {
        self.null_count
    }

    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.true_count += other.true_count;
        self.null_count += other.null_count;
    }

    pub fn to_summary(&self) -> CountersSummary {
        CountersSummary {
            count: self.count,
            true_count: (self.true_count > 0).then_some(self.true_count),
            null_count: (self.null_count > 0).then_some(self.null_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_and_summary() {
        let mut counters = Counters::new();
        counters.observe(InferredType::Integral);
        counters.observe(InferredType::Null);
        counters.observe(InferredType::Boolean);
        counters.observe(InferredType::Boolean);

        let summary = counters.to_summary();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.null_count, Some(1));
        assert_eq!(summary.true_count, Some(2));
    }

    #[test]
    fn test_zero_counts_are_omitted() {
        let mut counters = Counters::new();
        counters.observe(InferredType::String);
        let snapshot = counters;
        counters.merge(&snapshot);
        let summary = counters.to_summary();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.true_count, None);
        assert_eq!(summary.null_count, None);
    }
}
