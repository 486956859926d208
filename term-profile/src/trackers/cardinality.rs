//! Distinct-count tracking over canonical value forms.

use crate::error::ProfileResult;
use crate::sketches::{HllSketch, MergeableSketch};
use crate::summary::UniqueCountSummary;

/// Approximate number of distinct values.
#[derive(Debug, Clone, PartialEq)]
pub struct CardinalityTracker {
    sketch: HllSketch,
}

impl CardinalityTracker {
    /// Creates an empty tracker with `2^lg_k` registers.
    pub fn new(lg_k: u8) -> Self {
        Self {
            sketch: HllSketch::new(lg_k),
        }
    }

    /// Tracks the canonical form of a value.
    pub fn track(&mut self, key: &str) {
        self.sketch.update(key);
    }

    pub fn lg_k(&self) -> u8 {
        self.sketch.lg_k()
    }

    pub fn is_empty(&self) -> bool {
        self.sketch.is_empty()
    }

    pub fn estimate(&self) -> f64 {
        self.sketch.estimate()
    }

    /// Empties the tracker, keeping its precision.
    pub fn reset(&mut self) {
        self.sketch = HllSketch::new(self.sketch.lg_k());
    }

    pub fn merge(&mut self, other: &Self) -> ProfileResult<()> {
        self.sketch.merge(&other.sketch)
    }

    /// Estimate with bounds; `None` when nothing was tracked.
    pub fn to_summary(&self) -> Option<UniqueCountSummary> {
        if self.is_empty() {
            return None;
        }
        let (lower, estimate, upper) = self.sketch.bounds();
        Some(UniqueCountSummary {
            estimate,
            lower,
            upper,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.sketch.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> ProfileResult<Self> {
        Ok(Self {
            sketch: HllSketch::from_bytes(bytes)?,
        })
    }
}

impl Default for CardinalityTracker {
    fn default() -> Self {
        Self::new(12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_and_reset() {
        let mut tracker = CardinalityTracker::new(12);
        assert!(tracker.to_summary().is_none());

        for key in ["1", "2", "3", "2"] {
            tracker.track(key);
        }
        let summary = tracker.to_summary().unwrap();
        assert_eq!(summary.estimate, 3.0);
        assert!(summary.lower <= summary.estimate && summary.estimate <= summary.upper);

        tracker.reset();
        assert!(tracker.is_empty());
        assert_eq!(tracker.lg_k(), 12);
    }

    #[test]
    fn test_merge_precision_mismatch() {
        let mut a = CardinalityTracker::new(10);
        let b = CardinalityTracker::new(12);
        assert!(a.merge(&b).is_err());
    }
}
