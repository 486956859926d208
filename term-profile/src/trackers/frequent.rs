//! Heavy hitters over canonical value forms.

use crate::error::ProfileResult;
use crate::sketches::{FrequentItem, FrequentItemsSketch, MergeableSketch};
use crate::summary::{FrequentItemSummary, FrequentItemsSummary};

/// Approximate most frequent values of a column. Never sees nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequentItemsTracker {
    sketch: FrequentItemsSketch,
}

impl FrequentItemsTracker {
    pub fn new(capacity: u32) -> Self {
        Self {
            sketch: FrequentItemsSketch::new(capacity),
        }
    }

    /// Tracks the canonical form of a non-null value.
    pub fn track(&mut self, key: &str) {
        self.sketch.update(key);
    }

    /// True iff no value was ever tracked.
    pub fn is_empty(&self) -> bool {
        self.sketch.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.sketch.capacity()
    }

    /// Kept values with their estimates and lower bounds.
    pub fn items(&self) -> Vec<FrequentItem> {
        self.sketch.items()
    }

    pub fn merge(&mut self, other: &Self) -> ProfileResult<()> {
        self.sketch.merge(&other.sketch)
    }

    pub fn to_summary(&self) -> Option<FrequentItemsSummary> {
        if self.is_empty() {
            return None;
        }
        let items = self
            .sketch
            .items()
            .into_iter()
            .map(|item| FrequentItemSummary {
                json_value: item.value,
                estimate: item.estimate,
            })
            .collect();
        Some(FrequentItemsSummary { items })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.sketch.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> ProfileResult<Self> {
        Ok(Self {
            sketch: FrequentItemsSketch::from_bytes(bytes)?,
        })
    }
}

impl Default for FrequentItemsTracker {
    fn default() -> Self {
        Self {
            sketch: FrequentItemsSketch::default(),
        }
    }
}
