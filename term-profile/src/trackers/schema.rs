//! Type inference over the values of a column.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, ProfileResult};
use crate::summary::{InferredTypeSummary, SchemaSummary};
use crate::value::TrackedValue;

/// Type of a single observed value.
///
/// Declaration order is the tie-break order when two types are equally
/// frequent: the earlier variant wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InferredType {
    Null,
    Boolean,
    Integral,
    Fractional,
    String,
    Unknown,
}

impl InferredType {
    /// Every type, in declaration order.
    pub const ALL: [InferredType; 6] = [
        InferredType::Null,
        InferredType::Boolean,
        InferredType::Integral,
        InferredType::Fractional,
        InferredType::String,
        InferredType::Unknown,
    ];

    /// Classifies a value: null, then boolean, integral, fractional, string,
    /// and unknown for anything else.
    pub fn classify(value: &TrackedValue<'_>) -> Self {
        if value.is_null() {
            return InferredType::Null;
        }
        match value {
            TrackedValue::Boolean(_) => InferredType::Boolean,
            TrackedValue::Integral(_) => InferredType::Integral,
            TrackedValue::Fractional(_) => InferredType::Fractional,
            TrackedValue::String(_) => InferredType::String,
            TrackedValue::Null | TrackedValue::Unknown => InferredType::Unknown,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Tag used for this type in serialized profiles.
    pub fn wire_tag(self) -> i32 {
        match self {
            InferredType::Unknown => 0,
            InferredType::Null => 1,
            InferredType::Fractional => 2,
            InferredType::Integral => 3,
            InferredType::Boolean => 4,
            InferredType::String => 5,
        }
    }

    /// Inverse of [`InferredType::wire_tag`].
    pub fn from_wire_tag(tag: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.wire_tag() == tag)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InferredType::Null => "NULL",
            InferredType::Boolean => "BOOLEAN",
            InferredType::Integral => "INTEGRAL",
            InferredType::Fractional => "FRACTIONAL",
            InferredType::String => "STRING",
            InferredType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Per-type observation counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeInferenceTracker {
    counts: [u64; 6],
}

impl TypeInferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observation of `inferred_type`.
    pub fn observe(&mut self, inferred_type: InferredType) {
        self.counts[inferred_type.index()] += 1;
    }

    /// Adds decoded observations. Fails instead of overflowing.
    pub(crate) fn add(&mut self, inferred_type: InferredType, count: u64) -> ProfileResult<()> {
        let slot = &mut self.counts[inferred_type.index()];
        *slot = slot.checked_add(count).ok_or_else(|| {
            ProfileError::deserialization(format!("{inferred_type} count overflows u64"))
        })?;
        Ok(())
    }

    /// Count for `inferred_type`, 0 if never observed.
    pub fn get_count(&self, inferred_type: InferredType) -> u64 {
        self.counts[inferred_type.index()]
    }

    /// Total number of observations, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.checked_total().unwrap_or(u64::MAX)
    }

    /// Total number of observations, `None` on overflow.
    pub fn checked_total(&self) -> Option<u64> {
        self.counts
            .iter()
            .try_fold(0u64, |total, &count| total.checked_add(count))
    }

    /// Non-zero counts in declaration order.
    pub fn type_counts(&self) -> impl Iterator<Item = (InferredType, u64)> + '_ {
        InferredType::ALL
            .into_iter()
            .map(|t| (t, self.get_count(t)))
            .filter(|&(_, count)| count > 0)
    }

    /// Most frequent type and its share of all observations.
    ///
    /// Ties go to the earlier [`InferredType`] variant. Without observations
    /// the result is `(Unknown, 0.0)`.
    pub fn dominant(&self) -> (InferredType, f64) {
        let total = self.total();
        if total == 0 {
            return (InferredType::Unknown, 0.0);
        }
        let mut best = InferredType::ALL[0];
        for t in InferredType::ALL {
            if self.get_count(t) > self.get_count(best) {
                best = t;
            }
        }
        (best, self.get_count(best) as f64 / total as f64)
    }

    pub fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts.iter()) {
            *mine += theirs;
        }
    }

    pub fn to_summary(&self) -> SchemaSummary {
        let (inferred_type, ratio) = self.dominant();
        SchemaSummary {
            inferred_type: InferredTypeSummary {
                inferred_type,
                ratio,
            },
            type_counts: self.type_counts().collect::<BTreeMap<_, _>>(),
        }
    }
}
