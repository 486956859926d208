//! Column profiles: the aggregate of every tracker for one column.
//!
//! A [`ColumnProfile`] observes a stream of heterogeneous values and keeps a
//! bounded-size statistical fingerprint of them. Profiles built over
//! disjoint partitions of a column merge into the profile of the whole
//! column; merge is commutative and associative up to each sketch's
//! approximation error.
//!
//! # Example
//!
//! ```rust
//! use term_profile::prelude::*;
//!
//! let mut left = ColumnProfile::new("price");
//! let mut right = ColumnProfile::new("price");
//! for v in [1.5, 2.25, 9.0] {
//!     left.track(v);
//! }
//! right.track("3.75");
//! right.track(None::<f64>);
//!
//! let merged = left.merge(&right).unwrap();
//! let summary = merged.to_summary();
//! assert_eq!(summary.counters.count, 5);
//! assert_eq!(summary.counters.null_count, Some(1));
//! assert_eq!(summary.number_summary.unwrap().count, 4);
//! ```

use prost::Message;
use tracing::{debug, instrument, warn};

use crate::config::ProfileConfig;
use crate::error::{ProfileError, ProfileResult};
use crate::logging::truncate_field;
use crate::proto::{ColumnMessage, CountersMessage, SchemaMessage, FORMAT_VERSION};
use crate::summary::{ColumnSummary, NumberSummary, StringSummary, UniqueCountSummary};
use crate::trackers::{
    CardinalityTracker, Counters, FrequentItemsTracker, InferredType, NumberTracker,
    StringTracker, TypeInferenceTracker,
};
use crate::value::TrackedValue;

/// Longest column name written to log fields.
const MAX_LOGGED_NAME: usize = 128;

/// Statistical profile of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    column_name: String,
    config: ProfileConfig,
    counters: Counters,
    schema_tracker: TypeInferenceTracker,
    number_tracker: NumberTracker,
    string_tracker: StringTracker,
    frequent_items: FrequentItemsTracker,
    cardinality_tracker: CardinalityTracker,
}

impl ColumnProfile {
    /// Creates an empty profile with the default configuration.
    pub fn new(column_name: impl Into<String>) -> Self {
        Self::with_config(column_name, ProfileConfig::shared_default().clone())
    }

    /// Creates an empty profile with `config`.
    ///
    /// Out-of-range sketch parameters are clamped by the sketches; use
    /// [`ProfileConfig::builder`] to reject them instead.
    pub fn with_config(column_name: impl Into<String>, config: ProfileConfig) -> Self {
        Self {
            column_name: column_name.into(),
            counters: Counters::new(),
            schema_tracker: TypeInferenceTracker::new(),
            number_tracker: NumberTracker::new(&config),
            string_tracker: StringTracker::new(&config),
            frequent_items: FrequentItemsTracker::new(config.frequent_items_capacity),
            cardinality_tracker: CardinalityTracker::new(config.hll_lg_k),
            config,
        }
    }

    /// Tracks one value.
    ///
    /// Every value is counted and classified. Nulls and values without a
    /// usable representation stop there; numbers and strings update their
    /// trackers, and every other value also feeds the frequent-items and
    /// cardinality trackers with its canonical form.
    pub fn track<'a>(&mut self, value: impl Into<TrackedValue<'a>>) {
        let mut value = value.into();
        if self.config.coerce_strings {
            value = value.coerce();
        }

        let inferred_type = InferredType::classify(&value);
        self.counters.observe(inferred_type);
        self.schema_tracker.observe(inferred_type);
        if matches!(inferred_type, InferredType::Null | InferredType::Unknown) {
            return;
        }

        let Some(key) = value.canonical() else {
            return;
        };
        match &value {
            TrackedValue::Integral(v) => self.number_tracker.track_integral(*v, &key),
            TrackedValue::Fractional(v) => self.number_tracker.track_fractional(*v, &key),
            TrackedValue::String(s) => self.string_tracker.track(s),
            _ => {}
        }
        self.frequent_items.track(&key);
        self.cardinality_tracker.track(&key);
    }

    /// Merges two profiles into a new one.
    ///
    /// Both profiles should describe the same column; a name mismatch is
    /// logged, not rejected. Fails with [`ProfileError::Merge`] when the
    /// sketches were built with different parameters.
    #[instrument(skip(self, other), fields(column = %truncate_field(&self.column_name, MAX_LOGGED_NAME)))]
    pub fn merge(&self, other: &ColumnProfile) -> ProfileResult<ColumnProfile> {
        if self.column_name != other.column_name {
            warn!(
                other_column = %truncate_field(&other.column_name, MAX_LOGGED_NAME),
                "merging profiles of different columns"
            );
        }

        let mut merged = self.clone();
        merged.number_tracker.merge(&other.number_tracker)?;
        merged.string_tracker.merge(&other.string_tracker)?;
        merged.frequent_items.merge(&other.frequent_items)?;
        merged.cardinality_tracker.merge(&other.cardinality_tracker)?;
        merged.counters.merge(&other.counters);
        merged.schema_tracker.merge(&other.schema_tracker);

        debug!(count = merged.counters.count(), "merged column profiles");
        Ok(merged)
    }

    /// Merges `other` into `self`. On error `self` is left unchanged.
    pub fn merge_from(&mut self, other: &ColumnProfile) -> ProfileResult<()> {
        *self = self.merge(other)?;
        Ok(())
    }

    /// Merges any number of profiles by pairwise tree reduction.
    ///
    /// Returns `Ok(None)` for an empty input.
    pub fn merge_all<I>(profiles: I) -> ProfileResult<Option<ColumnProfile>>
    where
        I: IntoIterator<Item = ColumnProfile>,
    {
        let mut level: Vec<ColumnProfile> = profiles.into_iter().collect();
        while level.len() > 1 {
            let mut next = Vec::with_capacity((level.len() + 1) / 2);
            let mut iter = level.into_iter();
            while let Some(left) = iter.next() {
                match iter.next() {
                    Some(right) => next.push(left.merge(&right)?),
                    None => next.push(left),
                }
            }
            level = next;
        }
        Ok(level.pop())
    }

    /// Replaces the cardinality tracker with an empty one of the same
    /// precision. The summary then falls back to the number or string
    /// trackers' distinct counts.
    pub fn reset_cardinality(&mut self) {
        self.cardinality_tracker.reset();
    }

    /// Snapshot of every tracker.
    pub fn to_summary(&self) -> ColumnSummary {
        let number_summary = self.number_tracker.to_summary();
        let string_summary = self.string_tracker.to_summary();
        let unique_count = self.cardinality_tracker.to_summary().or_else(|| {
            fallback_unique_count(number_summary.as_ref(), string_summary.as_ref())
        });

        ColumnSummary {
            counters: self.counters.to_summary(),
            schema: self.schema_tracker.to_summary(),
            number_summary,
            string_summary,
            frequent_items: self.frequent_items.to_summary(),
            unique_count,
        }
    }

    /// Encodes the profile as a protobuf message.
    ///
    /// `counters.null_count` is left unset; readers derive it from the NULL
    /// type count.
    pub fn to_protobuf(&self) -> ColumnMessage {
        ColumnMessage {
            version: FORMAT_VERSION,
            name: self.column_name.clone(),
            counters: Some(CountersMessage {
                count: self.counters.count(),
                true_count: Some(self.counters.true_count()),
                null_count: None,
            }),
            schema: Some(SchemaMessage {
                type_counts: self
                    .schema_tracker
                    .type_counts()
                    .map(|(t, count)| (t.wire_tag(), count))
                    .collect(),
            }),
            numbers: Some(self.number_tracker.to_message()),
            strings: Some(self.string_tracker.to_message()),
            frequent_items: self.frequent_items.to_bytes(),
            cardinality_tracker: self.cardinality_tracker.to_bytes(),
        }
    }

    /// Decodes a profile written by [`ColumnProfile::to_protobuf`].
    ///
    /// An explicit `counters.null_count` (written by older producers) is
    /// added to the NULL type count.
    #[instrument(skip(message), fields(column = %truncate_field(&message.name, MAX_LOGGED_NAME)))]
    pub fn from_protobuf(message: &ColumnMessage) -> ProfileResult<Self> {
        if message.version != FORMAT_VERSION {
            return Err(ProfileError::deserialization(format!(
                "unsupported profile format version {}",
                message.version
            )));
        }
        let counters = message
            .counters
            .as_ref()
            .ok_or_else(|| ProfileError::deserialization("profile message has no counters"))?;

        let mut schema_tracker = TypeInferenceTracker::new();
        if let Some(schema) = &message.schema {
            for (&tag, &count) in &schema.type_counts {
                let inferred_type = InferredType::from_wire_tag(tag).ok_or_else(|| {
                    ProfileError::deserialization(format!("unknown inferred type tag {tag}"))
                })?;
                schema_tracker.add(inferred_type, count)?;
            }
        }
        if let Some(legacy_nulls) = counters.null_count {
            debug!(legacy_nulls, "folding legacy null count into the NULL type count");
            schema_tracker.add(InferredType::Null, legacy_nulls)?;
        }

        let type_total = schema_tracker
            .checked_total()
            .ok_or_else(|| ProfileError::deserialization("type counts overflow u64"))?;
        let non_null_types = type_total - schema_tracker.get_count(InferredType::Null);
        if non_null_types > counters.count {
            return Err(ProfileError::deserialization(format!(
                "type counts ({non_null_types} non-null) exceed the total count {}",
                counters.count
            )));
        }

        let mut config = ProfileConfig::shared_default().clone();
        let number_tracker = NumberTracker::from_message(message.numbers.as_ref(), &config)?;
        let string_tracker = StringTracker::from_message(message.strings.as_ref(), &config)?;
        let frequent_items = if message.frequent_items.is_empty() {
            FrequentItemsTracker::new(config.frequent_items_capacity)
        } else {
            FrequentItemsTracker::from_bytes(&message.frequent_items)?
        };
        let cardinality_tracker = if message.cardinality_tracker.is_empty() {
            CardinalityTracker::new(config.hll_lg_k)
        } else {
            CardinalityTracker::from_bytes(&message.cardinality_tracker)?
        };

        config.hll_lg_k = cardinality_tracker.lg_k();
        config.kll_k = number_tracker.integral().quantiles().k();
        config.histogram_bins = number_tracker.integral().histogram().num_buckets() as u16;
        config.frequent_items_capacity = frequent_items.capacity() as u32;
        config.character_list = string_tracker.char_pos().character_list().to_string();
        config.char_pos_max_positions = string_tracker.char_pos().max_positions() as u32;

        let profile = Self {
            column_name: message.name.clone(),
            counters: Counters::from_parts(
                counters.count,
                counters.true_count.unwrap_or(0),
                schema_tracker.get_count(InferredType::Null),
            ),
            schema_tracker,
            number_tracker,
            string_tracker,
            frequent_items,
            cardinality_tracker,
            config,
        };
        profile.check_parameters()?;
        Ok(profile)
    }

    /// Rejects decoded profiles whose parts disagree on sketch parameters,
    /// since they could never be merged or promoted.
    fn check_parameters(&self) -> ProfileResult<()> {
        let numbers = [self.number_tracker.integral(), self.number_tracker.fractional()];
        let consistent = numbers.iter().all(|n| {
            n.quantiles().k() == self.config.kll_k
                && n.histogram().num_buckets() == usize::from(self.config.histogram_bins)
                && n.cardinality().lg_k() == self.config.hll_lg_k
        }) && self.string_tracker.cardinality().lg_k() == self.config.hll_lg_k;

        if consistent {
            Ok(())
        } else {
            Err(ProfileError::deserialization(
                "profile parts were built with inconsistent sketch parameters",
            ))
        }
    }

    /// Encodes the profile as protobuf bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_protobuf().encode_to_vec()
    }

    /// Decodes protobuf bytes written by [`ColumnProfile::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> ProfileResult<Self> {
        let message = ColumnMessage::decode(bytes)?;
        Self::from_protobuf(&message)
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn schema_tracker(&self) -> &TypeInferenceTracker {
        &self.schema_tracker
    }

    pub fn number_tracker(&self) -> &NumberTracker {
        &self.number_tracker
    }

    pub fn string_tracker(&self) -> &StringTracker {
        &self.string_tracker
    }

    pub fn frequent_items(&self) -> &FrequentItemsTracker {
        &self.frequent_items
    }

    pub fn cardinality_tracker(&self) -> &CardinalityTracker {
        &self.cardinality_tracker
    }
}

/// Distinct count used when the column-level tracker is empty: the number
/// tracker's if it has data, else the string tracker's.
fn fallback_unique_count(
    number: Option<&NumberSummary>,
    string: Option<&StringSummary>,
) -> Option<UniqueCountSummary> {
    number
        .and_then(|n| n.unique_count)
        .or_else(|| string.and_then(|s| s.unique_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_counts_every_value() {
        let mut profile = ColumnProfile::new("c");
        profile.track(1);
        profile.track("x");
        profile.track(None::<i64>);
        profile.track(&[0xffu8][..]);

        assert_eq!(profile.counters().count(), 4);
        assert_eq!(profile.counters().null_count(), 1);
        assert_eq!(profile.schema_tracker().get_count(InferredType::Unknown), 1);
        assert_eq!(profile.number_tracker().count(), 1);
        assert_eq!(profile.string_tracker().count(), 1);
        assert_eq!(profile.frequent_items().items().len(), 2);
    }

    #[test]
    fn test_coercion_can_be_disabled() {
        let config = ProfileConfig::builder().coerce_strings(false).build().unwrap();
        let mut profile = ColumnProfile::with_config("c", config);
        profile.track("42");
        assert_eq!(profile.schema_tracker().get_count(InferredType::String), 1);
        assert!(profile.number_tracker().is_empty());
    }

    #[test]
    fn test_merge_leaves_inputs_untouched() {
        let mut a = ColumnProfile::new("c");
        a.track(1);
        let mut b = ColumnProfile::new("c");
        b.track(2);

        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.counters().count(), 2);
        assert_eq!(a.counters().count(), 1);
        assert_eq!(b.counters().count(), 1);
    }

    #[test]
    fn test_merge_rejects_incompatible_sketches() {
        let mut a = ColumnProfile::new("c");
        a.track(1);
        let config = ProfileConfig::builder().hll_lg_k(10).build().unwrap();
        let mut b = ColumnProfile::with_config("c", config);
        b.track(2);

        let before = a.clone();
        assert!(a.merge_from(&b).unwrap_err().is_merge());
        assert_eq!(a, before);
    }

    #[test]
    fn test_merge_all() {
        assert!(ColumnProfile::merge_all(Vec::new()).unwrap().is_none());

        let profiles: Vec<ColumnProfile> = (0..5)
            .map(|i| {
                let mut p = ColumnProfile::new("c");
                p.track(i);
                p
            })
            .collect();
        let merged = ColumnProfile::merge_all(profiles).unwrap().unwrap();
        assert_eq!(merged.counters().count(), 5);
        assert_eq!(merged.number_tracker().count(), 5);
    }

    #[test]
    fn test_fallback_prefers_numbers() {
        let mut profile = ColumnProfile::new("c");
        profile.track("a");
        profile.track("b");
        profile.track("c");
        profile.track(1);
        profile.reset_cardinality();

        let summary = profile.to_summary();
        assert_eq!(summary.unique_count.unwrap().estimate, 1.0);
    }

    #[test]
    fn test_fallback_prefers_numbers_on_equal_counts() {
        let mut profile = ColumnProfile::new("c");
        profile.track(5);
        profile.track(5);
        profile.track("a");
        profile.track("b");
        profile.reset_cardinality();

        let summary = profile.to_summary();
        assert_eq!(summary.number_summary.as_ref().unwrap().count, 2);
        assert_eq!(summary.string_summary.as_ref().unwrap().count, 2);
        assert_eq!(summary.unique_count.unwrap().estimate, 1.0);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut message = ColumnProfile::new("c").to_protobuf();
        message.version = 2;
        assert!(ColumnProfile::from_protobuf(&message)
            .unwrap_err()
            .is_deserialization());
    }
}
