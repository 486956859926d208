//! String length, character position and distinct-count tracking.

use super::{CharPosTracker, NumericStats};
use crate::config::ProfileConfig;
use crate::error::{ProfileError, ProfileResult};
use crate::proto::{NumericMessage, StringsMessage};
use crate::sketches::{HllSketch, MergeableSketch};
use crate::summary::{StatsSummary, StringSummary, UniqueCountSummary};

/// Statistics over the string values of a column.
#[derive(Debug, Clone, PartialEq)]
pub struct StringTracker {
    /// Lengths in characters
    length: NumericStats,
    char_pos: CharPosTracker,
    cardinality: HllSketch,
}

impl StringTracker {
    pub fn new(config: &ProfileConfig) -> Self {
        Self {
            length: NumericStats::new(),
            char_pos: CharPosTracker::new(&config.character_list, config.char_pos_max_positions),
            cardinality: HllSketch::new(config.hll_lg_k),
        }
    }

    pub fn track(&mut self, value: &str) {
        self.length.update(value.chars().count() as f64);
        self.char_pos.track(value);
        self.cardinality.update(value);
    }

    pub fn count(&self) -> u64 {
        self.length.count()
    }

    pub fn is_empty(&self) -> bool {
        self.length.is_empty()
    }

    pub fn length(&self) -> &NumericStats {
        &self.length
    }

    pub fn char_pos(&self) -> &CharPosTracker {
        &self.char_pos
    }

    pub fn cardinality(&self) -> &HllSketch {
        &self.cardinality
    }

    pub fn merge(&mut self, other: &Self) -> ProfileResult<()> {
        self.char_pos.merge(&other.char_pos)?;
        self.cardinality.merge(&other.cardinality)?;
        self.length.merge(&other.length);
        Ok(())
    }

    /// `None` when no string was tracked.
    pub fn to_summary(&self) -> Option<StringSummary> {
        if self.is_empty() {
            return None;
        }
        let (lower, estimate, upper) = self.cardinality.bounds();
        Some(StringSummary {
            count: self.count(),
            length: StatsSummary {
                count: self.length.count(),
                min: self.length.min().unwrap_or(0.0),
                max: self.length.max().unwrap_or(0.0),
                mean: self.length.mean().unwrap_or(0.0),
                stddev: self.length.stddev(),
            },
            unique_count: Some(UniqueCountSummary {
                estimate,
                lower,
                upper,
            }),
            char_pos_tracker: self.char_pos.to_summary(),
        })
    }

    pub(crate) fn to_message(&self) -> StringsMessage {
        StringsMessage {
            length: Some(NumericMessage {
                count: self.length.count(),
                min: self.length.min().unwrap_or(0.0),
                max: self.length.max().unwrap_or(0.0),
                mean: self.length.mean().unwrap_or(0.0),
                m2: self.length.m2(),
                ..Default::default()
            }),
            char_pos: Some(self.char_pos.to_message()),
            cardinality: self.cardinality.to_bytes(),
        }
    }

    pub(crate) fn from_message(
        message: Option<&StringsMessage>,
        config: &ProfileConfig,
    ) -> ProfileResult<Self> {
        let Some(message) = message else {
            return Ok(Self::new(config));
        };
        let length = message.length.as_ref().map_or_else(NumericStats::new, |m| {
            NumericStats::from_parts(m.count, m.mean, m.m2, m.min, m.max)
        });
        let char_pos = match &message.char_pos {
            Some(char_pos) => CharPosTracker::from_message(char_pos)?,
            None => CharPosTracker::new(&config.character_list, config.char_pos_max_positions),
        };
        let cardinality = if message.cardinality.is_empty() {
            HllSketch::new(config.hll_lg_k)
        } else {
            HllSketch::from_bytes(&message.cardinality)?
        };
        if length.is_empty() && !cardinality.is_empty() {
            return Err(ProfileError::deserialization(
                "string tracker: distinct values recorded without any string",
            ));
        }
        Ok(Self {
            length,
            char_pos,
            cardinality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_cardinality() {
        let mut strings = StringTracker::new(&ProfileConfig::default());
        for s in ["ab", "abcd", "ab", "\u{e9}t\u{e9}"] {
            strings.track(s);
        }

        let summary = strings.to_summary().unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.length.min, 2.0);
        assert_eq!(summary.length.max, 4.0);
        assert!((summary.length.mean - 2.75).abs() < 1e-12);
        assert_eq!(summary.unique_count.unwrap().estimate, 3.0);
        assert_eq!(summary.char_pos_tracker.char_pos_map["a"][0], 3);
    }

    #[test]
    fn test_empty_tracker() {
        let strings = StringTracker::new(&ProfileConfig::default());
        assert!(strings.to_summary().is_none());
        assert_eq!(strings.char_pos().character_list().chars().count(), 56);
    }

    #[test]
    fn test_message_roundtrip_keeps_character_list() {
        let config = ProfileConfig::default();
        let strings = StringTracker::new(&config);
        let decoded = StringTracker::from_message(Some(&strings.to_message()), &config).unwrap();
        assert_eq!(decoded, strings);
    }
}
