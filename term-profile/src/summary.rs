//! Human-readable snapshot of a column profile.
//!
//! Summaries are plain serde structs with camelCase field names. Exact
//! counters (`u64`) are written as decimal strings so that JSON consumers
//! with 53-bit numbers do not lose precision; floats are IEEE-754 doubles.
//!
//! # Example
//!
//! ```rust
//! use term_profile::prelude::*;
//!
//! let mut profile = ColumnProfile::new("age");
//! for v in [31, 45, 27] {
//!     profile.track(v);
//! }
//!
//! let summary = profile.to_summary();
//! assert_eq!(summary.counters.count, 3);
//!
//! let json = summary.to_json().unwrap();
//! assert!(json.contains("\"count\": \"3\""));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ProfileResult;
use crate::trackers::InferredType;

/// Quantile levels reported by every number summary.
pub const QUANTILE_LEVELS: [f64; 9] = [0.0, 0.01, 0.05, 0.25, 0.5, 0.75, 0.95, 0.99, 1.0];

/// Snapshot of every tracker of a column profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub counters: CountersSummary,
    pub schema: SchemaSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_summary: Option<NumberSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_summary: Option<StringSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequent_items: Option<FrequentItemsSummary>,
    /// Overall distinct-count estimate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_count: Option<UniqueCountSummary>,
}

impl ColumnSummary {
    /// Renders the summary as pretty-printed JSON.
    pub fn to_json(&self) -> ProfileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Exact counters. `true_count` and `null_count` are omitted when zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountersSummary {
    #[serde(with = "decimal")]
    pub count: u64,
    #[serde(default, with = "decimal::option", skip_serializing_if = "Option::is_none")]
    pub true_count: Option<u64>,
    #[serde(default, with = "decimal::option", skip_serializing_if = "Option::is_none")]
    pub null_count: Option<u64>,
}

/// Inferred type with per-type counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSummary {
    pub inferred_type: InferredTypeSummary,
    /// Counts of every type observed at least once
    #[serde(with = "decimal::map")]
    pub type_counts: BTreeMap<InferredType, u64>,
}

/// Dominant type and the share of observations it accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferredTypeSummary {
    #[serde(rename = "type")]
    pub inferred_type: InferredType,
    pub ratio: f64,
}

/// Statistics over the numeric values of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberSummary {
    #[serde(with = "decimal")]
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    /// True when every numeric value was integral
    pub is_discrete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<HistogramSummary>,
    pub quantiles: QuantileSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_count: Option<UniqueCountSummary>,
}

/// Histogram with integral bucket counts summing to `n`.
///
/// `bins` holds the bucket edges, one more than `counts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramSummary {
    pub start: f64,
    pub end: f64,
    pub width: f64,
    #[serde(with = "decimal::seq")]
    pub counts: Vec<u64>,
    pub bins: Vec<f64>,
    #[serde(with = "decimal")]
    pub n: u64,
    pub min: f64,
    pub max: f64,
}

/// Quantile levels and their approximate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantileSummary {
    pub quantiles: Vec<f64>,
    pub quantile_values: Vec<f64>,
}

/// Distinct-count estimate with bounds at two standard errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniqueCountSummary {
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Count, extrema, mean and standard deviation of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    #[serde(with = "decimal")]
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
}

/// Statistics over the string values of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringSummary {
    #[serde(with = "decimal")]
    pub count: u64,
    /// String lengths in characters
    pub length: StatsSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_count: Option<UniqueCountSummary>,
    pub char_pos_tracker: CharPosSummary,
}

/// Per-position character counts.
///
/// Each entry of `char_pos_map` lists, for one character (or `"other"`),
/// how often it occurred at positions 0, 1, 2, ... Entries stop at the last
/// position any string reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharPosSummary {
    pub character_list: String,
    #[serde(with = "decimal::seq_map")]
    pub char_pos_map: BTreeMap<String, Vec<u64>>,
    /// The same counts grouped into digit, letter, punctuation, whitespace and other
    #[serde(with = "decimal::seq_map")]
    pub categories: BTreeMap<String, Vec<u64>>,
}

/// Heavy hitters, highest estimate first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequentItemsSummary {
    pub items: Vec<FrequentItemSummary>,
}

/// One heavy hitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequentItemSummary {
    /// Canonical text of the value
    pub json_value: String,
    #[serde(with = "decimal")]
    pub estimate: u64,
}

/// Serde adapters writing `u64` as decimal strings.
///
/// Deserialization accepts both strings and plain JSON numbers.
pub mod decimal {
    use std::collections::BTreeMap;
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    struct Decimal(u64);

    impl Serialize for Decimal {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(&self.0)
        }
    }

    impl<'de> Deserialize<'de> for Decimal {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            struct DecimalVisitor;

            impl Visitor<'_> for DecimalVisitor {
                type Value = Decimal;

                fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    f.write_str("an unsigned integer or its decimal string")
                }

                fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
                    Ok(Decimal(v))
                }

                fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
                    v.parse().map(Decimal).map_err(E::custom)
                }
            }

            deserializer.deserialize_any(DecimalVisitor)
        }
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        Decimal(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Decimal::deserialize(deserializer).map(|d| d.0)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<u64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            value.map(Decimal).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            Ok(Option::<Decimal>::deserialize(deserializer)?.map(|d| d.0))
        }
    }

    pub mod seq {
        use super::*;

        pub fn serialize<S: Serializer>(values: &[u64], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(values.iter().map(|&v| Decimal(v)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<u64>, D::Error> {
            Ok(Vec::<Decimal>::deserialize(deserializer)?
                .into_iter()
                .map(|d| d.0)
                .collect())
        }
    }

    pub mod map {
        use super::*;

        pub fn serialize<K, S>(values: &BTreeMap<K, u64>, serializer: S) -> Result<S::Ok, S::Error>
        where
            K: Serialize,
            S: Serializer,
        {
            serializer.collect_map(values.iter().map(|(k, &v)| (k, Decimal(v))))
        }

        pub fn deserialize<'de, K, D>(deserializer: D) -> Result<BTreeMap<K, u64>, D::Error>
        where
            K: Deserialize<'de> + Ord,
            D: Deserializer<'de>,
        {
            Ok(BTreeMap::<K, Decimal>::deserialize(deserializer)?
                .into_iter()
                .map(|(k, d)| (k, d.0))
                .collect())
        }
    }

    pub mod seq_map {
        use super::*;

        pub fn serialize<S: Serializer>(
            values: &BTreeMap<String, Vec<u64>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.collect_map(values.iter().map(|(k, counts)| {
                (k, counts.iter().map(|&v| Decimal(v)).collect::<Vec<_>>())
            }))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<BTreeMap<String, Vec<u64>>, D::Error> {
            Ok(BTreeMap::<String, Vec<Decimal>>::deserialize(deserializer)?
                .into_iter()
                .map(|(k, counts)| (k, counts.into_iter().map(|d| d.0).collect()))
                .collect())
        }
    }
}
