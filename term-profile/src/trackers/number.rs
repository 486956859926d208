//! Numeric statistics split into an integral and a fractional branch.
//!
//! Once the fractional branch holds data the column is treated as
//! fractional: integral values go to the fractional branch, and a fractional
//! value arriving while the integral branch holds data first folds the whole
//! integral branch into the fractional one. At most one branch is ever
//! non-empty.

use tracing::{debug, trace};

use super::NumericStats;
use crate::config::ProfileConfig;
use crate::error::{ProfileError, ProfileResult};
use crate::proto::{NumbersMessage, NumericMessage};
use crate::sketches::{HistogramSketch, HllSketch, KllSketch, MergeableSketch};
use crate::summary::{NumberSummary, QuantileSummary, UniqueCountSummary, QUANTILE_LEVELS};

/// Statistics and sketches for one numeric branch.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSubTracker {
    stats: NumericStats,
    quantiles: KllSketch,
    histogram: HistogramSketch,
    cardinality: HllSketch,
}

impl NumericSubTracker {
    pub fn new(config: &ProfileConfig) -> Self {
        Self {
            stats: NumericStats::new(),
            quantiles: KllSketch::new(config.kll_k),
            histogram: HistogramSketch::new(config.histogram_bins),
            cardinality: HllSketch::new(config.hll_lg_k),
        }
    }

    /// An empty tracker with the same sketch parameters.
    fn empty_like(&self) -> Self {
        Self {
            stats: NumericStats::new(),
            quantiles: KllSketch::new(self.quantiles.k()),
            histogram: HistogramSketch::new(self.histogram.num_buckets() as u16),
            cardinality: HllSketch::new(self.cardinality.lg_k()),
        }
    }

    /// Tracks `value`; `key` is its canonical form.
    pub fn track(&mut self, value: f64, key: &str) {
        self.stats.update(value);
        self.quantiles.update(value);
        self.histogram.update(value);
        self.cardinality.update(key);
    }

    pub fn count(&self) -> u64 {
        self.stats.count()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn stats(&self) -> &NumericStats {
        &self.stats
    }

    pub fn quantiles(&self) -> &KllSketch {
        &self.quantiles
    }

    pub fn histogram(&self) -> &HistogramSketch {
        &self.histogram
    }

    pub fn cardinality(&self) -> &HllSketch {
        &self.cardinality
    }

    pub fn merge(&mut self, other: &Self) -> ProfileResult<()> {
        self.quantiles.merge(&other.quantiles)?;
        self.histogram.merge(&other.histogram)?;
        self.cardinality.merge(&other.cardinality)?;
        self.stats.merge(&other.stats);
        Ok(())
    }

    pub(crate) fn to_message(&self) -> NumericMessage {
        NumericMessage {
            count: self.stats.count(),
            min: self.stats.min().unwrap_or(0.0),
            max: self.stats.max().unwrap_or(0.0),
            mean: self.stats.mean().unwrap_or(0.0),
            m2: self.stats.m2(),
            histogram: self.histogram.to_bytes(),
            quantiles: self.quantiles.to_bytes(),
            cardinality: self.cardinality.to_bytes(),
        }
    }

    pub(crate) fn from_message(message: &NumericMessage) -> ProfileResult<Self> {
        let stats = NumericStats::from_parts(
            message.count,
            message.mean,
            message.m2,
            message.min,
            message.max,
        );
        let tracker = Self {
            stats,
            quantiles: KllSketch::from_bytes(&message.quantiles)?,
            histogram: HistogramSketch::from_bytes(&message.histogram)?,
            cardinality: HllSketch::from_bytes(&message.cardinality)?,
        };
        if tracker.quantiles.count() > tracker.stats.count() {
            return Err(ProfileError::deserialization(format!(
                "numeric tracker: quantile sketch holds {} values but count is {}",
                tracker.quantiles.count(),
                tracker.stats.count()
            )));
        }
        Ok(tracker)
    }
}

/// Routes numeric values into the integral and fractional branches.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberTracker {
    integral: NumericSubTracker,
    fractional: NumericSubTracker,
}

impl NumberTracker {
    pub fn new(config: &ProfileConfig) -> Self {
        Self {
            integral: NumericSubTracker::new(config),
            fractional: NumericSubTracker::new(config),
        }
    }

    /// Tracks an integral value.
    pub fn track_integral(&mut self, value: i64, key: &str) {
        if self.fractional.is_empty() {
            self.integral.track(value as f64, key);
        } else {
            self.fractional.track(value as f64, key);
        }
    }

    /// Tracks a floating-point value, whole or not.
    ///
    /// Infinite values leave both branches untouched and do not promote the
    /// integral branch.
    pub fn track_fractional(&mut self, value: f64, key: &str) {
        if !value.is_finite() {
            trace!(value, "skipping infinite value in numeric statistics");
            return;
        }
        if !self.integral.is_empty() {
            self.promote();
        }
        self.fractional.track(value, key);
    }

    /// Moves the integral branch into the empty fractional one.
    fn promote(&mut self) {
        debug_assert!(self.fractional.is_empty());
        let empty = self.integral.empty_like();
        self.fractional = std::mem::replace(&mut self.integral, empty);
        debug!(
            integral_count = self.fractional.count(),
            "promoting integral values to the fractional branch"
        );
    }

    /// Number of numeric values tracked.
    pub fn count(&self) -> u64 {
        self.integral.count() + self.fractional.count()
    }

    pub fn is_empty(&self) -> bool {
        self.integral.is_empty() && self.fractional.is_empty()
    }

    pub fn integral(&self) -> &NumericSubTracker {
        &self.integral
    }

    pub fn fractional(&self) -> &NumericSubTracker {
        &self.fractional
    }

    /// Merges branch by branch, then folds the integral branch if both hold
    /// data.
    pub fn merge(&mut self, other: &Self) -> ProfileResult<()> {
        self.integral.merge(&other.integral)?;
        self.fractional.merge(&other.fractional)?;
        self.fold_integral()
    }

    /// Folds the integral branch into the fractional one when both hold data.
    fn fold_integral(&mut self) -> ProfileResult<()> {
        if self.integral.is_empty() || self.fractional.is_empty() {
            return Ok(());
        }
        let empty = self.integral.empty_like();
        let integral = std::mem::replace(&mut self.integral, empty);
        debug!(
            integral_count = integral.count(),
            "folding integral branch into fractional"
        );
        self.fractional.merge(&integral)
    }

    /// Both branches combined.
    fn combined(&self) -> ProfileResult<NumericSubTracker> {
        let mut combined = self.integral.clone();
        combined.merge(&self.fractional)?;
        Ok(combined)
    }

    /// Summary of every numeric value; `None` when none was tracked.
    pub fn to_summary(&self) -> Option<NumberSummary> {
        if self.is_empty() {
            return None;
        }
        let combined = if self.fractional.is_empty() {
            self.integral.clone()
        } else if self.integral.is_empty() {
            self.fractional.clone()
        } else {
            self.combined().ok()?
        };

        let stats = combined.stats();
        let quantile_values = combined
            .quantiles()
            .get_quantiles(&QUANTILE_LEVELS)
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        let unique_count = (!combined.cardinality().is_empty()).then(|| {
            let (lower, estimate, upper) = combined.cardinality().bounds();
            UniqueCountSummary {
                estimate,
                lower,
                upper,
            }
        });

        Some(NumberSummary {
            count: stats.count(),
            min: stats.min().unwrap_or(f64::NAN),
            max: stats.max().unwrap_or(f64::NAN),
            mean: stats.mean().unwrap_or(f64::NAN),
            stddev: stats.stddev(),
            is_discrete: self.fractional.is_empty(),
            histogram: combined.histogram().to_summary(),
            quantiles: QuantileSummary {
                quantiles: QUANTILE_LEVELS.to_vec(),
                quantile_values,
            },
            unique_count,
        })
    }

    pub(crate) fn to_message(&self) -> NumbersMessage {
        NumbersMessage {
            integral: Some(self.integral.to_message()),
            fractional: Some(self.fractional.to_message()),
        }
    }

    pub(crate) fn from_message(
        message: Option<&NumbersMessage>,
        config: &ProfileConfig,
    ) -> ProfileResult<Self> {
        let mut tracker = Self::new(config);
        if let Some(message) = message {
            if let Some(integral) = &message.integral {
                tracker.integral = NumericSubTracker::from_message(integral)?;
            }
            if let Some(fractional) = &message.fractional {
                tracker.fractional = NumericSubTracker::from_message(fractional)?;
            }
        }
        tracker.fold_integral()?;
        Ok(tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> NumberTracker {
        NumberTracker::new(&ProfileConfig::default())
    }

    #[test]
    fn test_integral_summary() {
        let mut numbers = tracker();
        for v in [1, 2, 3] {
            numbers.track_integral(v, &v.to_string());
        }

        let summary = numbers.to_summary().unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 3.0);
        assert_eq!(summary.mean, 2.0);
        assert!((summary.stddev - 1.0).abs() < 1e-12);
        assert!(summary.is_discrete);
        assert_eq!(
            summary.quantiles.quantile_values,
            vec![1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 3.0, 3.0, 3.0]
        );
        assert_eq!(summary.unique_count.unwrap().estimate, 3.0);
        assert_eq!(summary.histogram.unwrap().n, 3);
    }

    #[test]
    fn test_fractional_value_promotes_integral_branch() {
        let mut numbers = tracker();
        numbers.track_integral(1, "1");
        numbers.track_integral(2, "2");
        numbers.track_fractional(2.5, "2.5");
        numbers.track_integral(4, "4");

        assert!(numbers.integral().is_empty());
        assert_eq!(numbers.fractional().count(), 4);
        assert_eq!(numbers.fractional().quantiles().count(), 4);
        assert_eq!(numbers.fractional().histogram().count(), 4);

        let summary = numbers.to_summary().unwrap();
        assert!(!summary.is_discrete);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
    }

    #[test]
    fn test_merge_folds_integral_branch() {
        let mut integers = tracker();
        integers.track_integral(7, "7");
        let mut floats = tracker();
        floats.track_fractional(0.5, "0.5");

        let mut forward = integers.clone();
        forward.merge(&floats).unwrap();
        let mut backward = floats.clone();
        backward.merge(&integers).unwrap();

        for merged in [&forward, &backward] {
            assert!(merged.integral().is_empty());
            assert_eq!(merged.fractional().count(), 2);
        }
        assert_eq!(forward.to_summary(), backward.to_summary());
    }

    #[test]
    fn test_infinite_values_skip_numeric_statistics() {
        let mut numbers = tracker();
        for v in [f64::INFINITY, 1.0, 2.0, f64::NEG_INFINITY] {
            numbers.track_fractional(v, &v.to_string());
        }

        let summary = numbers.to_summary().unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean, 1.5);
        assert_eq!(summary.max, 2.0);
        assert!((summary.stddev - 0.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(summary.histogram.unwrap().n, summary.count);

        let decoded =
            NumberTracker::from_message(Some(&numbers.to_message()), &ProfileConfig::default())
                .unwrap();
        assert_eq!(decoded.to_summary(), numbers.to_summary());
    }

    #[test]
    fn test_infinite_value_does_not_promote() {
        let mut numbers = tracker();
        numbers.track_integral(3, "3");
        numbers.track_fractional(f64::INFINITY, "inf");

        assert_eq!(numbers.integral().count(), 1);
        assert!(numbers.fractional().is_empty());
        assert!(numbers.to_summary().unwrap().is_discrete);
    }

    #[test]
    fn test_decoding_folds_both_branches() {
        let mut integers = tracker();
        integers.track_integral(7, "7");
        let mut floats = tracker();
        floats.track_fractional(0.5, "0.5");

        let message = NumbersMessage {
            integral: integers.to_message().integral,
            fractional: floats.to_message().fractional,
        };
        let mut decoded =
            NumberTracker::from_message(Some(&message), &ProfileConfig::default()).unwrap();
        assert!(decoded.integral().is_empty());
        assert_eq!(decoded.fractional().count(), 2);

        decoded.track_integral(9, "9");
        decoded.track_fractional(1.5, "1.5");
        assert!(decoded.integral().is_empty());
        assert_eq!(decoded.fractional().count(), 4);
    }

    #[test]
    fn test_empty_has_no_summary() {
        assert!(tracker().to_summary().is_none());
    }

    #[test]
    fn test_message_roundtrip() {
        let mut numbers = tracker();
        for v in [3.5, -1.25, 8.0] {
            numbers.track_fractional(v, &v.to_string());
        }
        let decoded =
            NumberTracker::from_message(Some(&numbers.to_message()), &ProfileConfig::default())
                .unwrap();
        assert_eq!(decoded.to_summary(), numbers.to_summary());
    }
}
