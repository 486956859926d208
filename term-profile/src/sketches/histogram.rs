//! Fixed-bucket histogram over a range that grows by aligned doubling.
//!
//! The sketch keeps an even number of equal-width buckets. The first distinct
//! pair of values fixes the initial range; a value outside it doubles the
//! bucket width towards that value until it fits. Doubling is aligned (each
//! new bucket is exactly two old buckets) so growth never smears counts.
//!
//! Merging two histograms with different grids builds a grid covering both
//! ranges and redistributes each source bucket by overlap, with bucket edges
//! clamped to the observed min/max.

use std::cmp::Ordering;

use super::codec::{Decoder, Encoder};
use super::{family, MergeableSketch};
use crate::error::{ProfileError, ProfileResult};
use crate::summary::HistogramSummary;

const FORMAT_VERSION: u8 = 1;

/// Upper bound on doubling steps for one value; reached only for ranges near
/// `f64::MAX`, where the width overflows to infinity.
const MAX_DOUBLINGS: usize = 2048;

/// Histogram sketch over finite `f64` values.
///
/// While every observed value is equal the sketch is degenerate: the width is
/// zero and all the weight sits at `min`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSketch {
    counts: Vec<f64>,
    start: f64,
    width: f64,
    n: u64,
    min: f64,
    max: f64,
}

impl HistogramSketch {
    /// Creates an empty histogram. `num_buckets` is rounded up to an even
    /// number of at least 2.
    pub fn new(num_buckets: u16) -> Self {
        let num_buckets = usize::from(num_buckets.max(2));
        let num_buckets = num_buckets + num_buckets % 2;
        Self {
            counts: vec![0.0; num_buckets],
            start: 0.0,
            width: 0.0,
            n: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.counts.len()
    }

    /// Number of values tracked.
    pub fn count(&self) -> u64 {
        self.n
    }

    fn end(&self) -> f64 {
        self.start + self.width * self.counts.len() as f64
    }

    fn is_degenerate(&self) -> bool {
        self.n > 0 && self.width == 0.0
    }

    /// Tracks a value. Non-finite values are ignored.
    pub fn update(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }

        if self.n == 0 {
            self.n = 1;
            self.min = value;
            self.max = value;
            return;
        }

        if self.is_degenerate() {
            if value == self.min {
                self.n += 1;
                return;
            }
            self.open_range(value);
        } else {
            self.cover(value);
        }

        let bucket = self.bucket_index(value);
        self.counts[bucket] += 1.0;
        self.n += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Leaves the degenerate state: the grid spans the previous point and
    /// `value`, with the larger one inside the last bucket.
    fn open_range(&mut self, value: f64) {
        let lo = self.min.min(value);
        let hi = self.max.max(value);
        self.start = lo;
        self.width = (hi - lo) / (self.counts.len() - 1) as f64;
        let point = self.bucket_index(self.min);
        self.counts[point] += self.n as f64;
    }

    /// Doubles the bucket width until `value` falls inside the range.
    fn cover(&mut self, value: f64) {
        let num_buckets = self.counts.len();
        for _ in 0..MAX_DOUBLINGS {
            if value >= self.end() {
                for i in 0..num_buckets {
                    let c = std::mem::take(&mut self.counts[i]);
                    self.counts[i / 2] += c;
                }
            } else if value < self.start {
                let mut widened = vec![0.0; num_buckets];
                for (i, c) in self.counts.iter().enumerate() {
                    widened[(num_buckets + i) / 2] += c;
                }
                self.counts = widened;
                self.start -= self.width * num_buckets as f64;
            } else {
                return;
            }
            self.width *= 2.0;
        }
    }

    fn bucket_index(&self, value: f64) -> usize {
        let last = self.counts.len() - 1;
        if self.width <= 0.0 {
            return 0;
        }
        let raw = ((value - self.start) / self.width).floor();
        if raw.is_nan() || raw < 0.0 {
            0
        } else {
            (raw as usize).min(last)
        }
    }

    /// Adds this sketch's mass, laid out on `target`'s grid, into `out`.
    fn redistribute_into(&self, target: &HistogramSketch, out: &mut [f64]) {
        if self.n == 0 {
            return;
        }
        if self.is_degenerate() {
            out[target.bucket_index(self.min)] += self.n as f64;
            return;
        }

        for (i, &weight) in self.counts.iter().enumerate() {
            if weight == 0.0 {
                continue;
            }
            let lo = (self.start + self.width * i as f64).max(self.min);
            let hi = (self.start + self.width * (i + 1) as f64).min(self.max);
            if hi <= lo {
                out[target.bucket_index(lo)] += weight;
                continue;
            }

            let first = target.bucket_index(lo);
            let last = target.bucket_index(hi);
            if first == last {
                out[first] += weight;
                continue;
            }
            let span = hi - lo;
            for (j, slot) in out.iter_mut().enumerate().take(last + 1).skip(first) {
                let bucket_lo = target.start + target.width * j as f64;
                let bucket_hi = bucket_lo + target.width;
                let overlap = hi.min(bucket_hi) - lo.max(bucket_lo);
                if overlap > 0.0 {
                    *slot += weight * overlap / span;
                }
            }
        }
    }

    /// Summarizes the histogram with integral bucket counts that sum to the
    /// number of tracked values. Leading and trailing empty buckets are
    /// dropped. Returns `None` when empty.
    pub fn to_summary(&self) -> Option<HistogramSummary> {
        if self.n == 0 {
            return None;
        }
        if self.is_degenerate() {
            return Some(HistogramSummary {
                start: self.min,
                end: self.max,
                width: 0.0,
                counts: vec![self.n],
                bins: vec![self.min, self.max],
                n: self.n,
                min: self.min,
                max: self.max,
            });
        }

        let counts = largest_remainder(&self.counts, self.n);
        let first = counts.iter().position(|&c| c > 0).unwrap_or(0);
        let last = counts.iter().rposition(|&c| c > 0).unwrap_or(counts.len() - 1);
        let start = self.start + self.width * first as f64;
        let bins = (first..=last + 1)
            .map(|i| self.start + self.width * i as f64)
            .collect();

        Some(HistogramSummary {
            start,
            end: self.start + self.width * (last + 1) as f64,
            width: self.width,
            counts: counts[first..=last].to_vec(),
            bins,
            n: self.n,
            min: self.min,
            max: self.max,
        })
    }
}

/// Rounds fractional weights to integers summing to `total`, giving the
/// leftover units to the largest fractional parts.
fn largest_remainder(weights: &[f64], total: u64) -> Vec<u64> {
    let mut counts: Vec<u64> = weights.iter().map(|w| w.max(0.0).floor() as u64).collect();
    let assigned: u64 = counts.iter().sum();

    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = weights[a] - weights[a].floor();
        let fb = weights[b] - weights[b].floor();
        fb.partial_cmp(&fa).unwrap_or(Ordering::Equal).then(a.cmp(&b))
    });

    if assigned < total {
        let mut deficit = total - assigned;
        while deficit > 0 {
            for &i in &order {
                if deficit == 0 {
                    break;
                }
                counts[i] += 1;
                deficit -= 1;
            }
        }
    } else {
        let mut surplus = assigned - total;
        for &i in order.iter().rev() {
            if surplus == 0 {
                break;
            }
            let take = counts[i].min(surplus);
            counts[i] -= take;
            surplus -= take;
        }
    }
    counts
}

impl MergeableSketch for HistogramSketch {
    fn merge(&mut self, other: &Self) -> ProfileResult<()> {
        if self.counts.len() != other.counts.len() {
            return Err(ProfileError::merge(format!(
                "Cannot merge histograms with different bucket counts: {} vs {}",
                self.counts.len(),
                other.counts.len()
            )));
        }
        if other.n == 0 {
            return Ok(());
        }
        if self.n == 0 {
            *self = other.clone();
            return Ok(());
        }

        let min = self.min.min(other.min);
        let max = self.max.max(other.max);
        let n = self.n + other.n;
        let num_buckets = self.counts.len();

        if min == max {
            self.n = n;
            return Ok(());
        }

        let width = self
            .width
            .max(other.width)
            .max((max - min) / (num_buckets - 1) as f64);
        let mut target = HistogramSketch {
            counts: vec![0.0; num_buckets],
            start: min,
            width,
            n,
            min,
            max,
        };

        let mut from_self = vec![0.0; num_buckets];
        let mut from_other = vec![0.0; num_buckets];
        self.redistribute_into(&target, &mut from_self);
        other.redistribute_into(&target, &mut from_other);
        for (slot, (a, b)) in target
            .counts
            .iter_mut()
            .zip(from_self.iter().zip(from_other.iter()))
        {
            *slot = a + b;
        }

        *self = target;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.n == 0
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut encoder = Encoder::new(family::HISTOGRAM, FORMAT_VERSION);
        encoder.put_u16(self.counts.len() as u16);
        encoder.put_u64(self.n);
        encoder.put_f64(self.min);
        encoder.put_f64(self.max);
        encoder.put_f64(self.start);
        encoder.put_f64(self.width);
        for &c in &self.counts {
            encoder.put_f64(c);
        }
        encoder.finish()
    }

    fn from_bytes(bytes: &[u8]) -> ProfileResult<Self> {
        let mut decoder = Decoder::new(bytes, "histogram", family::HISTOGRAM, FORMAT_VERSION)?;
        let num_buckets = usize::from(decoder.u16()?);
        if num_buckets < 2 || num_buckets % 2 != 0 {
            return Err(decoder.corrupt(format!("invalid bucket count {num_buckets}")));
        }
        let n = decoder.u64()?;
        let min = decoder.f64()?;
        let max = decoder.f64()?;
        let start = decoder.f64()?;
        let width = decoder.f64()?;
        if width.is_nan() || width < 0.0 || start.is_nan() {
            return Err(decoder.corrupt("invalid bucket grid"));
        }
        let mut counts = Vec::with_capacity(num_buckets);
        for _ in 0..num_buckets {
            let c = decoder.f64()?;
            if !c.is_finite() || c < 0.0 {
                return Err(decoder.corrupt(format!("invalid bucket weight {c}")));
            }
            counts.push(c);
        }

        let total: f64 = counts.iter().sum();
        if n > 0 {
            if !(min.is_finite() && max.is_finite() && min <= max) {
                return Err(decoder.corrupt("invalid min/max"));
            }
            if width > 0.0 && (total - n as f64).abs() > 1e-6 * (n as f64).max(1.0) {
                return Err(decoder.corrupt(format!(
                    "bucket weights sum to {total} for {n} values"
                )));
            }
        } else if total != 0.0 {
            return Err(decoder.corrupt("weights present in an empty histogram"));
        }
        decoder.finish()?;

        Ok(Self {
            counts,
            start,
            width,
            n,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_until_second_distinct_value() {
        let mut histogram = HistogramSketch::new(30);
        histogram.update(5.0);
        histogram.update(5.0);
        let summary = histogram.to_summary().unwrap();
        assert_eq!(summary.counts, vec![2]);
        assert_eq!(summary.width, 0.0);

        histogram.update(8.0);
        let summary = histogram.to_summary().unwrap();
        assert_eq!(summary.counts.iter().sum::<u64>(), 3);
        assert_eq!(summary.counts.first(), Some(&2));
        assert_eq!(summary.counts.last(), Some(&1));
        assert!(summary.end >= 8.0);
    }

    #[test]
    fn test_growth_keeps_counts_exact() {
        let mut histogram = HistogramSketch::new(10);
        for i in 0..10 {
            histogram.update(i as f64);
        }
        histogram.update(100.0);
        histogram.update(-100.0);

        assert_eq!(histogram.count(), 12);
        let total: f64 = histogram.counts.iter().sum();
        assert_eq!(total, 12.0);
        assert!(histogram.start <= -100.0);
        assert!(histogram.end() > 100.0);
        assert!(histogram.counts.iter().all(|c| c.fract() == 0.0));
    }

    #[test]
    fn test_non_finite_values_are_ignored() {
        let mut histogram = HistogramSketch::new(30);
        histogram.update(f64::NAN);
        histogram.update(f64::INFINITY);
        assert!(histogram.is_empty());
        assert!(histogram.to_summary().is_none());
    }

    #[test]
    fn test_merge_disjoint_ranges() {
        let mut left = HistogramSketch::new(30);
        let mut right = HistogramSketch::new(30);
        for i in 0..100 {
            left.update(i as f64);
            right.update(1_000.0 + i as f64);
        }

        let mut forward = left.clone();
        forward.merge(&right).unwrap();
        let mut backward = right.clone();
        backward.merge(&left).unwrap();

        assert_eq!(forward, backward);
        let summary = forward.to_summary().unwrap();
        assert_eq!(summary.n, 200);
        assert_eq!(summary.counts.iter().sum::<u64>(), 200);
        assert_eq!(summary.min, 0.0);
        assert_eq!(summary.max, 1_099.0);
        // both clusters keep their own buckets at either end of the range
        assert!(summary.counts[0] > 0);
        assert!(*summary.counts.last().unwrap() > 0);
    }

    #[test]
    fn test_merge_grouping_keeps_mass_and_range() {
        let mut a = HistogramSketch::new(20);
        let mut b = HistogramSketch::new(20);
        let mut c = HistogramSketch::new(20);
        for i in 0..50 {
            a.update(i as f64 * 0.5);
            b.update(-300.0 + i as f64 * 3.0);
            c.update(500.0 + i as f64);
        }

        let mut left = a.clone();
        left.merge(&b).unwrap();
        left.merge(&c).unwrap();
        let mut bc = b.clone();
        bc.merge(&c).unwrap();
        let mut right = a.clone();
        right.merge(&bc).unwrap();

        for merged in [&left, &right] {
            assert_eq!(merged.count(), 150);
            let mass: f64 = merged.counts.iter().sum();
            assert!((mass - 150.0).abs() < 1e-9);
            let summary = merged.to_summary().unwrap();
            assert_eq!(summary.counts.iter().sum::<u64>(), 150);
            assert_eq!(summary.min, -300.0);
            assert_eq!(summary.max, 549.0);
            assert!(merged.start <= -300.0);
            assert!(merged.end() >= 549.0);
        }
    }

    #[test]
    fn test_merge_rejects_different_bucket_counts() {
        let mut a = HistogramSketch::new(10);
        let mut b = HistogramSketch::new(20);
        b.update(1.0);
        assert!(a.merge(&b).unwrap_err().is_merge());
    }

    #[test]
    fn test_largest_remainder_rounding() {
        assert_eq!(largest_remainder(&[0.5, 0.5, 1.0], 2), vec![1, 0, 1]);
        assert_eq!(largest_remainder(&[1.4, 1.6], 3), vec![1, 2]);
    }

    #[test]
    fn test_bytes_roundtrip_and_validation() {
        let mut histogram = HistogramSketch::new(30);
        for i in 0..50 {
            histogram.update(i as f64 * 0.5);
        }
        let bytes = histogram.to_bytes();
        assert_eq!(HistogramSketch::from_bytes(&bytes).unwrap(), histogram);

        assert!(HistogramSketch::from_bytes(&bytes[..bytes.len() - 3]).is_err());
        let mut corrupt = bytes.clone();
        // first bucket weight starts after header, bucket count, n and four floats
        let offset = 2 + 2 + 8 + 32;
        corrupt[offset..offset + 8].copy_from_slice(&1.0e9f64.to_le_bytes());
        assert!(HistogramSketch::from_bytes(&corrupt)
            .unwrap_err()
            .is_deserialization());
    }
}
