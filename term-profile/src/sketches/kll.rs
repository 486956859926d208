//! KLL (Karnin-Lang-Liberty) sketch implementation for memory-efficient approximate quantile computation.
//!
//! The KLL sketch is a streaming algorithm that maintains a small space summary of a data stream,
//! allowing for approximate quantile queries with provable error bounds. It uses O(k log n) memory
//! where k controls the accuracy/memory tradeoff and n is the number of items processed.
//!
//! Items retained at level `h` each stand for `2^h` original items. Compaction
//! sorts a full level, promotes every other item to the next level and drops
//! the rest, so the total retained weight always equals the number of items
//! seen. Decoding checks this invariant.

use std::cmp::Ordering;

use super::codec::{Decoder, Encoder};
use super::{family, MergeableSketch};
use crate::error::{ProfileError, ProfileResult};

const FORMAT_VERSION: u8 = 1;

/// Smallest capacity of any level.
const MIN_LEVEL_CAPACITY: usize = 8;

/// Capacity decay between adjacent levels.
const CAPACITY_DECAY: f64 = 2.0 / 3.0;

/// A compactor holds the items of one level.
#[derive(Debug, Clone, PartialEq)]
struct Compactor {
    /// Items stored in this compactor (may be unsorted)
    items: Vec<f64>,
    /// Whether the items are currently sorted
    sorted: bool,
}

impl Compactor {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            sorted: true,
        }
    }

    fn add(&mut self, value: f64) {
        self.items.push(value);
        self.sorted = false;
    }

    fn ensure_sorted(&mut self) {
        if !self.sorted {
            self.items.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            self.sorted = true;
        }
    }

    /// Halves the level and returns the items promoted to the next one.
    ///
    /// With an odd number of items the largest one stays behind.
    fn compact(&mut self, keep_odd: bool) -> Vec<f64> {
        self.ensure_sorted();

        let leftover = if self.items.len() % 2 == 1 {
            self.items.pop()
        } else {
            None
        };

        let offset = usize::from(keep_odd);
        let promoted: Vec<f64> = self.items.iter().skip(offset).step_by(2).copied().collect();

        self.items.clear();
        self.items.extend(leftover);
        self.sorted = true;
        promoted
    }

    fn merge_items(&mut self, items: &[f64]) {
        if !items.is_empty() {
            self.items.extend_from_slice(items);
            self.sorted = false;
        }
    }
}

/// KLL sketch for approximate quantile computation.
///
/// # Example
///
/// ```rust
/// use term_profile::sketches::KllSketch;
///
/// let mut sketch = KllSketch::new(200);
///
/// for i in 0..1000 {
///     sketch.update(i as f64);
/// }
///
/// let median = sketch.get_quantile(0.5).unwrap();
/// assert!((median - 500.0).abs() < 50.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KllSketch {
    /// Controls accuracy/memory tradeoff (higher k = better accuracy)
    k: u16,
    /// Stack of compactors; level `h` items weigh `2^h`
    compactors: Vec<Compactor>,
    /// Total number of items seen
    n: u64,
    /// Minimum value seen
    min_value: f64,
    /// Maximum value seen
    max_value: f64,
}

impl KllSketch {
    /// Creates a new KLL sketch with the specified k parameter (at least 8).
    ///
    /// The k parameter controls the accuracy/memory tradeoff:
    /// - Higher k = better accuracy but more memory
    /// - Memory usage is O(k log n)
    /// - Normalized rank error is approximately 1.65 / sqrt(k)
    pub fn new(k: u16) -> Self {
        Self {
            k: k.max(MIN_LEVEL_CAPACITY as u16),
            compactors: vec![Compactor::new()],
            n: 0,
            min_value: f64::INFINITY,
            max_value: f64::NEG_INFINITY,
        }
    }

    /// Returns the accuracy parameter.
    pub fn k(&self) -> u16 {
        self.k
    }

    /// Capacity of `level` when the sketch has `num_levels` levels.
    ///
    /// The top level holds `k` items and each level below holds 2/3 of the
    /// level above it.
    fn level_capacity(&self, level: usize, num_levels: usize) -> usize {
        let depth = (num_levels - 1 - level) as i32;
        let capacity = (f64::from(self.k) * CAPACITY_DECAY.powi(depth)).ceil() as usize;
        capacity.max(MIN_LEVEL_CAPACITY)
    }

    /// Updates the sketch with a new value. NaN is ignored.
    pub fn update(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }

        self.n += 1;
        self.min_value = self.min_value.min(value);
        self.max_value = self.max_value.max(value);

        self.compactors[0].add(value);
        self.compress();
    }

    /// Compacts the lowest over-full level until every level fits.
    fn compress(&mut self) {
        loop {
            let num_levels = self.compactors.len();
            let Some(level) = (0..num_levels)
                .find(|&h| self.compactors[h].items.len() >= self.level_capacity(h, num_levels))
            else {
                break;
            };

            if level + 1 == num_levels {
                self.compactors.push(Compactor::new());
            }

            let keep_odd = self.compaction_coin(level);
            let promoted = self.compactors[level].compact(keep_odd);
            self.compactors[level + 1].merge_items(&promoted);
        }
    }

    /// Chooses which half of a level survives a compaction.
    ///
    /// The choice is a pseudo-random function of the sketch state only, so two
    /// sketches holding the same items compact the same way regardless of the
    /// order in which they were merged.
    fn compaction_coin(&self, level: usize) -> bool {
        let mut x = self.n ^ ((level as u64) << 56) ^ 0x9e37_79b9_7f4a_7c15;
        x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        x ^= x >> 31;
        x & 1 == 1
    }

    /// Retained items with their weights, sorted by value.
    fn weighted_items(&self) -> Vec<(f64, u64)> {
        let mut weighted_items =
            Vec::with_capacity(self.compactors.iter().map(|c| c.items.len()).sum());
        for (level, compactor) in self.compactors.iter().enumerate() {
            let weight = 1u64 << level.min(63);
            weighted_items.extend(compactor.items.iter().map(|&item| (item, weight)));
        }
        weighted_items.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        weighted_items
    }

    /// Returns the approximate quantile for the given phi (0 <= phi <= 1).
    ///
    /// Returns `None` if the sketch is empty or phi is outside [0, 1].
    /// The result is the smallest retained item whose cumulative weight reaches
    /// `ceil(phi * n)`; phi = 0 is the minimum and phi = 1 the maximum.
    pub fn get_quantile(&self, phi: f64) -> Option<f64> {
        self.get_quantiles(&[phi]).pop().flatten()
    }

    /// Returns one quantile per phi, sharing a single sort of the retained
    /// items. Results are non-decreasing for non-decreasing phis.
    pub fn get_quantiles(&self, phis: &[f64]) -> Vec<Option<f64>> {
        if self.n == 0 {
            return vec![None; phis.len()];
        }

        let weighted_items = self.weighted_items();
        phis.iter()
            .map(|&phi| {
                if !(0.0..=1.0).contains(&phi) {
                    return None;
                }
                if phi == 0.0 {
                    return Some(self.min_value);
                }
                if phi == 1.0 {
                    return Some(self.max_value);
                }

                let target_rank = (phi * self.n as f64).ceil().max(1.0);
                let mut cumulative_weight = 0u64;
                for &(value, weight) in &weighted_items {
                    cumulative_weight = cumulative_weight.saturating_add(weight);
                    if cumulative_weight as f64 >= target_rank {
                        return Some(value);
                    }
                }
                Some(self.max_value)
            })
            .collect()
    }

    /// Returns the total number of items processed.
    pub fn count(&self) -> u64 {
        self.n
    }

    /// Minimum value seen, if any.
    pub fn min(&self) -> Option<f64> {
        (self.n > 0).then_some(self.min_value)
    }

    /// Maximum value seen, if any.
    pub fn max(&self) -> Option<f64> {
        (self.n > 0).then_some(self.max_value)
    }

    /// Returns the number of compactor levels.
    pub fn num_levels(&self) -> usize {
        self.compactors.len()
    }

    /// Returns the number of retained items.
    pub fn num_retained(&self) -> usize {
        self.compactors.iter().map(|c| c.items.len()).sum()
    }

    /// Returns the memory usage in bytes (approximate).
    pub fn memory_usage(&self) -> usize {
        let mut usage = std::mem::size_of::<Self>();
        for compactor in &self.compactors {
            usage += std::mem::size_of::<Compactor>();
            usage += compactor.items.capacity() * std::mem::size_of::<f64>();
        }
        usage
    }

    /// Returns the normalized rank error bound for this sketch.
    pub fn relative_error_bound(&self) -> f64 {
        1.65 / f64::from(self.k).sqrt()
    }

    fn retained_weight(&self) -> u128 {
        self.compactors
            .iter()
            .enumerate()
            .map(|(level, c)| (c.items.len() as u128) << level)
            .sum()
    }
}

impl MergeableSketch for KllSketch {
    /// Both sketches must have the same k parameter.
    fn merge(&mut self, other: &Self) -> ProfileResult<()> {
        if self.k != other.k {
            return Err(ProfileError::merge(format!(
                "Cannot merge KLL sketches with different k values: {} vs {}",
                self.k, other.k
            )));
        }
        if other.n == 0 {
            return Ok(());
        }

        self.n += other.n;
        self.min_value = self.min_value.min(other.min_value);
        self.max_value = self.max_value.max(other.max_value);

        while self.compactors.len() < other.compactors.len() {
            self.compactors.push(Compactor::new());
        }
        for (level, other_compactor) in other.compactors.iter().enumerate() {
            self.compactors[level].merge_items(&other_compactor.items);
        }

        self.compress();
        for compactor in &mut self.compactors {
            compactor.ensure_sorted();
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.n == 0
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut encoder = Encoder::new(family::KLL, FORMAT_VERSION);
        encoder.put_u16(self.k);
        encoder.put_u64(self.n);
        encoder.put_f64(self.min_value);
        encoder.put_f64(self.max_value);
        encoder.put_u8(self.compactors.len() as u8);
        for compactor in &self.compactors {
            encoder.put_u8(u8::from(compactor.sorted));
            encoder.put_u32(compactor.items.len() as u32);
            for &item in &compactor.items {
                encoder.put_f64(item);
            }
        }
        encoder.finish()
    }

    fn from_bytes(bytes: &[u8]) -> ProfileResult<Self> {
        let mut decoder = Decoder::new(bytes, "kll sketch", family::KLL, FORMAT_VERSION)?;
        let k = decoder.u16()?;
        if usize::from(k) < MIN_LEVEL_CAPACITY {
            return Err(decoder.corrupt(format!("k {k} below minimum")));
        }
        let n = decoder.u64()?;
        let min_value = decoder.f64()?;
        let max_value = decoder.f64()?;
        let num_levels = decoder.u8()? as usize;
        if num_levels == 0 || num_levels > 64 {
            return Err(decoder.corrupt(format!("invalid level count {num_levels}")));
        }

        let mut compactors = Vec::with_capacity(num_levels);
        for _ in 0..num_levels {
            let sorted = decoder.u8()? != 0;
            let len = decoder.u32()? as usize;
            if len.saturating_mul(8) > decoder.remaining() {
                return Err(decoder.corrupt(format!("level of {len} items exceeds payload")));
            }
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                let item = decoder.f64()?;
                if item.is_nan() || item < min_value || item > max_value {
                    return Err(decoder.corrupt(format!(
                        "item {item} outside [{min_value}, {max_value}]"
                    )));
                }
                items.push(item);
            }
            compactors.push(Compactor { items, sorted });
        }
        decoder.finish()?;

        let sketch = KllSketch {
            k,
            compactors,
            n,
            min_value,
            max_value,
        };
        if sketch.retained_weight() != u128::from(n) {
            return Err(ProfileError::deserialization(format!(
                "kll sketch: retained weight {} does not match item count {n}",
                sketch.retained_weight()
            )));
        }
        if n > 0 && min_value > max_value {
            return Err(ProfileError::deserialization(
                "kll sketch: min exceeds max on a non-empty sketch",
            ));
        }
        Ok(sketch)
    }
}
