//! Heavy-hitter sketch with mergeable error bounds.
//!
//! Misra-Gries counters plus a global offset. When the sketch holds more
//! than `capacity` keys, the `(capacity + 1)`-th largest counter is subtracted
//! from every counter and added to the offset. For every key,
//! `counter <= true count <= counter + offset`, and the offset never exceeds
//! `N / (capacity + 1)` where `N` is the number of tracked items.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::codec::{Decoder, Encoder};
use super::{family, MergeableSketch};
use crate::error::{ProfileError, ProfileResult};

const FORMAT_VERSION: u8 = 1;

/// Largest supported capacity.
pub const MAX_CAPACITY: u32 = 1 << 20;

/// Smallest encoded entry: a length prefix and a counter.
const MIN_ENTRY_BYTES: usize = 4 + 8;

/// A key reported by [`FrequentItemsSketch::items`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequentItem {
    /// Canonical text of the value
    pub value: String,
    /// Upper-bound estimate of the occurrence count
    pub estimate: u64,
    /// Guaranteed lower bound of the occurrence count
    pub lower_bound: u64,
}

/// Approximate top-k sketch over string keys.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequentItemsSketch {
    capacity: usize,
    counters: HashMap<String, u64>,
    offset: u64,
    total: u64,
}

impl FrequentItemsSketch {
    /// Creates an empty sketch keeping at most `capacity` keys, clamped to
    /// `[1, MAX_CAPACITY]`.
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity: capacity.clamp(1, MAX_CAPACITY) as usize,
            counters: HashMap::new(),
            offset: 0,
            total: 0,
        }
    }

    /// Maximum number of keys kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of keys currently kept.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Number of items tracked.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Maximum overestimate of any reported count.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Tracks one occurrence of `key`.
    pub fn update(&mut self, key: &str) {
        self.total += 1;
        match self.counters.get_mut(key) {
            Some(counter) => *counter += 1,
            None => {
                self.counters.insert(key.to_string(), 1);
                self.purge();
            }
        }
    }

    /// Upper-bound estimate for `key`; 0 if the key is not kept.
    pub fn estimate(&self, key: &str) -> u64 {
        self.counters
            .get(key)
            .map_or(0, |counter| counter + self.offset)
    }

    /// Lower bound for `key`; 0 if the key is not kept.
    pub fn lower_bound(&self, key: &str) -> u64 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    /// Kept keys, highest estimate first; ties ordered by key.
    pub fn items(&self) -> Vec<FrequentItem> {
        let mut items: Vec<FrequentItem> = self
            .counters
            .iter()
            .map(|(value, &counter)| FrequentItem {
                value: value.clone(),
                estimate: counter + self.offset,
                lower_bound: counter,
            })
            .collect();
        items.sort_by(|a, b| {
            b.estimate
                .cmp(&a.estimate)
                .then_with(|| a.value.cmp(&b.value))
        });
        items
    }

    /// Shrinks the map back to `capacity` keys.
    fn purge(&mut self) {
        if self.counters.len() <= self.capacity {
            return;
        }
        let mut counts: Vec<u64> = self.counters.values().copied().collect();
        counts.sort_unstable_by(|a, b| b.cmp(a));
        let decrement = counts[self.capacity];

        self.counters.retain(|_, counter| {
            *counter -= decrement.min(*counter);
            *counter > 0
        });
        self.offset += decrement;
    }
}

impl Default for FrequentItemsSketch {
    fn default() -> Self {
        Self::new(128)
    }
}

impl MergeableSketch for FrequentItemsSketch {
    fn merge(&mut self, other: &Self) -> ProfileResult<()> {
        if self.capacity != other.capacity {
            return Err(ProfileError::merge(format!(
                "Cannot merge frequent items sketches with different capacities: {} vs {}",
                self.capacity, other.capacity
            )));
        }
        for (key, &counter) in &other.counters {
            *self.counters.entry(key.clone()).or_insert(0) += counter;
        }
        self.offset += other.offset;
        self.total += other.total;
        self.purge();
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.total == 0
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut encoder = Encoder::new(family::FREQUENT_ITEMS, FORMAT_VERSION);
        encoder.put_u32(self.capacity as u32);
        encoder.put_u64(self.total);
        encoder.put_u64(self.offset);

        let mut entries: Vec<(&String, &u64)> = self.counters.iter().collect();
        entries.sort();
        encoder.put_u32(entries.len() as u32);
        for (key, &counter) in entries {
            encoder.put_bytes(key.as_bytes());
            encoder.put_u64(counter);
        }
        encoder.finish()
    }

    fn from_bytes(bytes: &[u8]) -> ProfileResult<Self> {
        let mut decoder = Decoder::new(
            bytes,
            "frequent items",
            family::FREQUENT_ITEMS,
            FORMAT_VERSION,
        )?;
        let capacity = decoder.u32()?;
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(decoder.corrupt(format!(
                "capacity {capacity} outside [1, {MAX_CAPACITY}]"
            )));
        }
        let capacity = capacity as usize;
        let total = decoder.u64()?;
        let offset = decoder.u64()?;
        let len = decoder.u32()? as usize;
        if len > capacity {
            return Err(decoder.corrupt(format!("{len} entries exceed capacity {capacity}")));
        }
        if len.saturating_mul(MIN_ENTRY_BYTES) > decoder.remaining() {
            return Err(decoder.corrupt(format!(
                "{len} entries cannot fit in the {} remaining bytes",
                decoder.remaining()
            )));
        }

        let mut counters = HashMap::with_capacity(len);
        let mut counted = 0u64;
        for _ in 0..len {
            let key = String::from_utf8(decoder.bytes()?)
                .map_err(|_| decoder.corrupt("key is not valid UTF-8"))?;
            let counter = decoder.u64()?;
            if counter == 0 {
                return Err(decoder.corrupt(format!("zero counter for key {key:?}")));
            }
            counted = counted.saturating_add(counter);
            if counters.insert(key, counter).is_some() {
                return Err(decoder.corrupt("duplicate key"));
            }
        }
        if counted > total {
            return Err(decoder.corrupt(format!(
                "counters sum to {counted} but only {total} items were tracked"
            )));
        }
        decoder.finish()?;

        Ok(Self {
            capacity,
            counters,
            offset,
            total,
        })
    }
}
