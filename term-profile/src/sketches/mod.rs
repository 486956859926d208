//! Bounded-memory sketches used by the column trackers.
//!
//! - [`HllSketch`]: HyperLogLog distinct counting with an exact sparse mode
//! - [`KllSketch`]: KLL quantiles
//! - [`HistogramSketch`]: fixed-bin histogram over a growing range
//! - [`FrequentItemsSketch`]: Misra-Gries heavy hitters with error offset
//!
//! All of them implement [`MergeableSketch`]: merges are commutative and
//! associative (up to each sketch's approximation error), and every sketch has
//! a compact binary encoding that rejects corrupt payloads.

pub(crate) mod codec;
pub mod frequent_items;
pub mod histogram;
pub mod hll;
pub mod kll;

use std::fmt::Debug;

use crate::error::ProfileResult;

pub use frequent_items::{FrequentItem, FrequentItemsSketch};
pub use histogram::HistogramSketch;
pub use hll::HllSketch;
pub use kll::KllSketch;

/// Capability shared by every sketch kept in a profile.
pub trait MergeableSketch: Clone + Debug + Send + Sync {
    /// Unions `other` into `self`.
    ///
    /// Fails with [`ProfileError::Merge`](crate::error::ProfileError::Merge)
    /// when the two sketches were built with different parameters.
    fn merge(&mut self, other: &Self) -> ProfileResult<()>;

    /// Returns whether no value was ever added.
    fn is_empty(&self) -> bool;

    /// Encodes the sketch in its compact binary format.
    fn to_bytes(&self) -> Vec<u8>;

    /// Decodes a sketch produced by [`MergeableSketch::to_bytes`].
    fn from_bytes(bytes: &[u8]) -> ProfileResult<Self>
    where
        Self: Sized;
}

/// Family tags written as the first byte of each payload.
pub(crate) mod family {
    pub const HLL: u8 = 0x48;
    pub const KLL: u8 = 0x4b;
    pub const HISTOGRAM: u8 = 0x42;
    pub const FREQUENT_ITEMS: u8 = 0x46;
}
