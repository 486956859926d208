//! HyperLogLog cardinality estimation.
//!
//! The sketch starts in a sparse mode that stores the 64-bit hash of every
//! distinct key, which makes small cardinalities exact. Once the set grows
//! past `m / 8` entries it is converted to `m = 2^lg_k` dense registers.
//!
//! Keys are hashed with the first eight bytes of SHA-256 so that sketches
//! built on different machines and Rust versions agree.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};
use tracing::debug;

use super::codec::{Decoder, Encoder};
use super::{family, MergeableSketch};
use crate::error::{ProfileError, ProfileResult};

const FORMAT_VERSION: u8 = 1;
const MODE_SPARSE: u8 = 0;
const MODE_DENSE: u8 = 1;

/// Number of standard errors covered by [`HllSketch::bounds`].
pub const BOUNDS_STD_DEVS: f64 = 2.0;

/// Hashes a canonical key into the 64-bit space used by the sketch.
pub fn hash_key(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[derive(Debug, Clone, PartialEq)]
enum Representation {
    Sparse(BTreeSet<u64>),
    Dense(Vec<u8>),
}

/// HyperLogLog sketch with an exact sparse mode.
///
/// # Example
///
/// ```rust
/// use term_profile::sketches::HllSketch;
///
/// let mut sketch = HllSketch::new(12);
/// for user in ["alice", "bob", "alice"] {
///     sketch.update(user);
/// }
/// assert_eq!(sketch.estimate(), 2.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HllSketch {
    lg_k: u8,
    repr: Representation,
}

impl HllSketch {
    /// Creates an empty sketch with `2^lg_k` registers (clamped to [4, 18]).
    pub fn new(lg_k: u8) -> Self {
        Self {
            lg_k: lg_k.clamp(4, 18),
            repr: Representation::Sparse(BTreeSet::new()),
        }
    }

    /// Returns the register precision.
    pub fn lg_k(&self) -> u8 {
        self.lg_k
    }

    fn num_registers(&self) -> usize {
        1usize << self.lg_k
    }

    fn sparse_limit(&self) -> usize {
        self.num_registers() / 8
    }

    /// Returns true while the sketch still stores exact hashes.
    pub fn is_sparse(&self) -> bool {
        matches!(self.repr, Representation::Sparse(_))
    }

    /// Adds a key.
    pub fn update(&mut self, key: &str) {
        self.update_hash(hash_key(key));
    }

    /// Adds an already hashed key.
    pub fn update_hash(&mut self, hash: u64) {
        let lg_k = self.lg_k;
        let limit = self.sparse_limit();
        let overflowed = match &mut self.repr {
            Representation::Sparse(hashes) => {
                hashes.insert(hash);
                hashes.len() > limit
            }
            Representation::Dense(registers) => {
                set_register(registers, lg_k, hash);
                false
            }
        };
        if overflowed {
            self.densify();
        }
    }

    fn densify(&mut self) {
        let registers = match &self.repr {
            Representation::Sparse(hashes) => {
                let mut registers = vec![0u8; self.num_registers()];
                for &hash in hashes {
                    set_register(&mut registers, self.lg_k, hash);
                }
                debug!(
                    lg_k = self.lg_k,
                    keys = hashes.len(),
                    "Switching HLL sketch to dense registers"
                );
                registers
            }
            Representation::Dense(_) => return,
        };
        self.repr = Representation::Dense(registers);
    }

    /// Returns the estimated number of distinct keys.
    pub fn estimate(&self) -> f64 {
        match &self.repr {
            Representation::Sparse(hashes) => hashes.len() as f64,
            Representation::Dense(registers) => dense_estimate(registers),
        }
    }

    /// Relative standard error of the dense estimator, 1.04 / sqrt(m).
    pub fn relative_error(&self) -> f64 {
        1.04 / (self.num_registers() as f64).sqrt()
    }

    /// Returns `(lower, estimate, upper)`.
    ///
    /// Sparse sketches are exact so all three values coincide. Dense bounds
    /// span [`BOUNDS_STD_DEVS`] standard errors; the lower bound never drops
    /// below the number of occupied registers, since every occupied register
    /// was set by at least one distinct key.
    pub fn bounds(&self) -> (f64, f64, f64) {
        let estimate = self.estimate();
        match &self.repr {
            Representation::Sparse(_) => (estimate, estimate, estimate),
            Representation::Dense(registers) => {
                let occupied = registers.iter().filter(|&&r| r != 0).count() as f64;
                let spread = BOUNDS_STD_DEVS * self.relative_error() * estimate;
                let lower = (estimate - spread).max(occupied).min(estimate);
                (lower, estimate, estimate + spread)
            }
        }
    }

    /// Memory used by the sketch contents in bytes (approximate).
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>()
            + match &self.repr {
                Representation::Sparse(hashes) => hashes.len() * std::mem::size_of::<u64>(),
                Representation::Dense(registers) => registers.len(),
            }
    }
}

impl Default for HllSketch {
    fn default() -> Self {
        Self::new(12)
    }
}

fn set_register(registers: &mut [u8], lg_k: u8, hash: u64) {
    let index = (hash >> (64 - u32::from(lg_k))) as usize;
    let max_rank = 64 - u32::from(lg_k);
    let rank = ((hash << lg_k).leading_zeros().min(max_rank) + 1) as u8;
    if rank > registers[index] {
        registers[index] = rank;
    }
}

fn dense_estimate(registers: &[u8]) -> f64 {
    let m = registers.len() as f64;
    let indicator_sum: f64 = registers.iter().map(|&r| 2f64.powi(-i32::from(r))).sum();
    let alpha = match registers.len() {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / m),
    };
    let raw = alpha * m * m / indicator_sum;
    let zeros = registers.iter().filter(|&&r| r == 0).count() as f64;
    if raw <= 2.5 * m && zeros > 0.0 {
        // Linear counting for the small range
        m * (m / zeros).ln()
    } else {
        raw
    }
}

impl MergeableSketch for HllSketch {
    fn merge(&mut self, other: &Self) -> ProfileResult<()> {
        if self.lg_k != other.lg_k {
            return Err(ProfileError::merge(format!(
                "Cannot merge HLL sketches with different precision: {} vs {}",
                self.lg_k, other.lg_k
            )));
        }
        match &other.repr {
            Representation::Sparse(hashes) => {
                for &hash in hashes {
                    self.update_hash(hash);
                }
            }
            Representation::Dense(other_registers) => {
                self.densify();
                if let Representation::Dense(registers) = &mut self.repr {
                    for (mine, theirs) in registers.iter_mut().zip(other_registers) {
                        *mine = (*mine).max(*theirs);
                    }
                }
            }
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        match &self.repr {
            Representation::Sparse(hashes) => hashes.is_empty(),
            Representation::Dense(_) => false,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut encoder = Encoder::new(family::HLL, FORMAT_VERSION);
        encoder.put_u8(self.lg_k);
        match &self.repr {
            Representation::Sparse(hashes) => {
                encoder.put_u8(MODE_SPARSE);
                encoder.put_u32(hashes.len() as u32);
                for &hash in hashes {
                    encoder.put_u64(hash);
                }
            }
            Representation::Dense(registers) => {
                encoder.put_u8(MODE_DENSE);
                for &register in registers {
                    encoder.put_u8(register);
                }
            }
        }
        encoder.finish()
    }

    fn from_bytes(bytes: &[u8]) -> ProfileResult<Self> {
        let mut decoder = Decoder::new(bytes, "hll sketch", family::HLL, FORMAT_VERSION)?;
        let lg_k = decoder.u8()?;
        if !(4..=18).contains(&lg_k) {
            return Err(decoder.corrupt(format!("lg_k {lg_k} out of range")));
        }
        let mut sketch = HllSketch::new(lg_k);
        match decoder.u8()? {
            MODE_SPARSE => {
                let len = decoder.u32()? as usize;
                if len > sketch.sparse_limit() {
                    return Err(decoder.corrupt(format!(
                        "sparse set of {len} hashes exceeds the limit of {}",
                        sketch.sparse_limit()
                    )));
                }
                let mut hashes = BTreeSet::new();
                let mut previous = None;
                for _ in 0..len {
                    let hash = decoder.u64()?;
                    if previous.is_some_and(|p| p >= hash) {
                        return Err(decoder.corrupt("sparse hashes are not strictly increasing"));
                    }
                    previous = Some(hash);
                    hashes.insert(hash);
                }
                sketch.repr = Representation::Sparse(hashes);
            }
            MODE_DENSE => {
                let max_rank = 64 - lg_k + 1;
                let registers = decoder.raw(sketch.num_registers())?;
                if let Some(bad) = registers.iter().find(|&&r| r > max_rank) {
                    return Err(decoder.corrupt(format!(
                        "register value {bad} exceeds the maximum rank {max_rank}"
                    )));
                }
                sketch.repr = Representation::Dense(registers);
            }
            mode => return Err(decoder.corrupt(format!("unknown mode {mode}"))),
        }
        decoder.finish()?;
        Ok(sketch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_cardinality_is_exact() {
        let mut sketch = HllSketch::new(12);
        for value in ["1", "2", "3", "2", "1"] {
            sketch.update(value);
        }
        assert!(sketch.is_sparse());
        assert_eq!(sketch.bounds(), (3.0, 3.0, 3.0));
    }

    #[test]
    fn test_dense_estimate_within_bounds() {
        let mut sketch = HllSketch::new(12);
        for i in 0..20_000 {
            sketch.update(&format!("user-{i}"));
        }
        assert!(!sketch.is_sparse());
        let (lower, estimate, upper) = sketch.bounds();
        let error = (estimate - 20_000.0).abs() / 20_000.0;
        assert!(error < 0.05, "estimate {estimate} too far from 20000");
        assert!(lower <= estimate && estimate <= upper);
    }

    #[test]
    fn test_merge_is_union() {
        let mut a = HllSketch::new(10);
        let mut b = HllSketch::new(10);
        for i in 0..1_000 {
            a.update(&i.to_string());
        }
        for i in 500..1_500 {
            b.update(&i.to_string());
        }
        let mut ab = a.clone();
        ab.merge(&b).unwrap();
        let mut ba = b.clone();
        ba.merge(&a).unwrap();
        assert_eq!(ab, ba);
        let error = (ab.estimate() - 1_500.0).abs() / 1_500.0;
        assert!(error < 0.1, "merged estimate {} too far", ab.estimate());
    }

    #[test]
    fn test_merge_sparse_into_sparse_stays_exact() {
        let mut a = HllSketch::new(12);
        let mut b = HllSketch::new(12);
        a.update("x");
        b.update("x");
        b.update("y");
        a.merge(&b).unwrap();
        assert_eq!(a.estimate(), 2.0);
    }

    #[test]
    fn test_merge_rejects_different_precision() {
        let mut a = HllSketch::new(10);
        let b = HllSketch::new(12);
        assert!(a.merge(&b).unwrap_err().is_merge());
    }

    #[test]
    fn test_bytes_roundtrip_both_modes() {
        let mut sketch = HllSketch::new(8);
        sketch.update("a");
        let decoded = HllSketch::from_bytes(&sketch.to_bytes()).unwrap();
        assert_eq!(decoded, sketch);

        for i in 0..500 {
            sketch.update(&i.to_string());
        }
        assert!(!sketch.is_sparse());
        let decoded = HllSketch::from_bytes(&sketch.to_bytes()).unwrap();
        assert_eq!(decoded, sketch);
    }

    #[test]
    fn test_rejects_corrupt_payloads() {
        let mut sketch = HllSketch::new(8);
        for i in 0..500 {
            sketch.update(&i.to_string());
        }
        let mut bytes = sketch.to_bytes();
        bytes.pop();
        assert!(HllSketch::from_bytes(&bytes).is_err());

        let mut bytes = sketch.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] = 200;
        assert!(HllSketch::from_bytes(&bytes).is_err());

        let mut bytes = sketch.to_bytes();
        bytes[2] = 30;
        assert!(HllSketch::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_key("abc"), hash_key("abc"));
        assert_ne!(hash_key("1"), hash_key("1.0"));
    }
}
