//! Configuration for column profiles.
//!
//! Every sketch parameter lives here so that profiles built by different
//! workers agree on capacities before they are merged. Profiles built with
//! different parameters fail to merge with [`ProfileError::Merge`].
//!
//! # Example
//!
//! ```rust
//! use term_profile::config::ProfileConfig;
//!
//! let config = ProfileConfig::builder()
//!     .hll_lg_k(14)
//!     .kll_k(400)
//!     .frequent_items_capacity(256)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.hll_lg_k, 14);
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, ProfileResult};
use crate::sketches::frequent_items::MAX_CAPACITY;

/// Characters tracked per position by default: 26 lowercase letters,
/// 10 digits and 20 punctuation marks.
pub const DEFAULT_CHARACTER_LIST: &str =
    "abcdefghijklmnopqrstuvwxyz0123456789-_.,:;@/#!?&*()[]+='";

static DEFAULT_CONFIG: Lazy<ProfileConfig> = Lazy::new(ProfileConfig::balanced);

/// Configuration for a [`ColumnProfile`](crate::profile::ColumnProfile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Log2 of the HyperLogLog register count (default: 12)
    pub hll_lg_k: u8,
    /// KLL accuracy parameter (default: 200)
    pub kll_k: u16,
    /// Number of histogram bins, must be even (default: 30)
    pub histogram_bins: u16,
    /// Maximum number of keys kept by the frequent-items tracker (default: 128)
    pub frequent_items_capacity: u32,
    /// Number of leading character positions tracked per string (default: 128)
    pub char_pos_max_positions: u32,
    /// Characters counted per position (default: 56 characters)
    pub character_list: String,
    /// Parse numeric and boolean strings into typed values (default: true)
    pub coerce_strings: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

impl ProfileConfig {
    /// Returns a shared reference to the default configuration.
    pub fn shared_default() -> &'static ProfileConfig {
        &DEFAULT_CONFIG
    }

    /// Balanced accuracy and memory, suitable for most columns.
    pub fn balanced() -> Self {
        Self {
            hll_lg_k: 12,
            kll_k: 200,
            histogram_bins: 30,
            frequent_items_capacity: 128,
            char_pos_max_positions: 128,
            character_list: DEFAULT_CHARACTER_LIST.to_string(),
            coerce_strings: true,
        }
    }

    /// Smaller sketches for very wide datasets where memory dominates.
    pub fn compact() -> Self {
        Self {
            hll_lg_k: 10,
            kll_k: 100,
            histogram_bins: 16,
            frequent_items_capacity: 32,
            char_pos_max_positions: 32,
            ..Self::balanced()
        }
    }

    /// Larger sketches with tighter error bounds.
    pub fn precise() -> Self {
        Self {
            hll_lg_k: 14,
            kll_k: 400,
            histogram_bins: 100,
            frequent_items_capacity: 512,
            ..Self::balanced()
        }
    }

    /// Creates a builder starting from the balanced configuration.
    pub fn builder() -> ProfileConfigBuilder {
        ProfileConfigBuilder {
            config: Self::balanced(),
        }
    }

    /// Checks that every parameter is within the supported range.
    pub fn validate(&self) -> ProfileResult<()> {
        if !(4..=18).contains(&self.hll_lg_k) {
            return Err(ProfileError::invalid_config(format!(
                "hll_lg_k must be in [4, 18], got {}",
                self.hll_lg_k
            )));
        }
        if self.kll_k < 8 {
            return Err(ProfileError::invalid_config(format!(
                "kll_k must be at least 8, got {}",
                self.kll_k
            )));
        }
        if self.histogram_bins < 2 || self.histogram_bins > 1000 || self.histogram_bins % 2 != 0 {
            return Err(ProfileError::invalid_config(format!(
                "histogram_bins must be an even number in [2, 1000], got {}",
                self.histogram_bins
            )));
        }
        if self.frequent_items_capacity == 0 || self.frequent_items_capacity > MAX_CAPACITY {
            return Err(ProfileError::invalid_config(format!(
                "frequent_items_capacity must be in [1, {MAX_CAPACITY}], got {}",
                self.frequent_items_capacity
            )));
        }
        if self.char_pos_max_positions == 0 {
            return Err(ProfileError::invalid_config(
                "char_pos_max_positions must be positive",
            ));
        }
        if self.character_list.is_empty() {
            return Err(ProfileError::invalid_config(
                "character_list must not be empty",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for c in self.character_list.chars() {
            if c.is_uppercase() {
                return Err(ProfileError::invalid_config(format!(
                    "character_list is matched case-insensitively and must be lowercase, found '{c}'"
                )));
            }
            if !seen.insert(c) {
                return Err(ProfileError::invalid_config(format!(
                    "character_list contains '{c}' more than once"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`ProfileConfig`].
#[derive(Debug, Clone)]
pub struct ProfileConfigBuilder {
    config: ProfileConfig,
}

impl ProfileConfigBuilder {
    /// Set the HyperLogLog precision
    pub fn hll_lg_k(mut self, lg_k: u8) -> Self {
        self.config.hll_lg_k = lg_k;
        self
    }

    /// Set the KLL accuracy parameter
    pub fn kll_k(mut self, k: u16) -> Self {
        self.config.kll_k = k;
        self
    }

    /// Set the number of histogram bins
    pub fn histogram_bins(mut self, bins: u16) -> Self {
        self.config.histogram_bins = bins;
        self
    }

    /// Set the frequent-items capacity
    pub fn frequent_items_capacity(mut self, capacity: u32) -> Self {
        self.config.frequent_items_capacity = capacity;
        self
    }

    /// Set the number of tracked character positions
    pub fn char_pos_max_positions(mut self, positions: u32) -> Self {
        self.config.char_pos_max_positions = positions;
        self
    }

    /// Set the characters tracked per position
    pub fn character_list(mut self, list: impl Into<String>) -> Self {
        self.config.character_list = list.into();
        self
    }

    /// Enable or disable parsing of numeric and boolean strings
    pub fn coerce_strings(mut self, enabled: bool) -> Self {
        self.config.coerce_strings = enabled;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> ProfileResult<ProfileConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_character_list_has_56_entries() {
        assert_eq!(DEFAULT_CHARACTER_LIST.chars().count(), 56);
        assert!(ProfileConfig::default().validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(ProfileConfig::compact().validate().is_ok());
        assert!(ProfileConfig::precise().validate().is_ok());
        assert_eq!(ProfileConfig::shared_default(), &ProfileConfig::balanced());
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        assert!(ProfileConfig::builder().hll_lg_k(3).build().is_err());
        assert!(ProfileConfig::builder().kll_k(4).build().is_err());
        assert!(ProfileConfig::builder().histogram_bins(31).build().is_err());
        assert!(ProfileConfig::builder()
            .frequent_items_capacity(0)
            .build()
            .is_err());
        assert!(ProfileConfig::builder()
            .frequent_items_capacity(u32::MAX)
            .build()
            .is_err());
        assert!(ProfileConfig::builder().character_list("aab").build().is_err());
        assert!(ProfileConfig::builder().character_list("ABC").build().is_err());
    }

    #[test]
    fn test_config_from_json_fills_defaults() {
        let config: ProfileConfig = serde_json::from_str(r#"{"hll_lg_k": 10}"#).unwrap();
        assert_eq!(config.hll_lg_k, 10);
        assert_eq!(config.kll_k, 200);
        assert!(config.coerce_strings);
    }
}
