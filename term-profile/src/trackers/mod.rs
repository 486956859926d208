//! Per-column trackers owned by a [`ColumnProfile`](crate::profile::ColumnProfile).
//!
//! Each tracker owns its data, merges by union and produces its own part of
//! the [`ColumnSummary`](crate::summary::ColumnSummary).

pub mod cardinality;
pub mod char_pos;
pub mod counters;
pub mod frequent;
pub mod number;
pub mod schema;
pub mod stats;
pub mod string;

pub use cardinality::CardinalityTracker;
pub use char_pos::CharPosTracker;
pub use counters::Counters;
pub use frequent::FrequentItemsTracker;
pub use number::{NumberTracker, NumericSubTracker};
pub use schema::{InferredType, TypeInferenceTracker};
pub use stats::NumericStats;
pub use string::StringTracker;
