//! Prelude for commonly used types and traits in term-profile.

pub use crate::config::ProfileConfig;
pub use crate::error::{ProfileError, ProfileResult};
pub use crate::logging::setup::LoggingConfig;
pub use crate::profile::ColumnProfile;
pub use crate::sketches::MergeableSketch;
pub use crate::summary::ColumnSummary;
pub use crate::trackers::InferredType;
pub use crate::value::TrackedValue;
