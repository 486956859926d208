//! # Term Profile - Mergeable Column Profiles for Rust
//!
//! Term Profile builds a compact statistical fingerprint of a data column from
//! a single pass over its values. Profiles built independently over disjoint
//! partitions merge into the profile of the whole column, so large datasets
//! can be profiled in parallel and reduced afterwards.
//!
//! ## Overview
//!
//! A [`ColumnProfile`](profile::ColumnProfile) accepts heterogeneous values
//! (nulls, booleans, integers, floats, strings) and maintains:
//!
//! - counts of values, nulls and booleans
//! - a distribution of inferred types and the dominant type
//! - numeric statistics, quantiles and a histogram
//! - string length statistics and a per-position character distribution
//! - approximate frequent items and distinct counts
//!
//! Memory stays bounded regardless of the number of values tracked.
//!
//! ## Quick Start
//!
//! ```rust
//! use term_profile::prelude::*;
//!
//! let mut profile = ColumnProfile::new("age");
//! for value in [1, 2, 3] {
//!     profile.track(value);
//! }
//!
//! let summary = profile.to_summary();
//! assert_eq!(summary.counters.count, 3);
//!
//! let numbers = summary.number_summary.unwrap();
//! assert_eq!(numbers.mean, 2.0);
//! assert_eq!(numbers.stddev, 1.0);
//! assert_eq!(summary.schema.inferred_type.inferred_type, InferredType::Integral);
//! ```
//!
//! ## Parallel Profiling
//!
//! Every profile owns its data and is `Send + Sync`. Build one profile per
//! partition on worker threads, then reduce them:
//!
//! ```rust
//! use std::thread;
//! use term_profile::prelude::*;
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|part| {
//!         thread::spawn(move || {
//!             let mut profile = ColumnProfile::new("id");
//!             for i in (part * 100)..((part + 1) * 100) {
//!                 profile.track(i);
//!             }
//!             profile
//!         })
//!     })
//!     .collect();
//!
//! let profiles = handles.into_iter().map(|h| h.join().unwrap());
//! let merged = ColumnProfile::merge_all(profiles).unwrap().unwrap();
//! assert_eq!(merged.counters().count(), 400);
//! ```
//!
//! ## Serialization
//!
//! Profiles round-trip through protobuf ([`proto`]) without loss; summaries
//! serialize to JSON through `serde`.
//!
//! ## Architecture
//!
//! - **`sketches`**: HyperLogLog, KLL, histogram and frequent-items sketches
//! - **`trackers`**: per-concern trackers owned by a profile
//! - **`profile`**: the [`ColumnProfile`](profile::ColumnProfile) aggregate
//! - **`summary`**: serializable snapshots
//! - **`proto`**: the protobuf wire format
//! - **`logging`**: `tracing` subscriber setup

pub mod config;
pub mod error;
mod ingest;
pub mod logging;
pub mod prelude;
pub mod profile;
pub mod proto;
pub mod sketches;
pub mod summary;
pub mod trackers;
pub mod value;
