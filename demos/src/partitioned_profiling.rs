//! Example demonstrating parallel profiling of a partitioned column.
//!
//! Each worker thread profiles one partition; the partial profiles are sent
//! back over a channel, serialized as they would be between processes, and
//! reduced into a single profile.

use std::sync::mpsc;
use std::thread;

use term_profile::logging::setup::{init_logging, LoggingConfig};
use term_profile::prelude::*;
use tracing::{info, warn};

const PARTITIONS: usize = 4;
const ROWS_PER_PARTITION: usize = 25_000;

/// Simulates one partition of an `amount` column with a few dirty rows.
fn partition_rows(partition: usize) -> Vec<Option<String>> {
    (0..ROWS_PER_PARTITION)
        .map(|row| {
            let id = partition * ROWS_PER_PARTITION + row;
            match id % 50 {
                0 => None,
                1 => Some("n/a".to_string()),
                n if n % 2 == 0 => Some(format!("{}", id % 1_000)),
                _ => Some(format!("{:.2}", id as f64 / 13.0)),
            }
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::development())?;

    println!("=== Term Partitioned Profiling Example ===\n");

    let (sender, receiver) = mpsc::channel();
    let workers: Vec<_> = (0..PARTITIONS)
        .map(|partition| {
            let sender = sender.clone();
            thread::spawn(move || {
                let mut profile = ColumnProfile::new("amount");
                for value in partition_rows(partition) {
                    profile.track(value);
                }
                info!(partition, count = profile.counters().count(), "partition profiled");
                // ship the profile the way a remote worker would
                if sender.send(profile.to_bytes()).is_err() {
                    warn!(partition, "receiver hung up, dropping partition profile");
                }
            })
        })
        .collect();
    drop(sender);

    let mut profiles = Vec::with_capacity(PARTITIONS);
    for bytes in receiver {
        println!("received partial profile ({} bytes)", bytes.len());
        profiles.push(ColumnProfile::from_bytes(&bytes)?);
    }
    for worker in workers {
        worker.join().map_err(|_| "worker thread panicked")?;
    }

    let merged = ColumnProfile::merge_all(profiles)?.ok_or("no partitions were profiled")?;
    let summary = merged.to_summary();

    println!("\nrows:          {}", summary.counters.count);
    println!("nulls:         {}", summary.counters.null_count.unwrap_or(0));
    println!(
        "inferred type: {} ({:.1}%)",
        summary.schema.inferred_type.inferred_type,
        summary.schema.inferred_type.ratio * 100.0
    );
    if let Some(numbers) = &summary.number_summary {
        println!(
            "numbers:       min {} / median {} / max {}",
            numbers.min, numbers.quantiles.quantile_values[4], numbers.max
        );
    }
    if let Some(unique) = &summary.unique_count {
        println!(
            "distinct:      ~{:.0} [{:.0}, {:.0}]",
            unique.estimate, unique.lower, unique.upper
        );
    }

    println!("\nFull summary:\n{}", summary.to_json()?);
    Ok(())
}
