//! Example demonstrating column profiles built from Arrow record batches.
//!
//! Every column of each batch is tracked into its own profile. Profiles of the
//! same column from different batches are merged.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use term_profile::prelude::*;

/// Simulates a daily batch of sales data.
fn sales_batch(day: i64) -> Result<RecordBatch, Box<dyn std::error::Error>> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("order_id", DataType::Int64, false),
        Field::new("amount", DataType::Float64, true),
        Field::new("region", DataType::Utf8, true),
        Field::new("express", DataType::Boolean, true),
    ]));

    let ids: Vec<i64> = (0..100).map(|i| day * 100 + i).collect();
    let amounts: Vec<Option<f64>> = (0..100)
        .map(|i| (i % 17 != 0).then(|| 10.0 + (i * day) as f64 * 0.75))
        .collect();
    let regions: Vec<Option<&str>> = (0..100)
        .map(|i| match i % 5 {
            0 => Some("US"),
            1 | 2 => Some("EU"),
            3 => Some("APAC"),
            _ => None,
        })
        .collect();
    let express: Vec<Option<bool>> = (0..100).map(|i| Some(i % 3 == 0)).collect();

    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(Float64Array::from(amounts)),
            Arc::new(StringArray::from(regions)),
            Arc::new(BooleanArray::from(express)),
        ],
    )?)
}

fn profile_batch(batch: &RecordBatch) -> ProfileResult<Vec<ColumnProfile>> {
    let schema = batch.schema();
    let mut profiles = Vec::with_capacity(batch.num_columns());
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let mut profile = ColumnProfile::new(field.name().as_str());
        profile.track_array(column.as_ref())?;
        profiles.push(profile);
    }
    Ok(profiles)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Term Arrow Ingestion Example ===\n");

    let mut columns: BTreeMap<String, ColumnProfile> = BTreeMap::new();
    for day in 1..=3 {
        let batch = sales_batch(day)?;
        for profile in profile_batch(&batch)? {
            match columns.get_mut(profile.column_name()) {
                Some(existing) => existing.merge_from(&profile)?,
                None => {
                    columns.insert(profile.column_name().to_string(), profile);
                }
            }
        }
    }

    for (name, profile) in &columns {
        let summary = profile.to_summary();
        println!(
            "{name:<10} count={:<5} nulls={:<4} type={:<11} distinct~{:.0}",
            summary.counters.count,
            summary.counters.null_count.unwrap_or(0),
            summary.schema.inferred_type.inferred_type,
            summary.unique_count.map_or(0.0, |u| u.estimate),
        );
        if let Some(items) = &summary.frequent_items {
            let top: Vec<String> = items
                .items
                .iter()
                .take(3)
                .map(|i| format!("{}x{}", i.json_value, i.estimate))
                .collect();
            println!("{:<10} top: {}", "", top.join(", "));
        }
    }

    Ok(())
}
