//! Integration tests for protobuf serialization of column profiles.

use term_profile::config::DEFAULT_CHARACTER_LIST;
use term_profile::prelude::*;
use term_profile::proto::ColumnMessage;

fn realistic_profile() -> ColumnProfile {
    let mut profile = ColumnProfile::new("orders.amount");
    for i in 0..2_000 {
        match i % 7 {
            0 => profile.track(None::<f64>),
            1 => profile.track(format!("sku-{}", i % 40)),
            2 => profile.track(i % 2 == 0),
            3 => profile.track(i as f64 / 3.0),
            _ => profile.track(i),
        }
    }
    profile
}

#[test]
fn test_protobuf_roundtrip_preserves_summary() {
    let profile = realistic_profile();
    let decoded = ColumnProfile::from_protobuf(&profile.to_protobuf()).unwrap();

    assert_eq!(decoded.column_name(), "orders.amount");
    assert_eq!(decoded.to_summary(), profile.to_summary());
    assert_eq!(decoded.config(), profile.config());
}

#[test]
fn test_bytes_roundtrip() {
    let profile = realistic_profile();
    let bytes = profile.to_bytes();
    let decoded = ColumnProfile::from_bytes(&bytes).unwrap();

    assert_eq!(decoded.to_summary(), profile.to_summary());
    // decoded profiles keep merging
    let merged = decoded.merge(&profile).unwrap();
    assert_eq!(merged.counters().count(), 4_000);
}

#[test]
fn test_empty_profile_roundtrip_keeps_character_list() {
    let profile = ColumnProfile::new("empty");
    let decoded = ColumnProfile::from_bytes(&profile.to_bytes()).unwrap();

    assert_eq!(
        decoded.string_tracker().char_pos().character_list(),
        DEFAULT_CHARACTER_LIST
    );
    assert_eq!(decoded.to_summary(), profile.to_summary());
}

#[test]
fn test_custom_config_survives_roundtrip() {
    let config = ProfileConfig::builder()
        .hll_lg_k(10)
        .kll_k(64)
        .histogram_bins(10)
        .frequent_items_capacity(8)
        .character_list("abc")
        .char_pos_max_positions(4)
        .build()
        .unwrap();
    let mut profile = ColumnProfile::with_config("c", config.clone());
    for v in ["abcabc", "cab", "zz"] {
        profile.track(v);
    }
    for i in 0..50 {
        profile.track(i);
    }

    let decoded = ColumnProfile::from_bytes(&profile.to_bytes()).unwrap();
    assert_eq!(decoded.config(), &config);
    assert_eq!(decoded.to_summary(), profile.to_summary());
}

#[test]
fn test_writer_leaves_null_count_unset() {
    let mut profile = ColumnProfile::new("c");
    profile.track(());
    profile.track(true);

    let message = profile.to_protobuf();
    let counters = message.counters.as_ref().unwrap();
    assert_eq!(counters.null_count, None);
    assert_eq!(counters.true_count, Some(1));
    assert_eq!(message.version, term_profile::proto::FORMAT_VERSION);
}

#[test]
fn test_legacy_null_count_is_folded_into_null_type() {
    let mut profile = ColumnProfile::new("legacy");
    profile.track(1);
    profile.track(2);

    let mut message = profile.to_protobuf();
    let counters = message.counters.as_mut().unwrap();
    counters.count += 3;
    counters.null_count = Some(3);

    let decoded = ColumnProfile::from_protobuf(&message).unwrap();
    assert_eq!(decoded.counters().count(), 5);
    assert_eq!(decoded.counters().null_count(), 3);
    assert_eq!(decoded.schema_tracker().get_count(InferredType::Null), 3);
    assert_eq!(decoded.to_summary().counters.null_count, Some(3));
}

#[test]
fn test_corrupt_sketch_payloads_are_rejected() {
    let profile = realistic_profile();

    let mut truncated = profile.to_protobuf();
    let len = truncated.cardinality_tracker.len();
    truncated.cardinality_tracker.truncate(len - 1);
    assert!(ColumnProfile::from_protobuf(&truncated)
        .unwrap_err()
        .is_deserialization());

    let mut bad_family = profile.to_protobuf();
    bad_family.frequent_items[0] ^= 0xff;
    assert!(ColumnProfile::from_protobuf(&bad_family)
        .unwrap_err()
        .is_deserialization());

    let mut bad_quantiles = profile.to_protobuf();
    let numbers = bad_quantiles.numbers.as_mut().unwrap();
    let fractional = numbers.fractional.as_mut().unwrap();
    fractional.quantiles.push(0);
    assert!(ColumnProfile::from_protobuf(&bad_quantiles)
        .unwrap_err()
        .is_deserialization());
}

#[test]
fn test_unknown_type_tag_is_rejected() {
    let mut message = realistic_profile().to_protobuf();
    message.schema.as_mut().unwrap().type_counts.insert(42, 1);

    let err = ColumnProfile::from_protobuf(&message).unwrap_err();
    assert!(err.is_deserialization());
    assert!(err.to_string().contains("42"));
}

#[test]
fn test_missing_counters_are_rejected() {
    let message = ColumnMessage {
        version: term_profile::proto::FORMAT_VERSION,
        name: "c".to_string(),
        ..Default::default()
    };
    assert!(ColumnProfile::from_protobuf(&message)
        .unwrap_err()
        .is_deserialization());
}

#[test]
fn test_garbage_bytes_are_rejected() {
    assert!(ColumnProfile::from_bytes(&[0xff, 0xff, 0xff])
        .unwrap_err()
        .is_deserialization());
}

#[test]
fn test_oversized_frequent_items_header_is_rejected() {
    // family, version, capacity, total, offset, entry count; no entries follow
    let mut payload = vec![0x46, 1];
    payload.extend_from_slice(&u32::MAX.to_le_bytes());
    payload.extend_from_slice(&0u64.to_le_bytes());
    payload.extend_from_slice(&0u64.to_le_bytes());
    payload.extend_from_slice(&u32::MAX.to_le_bytes());

    let mut message = realistic_profile().to_protobuf();
    message.frequent_items = payload;
    let err = ColumnProfile::from_protobuf(&message).unwrap_err();
    assert!(err.is_deserialization());
}

#[test]
fn test_type_count_overflow_is_rejected() {
    let mut profile = ColumnProfile::new("overflow");
    profile.track("x");

    let mut message = profile.to_protobuf();
    message
        .schema
        .as_mut()
        .unwrap()
        .type_counts
        .insert(InferredType::Null.wire_tag(), u64::MAX);
    let err = ColumnProfile::from_protobuf(&message).unwrap_err();
    assert!(err.is_deserialization());
    assert!(err.to_string().contains("overflow"));
}

#[test]
fn test_legacy_null_count_overflow_is_rejected() {
    let mut profile = ColumnProfile::new("overflow");
    profile.track(());

    let mut message = profile.to_protobuf();
    message.counters.as_mut().unwrap().null_count = Some(u64::MAX);
    let err = ColumnProfile::from_protobuf(&message).unwrap_err();
    assert!(err.is_deserialization());
    assert!(err.to_string().contains("overflow"));
}
