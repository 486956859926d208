//! Protobuf messages for serialized column profiles (format version 1).
//!
//! The messages are declared with `prost` derives. Sketch contents travel as
//! opaque `bytes` fields holding each sketch's own binary encoding.
//!
//! ```text
//! message ColumnMessage {
//!   uint32 version = 1;
//!   string name = 2;
//!   CountersMessage counters = 3;
//!   SchemaMessage schema = 4;
//!   NumbersMessage numbers = 5;
//!   StringsMessage strings = 6;
//!   bytes frequent_items = 7;
//!   bytes cardinality_tracker = 8;
//! }
//! ```

use std::collections::HashMap;

/// Current serialization format version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ColumnMessage {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(message, optional, tag = "3")]
    pub counters: Option<CountersMessage>,
    #[prost(message, optional, tag = "4")]
    pub schema: Option<SchemaMessage>,
    #[prost(message, optional, tag = "5")]
    pub numbers: Option<NumbersMessage>,
    #[prost(message, optional, tag = "6")]
    pub strings: Option<StringsMessage>,
    #[prost(bytes = "vec", tag = "7")]
    pub frequent_items: Vec<u8>,
    #[prost(bytes = "vec", tag = "8")]
    pub cardinality_tracker: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CountersMessage {
    #[prost(uint64, tag = "1")]
    pub count: u64,
    #[prost(uint64, optional, tag = "2")]
    pub true_count: Option<u64>,
    /// Written by older producers only; folded into the NULL type count on load.
    #[prost(uint64, optional, tag = "3")]
    pub null_count: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SchemaMessage {
    /// Keyed by [`InferredType::wire_tag`](crate::trackers::InferredType::wire_tag)
    #[prost(map = "int32, uint64", tag = "1")]
    pub type_counts: HashMap<i32, u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NumbersMessage {
    #[prost(message, optional, tag = "1")]
    pub integral: Option<NumericMessage>,
    #[prost(message, optional, tag = "2")]
    pub fractional: Option<NumericMessage>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NumericMessage {
    #[prost(uint64, tag = "1")]
    pub count: u64,
    #[prost(double, tag = "2")]
    pub min: f64,
    #[prost(double, tag = "3")]
    pub max: f64,
    #[prost(double, tag = "4")]
    pub mean: f64,
    #[prost(double, tag = "5")]
    pub m2: f64,
    #[prost(bytes = "vec", tag = "6")]
    pub histogram: Vec<u8>,
    #[prost(bytes = "vec", tag = "7")]
    pub quantiles: Vec<u8>,
    #[prost(bytes = "vec", tag = "8")]
    pub cardinality: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringsMessage {
    /// Length statistics; the sketch fields are left empty
    #[prost(message, optional, tag = "1")]
    pub length: Option<NumericMessage>,
    #[prost(message, optional, tag = "2")]
    pub char_pos: Option<CharPosMessage>,
    #[prost(bytes = "vec", tag = "3")]
    pub cardinality: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CharPosMessage {
    #[prost(string, tag = "1")]
    pub character_list: String,
    #[prost(uint32, tag = "2")]
    pub max_positions: u32,
    #[prost(message, repeated, tag = "3")]
    pub positions: Vec<PositionMessage>,
}

/// Counts at one character position: one per listed character, then "other".
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PositionMessage {
    #[prost(uint64, repeated, tag = "1")]
    pub counts: Vec<u64>,
}
