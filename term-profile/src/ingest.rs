//! Arrow ingestion for column profiles.

use arrow::array::{Array, ArrowPrimitiveType, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use tracing::debug;

use crate::error::ProfileResult;
use crate::profile::ColumnProfile;
use crate::value::TrackedValue;

impl ColumnProfile {
    /// Tracks every element of an Arrow array.
    ///
    /// Nulls are tracked as nulls. Integers become integral values (`u64`
    /// above `i64::MAX` becomes fractional), floats fractional and string
    /// arrays strings. Any other type is rendered with Arrow's display
    /// formatter and tracked as a string.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use arrow::array::{ArrayRef, Int64Array};
    /// use term_profile::prelude::*;
    ///
    /// let array: ArrayRef = Arc::new(Int64Array::from(vec![Some(1), None, Some(3)]));
    /// let mut profile = ColumnProfile::new("id");
    /// profile.track_array(array.as_ref()).unwrap();
    ///
    /// assert_eq!(profile.counters().count(), 3);
    /// assert_eq!(profile.counters().null_count(), 1);
    /// ```
    pub fn track_array(&mut self, array: &dyn Array) -> ProfileResult<()> {
        debug!(
            data_type = %array.data_type(),
            len = array.len(),
            null_count = array.null_count(),
            "tracking arrow array"
        );

        match array.data_type() {
            DataType::Null => {
                for _ in 0..array.len() {
                    self.track(TrackedValue::Null);
                }
            }
            DataType::Boolean => self.track_all(array.as_boolean().iter()),
            DataType::Int8 => self.track_primitive::<Int8Type>(array),
            DataType::Int16 => self.track_primitive::<Int16Type>(array),
            DataType::Int32 => self.track_primitive::<Int32Type>(array),
            DataType::Int64 => self.track_primitive::<Int64Type>(array),
            DataType::UInt8 => self.track_primitive::<UInt8Type>(array),
            DataType::UInt16 => self.track_primitive::<UInt16Type>(array),
            DataType::UInt32 => self.track_primitive::<UInt32Type>(array),
            DataType::UInt64 => self.track_primitive::<UInt64Type>(array),
            DataType::Float32 => self.track_primitive::<Float32Type>(array),
            DataType::Float64 => self.track_primitive::<Float64Type>(array),
            DataType::Utf8 => self.track_all(array.as_string::<i32>().iter()),
            DataType::LargeUtf8 => self.track_all(array.as_string::<i64>().iter()),
            DataType::Utf8View => self.track_all(array.as_string_view().iter()),
            _ => self.track_formatted(array)?,
        }
        Ok(())
    }

    fn track_all<'a, I, T>(&mut self, values: I)
    where
        I: IntoIterator<Item = Option<T>>,
        T: Into<TrackedValue<'a>>,
    {
        for value in values {
            self.track(value);
        }
    }

    fn track_primitive<T>(&mut self, array: &dyn Array)
    where
        T: ArrowPrimitiveType,
        for<'a> T::Native: Into<TrackedValue<'a>>,
    {
        self.track_all(array.as_primitive::<T>().iter());
    }

    fn track_formatted(&mut self, array: &dyn Array) -> ProfileResult<()> {
        let formatter = ArrayFormatter::try_new(array, &FormatOptions::default())?;
        for i in 0..array.len() {
            if array.is_null(i) {
                self.track(TrackedValue::Null);
            } else {
                self.track(formatter.value(i).to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{
        ArrayRef, BooleanArray, Date32Array, Float64Array, LargeStringArray, NullArray,
        StringArray, UInt64Array,
    };

    use crate::profile::ColumnProfile;
    use crate::trackers::InferredType;

    #[test]
    fn test_track_string_array() {
        let array: ArrayRef = Arc::new(StringArray::from(vec![Some("a"), None, Some("bb")]));
        let mut profile = ColumnProfile::new("s");
        profile.track_array(array.as_ref()).unwrap();

        assert_eq!(profile.counters().count(), 3);
        assert_eq!(profile.counters().null_count(), 1);
        assert_eq!(profile.string_tracker().count(), 2);
    }

    #[test]
    fn test_track_large_utf8_is_coerced() {
        let array = LargeStringArray::from(vec!["1", "2.5", "x"]);
        let mut profile = ColumnProfile::new("s");
        profile.track_array(&array).unwrap();

        let schema = profile.schema_tracker();
        assert_eq!(schema.get_count(InferredType::Integral), 1);
        assert_eq!(schema.get_count(InferredType::Fractional), 1);
        assert_eq!(schema.get_count(InferredType::String), 1);
    }

    #[test]
    fn test_track_numeric_and_boolean_arrays() {
        let mut profile = ColumnProfile::new("n");
        profile
            .track_array(&UInt64Array::from(vec![1, u64::MAX]))
            .unwrap();
        profile
            .track_array(&Float64Array::from(vec![0.5, f64::NAN]))
            .unwrap();
        profile
            .track_array(&BooleanArray::from(vec![true, false]))
            .unwrap();

        let schema = profile.schema_tracker();
        assert_eq!(schema.get_count(InferredType::Integral), 1);
        assert_eq!(schema.get_count(InferredType::Fractional), 2);
        assert_eq!(schema.get_count(InferredType::Null), 1);
        assert_eq!(schema.get_count(InferredType::Boolean), 2);
        assert_eq!(profile.number_tracker().count(), 3);
    }

    #[test]
    fn test_track_other_types_as_text() {
        let mut profile = ColumnProfile::new("d");
        profile
            .track_array(&Date32Array::from(vec![Some(0), None]))
            .unwrap();
        profile.track_array(&NullArray::new(2)).unwrap();

        assert_eq!(profile.counters().null_count(), 3);
        let items = profile.frequent_items().items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].value, "1970-01-01");
    }
}
