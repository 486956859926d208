//! Values accepted by [`ColumnProfile::track`](crate::profile::ColumnProfile::track).
//!
//! A [`TrackedValue`] is a closed set of value kinds. Callers convert their
//! own data into it through the `From` impls below; the profile never
//! inspects foreign types.

use std::borrow::Cow;

/// A single value observed in a column.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackedValue<'a> {
    /// Missing value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Value of a declared integer kind
    Integral(i64),
    /// Value of a declared floating-point kind, whole or not
    Fractional(f64),
    /// Textual value
    String(Cow<'a, str>),
    /// Value without a usable representation
    Unknown,
}

impl<'a> TrackedValue<'a> {
    /// Parses textual values that look like numbers or booleans.
    ///
    /// Strings that parse exactly as `i64` become integral, strings that parse
    /// as a finite `f64` become fractional, and `true`/`false` (any case)
    /// become booleans. Everything else is returned unchanged.
    pub fn coerce(self) -> TrackedValue<'a> {
        match self {
            TrackedValue::String(text) => match parse_text(&text) {
                Some(parsed) => parsed,
                None => TrackedValue::String(text),
            },
            other => other,
        }
    }

    /// Returns true for `Null` and fractional NaN.
    pub fn is_null(&self) -> bool {
        match self {
            TrackedValue::Null => true,
            TrackedValue::Fractional(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Normalized textual form used as the key of frequent-items and
    /// cardinality sketches.
    ///
    /// Numbers and strings share one namespace: the integer `3` and the string
    /// `"3"` (when not coerced) map to the same key. Whole floats keep a
    /// trailing `.0` so `1.0` stays distinct from `1`.
    pub fn canonical(&self) -> Option<Cow<'_, str>> {
        match self {
            TrackedValue::Null | TrackedValue::Unknown => None,
            TrackedValue::Boolean(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
            TrackedValue::Integral(v) => Some(Cow::Owned(v.to_string())),
            TrackedValue::Fractional(v) => {
                if v.is_nan() {
                    None
                } else {
                    Some(Cow::Owned(canonical_f64(*v)))
                }
            }
            TrackedValue::String(s) => Some(Cow::Borrowed(s.as_ref())),
        }
    }

    /// Converts borrowed text into an owned value.
    pub fn into_owned(self) -> TrackedValue<'static> {
        match self {
            TrackedValue::Null => TrackedValue::Null,
            TrackedValue::Boolean(b) => TrackedValue::Boolean(b),
            TrackedValue::Integral(v) => TrackedValue::Integral(v),
            TrackedValue::Fractional(v) => TrackedValue::Fractional(v),
            TrackedValue::String(s) => TrackedValue::String(Cow::Owned(s.into_owned())),
            TrackedValue::Unknown => TrackedValue::Unknown,
        }
    }
}

/// Formats a float the way it is keyed in sketches.
pub fn canonical_f64(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn parse_text(text: &str) -> Option<TrackedValue<'static>> {
    if text.eq_ignore_ascii_case("true") {
        return Some(TrackedValue::Boolean(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Some(TrackedValue::Boolean(false));
    }
    // f64 parsing accepts "inf" and "NaN"; only texts with a digit qualify
    if !text.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    if let Ok(v) = text.parse::<i64>() {
        return Some(TrackedValue::Integral(v));
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(TrackedValue::Fractional(v)),
        _ => None,
    }
}

impl From<bool> for TrackedValue<'_> {
    fn from(value: bool) -> Self {
        TrackedValue::Boolean(value)
    }
}

macro_rules! impl_from_integral {
    ($($t:ty),*) => {
        $(
            impl From<$t> for TrackedValue<'_> {
                fn from(value: $t) -> Self {
                    TrackedValue::Integral(i64::from(value))
                }
            }
        )*
    };
}

impl_from_integral!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for TrackedValue<'_> {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => TrackedValue::Integral(v),
            Err(_) => TrackedValue::Fractional(value as f64),
        }
    }
}

impl From<usize> for TrackedValue<'_> {
    fn from(value: usize) -> Self {
        TrackedValue::from(value as u64)
    }
}

impl From<isize> for TrackedValue<'_> {
    fn from(value: isize) -> Self {
        TrackedValue::Integral(value as i64)
    }
}

impl From<f32> for TrackedValue<'_> {
    fn from(value: f32) -> Self {
        TrackedValue::Fractional(f64::from(value))
    }
}

impl From<f64> for TrackedValue<'_> {
    fn from(value: f64) -> Self {
        TrackedValue::Fractional(value)
    }
}

impl<'a> From<&'a str> for TrackedValue<'a> {
    fn from(value: &'a str) -> Self {
        TrackedValue::String(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a String> for TrackedValue<'a> {
    fn from(value: &'a String) -> Self {
        TrackedValue::String(Cow::Borrowed(value.as_str()))
    }
}

impl From<String> for TrackedValue<'_> {
    fn from(value: String) -> Self {
        TrackedValue::String(Cow::Owned(value))
    }
}

impl<'a> From<&'a [u8]> for TrackedValue<'a> {
    fn from(value: &'a [u8]) -> Self {
        match std::str::from_utf8(value) {
            Ok(text) => TrackedValue::String(Cow::Borrowed(text)),
            Err(_) => TrackedValue::Unknown,
        }
    }
}

impl From<()> for TrackedValue<'_> {
    fn from(_: ()) -> Self {
        TrackedValue::Null
    }
}

impl<'a, T: Into<TrackedValue<'a>>> From<Option<T>> for TrackedValue<'a> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => TrackedValue::Null,
        }
    }
}

impl<'a> From<&'a serde_json::Value> for TrackedValue<'a> {
    fn from(value: &'a serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => TrackedValue::Null,
            Value::Bool(b) => TrackedValue::Boolean(*b),
            Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    TrackedValue::Integral(v)
                } else if let Some(v) = n.as_f64() {
                    TrackedValue::Fractional(v)
                } else {
                    TrackedValue::Unknown
                }
            }
            Value::String(s) => TrackedValue::String(Cow::Borrowed(s.as_str())),
            Value::Array(_) | Value::Object(_) => TrackedValue::String(Cow::Owned(value.to_string())),
        }
    }
}
