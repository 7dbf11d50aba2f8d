//! # Value Codec
//!
//! Conversions between typed setting values and what a backend can hold.
//!
//! Every scalar has one locale-independent text form, used wherever a backend has no native
//! representation for it:
//!
//! | Type | Text form |
//! |------|-----------|
//! | `bool` | `1` / `0` (parsing also accepts `true` / `false`, any case) |
//! | `i32`, `i64` | decimal digits |
//! | `f64` | shortest round-trip form, `NaN`, `inf`, `-inf` |
//! | `Decimal` | exact decimal text |
//! | `DateTime<Utc>` | RFC 3339 with `Z` |
//! | `TimeDelta` | integer count of 100 ns ticks |
//!
//! Arrays without native backend support are joined with `,`. Embedded commas are not escaped,
//! so string-like elements containing a comma do not survive that path. An empty string decodes
//! to an empty array.
//!
//! String-keyed maps are flattened to `[k0, v0, k1, v1, ...]`. [`decode_flat_map`] is strict: an
//! odd-length sequence or a repeated key is an error rather than being truncated.

use crate::error::{Result, SettingsError};
use crate::value::{SettingsMap, Value, ValueKind};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::str::FromStr;

pub const ARRAY_DELIMITER: char = ',';

pub const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i32 = 100;

/// Seconds from the Unix epoch back to 0001-01-01T00:00:00Z.
const MIN_DATETIME_SECONDS: i64 = -62_135_596_800;

// --- Scalar text forms ---

pub fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text == "1" || text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text == "0" || text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

pub fn format_double(value: f64) -> String {
    value.to_string()
}

pub fn parse_double(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses RFC 3339 timestamps. A timestamp without offset is taken as UTC.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// The smallest timestamp settings deal in, 0001-01-01T00:00:00Z.
pub fn datetime_min() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(MIN_DATETIME_SECONDS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn duration_to_ticks(value: TimeDelta) -> i64 {
    value
        .num_seconds()
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(i64::from(value.subsec_nanos() / NANOS_PER_TICK))
}

pub fn duration_from_ticks(ticks: i64) -> TimeDelta {
    TimeDelta::seconds(ticks / TICKS_PER_SECOND)
        + TimeDelta::nanoseconds((ticks % TICKS_PER_SECOND) * i64::from(NANOS_PER_TICK))
}

// --- Arrays ---

pub fn join_array<T>(items: &[T], format: impl Fn(&T) -> String) -> String {
    items
        .iter()
        .map(format)
        .collect::<Vec<_>>()
        .join(&ARRAY_DELIMITER.to_string())
}

/// Splits a joined array. Returns `None` if any element fails to parse.
pub fn split_array<T>(text: &str, parse: impl Fn(&str) -> Option<T>) -> Option<Vec<T>> {
    if text.is_empty() {
        return Some(Vec::new());
    }
    text.split(ARRAY_DELIMITER).map(parse).collect()
}

// --- Maps ---

pub fn encode_flat_map(map: &SettingsMap) -> Vec<String> {
    let mut flat = Vec::with_capacity(map.len() * 2);
    for (k, v) in map.iter() {
        flat.push(k.to_string());
        flat.push(v.to_string());
    }
    flat
}

/// Decodes `[k0, v0, k1, v1, ...]` for the setting `key`.
pub fn decode_flat_map(key: &str, items: &[String]) -> Result<SettingsMap> {
    if items.len() % 2 != 0 {
        return Err(SettingsError::MalformedStoredValue {
            key: key.to_string(),
            reason: format!("map sequence has odd length {}", items.len()),
        });
    }
    let mut map = SettingsMap::new();
    for pair in items.chunks(2) {
        if map.insert(pair[0].clone(), pair[1].clone()).is_some() {
            return Err(SettingsError::MalformedStoredValue {
                key: key.to_string(),
                reason: format!("map key '{}' appears more than once", pair[0]),
            });
        }
    }
    Ok(map)
}

// --- Whole values ---

/// Text rendering of any value, for display and for string getters.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::StringArray(items) => items.join(&ARRAY_DELIMITER.to_string()),
        Value::Int(i) => i.to_string(),
        Value::IntArray(items) => join_array(items, |i| i.to_string()),
        Value::Double(d) => format_double(*d),
        Value::DoubleArray(items) => join_array(items, |d| format_double(*d)),
        Value::Decimal(d) => d.to_string(),
        Value::DecimalArray(items) => join_array(items, |d| d.to_string()),
        Value::Bool(b) => b.to_string(),
        Value::BoolArray(items) => join_array(items, |b| b.format_text()),
        Value::DateTime(t) => format_datetime(t),
        Value::DateTimeArray(items) => join_array(items, format_datetime),
        Value::Duration(d) => duration_to_ticks(*d).to_string(),
        Value::DurationArray(items) => join_array(items, |d| duration_to_ticks(*d).to_string()),
        Value::Map(map) => map
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(&ARRAY_DELIMITER.to_string()),
        Value::Bytes(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
    }
}

/// Parses user-supplied text as a value of `kind`. Arrays are comma-separated, maps are
/// `key=value` pairs separated by commas.
pub fn parse_value(kind: ValueKind, text: &str) -> Result<Value> {
    fn scalar<T: SettingScalar>(text: &str) -> Option<Value> {
        T::parse_text(text).map(|v| v.to_value())
    }
    fn array<T: SettingScalar>(text: &str) -> Option<Value> {
        split_array(text, T::parse_text).map(T::to_array_value)
    }

    let parsed = match kind {
        ValueKind::String => Some(Value::String(text.to_string())),
        ValueKind::StringArray => array::<String>(text),
        ValueKind::Int => scalar::<i64>(text),
        ValueKind::IntArray => array::<i64>(text),
        ValueKind::Double => scalar::<f64>(text),
        ValueKind::DoubleArray => array::<f64>(text),
        ValueKind::Decimal => scalar::<Decimal>(text),
        ValueKind::DecimalArray => array::<Decimal>(text),
        ValueKind::Bool => scalar::<bool>(text),
        ValueKind::BoolArray => array::<bool>(text),
        ValueKind::DateTime => scalar::<DateTime<Utc>>(text),
        ValueKind::DateTimeArray => array::<DateTime<Utc>>(text),
        ValueKind::Duration => scalar::<TimeDelta>(text),
        ValueKind::DurationArray => array::<TimeDelta>(text),
        ValueKind::Map => {
            let mut map = SettingsMap::new();
            let mut valid = true;
            if !text.is_empty() {
                for pair in text.split(ARRAY_DELIMITER) {
                    match pair.split_once('=') {
                        Some((k, v)) => {
                            map.insert(k, v);
                        }
                        None => valid = false,
                    }
                }
            }
            valid.then_some(Value::Map(map))
        }
        ValueKind::Bytes => return Err(SettingsError::UnsupportedType(kind)),
    };

    parsed.ok_or_else(|| SettingsError::Store(format!("cannot parse '{}' as {}", text, kind)))
}

// --- Typed values ---

/// A type that can be stored as a setting.
///
/// `from_value` is lenient: it accepts every representation a backend may hand back for the
/// type (a registry stores doubles as strings, a file store keeps them as doubles) and returns
/// `None` only when the value cannot mean a `Self`.
pub trait SettingValue: Clone + PartialEq + Send + Sync + 'static {
    const KIND: ValueKind;

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;

    /// The value returned by getters without an explicit fallback.
    fn type_default() -> Self;
}

/// A setting type that can also be an array element, a list item or a map value.
pub trait SettingScalar: SettingValue {
    const ARRAY_KIND: ValueKind;

    fn format_text(&self) -> String;

    fn parse_text(text: &str) -> Option<Self>;

    fn to_array_value(items: Vec<Self>) -> Value;

    /// Extracts the backend-native array variant, if `value` is one.
    fn native_array(value: &Value) -> Option<Vec<Self>>;

    fn array_from_value(value: &Value) -> Option<Vec<Self>> {
        if let Some(items) = Self::native_array(value) {
            return Some(items);
        }
        match value {
            Value::String(text) => split_array(text, Self::parse_text),
            _ => None,
        }
    }
}

impl<T: SettingScalar> SettingValue for Vec<T> {
    const KIND: ValueKind = T::ARRAY_KIND;

    fn to_value(&self) -> Value {
        T::to_array_value(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        T::array_from_value(value)
    }

    fn type_default() -> Self {
        Vec::new()
    }
}

impl SettingValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Int(1) => Some(true),
            Value::Int(0) => Some(false),
            Value::String(s) => parse_bool(s),
            _ => None,
        }
    }

    fn type_default() -> Self {
        false
    }
}

impl SettingScalar for bool {
    const ARRAY_KIND: ValueKind = ValueKind::BoolArray;

    fn format_text(&self) -> String {
        (if *self { "1" } else { "0" }).to_string()
    }

    fn parse_text(text: &str) -> Option<Self> {
        parse_bool(text)
    }

    fn to_array_value(items: Vec<Self>) -> Value {
        Value::BoolArray(items)
    }

    fn native_array(value: &Value) -> Option<Vec<Self>> {
        match value {
            Value::BoolArray(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl SettingValue for i64 {
    const KIND: ValueKind = ValueKind::Int;

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::String(s) => Self::parse_text(s),
            _ => None,
        }
    }

    fn type_default() -> Self {
        0
    }
}

impl SettingScalar for i64 {
    const ARRAY_KIND: ValueKind = ValueKind::IntArray;

    fn format_text(&self) -> String {
        self.to_string()
    }

    fn parse_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }

    fn to_array_value(items: Vec<Self>) -> Value {
        Value::IntArray(items)
    }

    fn native_array(value: &Value) -> Option<Vec<Self>> {
        match value {
            Value::IntArray(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl SettingValue for i32 {
    const KIND: ValueKind = ValueKind::Int;

    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|i| i32::try_from(i).ok())
    }

    fn type_default() -> Self {
        0
    }
}

impl SettingScalar for i32 {
    const ARRAY_KIND: ValueKind = ValueKind::IntArray;

    fn format_text(&self) -> String {
        self.to_string()
    }

    fn parse_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }

    fn to_array_value(items: Vec<Self>) -> Value {
        Value::IntArray(items.into_iter().map(i64::from).collect())
    }

    fn native_array(value: &Value) -> Option<Vec<Self>> {
        match value {
            Value::IntArray(items) => items.iter().map(|i| i32::try_from(*i).ok()).collect(),
            _ => None,
        }
    }
}

impl SettingValue for f64 {
    const KIND: ValueKind = ValueKind::Double;

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Double(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            Value::Decimal(d) => d.to_f64(),
            Value::String(s) => parse_double(s),
            _ => None,
        }
    }

    /// Doubles default to NaN, so "unset" stays distinguishable from zero.
    fn type_default() -> Self {
        f64::NAN
    }
}

impl SettingScalar for f64 {
    const ARRAY_KIND: ValueKind = ValueKind::DoubleArray;

    fn format_text(&self) -> String {
        format_double(*self)
    }

    fn parse_text(text: &str) -> Option<Self> {
        parse_double(text)
    }

    fn to_array_value(items: Vec<Self>) -> Value {
        Value::DoubleArray(items)
    }

    fn native_array(value: &Value) -> Option<Vec<Self>> {
        match value {
            Value::DoubleArray(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl SettingValue for Decimal {
    const KIND: ValueKind = ValueKind::Decimal;

    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Decimal(d) => Some(*d),
            Value::Int(i) => Some(Decimal::from(*i)),
            Value::Double(d) => Decimal::from_f64(*d),
            Value::String(s) => parse_decimal(s),
            _ => None,
        }
    }

    fn type_default() -> Self {
        Decimal::ZERO
    }
}

impl SettingScalar for Decimal {
    const ARRAY_KIND: ValueKind = ValueKind::DecimalArray;

    fn format_text(&self) -> String {
        self.to_string()
    }

    fn parse_text(text: &str) -> Option<Self> {
        parse_decimal(text)
    }

    fn to_array_value(items: Vec<Self>) -> Value {
        Value::DecimalArray(items)
    }

    fn native_array(value: &Value) -> Option<Vec<Self>> {
        match value {
            Value::DecimalArray(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl SettingValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Int(_)
            | Value::Double(_)
            | Value::Decimal(_)
            | Value::Bool(_)
            | Value::DateTime(_)
            | Value::Duration(_) => Some(format_value(value)),
            _ => None,
        }
    }

    fn type_default() -> Self {
        String::new()
    }
}

impl SettingScalar for String {
    const ARRAY_KIND: ValueKind = ValueKind::StringArray;

    fn format_text(&self) -> String {
        self.clone()
    }

    fn parse_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }

    fn to_array_value(items: Vec<Self>) -> Value {
        Value::StringArray(items)
    }

    fn native_array(value: &Value) -> Option<Vec<Self>> {
        match value {
            Value::StringArray(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// String arrays are only ever stored natively; a plain string is not split.
    fn array_from_value(value: &Value) -> Option<Vec<Self>> {
        Self::native_array(value)
    }
}

impl SettingValue for DateTime<Utc> {
    const KIND: ValueKind = ValueKind::DateTime;

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DateTime(t) => Some(*t),
            Value::String(s) => parse_datetime(s),
            _ => None,
        }
    }

    fn type_default() -> Self {
        datetime_min()
    }
}

impl SettingScalar for DateTime<Utc> {
    const ARRAY_KIND: ValueKind = ValueKind::DateTimeArray;

    fn format_text(&self) -> String {
        format_datetime(self)
    }

    fn parse_text(text: &str) -> Option<Self> {
        parse_datetime(text)
    }

    fn to_array_value(items: Vec<Self>) -> Value {
        Value::DateTimeArray(items)
    }

    fn native_array(value: &Value) -> Option<Vec<Self>> {
        match value {
            Value::DateTimeArray(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl SettingValue for TimeDelta {
    const KIND: ValueKind = ValueKind::Duration;

    fn to_value(&self) -> Value {
        Value::Duration(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Duration(d) => Some(*d),
            Value::Int(ticks) => Some(duration_from_ticks(*ticks)),
            Value::String(s) => Self::parse_text(s),
            _ => None,
        }
    }

    fn type_default() -> Self {
        TimeDelta::zero()
    }
}

impl SettingScalar for TimeDelta {
    const ARRAY_KIND: ValueKind = ValueKind::DurationArray;

    fn format_text(&self) -> String {
        duration_to_ticks(*self).to_string()
    }

    fn parse_text(text: &str) -> Option<Self> {
        text.trim().parse::<i64>().ok().map(duration_from_ticks)
    }

    fn to_array_value(items: Vec<Self>) -> Value {
        Value::DurationArray(items)
    }

    fn native_array(value: &Value) -> Option<Vec<Self>> {
        match value {
            Value::DurationArray(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl SettingValue for SettingsMap {
    const KIND: ValueKind = ValueKind::Map;

    fn to_value(&self) -> Value {
        Value::Map(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Map(map) => Some(map.clone()),
            Value::StringArray(items) => decode_flat_map("", items).ok(),
            _ => None,
        }
    }

    fn type_default() -> Self {
        SettingsMap::new()
    }
}

/// Declares a fieldless enum that is stored as its integer discriminant.
///
/// The first variant is the type default. The macro derives `Debug`, `Clone`, `Copy`,
/// `PartialEq`, `Eq` and `Hash`.
///
/// ```
/// settingskit::setting_enum! {
///     pub enum TimeType {
///         Utc = 0,
///         Local = 1,
///         Remote = 2,
///     }
/// }
/// ```
#[macro_export]
macro_rules! setting_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(#[$first_meta:meta])*
            $first:ident = $first_value:literal
            $(, $(#[$variant_meta:meta])* $variant:ident = $value:literal)* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(#[$first_meta])*
            $first = $first_value,
            $($(#[$variant_meta])* $variant = $value,)*
        }

        impl $crate::codec::SettingValue for $name {
            const KIND: $crate::value::ValueKind = $crate::value::ValueKind::Int;

            fn to_value(&self) -> $crate::value::Value {
                $crate::value::Value::Int(*self as i64)
            }

            fn from_value(value: &$crate::value::Value) -> Option<Self> {
                let raw = <i64 as $crate::codec::SettingValue>::from_value(value)?;
                if raw == $first_value {
                    return Some($name::$first);
                }
                $(
                    if raw == $value {
                        return Some($name::$variant);
                    }
                )*
                None
            }

            fn type_default() -> Self {
                $name::$first
            }
        }
    };
}
