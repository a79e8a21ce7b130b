use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde_json::Value;

/// One typed cell of a Flux result row.
#[derive(Debug, Clone, PartialEq)]
pub enum FluxValue {
    Null,
    String(String),
    Long(i64),
    UnsignedLong(u64),
    Double(f64),
    Bool(bool),
    Time(DateTime<FixedOffset>),
    Duration(String),
    Base64(String),
}

impl FluxValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FluxValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FluxValue::Null)
    }

    /// JSON rendering used in API responses. Non-finite doubles become null.
    pub fn to_json(&self) -> Value {
        match self {
            FluxValue::Null => Value::Null,
            FluxValue::String(s) | FluxValue::Duration(s) | FluxValue::Base64(s) => {
                Value::String(s.clone())
            }
            FluxValue::Long(v) => Value::from(*v),
            FluxValue::UnsignedLong(v) => Value::from(*v),
            FluxValue::Double(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FluxValue::Bool(b) => Value::Bool(*b),
            FluxValue::Time(t) => Value::String(format_rfc3339(t)),
        }
    }
}

/// RFC3339 in UTC with whole seconds and a `Z` suffix.
pub fn format_rfc3339(t: &DateTime<FixedOffset>) -> String {
    t.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A single row of a Flux result table, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FluxRecord {
    values: BTreeMap<String, FluxValue>,
}

impl FluxRecord {
    pub fn new(values: BTreeMap<String, FluxValue>) -> Self {
        Self { values }
    }

    pub fn value_by_key(&self, key: &str) -> Option<&FluxValue> {
        self.values.get(key)
    }

    /// The `_time` column, if present and typed as a timestamp.
    pub fn time(&self) -> Option<&DateTime<FixedOffset>> {
        match self.values.get("_time") {
            Some(FluxValue::Time(t)) => Some(t),
            _ => None,
        }
    }

    /// The `_value` column; absent columns read as null.
    pub fn value(&self) -> &FluxValue {
        self.values.get("_value").unwrap_or(&FluxValue::Null)
    }

    pub fn table(&self) -> Option<i64> {
        match self.values.get("table") {
            Some(FluxValue::Long(t)) => Some(*t),
            _ => None,
        }
    }
}
