//! Flux query construction for series and snapshot reads.

use std::fmt;

use thiserror::Error;
use validator::{Validate, ValidationErrors};

use super::metric_spec::ValueKind;

pub const DEFAULT_RANGE_HOURS: u32 = 1;
pub const DEFAULT_AGGREGATE_MINUTES: u32 = 1;

/// Lookback of the `/now` snapshot query.
pub const SNAPSHOT_LOOKBACK_MINUTES: u32 = 15;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidParams(pub String);

/// Validated series parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Validate)]
pub struct QueryParams {
    #[validate(range(min = 1, max = 8784, message = "range must be between 1 and 8784 hours"))]
    pub range_hours: u32,

    #[validate(range(min = 1, max = 10080, message = "aggregate must be between 1 and 10080 minutes"))]
    pub aggregate_minutes: u32,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            range_hours: DEFAULT_RANGE_HOURS,
            aggregate_minutes: DEFAULT_AGGREGATE_MINUTES,
        }
    }
}

impl QueryParams {
    /// Parses raw request values. Absent or blank values take the defaults.
    pub fn parse(range: Option<&str>, aggregate: Option<&str>) -> Result<Self, InvalidParams> {
        let params = Self {
            range_hours: parse_positive("range", range, DEFAULT_RANGE_HOURS)?,
            aggregate_minutes: parse_positive("aggregate", aggregate, DEFAULT_AGGREGATE_MINUTES)?,
        };
        params
            .validate()
            .map_err(|errors| InvalidParams(first_message(&errors)))?;
        Ok(params)
    }
}

fn parse_positive(name: &str, raw: Option<&str>, default: u32) -> Result<u32, InvalidParams> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v
            .parse::<u32>()
            .map_err(|_| InvalidParams(format!("{name} must be a positive integer, got {v:?}"))),
    }
}

fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}

/// A rendered Flux script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluxQuery(String);

impl FluxQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FluxQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quotes `s` as a Flux string literal.
fn flux_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' | '$' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Renders queries scoped to one bucket and measurement.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    bucket: String,
    measurement: String,
}

impl QueryBuilder {
    pub fn new(bucket: impl Into<String>, measurement: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            measurement: measurement.into(),
        }
    }

    /// Mean-downsampled series of one metric over the last `range_hours`.
    pub fn series_query(&self, metric_name: &str, kind: ValueKind, params: &QueryParams) -> FluxQuery {
        FluxQuery(format!(
            r#"from(bucket: {bucket})
  |> range(start: -{range}h)
  |> filter(fn: (r) => r["_measurement"] == {measurement})
  |> filter(fn: (r) => r["_field"] == {field})
  |> filter(fn: (r) => r["metric"] == {metric})
  |> aggregateWindow(every: {every}m, fn: mean, createEmpty: false)
  |> yield(name: "mean")"#,
            bucket = flux_string(&self.bucket),
            range = params.range_hours,
            measurement = flux_string(&self.measurement),
            field = flux_string(kind.field()),
            metric = flux_string(metric_name),
            every = params.aggregate_minutes,
        ))
    }

    /// Last sample of every watts/percent series within the snapshot lookback.
    /// Rows carry their `metric` tag, so no metric filter is applied.
    pub fn snapshot_query(&self) -> FluxQuery {
        let fields = ValueKind::ALL
            .iter()
            .map(|kind| format!(r#"r["_field"] == {}"#, flux_string(kind.field())))
            .collect::<Vec<_>>()
            .join(" or ");

        FluxQuery(format!(
            r#"from(bucket: {bucket})
  |> range(start: -{lookback}m)
  |> filter(fn: (r) => r["_measurement"] == {measurement})
  |> filter(fn: (r) => {fields})
  |> last()"#,
            bucket = flux_string(&self.bucket),
            lookback = SNAPSHOT_LOOKBACK_MINUTES,
            measurement = flux_string(&self.measurement),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> QueryBuilder {
        QueryBuilder::new("battery-modbus", "battery_modbus_metrics")
    }

    #[test]
    fn series_query_matches_expected_script() {
        let params = QueryParams { range_hours: 2, aggregate_minutes: 15 };
        let query = builder().series_query("pv_power", ValueKind::Watts, &params);
        let expected = r#"from(bucket: "battery-modbus")
  |> range(start: -2h)
  |> filter(fn: (r) => r["_measurement"] == "battery_modbus_metrics")
  |> filter(fn: (r) => r["_field"] == "value_watts")
  |> filter(fn: (r) => r["metric"] == "pv_power")
  |> aggregateWindow(every: 15m, fn: mean, createEmpty: false)
  |> yield(name: "mean")"#;
        assert_eq!(query.as_str(), expected);
    }

    #[test]
    fn only_range_and_window_change_with_params() {
        let b = builder();
        let base = b.series_query("battery_soc", ValueKind::Percent, &QueryParams::default());
        for (range, every) in [(3, 5), (24, 60), (8784, 10080)] {
            let params = QueryParams { range_hours: range, aggregate_minutes: every };
            let query = b.series_query("battery_soc", ValueKind::Percent, &params);
            let expected = base
                .as_str()
                .replace("range(start: -1h)", &format!("range(start: -{range}h)"))
                .replace("every: 1m", &format!("every: {every}m"));
            assert_eq!(query.as_str(), expected);
        }
        assert!(base.as_str().contains(r#"r["_field"] == "value_percent""#));
    }

    #[test]
    fn snapshot_query_reads_last_value_of_both_fields() {
        let query = builder().snapshot_query();
        let expected = r#"from(bucket: "battery-modbus")
  |> range(start: -15m)
  |> filter(fn: (r) => r["_measurement"] == "battery_modbus_metrics")
  |> filter(fn: (r) => r["_field"] == "value_watts" or r["_field"] == "value_percent")
  |> last()"#;
        assert_eq!(query.as_str(), expected);
        assert!(!query.as_str().contains(r#"r["metric"]"#));
    }

    #[test]
    fn string_literals_are_escaped() {
        let b = QueryBuilder::new(r#"we"ird\bucket"#, "m${x}");
        let query = b.snapshot_query();
        assert!(query.as_str().contains(r#"from(bucket: "we\"ird\\bucket")"#));
        assert!(query.as_str().contains(r#"== "m\${x}""#));
    }

    #[test]
    fn params_default_when_absent_or_blank() {
        assert_eq!(QueryParams::parse(None, None).unwrap(), QueryParams::default());
        assert_eq!(QueryParams::parse(Some(""), Some("  ")).unwrap(), QueryParams::default());
        assert_eq!(
            QueryParams::parse(Some("6"), Some("30")).unwrap(),
            QueryParams { range_hours: 6, aggregate_minutes: 30 }
        );
    }

    #[test]
    fn params_reject_non_numeric_and_non_positive() {
        for bad in ["abc", "-1", "1.5", "2h", "1) |> drop()"] {
            let err = QueryParams::parse(Some(bad), None).unwrap_err();
            assert!(err.0.starts_with("range must be a positive integer"), "{bad}: {err}");
        }
        let err = QueryParams::parse(None, Some("0")).unwrap_err();
        assert_eq!(err.0, "aggregate must be between 1 and 10080 minutes");
        let err = QueryParams::parse(Some("0"), None).unwrap_err();
        assert_eq!(err.0, "range must be between 1 and 8784 hours");
    }

    #[test]
    fn params_reject_out_of_range() {
        assert!(QueryParams::parse(Some("8785"), None).is_err());
        assert!(QueryParams::parse(None, Some("10081")).is_err());
        assert!(QueryParams::parse(Some("8784"), Some("10080")).is_ok());
    }
}
