//! Shapes store records into the dashboard's point series and snapshot maps.

use std::collections::BTreeMap;

use futures::{Stream, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::core::client::flux_record::{format_rfc3339, FluxRecord};
use crate::core::client::store_error::StoreError;

/// One `(time, value)` sample of a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub time: String,
    pub value: Value,
}

/// Latest value per metric name.
pub type Snapshot = BTreeMap<String, Value>;

/// Collects every record into a point, in store order.
///
/// Any stream error discards what was collected so far.
pub async fn normalize_points<S>(mut records: S) -> Result<Vec<Point>, StoreError>
where
    S: Stream<Item = Result<FluxRecord, StoreError>> + Unpin,
{
    let mut points = Vec::new();
    while let Some(record) = records.try_next().await? {
        let time = record
            .time()
            .map(format_rfc3339)
            .ok_or_else(|| StoreError::Decode("record without _time column".to_string()))?;
        points.push(Point {
            time,
            value: record.value().to_json(),
        });
    }
    Ok(points)
}

/// Maps each record's `metric` tag to its value. Later rows for the same
/// metric replace earlier ones; rows without a string tag are skipped.
pub async fn normalize_snapshot<S>(mut records: S) -> Result<Snapshot, StoreError>
where
    S: Stream<Item = Result<FluxRecord, StoreError>> + Unpin,
{
    let mut snapshot = Snapshot::new();
    while let Some(record) = records.try_next().await? {
        match record.value_by_key("metric").and_then(|m| m.as_str()) {
            Some(metric) => {
                snapshot.insert(metric.to_string(), record.value().to_json());
            }
            None => debug!("Skipping snapshot row without metric tag"),
        }
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::flux_record::FluxValue;
    use chrono::DateTime;
    use futures::stream;
    use serde_json::json;

    fn record(time: Option<&str>, value: FluxValue, metric: Option<&str>) -> FluxRecord {
        let mut values = BTreeMap::new();
        if let Some(t) = time {
            values.insert("_time".to_string(), FluxValue::Time(DateTime::parse_from_rfc3339(t).unwrap()));
        }
        values.insert("_value".to_string(), value);
        if let Some(m) = metric {
            values.insert("metric".to_string(), FluxValue::String(m.to_string()));
        }
        FluxRecord::new(values)
    }

    fn ok_stream(
        records: Vec<FluxRecord>,
    ) -> impl Stream<Item = Result<FluxRecord, StoreError>> + Unpin {
        stream::iter(records.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn points_keep_store_order_and_values() {
        let points = normalize_points(ok_stream(vec![
            record(Some("2024-05-01T10:00:00Z"), FluxValue::Double(120.0), None),
            record(Some("2024-05-01T10:15:00Z"), FluxValue::Long(150), None),
        ]))
        .await
        .unwrap();

        assert_eq!(
            serde_json::to_value(&points).unwrap(),
            json!([
                {"time": "2024-05-01T10:00:00Z", "value": 120.0},
                {"time": "2024-05-01T10:15:00Z", "value": 150},
            ])
        );
    }

    #[tokio::test]
    async fn empty_result_is_an_empty_series() {
        let points = normalize_points(ok_stream(vec![])).await.unwrap();
        assert!(points.is_empty());
        assert_eq!(serde_json::to_string(&points).unwrap(), "[]");
    }

    #[tokio::test]
    async fn null_values_pass_through() {
        let points = normalize_points(ok_stream(vec![record(
            Some("2024-05-01T10:00:00Z"),
            FluxValue::Null,
            None,
        )]))
        .await
        .unwrap();
        assert_eq!(points[0].value, Value::Null);
    }

    #[tokio::test]
    async fn mid_stream_error_discards_points() {
        let items = vec![
            Ok(record(Some("2024-05-01T10:00:00Z"), FluxValue::Double(1.0), None)),
            Err(StoreError::Stream("connection reset".into())),
        ];
        let err = normalize_points(stream::iter(items)).await.unwrap_err();
        assert_eq!(err, StoreError::Stream("connection reset".into()));
    }

    #[tokio::test]
    async fn point_without_time_is_rejected() {
        let err = normalize_points(ok_stream(vec![record(None, FluxValue::Long(1), None)]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[tokio::test]
    async fn snapshot_maps_metric_to_value() {
        let snapshot = normalize_snapshot(ok_stream(vec![
            record(None, FluxValue::Long(42), Some("battery_soc")),
            record(None, FluxValue::Long(300), Some("pv_power")),
        ]))
        .await
        .unwrap();
        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({"battery_soc": 42, "pv_power": 300})
        );
    }

    #[tokio::test]
    async fn snapshot_last_row_wins() {
        let snapshot = normalize_snapshot(ok_stream(vec![
            record(None, FluxValue::Double(10.0), Some("grid_power")),
            record(None, FluxValue::Double(-25.5), Some("grid_power")),
        ]))
        .await
        .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["grid_power"], json!(-25.5));
    }

    #[tokio::test]
    async fn snapshot_skips_rows_without_metric() {
        let mut untagged = BTreeMap::new();
        untagged.insert("_value".to_string(), FluxValue::Long(1));
        untagged.insert("metric".to_string(), FluxValue::Null);
        let snapshot = normalize_snapshot(ok_stream(vec![
            record(None, FluxValue::Long(5), None),
            FluxRecord::new(untagged),
            record(None, FluxValue::Long(80), Some("battery_soc")),
        ]))
        .await
        .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["battery_soc"], json!(80));
    }

    #[tokio::test]
    async fn snapshot_error_discards_partial_map() {
        let items = vec![
            Ok(record(None, FluxValue::Long(42), Some("battery_soc"))),
            Err(StoreError::Execution("query timed out".into())),
        ];
        assert!(normalize_snapshot(stream::iter(items)).await.is_err());
    }
}
