//! Metrics controller: connects metric routes to the metric service.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use tracing::warn;

use crate::api::dto::metrics_dto::RangeQuery;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::domain::metric::metric_spec::MetricSpec;
use crate::domain::metric::normalizer::{Point, Snapshot};
use crate::domain::metric::query_builder::QueryParams;
use crate::errors::AppError;

pub struct MetricsController;

impl MetricsController {
    /// `GET /api/{metric}`: downsampled series for one configured metric.
    pub async fn get_metric_series(
        state: AppState,
        spec: &'static MetricSpec,
        query: Result<Query<RangeQuery>, QueryRejection>,
    ) -> Result<Json<Vec<Point>>, AppError> {
        let Query(q) = query.map_err(|rejection| {
            warn!(metric = spec.name, %rejection, "Rejected query string");
            AppError::BadRequest(rejection.body_text())
        })?;

        let params = QueryParams::parse(q.range.as_deref(), q.aggregate.as_deref()).map_err(|err| {
            warn!(metric = spec.name, %err, "Rejected series parameters");
            AppError::BadRequest(err.to_string())
        })?;

        to_json(state.metric_service.get_metric_points(spec, params).await)
    }

    /// `GET /api/now`: latest value of every metric seen recently.
    pub async fn get_snapshot(
        State(state): State<AppState>,
    ) -> Result<Json<Snapshot>, AppError> {
        to_json(state.metric_service.get_snapshot().await)
    }
}
