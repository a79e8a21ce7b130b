//! Metrics routes (e.g., /api/pv_power, /api/now)

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::{routing::get, Router};

use crate::api::controller::metric::metrics_controller::MetricsController;
use crate::api::dto::metrics_dto::RangeQuery;
use crate::app_state::AppState;
use crate::domain::metric::metric_spec::METRIC_SPECS;

/// Build the router for metric endpoints under /api.
///
/// One series route per entry of the metric table, plus the snapshot route.
pub fn metrics_routes() -> Router<AppState> {
    METRIC_SPECS
        .iter()
        .fold(Router::new(), |router, spec| {
            router.route(
                &format!("/{}", spec.name),
                get(
                    move |State(state): State<AppState>,
                          query: Result<Query<RangeQuery>, QueryRejection>| {
                        MetricsController::get_metric_series(state, spec, query)
                    },
                ),
            )
        })
        .route("/now", get(MetricsController::get_snapshot))
}
