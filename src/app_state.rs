use std::sync::Arc;

use crate::core::client::query_executor_trait::QueryExecutor;
use crate::domain::metric::query_builder::QueryBuilder;
use crate::domain::metric::service::MetricService;

#[derive(Clone)]
pub struct AppState {
    pub metric_service: Arc<MetricService>,
}

/// Wires the shared executor into the services handlers call.
pub fn build_app_state(executor: Arc<dyn QueryExecutor>, builder: QueryBuilder) -> AppState {
    AppState {
        metric_service: Arc::new(MetricService::new(executor, builder)),
    }
}
