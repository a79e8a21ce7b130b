use std::sync::Arc;

use tracing::debug;

use crate::core::client::query_executor_trait::QueryExecutor;
use crate::core::client::store_error::StoreError;
use crate::domain::metric::metric_spec::MetricSpec;
use crate::domain::metric::normalizer::{normalize_points, normalize_snapshot, Point, Snapshot};
use crate::domain::metric::query_builder::{QueryBuilder, QueryParams};

/// Builds, runs and normalizes metric queries. One store round trip per call.
pub struct MetricService {
    executor: Arc<dyn QueryExecutor>,
    builder: QueryBuilder,
}

impl MetricService {
    pub fn new(executor: Arc<dyn QueryExecutor>, builder: QueryBuilder) -> Self {
        Self { executor, builder }
    }

    pub async fn get_metric_points(
        &self,
        spec: &MetricSpec,
        params: QueryParams,
    ) -> Result<Vec<Point>, StoreError> {
        let query = self.builder.series_query(spec.name, spec.value_kind, &params);
        debug!(metric = spec.name, %query, "Built series query");

        let records = self.executor.execute(query.as_str()).await?;
        normalize_points(records).await
    }

    pub async fn get_snapshot(&self) -> Result<Snapshot, StoreError> {
        let query = self.builder.snapshot_query();
        debug!(%query, "Built snapshot query");

        let records = self.executor.execute(query.as_str()).await?;
        normalize_snapshot(records).await
    }
}
