use async_trait::async_trait;
use futures::stream::BoxStream;

use super::flux_record::FluxRecord;
use super::store_error::StoreError;

/// Rows of one query result, in store order. Dropping the stream abandons the
/// query.
pub type RecordStream = BoxStream<'static, Result<FluxRecord, StoreError>>;

/// Runs a Flux query against the metrics store.
///
/// Implementations must be usable from many requests at once.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str) -> Result<RecordStream, StoreError>;
}
