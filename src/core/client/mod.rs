//! Metrics store client: Flux query execution and result decoding.

pub mod flux_csv;
pub mod flux_record;
pub mod influx_client;
pub mod query_executor_trait;
pub mod store_error;

#[cfg(test)]
pub mod fake_executor;
