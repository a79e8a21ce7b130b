//! Metric catalogue, query construction and result shaping.

pub mod metric_spec;
pub mod normalizer;
pub mod query_builder;
pub mod service;
