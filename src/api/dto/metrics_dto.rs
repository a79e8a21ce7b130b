//! Metrics API DTOs

use serde::Deserialize;

/// Raw `?range=<hours>&aggregate=<minutes>` values, validated later.
#[derive(Deserialize, Debug, Default)]
pub struct RangeQuery {
    pub range: Option<String>,
    pub aggregate: Option<String>,
}
