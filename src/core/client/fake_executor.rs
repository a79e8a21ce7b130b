//! In-memory executor for tests: replays a canned annotated-CSV body.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use super::flux_csv::decode_flux_csv;
use super::query_executor_trait::{QueryExecutor, RecordStream};
use super::store_error::StoreError;

pub struct FakeExecutor {
    chunks: Vec<Result<String, String>>,
    fail_with: Option<StoreError>,
    queries: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn with_body(body: &str) -> Self {
        Self::with_chunks(vec![Ok(body.to_string())])
    }

    /// `Err` chunks simulate the connection dropping mid-body.
    pub fn with_chunks(chunks: Vec<Result<String, String>>) -> Self {
        Self {
            chunks,
            fail_with: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: StoreError) -> Self {
        Self {
            chunks: Vec::new(),
            fail_with: Some(err),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    async fn execute(&self, query: &str) -> Result<RecordStream, StoreError> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        Ok(decode_flux_csv(stream::iter(self.chunks.clone())))
    }
}

/// Builds an annotated CSV table of `_time`/`_value`/`metric` rows.
pub fn series_csv(value_type: &str, rows: &[(&str, &str, &str)]) -> String {
    let mut body = format!(
        "#datatype,string,long,dateTime:RFC3339,{value_type},string\n\
         #group,false,false,false,false,true\n\
         #default,_result,,,,\n\
         ,result,table,_time,_value,metric\n"
    );
    for (time, value, metric) in rows {
        body.push_str(&format!(",,0,{time},{value},{metric}\n"));
    }
    body.push('\n');
    body
}
