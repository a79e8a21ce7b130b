use thiserror::Error;

/// Everything that can go wrong between issuing a query and draining its rows.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Query rejected with status {status}: {message}")]
    Query { status: u16, message: String },

    /// Error table reported inside an otherwise successful response.
    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Result stream interrupted: {0}")]
    Stream(String),

    #[error("Malformed query result: {0}")]
    Decode(String),
}
