//! Parameterized query capability.
//!
//! Components that need data are handed an `Arc<dyn QueryExecutor>` at
//! construction; there is no global connection. Rows come back as JSON objects
//! so callers decode them into their own typed records.

use serde::Serialize;
use thiserror::Error;

pub mod postgres;
pub mod scripted;

pub use postgres::PgQueryExecutor;
pub use scripted::{RecordedQuery, ScriptedQueryExecutor};

/// One result row, column name → value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Positional statement parameter (`$1`, `$2`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryParam {
    Text(String),
    Bool(bool),
    Int(i64),
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for QueryParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failure reported by a non-database backend.
    #[error("query backend error: {0}")]
    Backend(String),

    #[error("row decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Async, parameterized, read-only query interface.
///
/// Implementations own connection pooling; no timeout or retry policy is
/// applied on top of them.
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn query(&self, sql: &str, params: &[QueryParam]) -> Result<Vec<Row>, QueryError>;
}
