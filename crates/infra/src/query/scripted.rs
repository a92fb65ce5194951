//! In-memory query executor with scripted responses (dev/test).
//!
//! Responses are served in the order they were queued, regardless of the
//! statement text. Every call is recorded so tests can assert on how many
//! queries ran and with which parameters. Once the script is exhausted every
//! query returns no rows.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use super::{QueryError, QueryExecutor, QueryParam, Row};

/// One call made against a [`ScriptedQueryExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

enum Scripted {
    Rows(Vec<Row>),
    Fail(String),
}

#[derive(Default)]
pub struct ScriptedQueryExecutor {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedQuery>>,
}

impl core::fmt::Debug for ScriptedQueryExecutor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScriptedQueryExecutor")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl ScriptedQueryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next unanswered query.
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Scripted::Rows(rows));
        self
    }

    /// Queue a single-row response built from a JSON object.
    ///
    /// Non-object values are queued as an empty result.
    pub fn push_row(&self, row: serde_json::Value) -> &Self {
        match row {
            serde_json::Value::Object(map) => self.push_rows(vec![map]),
            _ => self.push_rows(Vec::new()),
        }
    }

    pub fn push_empty(&self) -> &Self {
        self.push_rows(Vec::new())
    }

    /// Queue a failure for the next unanswered query.
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Scripted::Fail(message.into()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedQuery> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait::async_trait]
impl QueryExecutor for ScriptedQueryExecutor {
    async fn query(&self, sql: &str, params: &[QueryParam]) -> Result<Vec<Row>, QueryError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedQuery {
                sql: sql.to_string(),
                params: params.to_vec(),
            });

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(Scripted::Rows(rows)) => Ok(rows),
            Some(Scripted::Fail(message)) => Err(QueryError::Backend(message)),
            None => Ok(Vec::new()),
        }
    }
}
