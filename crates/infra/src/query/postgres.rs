//! Postgres-backed query executor.
//!
//! Each statement is wrapped as `SELECT row_to_json(q) FROM (<sql>) q` so any
//! projection comes back as one JSON object per row, without per-statement
//! row mapping code.
//!
//! ## Thread Safety
//!
//! `PgQueryExecutor` is `Send + Sync`; the SQLx pool handles connection sharing.

use std::sync::Arc;

use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use super::{QueryError, QueryExecutor, QueryParam, Row};

#[derive(Debug, Clone)]
pub struct PgQueryExecutor {
    pool: Arc<PgPool>,
}

impl PgQueryExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn wrap(sql: &str) -> String {
    format!("SELECT row_to_json(q) FROM ({}) q", sql.trim().trim_end_matches(';'))
}

#[async_trait::async_trait]
impl QueryExecutor for PgQueryExecutor {
    #[instrument(skip(self, params), fields(param_count = params.len()))]
    async fn query(&self, sql: &str, params: &[QueryParam]) -> Result<Vec<Row>, QueryError> {
        let wrapped = wrap(sql);
        let mut query = sqlx::query_scalar::<_, Json<Row>>(&wrapped);
        for param in params {
            query = match param {
                QueryParam::Text(value) => query.bind(value.clone()),
                QueryParam::Bool(value) => query.bind(*value),
                QueryParam::Int(value) => query.bind(*value),
            };
        }

        let rows = query.fetch_all(&*self.pool).await?;
        Ok(rows.into_iter().map(|Json(row)| row).collect())
    }
}
