//! `servicegate-infra`: IO-facing building blocks.
//!
//! - `query`: injected, parameterized query capability (Postgres, scripted)
//! - `tenant`: tenant context resolution on top of that capability

pub mod query;
pub mod tenant;

pub use query::{PgQueryExecutor, QueryError, QueryExecutor, QueryParam, Row, ScriptedQueryExecutor};
pub use tenant::{TenantContext, TenantContextResolver, TenantDenial, TenantDenialKind};
