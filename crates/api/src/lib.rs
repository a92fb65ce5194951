//! HTTP API: guard adapters, tenant middleware, routing, and error mapping.

pub mod app;
pub mod config;
pub mod context;
pub mod guard;
pub mod middleware;
pub mod tenant;

pub use app::{AppState, build_app};
pub use guard::{ScopeGuard, ServiceScopeGuardFactory, enforce_scope};
pub use tenant::resolve_tenant;
