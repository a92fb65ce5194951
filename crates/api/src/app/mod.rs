//! HTTP API application wiring (Axum router + guard wiring).
//!
//! - `routes.rs`: guarded probe routes per service scope, tenant-scoped routes
//! - `errors.rs`: uniform error envelope

use std::sync::Arc;

use axum::{Router, routing::get};
use tower::ServiceBuilder;

use servicegate_auth::{ScopeEvaluator, ServiceCatalog};
use servicegate_infra::QueryExecutor;

use crate::middleware;

pub mod errors;
pub mod routes;

/// Shared, read-only process state.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ServiceCatalog>,
    pub evaluator: Arc<ScopeEvaluator>,
    pub executor: Arc<dyn QueryExecutor>,
}

impl AppState {
    pub fn new(
        catalog: ServiceCatalog,
        evaluator: ScopeEvaluator,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            evaluator: Arc::new(evaluator),
            executor,
        }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    // Identity first, then per-route guards and tenant resolution.
    let protected = routes::router(&state).layer(
        ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::gateway_identity)),
    );

    Router::new()
        .route("/health", get(routes::health))
        .merge(protected)
}
