//! Per-scope request guards bound to one service policy.
//!
//! This layer only adapts a [`Decision`] to the HTTP contract; all policy lives
//! in [`ScopeEvaluator`].
//!
//! ```ignore
//! let guards = ServiceScopeGuardFactory::new(neture_config, evaluator);
//! let router = Router::new()
//!     .route("/neture/supplier/products", get(list_products))
//!     .route_layer(from_fn_with_state(guards.require_scope("neture:supplier"), enforce_scope));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use servicegate_auth::{Decision, Grant, Identity, Scope, ScopeEvaluator, ServiceScopeConfig};

use crate::app::errors::denial_response;

#[derive(Debug, Clone)]
pub struct ServiceScopeGuardFactory {
    config: Arc<ServiceScopeConfig>,
    evaluator: Arc<ScopeEvaluator>,
}

impl ServiceScopeGuardFactory {
    pub fn new(config: Arc<ServiceScopeConfig>, evaluator: Arc<ScopeEvaluator>) -> Self {
        Self { config, evaluator }
    }

    /// Guard requiring `scope` within this factory's service.
    pub fn require_scope(&self, scope: impl Into<Scope>) -> ScopeGuard {
        ScopeGuard {
            config: self.config.clone(),
            evaluator: self.evaluator.clone(),
            scope: scope.into(),
        }
    }
}

/// State of one guarded route; run it with [`enforce_scope`].
#[derive(Debug, Clone)]
pub struct ScopeGuard {
    config: Arc<ServiceScopeConfig>,
    evaluator: Arc<ScopeEvaluator>,
    scope: Scope,
}

impl ScopeGuard {
    pub fn evaluate(&self, identity: Option<&Identity>) -> Decision {
        self.evaluator.evaluate(identity, &self.config, self.scope.as_str())
    }

    /// `Ok` to continue, or the terminal response to send.
    pub fn check(&self, identity: Option<&Identity>) -> Result<Grant, Response> {
        self.evaluate(identity)
            .into_result()
            .map_err(|denial| denial_response(&denial))
    }
}

/// Axum middleware running a [`ScopeGuard`].
pub async fn enforce_scope(State(guard): State<ScopeGuard>, req: Request, next: Next) -> Response {
    let outcome = guard.check(req.extensions().get::<Identity>());

    match outcome {
        Ok(grant) => {
            tracing::debug!(
                scope = %guard.scope,
                basis = ?grant.basis,
                matched = %grant.matched,
                "scope granted"
            );
            next.run(req).await
        }
        Err(response) => response,
    }
}
