use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use servicegate_auth::Identity;
use servicegate_infra::{TenantContext, TenantContextResolver};

use super::AppState;
use super::errors::json_error;
use crate::guard::{ServiceScopeGuardFactory, enforce_scope};
use crate::tenant::resolve_tenant;

/// Services whose operations are partitioned by pharmacy (organization).
pub const TENANT_SCOPED_SERVICES: &[&str] = &["glycopharm"];

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Every guarded route of the deployment.
///
/// Each service gets one probe route per scope (`/{service}/scopes/{level}`);
/// tenant-scoped services additionally get `/{service}/pharmacy/context`,
/// guarded by `{service}:pharmacy` and then by tenant resolution.
pub fn router(state: &AppState) -> Router {
    let mut router = Router::new().route("/whoami", get(whoami));

    for config in state.catalog.iter() {
        let guards =
            ServiceScopeGuardFactory::new(Arc::new(config.clone()), state.evaluator.clone());
        let prefix = config.service_prefix().to_string();

        for scope in config.known_scopes() {
            let level = scope
                .split_once(':')
                .map(|(_, level)| level.to_string())
                .unwrap_or_else(|| scope.clone());
            let path = format!("/{prefix}/scopes/{level}");
            let guard = guards.require_scope(scope.clone());

            let route = Router::new()
                .route(
                    &path,
                    get(move || {
                        let scope = scope.clone();
                        async move { Json(json!({ "success": true, "data": { "scope": scope } })) }
                    }),
                )
                .route_layer(from_fn_with_state(guard, enforce_scope));

            router = router.merge(route);
        }

        if TENANT_SCOPED_SERVICES.contains(&prefix.as_str()) {
            let resolver = Arc::new(TenantContextResolver::new(
                state.executor.clone(),
                config.service().clone(),
            ));
            let guard = guards.require_scope(format!("{prefix}:pharmacy"));

            // Last route_layer runs first: scope check before any tenant query.
            let route = Router::new()
                .route(&format!("/{prefix}/pharmacy/context"), get(pharmacy_context))
                .route_layer(from_fn_with_state(resolver, resolve_tenant))
                .route_layer(from_fn_with_state(guard, enforce_scope));

            router = router.merge(route);
        }
    }

    router
}

async fn whoami(identity: Option<Extension<Identity>>) -> Response {
    match identity {
        Some(Extension(identity)) => {
            Json(json!({ "success": true, "data": identity })).into_response()
        }
        None => json_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Authentication required"),
    }
}

async fn pharmacy_context(Extension(context): Extension<TenantContext>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "data": {
            "pharmacy_id": context.pharmacy_id(),
            "admin_bypass": context.is_admin_bypass(),
        },
    }))
}
