use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use servicegate_auth::Identity;
use servicegate_infra::TenantContextResolver;

use crate::app::errors::tenant_denial_response;

/// Axum middleware attaching a [`TenantContext`](servicegate_infra::TenantContext).
///
/// On denial the request stops here and nothing is attached; handlers behind it
/// read the context with `Extension<TenantContext>`.
pub async fn resolve_tenant(
    State(resolver): State<Arc<TenantContextResolver>>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = req.extensions().get::<Identity>().cloned();

    match resolver.resolve(identity.as_ref()).await {
        Ok(context) => {
            req.extensions_mut().insert(context);
            next.run(req).await
        }
        Err(denial) => tenant_denial_response(&denial),
    }
}
