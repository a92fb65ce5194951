use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{Instrument, Span};

use servicegate_auth::Identity;

use crate::context::identity_from_headers;

/// Attach the gateway-supplied [`Identity`] to the request.
///
/// Credential verification happens upstream; this only trusts headers set by
/// the authentication gateway and must not be exposed without it. Requests
/// without identity headers continue anonymously, and the guards reject them.
pub async fn gateway_identity(mut req: Request, next: Next) -> Response {
    // Never trust an identity that a caller smuggled in through another layer.
    req.extensions_mut().remove::<Identity>();

    let identity = identity_from_headers(req.headers());
    let span = request_span(&req, identity.as_ref());

    if let Some(identity) = identity {
        req.extensions_mut().insert(identity);
    }

    next.run(req).instrument(span).await
}

/// Span wrapping the rest of the request; `user_id` stays empty for anonymous callers.
fn request_span(req: &Request, identity: Option<&Identity>) -> Span {
    let span = tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        user_id = tracing::field::Empty,
    );
    if let Some(identity) = identity {
        span.record("user_id", identity.id().as_str());
    }
    span
}
