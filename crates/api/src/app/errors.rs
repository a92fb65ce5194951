use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use servicegate_auth::Denial;
use servicegate_infra::TenantDenial;

/// Uniform error body: `{ "success": false, "error": { "code", "message" } }`.
pub fn json_error(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message.into(),
            },
        })),
    )
        .into_response()
}

pub fn denial_response(denial: &Denial) -> axum::response::Response {
    json_error(status(denial.status()), &denial.code, denial.message.clone())
}

pub fn tenant_denial_response(denial: &TenantDenial) -> axum::response::Response {
    json_error(status(denial.status()), &denial.code, denial.message.clone())
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
