use axum::http::HeaderMap;

use servicegate_auth::{Identity, Role, Scope};

/// Headers the authentication gateway sets after verifying the caller.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";
pub const USER_SCOPES_HEADER: &str = "x-user-scopes";

/// Build the request identity from gateway headers.
///
/// Returns `None` when no user id is present. Roles and scopes are
/// comma-separated; blank entries are skipped.
pub fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let id = header_str(headers, USER_ID_HEADER)?.trim();
    if id.is_empty() {
        return None;
    }

    let roles = split_list(headers, USER_ROLES_HEADER).into_iter().map(Role::new);
    let scopes = split_list(headers, USER_SCOPES_HEADER).into_iter().map(Scope::new);

    Some(Identity::new(id, roles, scopes))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn split_list(headers: &HeaderMap, name: &str) -> Vec<String> {
    header_str(headers, name)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
