use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use servicegate_core::UserId;

use crate::{Role, Scope};

/// Authenticated identity as produced by the upstream authentication step.
///
/// Construction of this object is outside this workspace; the authorization
/// layer only reads it. Roles and scopes keep their original order with
/// duplicates dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IdentityRecord")]
pub struct Identity {
    id: UserId,
    roles: Vec<Role>,
    scopes: Vec<Scope>,
}

impl Identity {
    pub fn new(
        id: impl Into<UserId>,
        roles: impl IntoIterator<Item = Role>,
        scopes: impl IntoIterator<Item = Scope>,
    ) -> Self {
        Self {
            id: id.into(),
            roles: dedup(roles, |r| r.as_str().to_string()),
            scopes: dedup(scopes, |s| s.as_str().to_string()),
        }
    }

    /// Identity with roles only (the common case for human users).
    pub fn with_roles(id: impl Into<UserId>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self::new(id, roles, Vec::new())
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s.as_str() == scope)
    }
}

/// Wire shape of an identity; `roles`/`scopes` may be omitted.
#[derive(Debug, Deserialize)]
struct IdentityRecord {
    id: UserId,
    #[serde(default)]
    roles: Vec<Role>,
    #[serde(default)]
    scopes: Vec<Scope>,
}

impl From<IdentityRecord> for Identity {
    fn from(record: IdentityRecord) -> Self {
        Self::new(record.id, record.roles, record.scopes)
    }
}

fn dedup<T>(items: impl IntoIterator<Item = T>, key: impl Fn(&T) -> String) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}
