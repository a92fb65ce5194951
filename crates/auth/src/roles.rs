use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Separator between a role's service namespace and its level.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Role string carried by an identity.
///
/// On the wire roles stay opaque strings and are compared verbatim. Either
/// namespaced (`"{service}:{level}"`) or a bare legacy token (`"admin"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Role {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Typed view of a role string.
///
/// Configured roles are parsed once when a service policy is built, to validate
/// their namespaces; request-time checks keep comparing raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParsedRole {
    /// Service namespace, `None` for bare tokens.
    pub service: Option<String>,
    pub level: String,
    /// Bare token without a namespace (pre-migration role scheme).
    pub is_legacy: bool,
}

impl ParsedRole {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(NAMESPACE_SEPARATOR) {
            Some((service, level)) => Self {
                service: Some(service.to_string()),
                level: level.to_string(),
                is_legacy: false,
            },
            None => Self {
                service: None,
                level: raw.to_string(),
                is_legacy: true,
            },
        }
    }

    /// Whether this role is namespaced under `prefix`.
    pub fn belongs_to(&self, prefix: &str) -> bool {
        self.service.as_deref() == Some(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_role_parses_service_and_level() {
        let parsed = ParsedRole::parse("neture:supplier");
        assert_eq!(parsed.service.as_deref(), Some("neture"));
        assert_eq!(parsed.level, "supplier");
        assert!(!parsed.is_legacy);
        assert!(parsed.belongs_to("neture"));
        assert!(!parsed.belongs_to("kpa"));
    }

    #[test]
    fn bare_role_is_legacy() {
        let parsed = ParsedRole::parse("admin");
        assert_eq!(parsed.service, None);
        assert_eq!(parsed.level, "admin");
        assert!(parsed.is_legacy);
        assert!(!parsed.belongs_to("admin"));
    }

    #[test]
    fn only_first_separator_splits() {
        let parsed = ParsedRole::parse("kpa:branch:admin");
        assert_eq!(parsed.service.as_deref(), Some("kpa"));
        assert_eq!(parsed.level, "branch:admin");
    }
}
