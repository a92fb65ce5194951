//! Declarative per-service authorization policy.
//!
//! One [`ServiceScopeConfig`] per hosted service. Whether the service uses a
//! flat or hierarchical role model is decided solely by the presence of a
//! scope→roles mapping; the evaluator has no per-service code paths.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use servicegate_core::ServiceCode;

use crate::roles::ParsedRole;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid service prefix: {0}")]
    InvalidPrefix(String),

    #[error("role '{role}' is not namespaced under '{prefix}:'")]
    ForeignRole { prefix: String, role: String },

    #[error("legacy role '{0}' must be a bare token")]
    NamespacedLegacyRole(String),

    #[error("scope mapping for '{scope}' references unknown role '{role}'")]
    UnknownMappedRole { scope: String, role: String },

    #[error("platform bypass role '{0}' must be namespaced")]
    BareBypassRole(String),

    #[error("service '{0}' declares no valid roles")]
    NoValidRoles(String),
}

/// Immutable authorization policy of one service.
///
/// Built once at process start through [`ServiceScopeConfig::builder`] and
/// shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceScopeConfig {
    service: ServiceCode,
    admin_role: String,
    valid_roles: BTreeSet<String>,
    scope_role_mapping: Option<BTreeMap<String, BTreeSet<String>>>,
    legacy_roles: BTreeSet<String>,
    platform_bypass: bool,
    platform_bypass_roles: BTreeSet<String>,
}

impl ServiceScopeConfig {
    pub fn builder(service_prefix: &str) -> ServiceScopeConfigBuilder {
        ServiceScopeConfigBuilder::new(service_prefix)
    }

    pub fn service(&self) -> &ServiceCode {
        &self.service
    }

    pub fn service_prefix(&self) -> &str {
        self.service.as_str()
    }

    /// `"{prefix}:admin"`, superior to every scope of this service.
    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }

    pub fn valid_roles(&self) -> &BTreeSet<String> {
        &self.valid_roles
    }

    pub fn scope_role_mapping(&self) -> Option<&BTreeMap<String, BTreeSet<String>>> {
        self.scope_role_mapping.as_ref()
    }

    pub fn is_hierarchical(&self) -> bool {
        self.scope_role_mapping.is_some()
    }

    pub fn legacy_roles(&self) -> &BTreeSet<String> {
        &self.legacy_roles
    }

    pub fn platform_bypass(&self) -> bool {
        self.platform_bypass
    }

    pub fn platform_bypass_roles(&self) -> &BTreeSet<String> {
        &self.platform_bypass_roles
    }

    pub fn is_valid_role(&self, role: &str) -> bool {
        self.valid_roles.contains(role)
    }

    pub fn is_legacy_role(&self, role: &str) -> bool {
        self.legacy_roles.contains(role)
    }

    /// Roles satisfying `scope` in hierarchical mode.
    pub fn roles_for_scope(&self, scope: &str) -> Option<&BTreeSet<String>> {
        self.scope_role_mapping.as_ref()?.get(scope)
    }

    /// Scopes a guard of this service can meaningfully require.
    ///
    /// Hierarchical services list their mapped scopes; flat services accept any
    /// of their valid roles as a scope.
    pub fn known_scopes(&self) -> Vec<String> {
        match &self.scope_role_mapping {
            Some(mapping) => mapping.keys().cloned().collect(),
            None => self.valid_roles.iter().cloned().collect(),
        }
    }
}

/// Builder for [`ServiceScopeConfig`]; [`build`](Self::build) validates the policy.
#[derive(Debug, Clone)]
pub struct ServiceScopeConfigBuilder {
    prefix: String,
    valid_roles: BTreeSet<String>,
    scope_role_mapping: Option<BTreeMap<String, BTreeSet<String>>>,
    legacy_roles: BTreeSet<String>,
    platform_bypass: bool,
    platform_bypass_roles: BTreeSet<String>,
}

impl ServiceScopeConfigBuilder {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            valid_roles: BTreeSet::new(),
            scope_role_mapping: None,
            legacy_roles: BTreeSet::new(),
            platform_bypass: false,
            platform_bypass_roles: BTreeSet::new(),
        }
    }

    pub fn valid_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Add a hierarchical mapping entry; the first call switches the service to
    /// hierarchical mode.
    pub fn map_scope<I, S>(mut self, scope: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope_role_mapping
            .get_or_insert_with(BTreeMap::new)
            .entry(scope.into())
            .or_default()
            .extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn legacy_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.legacy_roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn platform_bypass<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platform_bypass = true;
        self.platform_bypass_roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Validate the policy. Every configured role is parsed here once; request
    /// checks only compare the raw strings.
    pub fn build(self) -> Result<ServiceScopeConfig, ConfigError> {
        let service = ServiceCode::parse(self.prefix.clone())
            .map_err(|_| ConfigError::InvalidPrefix(self.prefix.clone()))?;
        let prefix = service.as_str();

        if self.valid_roles.is_empty() {
            return Err(ConfigError::NoValidRoles(prefix.to_string()));
        }

        for role in &self.valid_roles {
            let parsed = ParsedRole::parse(role);
            if !parsed.belongs_to(prefix) || parsed.level.is_empty() {
                return Err(ConfigError::ForeignRole {
                    prefix: prefix.to_string(),
                    role: role.clone(),
                });
            }
        }

        if let Some(mapping) = &self.scope_role_mapping {
            for (scope, roles) in mapping {
                if !ParsedRole::parse(scope).belongs_to(prefix) {
                    return Err(ConfigError::ForeignRole {
                        prefix: prefix.to_string(),
                        role: scope.clone(),
                    });
                }
                if let Some(unknown) = roles.iter().find(|r| !self.valid_roles.contains(*r)) {
                    return Err(ConfigError::UnknownMappedRole {
                        scope: scope.clone(),
                        role: unknown.clone(),
                    });
                }
            }
        }

        if let Some(role) = self
            .legacy_roles
            .iter()
            .find(|r| !ParsedRole::parse(r).is_legacy)
        {
            return Err(ConfigError::NamespacedLegacyRole(role.clone()));
        }

        if let Some(role) = self
            .platform_bypass_roles
            .iter()
            .find(|r| ParsedRole::parse(r).is_legacy)
        {
            return Err(ConfigError::BareBypassRole(role.clone()));
        }

        Ok(ServiceScopeConfig {
            admin_role: service.admin_role(),
            service,
            valid_roles: self.valid_roles,
            scope_role_mapping: self.scope_role_mapping,
            legacy_roles: self.legacy_roles,
            platform_bypass: self.platform_bypass,
            platform_bypass_roles: self.platform_bypass_roles,
        })
    }
}
