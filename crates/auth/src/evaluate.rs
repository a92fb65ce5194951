//! Service-scoped authorization decisions.
//!
//! - No IO
//! - No panics
//! - One evaluator for every service; policy differences live in
//!   [`ServiceScopeConfig`] only.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::ServiceScopeConfig;
use crate::migration::{LegacyRoleNotice, MigrationLog, TracingMigrationLog};
use crate::{Identity, Role};

pub const UNAUTHORIZED_CODE: &str = "UNAUTHORIZED";
pub const FORBIDDEN_CODE: &str = "FORBIDDEN";

/// Outcome of a scope check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow(Grant),
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    /// HTTP status equivalent (200 when allowed).
    pub fn http_status(&self) -> u16 {
        match self {
            Decision::Allow(_) => 200,
            Decision::Deny(denial) => denial.status(),
        }
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Decision::Allow(_) => None,
            Decision::Deny(denial) => Some(denial),
        }
    }

    pub fn into_result(self) -> Result<Grant, Denial> {
        match self {
            Decision::Allow(grant) => Ok(grant),
            Decision::Deny(denial) => Err(denial),
        }
    }
}

/// Why access was granted, for audit logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub basis: GrantBasis,
    /// The scope or role string that satisfied the check.
    pub matched: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantBasis {
    /// Capability claim in `identity.scopes`.
    ScopeClaim,
    /// A role equal to the required scope.
    ExactRole,
    /// `{prefix}:admin`.
    ServiceAdmin,
    /// Hierarchical mapping entry of the required scope.
    RoleHierarchy,
    /// Flat mode: any role known to the service.
    ServiceMembership,
    PlatformBypass,
}

/// Terminal denial with a stable code and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{code}: {message}")]
pub struct Denial {
    pub kind: DenialKind,
    pub code: String,
    pub message: String,
}

impl Denial {
    pub fn unauthenticated() -> Self {
        Self {
            kind: DenialKind::Unauthenticated,
            code: UNAUTHORIZED_CODE.to_string(),
            message: "Authentication required".to_string(),
        }
    }

    fn legacy_role(prefix: &str) -> Self {
        Self {
            kind: DenialKind::LegacyRole,
            code: FORBIDDEN_CODE.to_string(),
            message: format!("Legacy roles are no longer supported. Use {prefix}:* roles."),
        }
    }

    fn insufficient_scope(prefix: &str, scope: &str) -> Self {
        Self {
            kind: DenialKind::InsufficientScope,
            code: FORBIDDEN_CODE.to_string(),
            message: format!(
                "Insufficient permissions for {prefix} service. Required scope: {scope}"
            ),
        }
    }

    pub fn status(&self) -> u16 {
        self.kind.status()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Unauthenticated,
    LegacyRole,
    InsufficientScope,
}

impl DenialKind {
    pub fn status(self) -> u16 {
        match self {
            DenialKind::Unauthenticated => 401,
            DenialKind::LegacyRole | DenialKind::InsufficientScope => 403,
        }
    }
}

/// Pure scope evaluator shared by every service guard.
///
/// Holds no mutable state; the only side effect is the legacy-role notice sent
/// to the injected [`MigrationLog`].
#[derive(Clone)]
pub struct ScopeEvaluator {
    migration_log: Arc<dyn MigrationLog>,
}

impl Default for ScopeEvaluator {
    fn default() -> Self {
        Self::new(Arc::new(TracingMigrationLog))
    }
}

impl core::fmt::Debug for ScopeEvaluator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScopeEvaluator").finish_non_exhaustive()
    }
}

impl ScopeEvaluator {
    pub fn new(migration_log: Arc<dyn MigrationLog>) -> Self {
        Self { migration_log }
    }

    /// Decide whether `identity` may invoke an operation requiring `required_scope`
    /// within the service described by `config`.
    ///
    /// Steps are ordered and short-circuit; legacy-role detection only runs when
    /// nothing earlier granted access.
    pub fn evaluate(
        &self,
        identity: Option<&Identity>,
        config: &ServiceScopeConfig,
        required_scope: &str,
    ) -> Decision {
        let Some(identity) = identity else {
            return Decision::Deny(Denial::unauthenticated());
        };

        match grant(identity, config, required_scope) {
            Some(grant) => Decision::Allow(grant),
            None => self.deny(identity, config, required_scope),
        }
    }

    fn deny(
        &self,
        identity: &Identity,
        config: &ServiceScopeConfig,
        required_scope: &str,
    ) -> Decision {
        let prefix = config.service_prefix();

        if let Some(legacy) = identity
            .roles()
            .iter()
            .find(|r| config.is_legacy_role(r.as_str()))
        {
            self.migration_log.legacy_role_denied(&LegacyRoleNotice {
                user_id: identity.id().clone(),
                role: legacy.as_str().to_string(),
                service: prefix.to_string(),
            });
            return Decision::Deny(Denial::legacy_role(prefix));
        }

        Decision::Deny(Denial::insufficient_scope(prefix, required_scope))
    }
}

fn grant(identity: &Identity, config: &ServiceScopeConfig, required_scope: &str) -> Option<Grant> {
    let admin_role = config.admin_role();

    if let Some(scope) = identity
        .scopes()
        .iter()
        .find(|s| s.as_str() == required_scope || s.as_str() == admin_role)
    {
        return Some(Grant {
            basis: GrantBasis::ScopeClaim,
            matched: scope.as_str().to_string(),
        });
    }

    if identity.has_role(required_scope) {
        return Some(Grant {
            basis: GrantBasis::ExactRole,
            matched: required_scope.to_string(),
        });
    }

    if identity.has_role(admin_role) {
        return Some(Grant {
            basis: GrantBasis::ServiceAdmin,
            matched: admin_role.to_string(),
        });
    }

    match config.scope_role_mapping() {
        Some(_) => {
            if let Some(role) = config
                .roles_for_scope(required_scope)
                .and_then(|allowed| first_role_in(identity.roles(), |r| allowed.contains(r)))
            {
                return Some(Grant {
                    basis: GrantBasis::RoleHierarchy,
                    matched: role,
                });
            }
        }
        None => {
            if let Some(role) = first_role_in(identity.roles(), |r| config.is_valid_role(r)) {
                return Some(Grant {
                    basis: GrantBasis::ServiceMembership,
                    matched: role,
                });
            }
        }
    }

    if !config.platform_bypass() {
        return None;
    }

    first_role_in(identity.roles(), |r| config.platform_bypass_roles().contains(r)).map(|role| {
        Grant {
            basis: GrantBasis::PlatformBypass,
            matched: role,
        }
    })
}

fn first_role_in(roles: &[Role], pred: impl Fn(&str) -> bool) -> Option<String> {
    roles
        .iter()
        .find(|r| pred(r.as_str()))
        .map(|r| r.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;
    use crate::migration::{MemoryMigrationLog, ROLE_MIGRATION_TAG};
    use crate::services::{self, ServiceCatalog};
    use crate::Scope;

    fn identity(roles: &[&'static str]) -> Identity {
        Identity::with_roles("user-1", roles.iter().map(|r| Role::new(*r)))
    }

    fn recording() -> (ScopeEvaluator, Arc<MemoryMigrationLog>) {
        let log = Arc::new(MemoryMigrationLog::new());
        (ScopeEvaluator::new(log.clone()), log)
    }

    #[test]
    fn missing_identity_is_unauthorized() {
        let (evaluator, log) = recording();
        let config = services::kpa().unwrap();

        let decision = evaluator.evaluate(None, &config, "kpa:admin");

        let denial = decision.denial().unwrap();
        assert_eq!(denial.kind, DenialKind::Unauthenticated);
        assert_eq!(denial.code, "UNAUTHORIZED");
        assert_eq!(decision.http_status(), 401);
        assert!(log.is_empty());
    }

    #[test]
    fn scope_claim_grants_before_roles() {
        let (evaluator, _) = recording();
        let config = services::neture().unwrap();
        let id = Identity::new("u", [Role::new("admin")], [Scope::new("neture:supplier")]);

        let grant = evaluator
            .evaluate(Some(&id), &config, "neture:supplier")
            .into_result()
            .unwrap();

        assert_eq!(grant.basis, GrantBasis::ScopeClaim);
    }

    #[test]
    fn service_admin_scope_claim_satisfies_any_scope() {
        let (evaluator, _) = recording();
        let config = services::kpa().unwrap();
        let id = Identity::new("u", Vec::<Role>::new(), [Scope::new("kpa:admin")]);

        assert!(evaluator.evaluate(Some(&id), &config, "kpa:operator").is_allowed());
    }

    #[test]
    fn exact_role_grants() {
        let (evaluator, _) = recording();
        let config = services::neture().unwrap();

        let grant = evaluator
            .evaluate(Some(&identity(&["neture:partner"])), &config, "neture:partner")
            .into_result()
            .unwrap();

        assert_eq!(grant.basis, GrantBasis::ExactRole);
        assert_eq!(grant.matched, "neture:partner");
    }

    #[test]
    fn neture_admin_satisfies_supplier_via_hierarchy() {
        let (evaluator, _) = recording();
        let config = services::neture().unwrap();

        let decision =
            evaluator.evaluate(Some(&identity(&["neture:admin"])), &config, "neture:supplier");

        assert!(decision.is_allowed());
    }

    #[test]
    fn neture_operator_cannot_act_as_supplier() {
        let (evaluator, log) = recording();
        let config = services::neture().unwrap();

        let decision =
            evaluator.evaluate(Some(&identity(&["neture:operator"])), &config, "neture:supplier");

        let denial = decision.denial().unwrap();
        assert_eq!(denial.kind, DenialKind::InsufficientScope);
        assert_eq!(decision.http_status(), 403);
        assert!(denial.message.contains("neture"));
        assert!(log.is_empty());
    }

    #[test]
    fn glycopharm_hierarchy_lets_operator_act_as_pharmacy() {
        let (evaluator, _) = recording();
        let config = services::glycopharm().unwrap();

        let grant = evaluator
            .evaluate(Some(&identity(&["glycopharm:operator"])), &config, "glycopharm:pharmacy")
            .into_result()
            .unwrap();

        assert_eq!(grant.basis, GrantBasis::RoleHierarchy);
        assert_eq!(grant.matched, "glycopharm:operator");
    }

    #[test]
    fn hierarchical_scope_without_mapping_entry_is_denied_for_members() {
        let (evaluator, _) = recording();
        let config = services::neture().unwrap();

        let decision =
            evaluator.evaluate(Some(&identity(&["neture:seller"])), &config, "neture:reports");

        assert!(!decision.is_allowed());
    }

    #[test]
    fn flat_service_grants_any_valid_role_for_any_scope() {
        let (evaluator, _) = recording();
        let config = services::kpa().unwrap();

        let grant = evaluator
            .evaluate(Some(&identity(&["kpa:pharmacist"])), &config, "kpa:admin")
            .into_result()
            .unwrap();

        assert_eq!(grant.basis, GrantBasis::ServiceMembership);
    }

    #[test]
    fn platform_admin_denied_where_bypass_is_disabled() {
        let (evaluator, log) = recording();
        let config = services::kpa().unwrap();

        let decision =
            evaluator.evaluate(Some(&identity(&["platform:admin"])), &config, "kpa:admin");

        assert_eq!(decision.http_status(), 403);
        assert!(log.is_empty());
    }

    #[test]
    fn platform_admin_bypasses_where_enabled() {
        let (evaluator, _) = recording();
        let config = services::glycopharm().unwrap();

        for role in ["platform:admin", "platform:super_admin"] {
            let id = Identity::with_roles("u", [Role::new(role)]);
            let grant = evaluator
                .evaluate(Some(&id), &config, "glycopharm:admin")
                .into_result()
                .unwrap();
            assert_eq!(grant.basis, GrantBasis::PlatformBypass);
        }
    }

    #[test]
    fn legacy_role_is_denied_with_migration_notice() {
        let (evaluator, log) = recording();
        let config = services::kpa().unwrap();

        let decision = evaluator.evaluate(Some(&identity(&["admin"])), &config, "kpa:admin");

        let denial = decision.denial().unwrap();
        assert_eq!(denial.kind, DenialKind::LegacyRole);
        assert_eq!(
            denial.message,
            "Legacy roles are no longer supported. Use kpa:* roles."
        );

        let notices = log.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].user_id.as_str(), "user-1");
        assert_eq!(notices[0].role, "admin");
        assert_eq!(notices[0].service, "kpa");
        assert!(notices[0].message().contains(ROLE_MIGRATION_TAG));
    }

    #[test]
    fn legacy_plus_valid_role_is_allowed_without_notice() {
        let (evaluator, log) = recording();
        let config = services::neture().unwrap();

        let decision = evaluator.evaluate(
            Some(&identity(&["supplier", "neture:supplier"])),
            &config,
            "neture:supplier",
        );

        assert!(decision.is_allowed());
        assert!(log.is_empty());
    }

    #[test]
    fn unknown_bare_role_gets_generic_denial() {
        let (evaluator, log) = recording();
        let config = services::glycopharm().unwrap();

        let decision =
            evaluator.evaluate(Some(&identity(&["viewer"])), &config, "glycopharm:operator");

        assert_eq!(decision.denial().unwrap().kind, DenialKind::InsufficientScope);
        assert!(log.is_empty());
    }

    #[test]
    fn every_guard_denies_every_legacy_role() {
        let catalog = ServiceCatalog::standard().unwrap();

        for config in catalog.iter() {
            for legacy in config.legacy_roles() {
                let (evaluator, log) = recording();
                let id = Identity::with_roles("legacy-user", [Role::new(legacy.clone())]);

                for scope in config.known_scopes() {
                    let decision = evaluator.evaluate(Some(&id), config, &scope);
                    let denial = decision.denial().unwrap();
                    assert!(
                        denial.message.contains("Legacy roles are no longer supported"),
                        "{legacy} at {scope}"
                    );
                }

                let notices = log.notices();
                assert_eq!(notices.len(), config.known_scopes().len());
                assert!(notices.iter().all(|n| n.role == *legacy
                    && n.service == config.service_prefix()));
            }
        }
    }

    fn service_index() -> impl Strategy<Value = usize> {
        0..ServiceCatalog::standard().unwrap().iter().count()
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn service_admin_satisfies_every_scope(idx in service_index(), level in "[a-z_]{1,16}") {
            let catalog = ServiceCatalog::standard().unwrap();
            let config = catalog.iter().nth(idx).unwrap();
            let (evaluator, log) = recording();
            let id =
                Identity::with_roles("admin-user", [Role::new(config.admin_role().to_string())]);
            let scope = format!("{}:{}", config.service_prefix(), level);

            prop_assert!(evaluator.evaluate(Some(&id), config, &scope).is_allowed());
            prop_assert!(log.is_empty());
        }

        #[test]
        fn roles_of_one_service_never_satisfy_another(
            owner in service_index(),
            target in service_index(),
            picks in proptest::collection::vec(any::<prop::sample::Index>(), 1..4),
        ) {
            prop_assume!(owner != target);
            let catalog = ServiceCatalog::standard().unwrap();
            let owner = catalog.iter().nth(owner).unwrap();
            let target = catalog.iter().nth(target).unwrap();

            let owned: Vec<&String> = owner.valid_roles().iter().collect();
            let roles: BTreeSet<String> = picks.iter().map(|i| i.get(&owned).to_string()).collect();
            let id = Identity::with_roles("cross-user", roles.into_iter().map(Role::new));

            let (evaluator, log) = recording();
            for scope in target.known_scopes() {
                let decision = evaluator.evaluate(Some(&id), target, &scope);
                prop_assert_eq!(decision.http_status(), 403);
            }
            prop_assert!(log.is_empty());
        }
    }
}
