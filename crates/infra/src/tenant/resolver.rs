//! Two-step tenant resolution: owned organization, then active enrollment.
//!
//! ```text
//! START → AUTH_CHECK → ADMIN_CHECK → ORG_LOOKUP → ORG_ACTIVE_CHECK
//!       → ENROLLMENT_LOOKUP → RESOLVED | DENIED | ERROR
//! ```
//!
//! Admin identities resolve without touching the database. Everyone else costs
//! one query (no or inactive organization) or two (enrollment check). The
//! second query depends on the first, so they run sequentially.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::instrument;

use servicegate_auth::Identity;
use servicegate_auth::services::{PLATFORM_ADMIN, PLATFORM_SUPER_ADMIN};
use servicegate_core::ServiceCode;

use super::{Enrollment, Organization, TenantContext, TenantDenial, TenantDenialKind};
use crate::query::{QueryError, QueryExecutor, QueryParam};

// Ids are bound as text and cast to the uuid column type so both lookups stay indexable.
pub(crate) const OWNED_ORGANIZATION_SQL: &str = "SELECT id, is_active FROM organizations \
     WHERE created_by_user_id = $1::uuid LIMIT 1";

pub(crate) const ACTIVE_ENROLLMENT_SQL: &str = "SELECT organization_id, service_code, status \
     FROM organization_service_enrollments \
     WHERE organization_id = $1::uuid AND service_code = $2 AND status = 'active' LIMIT 1";

pub struct TenantContextResolver {
    executor: Arc<dyn QueryExecutor>,
    service: ServiceCode,
    admin_roles: [String; 3],
}

impl core::fmt::Debug for TenantContextResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TenantContextResolver")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl TenantContextResolver {
    pub fn new(executor: Arc<dyn QueryExecutor>, service: ServiceCode) -> Self {
        let admin_roles = [
            service.admin_role(),
            PLATFORM_ADMIN.to_string(),
            PLATFORM_SUPER_ADMIN.to_string(),
        ];
        Self {
            executor,
            service,
            admin_roles,
        }
    }

    fn is_admin(&self, identity: &Identity) -> bool {
        self.admin_roles.iter().any(|role| identity.has_role(role))
    }

    fn deny(&self, kind: TenantDenialKind) -> TenantDenial {
        TenantDenial::new(kind, &self.service)
    }

    /// Resolve the tenant partition `identity` may see within this service.
    ///
    /// Query failures never escape: they become a `PHARMACY_LOOKUP_ERROR`
    /// denial and nothing partial is returned.
    #[instrument(skip(self, identity), fields(service = %self.service))]
    pub async fn resolve(
        &self,
        identity: Option<&Identity>,
    ) -> Result<TenantContext, TenantDenial> {
        let Some(identity) = identity else {
            return Err(self.deny(TenantDenialKind::Unauthenticated));
        };

        if self.is_admin(identity) {
            tracing::debug!(user_id = %identity.id(), "admin bypass: tenant context unrestricted");
            return Ok(TenantContext::admin_bypass());
        }

        let organization: Organization = match self
            .fetch_one(OWNED_ORGANIZATION_SQL, &[identity.id().as_str().into()])
            .await
        {
            Ok(Some(organization)) => organization,
            Ok(None) => {
                tracing::warn!(user_id = %identity.id(), "no owned organization");
                return Err(self.deny(TenantDenialKind::OrganizationNotFound));
            }
            Err(e) => return Err(self.lookup_failed(identity, "organization", e)),
        };

        if !organization.is_active {
            tracing::warn!(
                user_id = %identity.id(),
                organization_id = %organization.id,
                "organization inactive"
            );
            return Err(self.deny(TenantDenialKind::OrganizationInactive));
        }

        let enrollment: Option<Enrollment> = match self
            .fetch_one(
                ACTIVE_ENROLLMENT_SQL,
                &[
                    organization.id.as_str().into(),
                    self.service.as_str().into(),
                ],
            )
            .await
        {
            Ok(enrollment) => enrollment,
            Err(e) => return Err(self.lookup_failed(identity, "enrollment", e)),
        };

        if enrollment.is_none() {
            tracing::warn!(
                user_id = %identity.id(),
                organization_id = %organization.id,
                "organization not enrolled"
            );
            return Err(self.deny(TenantDenialKind::NotEnrolled));
        }

        Ok(TenantContext::owned(organization.id))
    }

    async fn fetch_one<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[QueryParam],
    ) -> Result<Option<T>, QueryError> {
        let rows = self.executor.query(sql, params).await?;
        rows.into_iter()
            .next()
            .map(|row| serde_json::from_value(serde_json::Value::Object(row)))
            .transpose()
            .map_err(QueryError::from)
    }

    fn lookup_failed(&self, identity: &Identity, step: &str, error: QueryError) -> TenantDenial {
        tracing::error!(user_id = %identity.id(), step, error = %error, "pharmacy lookup failed");
        self.deny(TenantDenialKind::LookupFailed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use servicegate_auth::Role;

    use super::*;
    use crate::query::ScriptedQueryExecutor;

    fn resolver() -> (TenantContextResolver, Arc<ScriptedQueryExecutor>) {
        let executor = Arc::new(ScriptedQueryExecutor::new());
        let resolver = TenantContextResolver::new(
            executor.clone(),
            ServiceCode::parse("glycopharm").unwrap(),
        );
        (resolver, executor)
    }

    fn user(roles: &[&'static str]) -> Identity {
        Identity::with_roles("user-9", roles.iter().map(|r| Role::new(*r)))
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized_without_queries() {
        let (resolver, executor) = resolver();

        let denial = resolver.resolve(None).await.unwrap_err();

        assert_eq!(denial.status(), 401);
        assert_eq!(denial.code, "UNAUTHORIZED");
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn admins_bypass_with_zero_queries() {
        for role in ["glycopharm:admin", "platform:admin", "platform:super_admin"] {
            let (resolver, executor) = resolver();
            executor.push_error("must not be called");

            let context = resolver.resolve(Some(&user(&[role]))).await.unwrap();

            assert!(context.is_admin_bypass(), "{role}");
            assert_eq!(context.pharmacy_id(), None);
            assert_eq!(executor.call_count(), 0);
        }
    }

    #[tokio::test]
    async fn other_service_admin_does_not_bypass() {
        let (resolver, executor) = resolver();

        let denial = resolver.resolve(Some(&user(&["kpa:admin"]))).await.unwrap_err();

        assert_eq!(denial.code, "GLYCOPHARM_ORG_NOT_FOUND");
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn no_owned_organization_is_denied_after_one_query() {
        let (resolver, executor) = resolver();
        executor.push_empty();

        let denial = resolver
            .resolve(Some(&user(&["glycopharm:pharmacy"])))
            .await
            .unwrap_err();

        assert_eq!(denial.status(), 403);
        assert_eq!(denial.code, "GLYCOPHARM_ORG_NOT_FOUND");

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].sql, OWNED_ORGANIZATION_SQL);
        assert_eq!(calls[0].params, vec![QueryParam::Text("user-9".into())]);
    }

    #[test]
    fn lookups_cast_parameters_not_columns() {
        for sql in [OWNED_ORGANIZATION_SQL, ACTIVE_ENROLLMENT_SQL] {
            assert!(!sql.contains("::text"), "{sql}");
            assert!(sql.contains("= $1::uuid"), "{sql}");
        }
    }

    #[tokio::test]
    async fn inactive_organization_stops_before_enrollment() {
        let (resolver, executor) = resolver();
        executor.push_row(json!({ "id": "org-1", "is_active": false }));

        let denial = resolver
            .resolve(Some(&user(&["glycopharm:pharmacy"])))
            .await
            .unwrap_err();

        assert_eq!(denial.code, "GLYCOPHARM_ORG_INACTIVE");
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn missing_enrollment_is_denied_after_two_queries() {
        let (resolver, executor) = resolver();
        executor
            .push_row(json!({ "id": "org-1", "is_active": true }))
            .push_empty();

        let denial = resolver
            .resolve(Some(&user(&["glycopharm:pharmacy"])))
            .await
            .unwrap_err();

        assert_eq!(denial.status(), 403);
        assert_eq!(denial.code, "GLYCOPHARM_NOT_ENROLLED");

        let calls = executor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].sql, ACTIVE_ENROLLMENT_SQL);
        assert_eq!(
            calls[1].params,
            vec![
                QueryParam::Text("org-1".into()),
                QueryParam::Text("glycopharm".into())
            ]
        );
    }

    #[tokio::test]
    async fn enrolled_organization_resolves_to_its_id() {
        let (resolver, executor) = resolver();
        executor
            .push_row(json!({ "id": "org-1", "is_active": true }))
            .push_row(json!({
                "organization_id": "org-1",
                "service_code": "glycopharm",
                "status": "active"
            }));

        let context = resolver
            .resolve(Some(&user(&["glycopharm:pharmacy"])))
            .await
            .unwrap();

        assert_eq!(context.pharmacy_id().map(|id| id.as_str()), Some("org-1"));
        assert!(!context.is_admin_bypass());
        assert_eq!(executor.call_count(), 2);
    }

    #[tokio::test]
    async fn first_query_failure_is_lookup_error() {
        let (resolver, executor) = resolver();
        executor.push_error("connection refused");

        let denial = resolver
            .resolve(Some(&user(&["glycopharm:pharmacy"])))
            .await
            .unwrap_err();

        assert_eq!(denial.status(), 500);
        assert_eq!(denial.code, "PHARMACY_LOOKUP_ERROR");
        assert!(!denial.message.contains("connection refused"));
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn enrollment_query_failure_is_lookup_error() {
        let (resolver, executor) = resolver();
        executor
            .push_row(json!({ "id": "org-1", "is_active": true }))
            .push_error("timeout");

        let denial = resolver
            .resolve(Some(&user(&["glycopharm:pharmacy"])))
            .await
            .unwrap_err();

        assert_eq!(denial.code, "PHARMACY_LOOKUP_ERROR");
        assert_eq!(executor.call_count(), 2);
    }

    #[tokio::test]
    async fn undecodable_row_is_lookup_error() {
        let (resolver, executor) = resolver();
        executor.push_row(json!({ "id": "org-1" }));

        let denial = resolver
            .resolve(Some(&user(&["glycopharm:pharmacy"])))
            .await
            .unwrap_err();

        assert_eq!(denial.code, "PHARMACY_LOOKUP_ERROR");
    }
}
