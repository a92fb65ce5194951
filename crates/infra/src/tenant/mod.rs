//! Tenant (pharmacy) context resolution.
//!
//! Scope guards decide *whether* an operation may run; this module decides
//! *whose* data it may touch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use servicegate_core::{OrganizationId, ServiceCode};

pub mod resolver;

pub use resolver::TenantContextResolver;

pub const PHARMACY_LOOKUP_ERROR: &str = "PHARMACY_LOOKUP_ERROR";

/// Resolved tenant partition for one request.
///
/// `pharmacy_id` is `None` only for an admin-bypass identity; any other
/// resolution carries a concrete organization or ends in a [`TenantDenial`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantContext {
    pharmacy_id: Option<OrganizationId>,
}

impl TenantContext {
    pub(crate) fn admin_bypass() -> Self {
        Self { pharmacy_id: None }
    }

    pub(crate) fn owned(organization: OrganizationId) -> Self {
        Self {
            pharmacy_id: Some(organization),
        }
    }

    pub fn pharmacy_id(&self) -> Option<&OrganizationId> {
        self.pharmacy_id.as_ref()
    }

    /// Admin identities see every tenant.
    pub fn is_admin_bypass(&self) -> bool {
        self.pharmacy_id.is_none()
    }
}

/// Organization row (externally maintained).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub is_active: bool,
}

/// Service enrollment row (externally maintained).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Enrollment {
    pub organization_id: OrganizationId,
    pub service_code: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantDenialKind {
    Unauthenticated,
    OrganizationNotFound,
    OrganizationInactive,
    NotEnrolled,
    LookupFailed,
}

impl TenantDenialKind {
    pub fn status(self) -> u16 {
        match self {
            TenantDenialKind::Unauthenticated => 401,
            TenantDenialKind::OrganizationNotFound
            | TenantDenialKind::OrganizationInactive
            | TenantDenialKind::NotEnrolled => 403,
            TenantDenialKind::LookupFailed => 500,
        }
    }
}

/// Terminal outcome of a failed tenant resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{code}: {message}")]
pub struct TenantDenial {
    pub kind: TenantDenialKind,
    pub code: String,
    pub message: String,
}

impl TenantDenial {
    pub(crate) fn new(kind: TenantDenialKind, service: &ServiceCode) -> Self {
        let prefix = service.error_prefix();
        let (code, message) = match kind {
            TenantDenialKind::Unauthenticated => {
                ("UNAUTHORIZED".to_string(), "Authentication required".to_string())
            }
            TenantDenialKind::OrganizationNotFound => (
                format!("{prefix}_ORG_NOT_FOUND"),
                format!("No organization is registered for this account on {service}"),
            ),
            TenantDenialKind::OrganizationInactive => (
                format!("{prefix}_ORG_INACTIVE"),
                "Organization is inactive".to_string(),
            ),
            TenantDenialKind::NotEnrolled => (
                format!("{prefix}_NOT_ENROLLED"),
                format!("Organization is not enrolled in {service}"),
            ),
            TenantDenialKind::LookupFailed => (
                PHARMACY_LOOKUP_ERROR.to_string(),
                "Failed to resolve pharmacy context".to_string(),
            ),
        };
        Self {
            kind,
            code,
            message,
        }
    }

    pub fn status(&self) -> u16 {
        self.kind.status()
    }
}
