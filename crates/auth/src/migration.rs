//! Diagnostics for the legacy (unnamespaced) role migration.
//!
//! Every denial caused by a bare legacy role is reported through a
//! [`MigrationLog`], so callers still on the old role scheme can be found by
//! grepping for [`ROLE_MIGRATION_TAG`].

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use servicegate_core::UserId;

/// Literal tag carried by every legacy-role warning.
pub const ROLE_MIGRATION_TAG: &str = "[ROLE_MIGRATION]";

/// One legacy-role denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyRoleNotice {
    pub user_id: UserId,
    pub role: String,
    pub service: String,
}

impl LegacyRoleNotice {
    /// Human-readable line including the migration tag.
    pub fn message(&self) -> String {
        format!(
            "{ROLE_MIGRATION_TAG} Legacy role '{}' denied for user {} on service '{}'",
            self.role, self.user_id, self.service
        )
    }
}

/// Sink for legacy-role warnings.
pub trait MigrationLog: Send + Sync {
    fn legacy_role_denied(&self, notice: &LegacyRoleNotice);
}

/// Default sink: one structured `tracing` warning per notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMigrationLog;

impl MigrationLog for TracingMigrationLog {
    fn legacy_role_denied(&self, notice: &LegacyRoleNotice) {
        tracing::warn!(
            tag = ROLE_MIGRATION_TAG,
            user_id = %notice.user_id,
            role = %notice.role,
            service = %notice.service,
            "{}",
            notice.message()
        );
    }
}

/// In-memory sink that keeps every notice (tests, local tooling).
#[derive(Debug, Default)]
pub struct MemoryMigrationLog {
    notices: Mutex<Vec<LegacyRoleNotice>>,
}

impl MemoryMigrationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<LegacyRoleNotice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl MigrationLog for MemoryMigrationLog {
    fn legacy_role_denied(&self, notice: &LegacyRoleNotice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice.clone());
    }
}
