//! `servicegate-auth`: pure service-scoped authorization (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod config;
pub mod evaluate;
pub mod identity;
pub mod migration;
pub mod roles;
pub mod scopes;
pub mod services;

pub use config::{ConfigError, ServiceScopeConfig, ServiceScopeConfigBuilder};
pub use evaluate::{Decision, Denial, DenialKind, Grant, GrantBasis, ScopeEvaluator};
pub use identity::Identity;
pub use migration::{
    LegacyRoleNotice, MemoryMigrationLog, MigrationLog, ROLE_MIGRATION_TAG, TracingMigrationLog,
};
pub use roles::{ParsedRole, Role};
pub use scopes::Scope;
pub use services::ServiceCatalog;
