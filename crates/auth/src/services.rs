//! Policies of the services hosted on the platform.

use std::collections::BTreeMap;

use crate::config::{ConfigError, ServiceScopeConfig};

pub const PLATFORM_ADMIN: &str = "platform:admin";
pub const PLATFORM_SUPER_ADMIN: &str = "platform:super_admin";

/// Pharmacy association. Flat role model: every `kpa:*` role satisfies every
/// `kpa` scope.
pub fn kpa() -> Result<ServiceScopeConfig, ConfigError> {
    ServiceScopeConfig::builder("kpa")
        .valid_roles([
            "kpa:admin",
            "kpa:operator",
            "kpa:district_admin",
            "kpa:branch_admin",
            "kpa:branch_operator",
            "kpa:pharmacist",
        ])
        .legacy_roles([
            "admin",
            "super_admin",
            "operator",
            "district_admin",
            "branch_admin",
            "branch_operator",
            "pharmacist",
            "membership_super_admin",
            "membership_district_admin",
            "membership_branch_admin",
        ])
        .build()
}

/// Consumer marketplace. Hierarchical: admin sits above every other level,
/// levels below admin do not satisfy each other.
pub fn neture() -> Result<ServiceScopeConfig, ConfigError> {
    ServiceScopeConfig::builder("neture")
        .valid_roles([
            "neture:admin",
            "neture:operator",
            "neture:supplier",
            "neture:partner",
            "neture:seller",
        ])
        .map_scope("neture:admin", ["neture:admin"])
        .map_scope("neture:operator", ["neture:admin", "neture:operator"])
        .map_scope("neture:supplier", ["neture:admin", "neture:supplier"])
        .map_scope("neture:partner", ["neture:admin", "neture:partner"])
        .map_scope("neture:seller", ["neture:admin", "neture:seller"])
        .legacy_roles(["admin", "super_admin", "operator", "supplier", "partner", "seller"])
        .build()
}

/// Specialty pharmacy. Hierarchical, tenant-scoped, and the only service that
/// honors platform administrators.
pub fn glycopharm() -> Result<ServiceScopeConfig, ConfigError> {
    ServiceScopeConfig::builder("glycopharm")
        .valid_roles([
            "glycopharm:admin",
            "glycopharm:operator",
            "glycopharm:pharmacy",
            "glycopharm:customer",
        ])
        .map_scope("glycopharm:admin", ["glycopharm:admin"])
        .map_scope("glycopharm:operator", ["glycopharm:admin", "glycopharm:operator"])
        .map_scope(
            "glycopharm:pharmacy",
            ["glycopharm:admin", "glycopharm:operator", "glycopharm:pharmacy"],
        )
        .map_scope("glycopharm:customer", ["glycopharm:admin", "glycopharm:customer"])
        .legacy_roles(["admin", "super_admin", "operator", "pharmacy", "pharmacist", "customer"])
        .platform_bypass([PLATFORM_ADMIN, PLATFORM_SUPER_ADMIN])
        .build()
}

/// Every hosted service's policy, keyed by prefix.
#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    services: BTreeMap<String, ServiceScopeConfig>,
}

impl ServiceCatalog {
    /// Build and validate the standard policies.
    pub fn standard() -> Result<Self, ConfigError> {
        Self::from_configs([kpa()?, neture()?, glycopharm()?])
    }

    pub fn from_configs(
        configs: impl IntoIterator<Item = ServiceScopeConfig>,
    ) -> Result<Self, ConfigError> {
        let mut services = BTreeMap::new();
        for config in configs {
            let prefix = config.service_prefix().to_string();
            if services.insert(prefix.clone(), config).is_some() {
                return Err(ConfigError::InvalidPrefix(format!("{prefix} (duplicate)")));
            }
        }
        Ok(Self { services })
    }

    pub fn get(&self, prefix: &str) -> Option<&ServiceScopeConfig> {
        self.services.get(prefix)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceScopeConfig> {
        self.services.values()
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}
