//! Plugin-based provider registry
//!
//! The registry maps zone types to DNS provider factories and inventory
//! types to inventory factories, so the engine never branches on back-end
//! identity.
//!
//! ## Registration
//!
//! Back-end crates register themselves during initialization:
//!
//! ```rust,ignore
//! // In zonesync-provider-zonefile
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_provider("zonefile", Box::new(ZoneFileFactory));
//! }
//! ```

use crate::config::{InventoryConfig, ZoneConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory, InventorySource, InventorySourceFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry for plugin-based provider and inventory creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS provider factories, keyed by zone type
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,

    /// Registered inventory factories, keyed by inventory type
    inventories: RwLock<HashMap<String, Box<dyn InventorySourceFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the in-memory provider and static inventory
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        crate::memory::register(&registry);
        registry
    }

    /// Register a DNS provider factory under a zone type
    pub fn register_provider(&self, zonetype: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        providers.insert(zonetype.into(), factory);
    }

    /// Register an inventory factory under an inventory type
    pub fn register_inventory(
        &self,
        name: impl Into<String>,
        factory: Box<dyn InventorySourceFactory>,
    ) {
        let mut inventories = self.inventories.write().unwrap_or_else(PoisonError::into_inner);
        inventories.insert(name.into(), factory);
    }

    /// Create the DNS provider for one zone
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error::Config)`: If the zone type is not registered
    pub fn create_provider(&self, zone: &ZoneConfig) -> Result<Box<dyn DnsProvider>> {
        let zonetype = zone.zone_type();
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);

        let factory = providers.get(zonetype).ok_or_else(|| {
            Error::config(format!("Unknown zonetype {:?} for zone {}", zonetype, zone.name))
        })?;

        factory.create(zone)
    }

    /// Create the inventory source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn InventorySource>)`: Created inventory instance
    /// - `Err(Error::Config)`: If the inventory type is not registered
    pub fn create_inventory(&self, config: &InventoryConfig) -> Result<Box<dyn InventorySource>> {
        let inventory_type = config.type_name();
        let inventories = self.inventories.read().unwrap_or_else(PoisonError::into_inner);

        let factory = inventories
            .get(inventory_type)
            .ok_or_else(|| Error::config(format!("Unknown inventory type: {}", inventory_type)))?;

        factory.create(config)
    }

    /// List all registered zone types, sorted
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all registered inventory types, sorted
    pub fn list_inventories(&self) -> Vec<String> {
        let inventories = self.inventories.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = inventories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a zone type is registered
    pub fn has_provider(&self, zonetype: &str) -> bool {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(zonetype)
    }

    /// Check if an inventory type is registered
    pub fn has_inventory(&self, name: &str) -> bool {
        let inventories = self.inventories.read().unwrap_or_else(PoisonError::into_inner);
        inventories.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockProviderFactory;

    impl DnsProviderFactory for MockProviderFactory {
        fn create(&self, _zone: &ZoneConfig) -> Result<Box<dyn DnsProvider>> {
            Err(Error::not_found("Mock provider not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = ProviderRegistry::new();

        assert!(!registry.has_provider("mock"));

        registry.register_provider("mock", Box::new(MockProviderFactory));

        assert!(registry.has_provider("mock"));
        assert!(registry.list_providers().contains(&"mock".to_string()));
    }

    #[test]
    fn test_unknown_zonetype_is_config_error() {
        let registry = ProviderRegistry::new();
        let zone = ZoneConfig::new("example.com", "route53");
        let err = registry.create_provider(&zone).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_builtins() {
        let registry = ProviderRegistry::with_builtins();
        assert!(registry.has_provider("memory"));
        assert!(registry.has_inventory("static"));

        let provider = registry
            .create_provider(&ZoneConfig::new("example.com", "memory"))
            .unwrap();
        assert_eq!(provider.provider_name(), "memory");
    }
}
