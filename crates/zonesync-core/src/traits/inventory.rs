// # Inventory Source Trait
//
// Defines the interface for the IP address inventory that drives desired
// DNS state.
//
// ## Implementations
//
// - Fixed list: `zonesync_core::memory::StaticInventory`
// - NetBox IPAM: `zonesync-inventory-netbox` crate

use crate::config::InventoryConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::net::IpAddr;

/// One address as reported by the inventory
///
/// Sources parse addresses before handing them over; malformed addresses
/// never reach the zone model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryAddress {
    /// Forward name without trailing dot (may be empty)
    pub dns_name: String,
    /// Address without prefix length
    pub address: IpAddr,
    /// Inventory status ("active", "reserved", "deprecated", ...)
    pub status: String,
}

impl InventoryAddress {
    /// Create a new inventory entry
    pub fn new(dns_name: impl Into<String>, address: IpAddr, status: impl Into<String>) -> Self {
        Self {
            dns_name: dns_name.into(),
            address,
            status: status.into(),
        }
    }

    /// Whether this entry should be published in DNS
    pub fn is_active(&self) -> bool {
        !self.dns_name.is_empty() && self.status == crate::model::ACTIVE_STATUS
    }
}

/// Trait for inventory implementations
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Fetch every address known to the inventory
    async fn list_addresses(&self) -> Result<Vec<InventoryAddress>>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing inventory sources from configuration
pub trait InventorySourceFactory: Send + Sync {
    /// Create an InventorySource instance from configuration
    fn create(&self, config: &InventoryConfig) -> Result<Box<dyn InventorySource>>;
}
