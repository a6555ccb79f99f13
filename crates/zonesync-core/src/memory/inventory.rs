// # Static Inventory
//
// An InventorySource that serves a fixed list of addresses, taken either
// from the `static` inventory configuration or handed over in code.

use crate::config::InventoryConfig;
use crate::error::{Error, Result};
use crate::traits::{InventoryAddress, InventorySource, InventorySourceFactory};
use async_trait::async_trait;

/// Inventory backed by a fixed address list
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    addresses: Vec<InventoryAddress>,
}

impl StaticInventory {
    /// Create an inventory serving `addresses`
    pub fn new(addresses: Vec<InventoryAddress>) -> Self {
        Self { addresses }
    }

    /// Number of entries, active or not
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether the inventory holds no entries
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[async_trait]
impl InventorySource for StaticInventory {
    async fn list_addresses(&self) -> Result<Vec<InventoryAddress>> {
        Ok(self.addresses.clone())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// Factory for the `static` inventory type
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticInventoryFactory;

impl InventorySourceFactory for StaticInventoryFactory {
    fn create(&self, config: &InventoryConfig) -> Result<Box<dyn InventorySource>> {
        match config {
            InventoryConfig::Static { addresses } => {
                let addresses = addresses
                    .iter()
                    .map(|entry| {
                        InventoryAddress::new(&entry.dns_name, entry.address, &entry.status)
                    })
                    .collect();
                Ok(Box::new(StaticInventory::new(addresses)))
            }
            other => Err(Error::config(format!(
                "Static inventory cannot be built from {} configuration",
                other.type_name()
            ))),
        }
    }
}
