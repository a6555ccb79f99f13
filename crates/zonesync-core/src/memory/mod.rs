//! Built-in in-memory back ends
//!
//! - [`MemoryProvider`]: zones held in process memory (zonetype `memory`)
//! - [`StaticInventory`]: a fixed address list (inventory type `static`)

pub mod inventory;
pub mod provider;

pub use inventory::{StaticInventory, StaticInventoryFactory};
pub use provider::{MemoryProvider, MemoryProviderFactory, MemoryStore};

use crate::config::ZONETYPE_MEMORY;
use crate::registry::ProviderRegistry;

/// Register the built-in back ends with a fresh, empty memory store
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(ZONETYPE_MEMORY, Box::new(MemoryProviderFactory::default()));
    registry.register_inventory("static", Box::new(StaticInventoryFactory));
}
