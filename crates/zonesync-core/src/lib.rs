// # zonesync-core
//
// Core library for synchronizing DNS zones with an IP address inventory.
//
// ## Architecture Overview
//
// - **Record / Zone / ZoneSet**: the zone data model, with longest-suffix
//   routing of records into their owning zone
// - **ZoneDelta**: per-zone additions and removals computed by comparing an
//   observed zone set with a desired one
// - **reverse_name**: PTR owner names for IPv4 and IPv6 addresses
// - **increment_serial**: the zone serial policy applied on save
// - **DnsProvider / InventorySource**: traits implemented by back ends
// - **ProviderRegistry**: plugin-based lookup of back ends by type name
// - **SyncEngine**: import, compare, and apply for every configured zone
//
// ## Design Principles
//
// 1. **Pure core**: routing, comparison, reverse names, and serial math do no
//    I/O and never suspend
// 2. **Plugin-based**: back ends register themselves, no hard-coded if-else
// 3. **Library-first**: the CLI is a thin wrapper around `SyncEngine`
// 4. **Idempotent**: re-running a sync on a partially updated zone yields
//    the remaining delta and nothing else

pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod model;
pub mod registry;
pub mod reverse;
pub mod serial;
pub mod traits;

// Re-export core types for convenience
pub use config::{InventoryConfig, ZoneConfig, ZonesyncConfig};
pub use engine::{SyncEngine, SyncEvent, SyncMode, SyncReport, ZoneReport};
pub use error::{Error, Result};
pub use memory::{MemoryProvider, MemoryStore, StaticInventory};
pub use model::{Record, Zone, ZoneDelta, ZoneSet, compare_record_sets};
pub use registry::ProviderRegistry;
pub use reverse::reverse_name;
pub use serial::{increment_serial, increment_serial_today};
pub use traits::{DnsProvider, InventoryAddress, InventorySource};
