//! Zone data model
//!
//! - [`Record`]: one resource record
//! - [`Zone`]: one zone's records keyed by owner name
//! - [`ZoneSet`]: all zones of a sync run, with longest-suffix routing
//! - [`ZoneDelta`]: records to add and remove for one zone

pub mod delta;
pub mod record;
pub mod zone;
pub mod zone_set;

pub use delta::{ZoneDelta, compare_record_sets};
pub use record::Record;
pub use zone::Zone;
pub use zone_set::{ACTIVE_STATUS, InventoryStats, ZoneSet};
