//! Core traits for zonesync
//!
//! This module defines the abstract interfaces that back ends implement.
//!
//! - [`DnsProvider`]: Import, stage, and commit records for one zone
//! - [`InventorySource`]: Fetch the addresses that drive desired state

pub mod dns_provider;
pub mod inventory;

pub use dns_provider::{DnsProvider, DnsProviderFactory};
pub use inventory::{InventoryAddress, InventorySource, InventorySourceFactory};
