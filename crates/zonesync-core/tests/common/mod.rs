//! Test doubles and common utilities for contract tests
//!
//! This module provides a recording provider with failure injection, a
//! fixed inventory, and config helpers. None of them implement real
//! back-end behavior.

#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use zonesync_core::config::{InventoryConfig, StaticAddress, ZoneConfig, ZonesyncConfig};
use zonesync_core::error::{Error, Result};
use zonesync_core::memory::{MemoryProviderFactory, MemoryStore};
use zonesync_core::traits::{DnsProvider, DnsProviderFactory};
use zonesync_core::{ProviderRegistry, Record, Zone};

/// One provider call as seen by [`RecordingProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Import(String),
    Remove(String, Record),
    Write(String, Record),
    Save(String),
}

impl Call {
    pub fn zone(&self) -> &str {
        match self {
            Call::Import(zone) | Call::Save(zone) => zone,
            Call::Remove(zone, _) | Call::Write(zone, _) => zone,
        }
    }
}

/// Which call to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Import,
    Remove,
    Write,
    Save,
}

#[derive(Default)]
struct Backend {
    zones: HashMap<String, Vec<Record>>,
    calls: Vec<Call>,
    failures: Vec<(String, Op)>,
}

/// A provider that records every call and never persists anything
#[derive(Clone, Default)]
pub struct RecordingProvider {
    backend: Arc<Mutex<Backend>>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the records returned by `import_zone` for a zone
    pub fn seed(&self, zone: &str, records: Vec<Record>) {
        self.backend
            .lock()
            .unwrap()
            .zones
            .insert(zone.to_string(), records);
    }

    /// Make the first matching call for `zone` fail
    pub fn fail_on(&self, zone: &str, op: Op) {
        self.backend
            .lock()
            .unwrap()
            .failures
            .push((zone.to_string(), op));
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.backend.lock().unwrap().calls.clone()
    }

    /// Calls made for one zone, in order
    pub fn calls_for(&self, zone: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.zone() == zone)
            .collect()
    }

    /// Number of saves for one zone
    pub fn save_count(&self, zone: &str) -> usize {
        self.calls_for(zone)
            .iter()
            .filter(|call| matches!(call, Call::Save(_)))
            .count()
    }

    fn record(&self, call: Call, op: Op) -> Result<()> {
        let mut backend = self.backend.lock().unwrap();
        let zone = call.zone().to_string();
        backend.calls.push(call);

        if let Some(index) = backend
            .failures
            .iter()
            .position(|(z, o)| *z == zone && *o == op)
        {
            backend.failures.remove(index);
            return Err(Error::provider("recording", format!("injected {:?} failure", op)));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl DnsProvider for RecordingProvider {
    async fn import_zone(&self, zone: &ZoneConfig) -> Result<Zone> {
        self.record(Call::Import(zone.name.clone()), Op::Import)?;

        let mut imported = Zone::from_config(zone);
        let records = self
            .backend
            .lock()
            .unwrap()
            .zones
            .get(&zone.name)
            .cloned()
            .unwrap_or_default();
        for record in records {
            imported.add_record(record);
        }
        Ok(imported)
    }

    async fn write_record(&self, zone: &ZoneConfig, record: &Record) -> Result<()> {
        self.record(Call::Write(zone.name.clone(), record.clone()), Op::Write)
    }

    async fn remove_record(&self, zone: &ZoneConfig, record: &Record) -> Result<()> {
        self.record(Call::Remove(zone.name.clone(), record.clone()), Op::Remove)
    }

    async fn save(&self, zone: &ZoneConfig) -> Result<()> {
        self.record(Call::Save(zone.name.clone()), Op::Save)
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Hands out clones of one [`RecordingProvider`]
pub struct RecordingFactory(pub RecordingProvider);

impl DnsProviderFactory for RecordingFactory {
    fn create(&self, _zone: &ZoneConfig) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(self.0.clone()))
    }
}

/// Registry with the recording provider under zonetype `recording`
pub fn recording_registry(provider: &RecordingProvider) -> Arc<ProviderRegistry> {
    let registry = ProviderRegistry::with_builtins();
    registry.register_provider("recording", Box::new(RecordingFactory(provider.clone())));
    Arc::new(registry)
}

/// Registry whose `memory` zonetype is backed by `store`, pinned to `today`
pub fn memory_registry(store: &MemoryStore, today: NaiveDate) -> Arc<ProviderRegistry> {
    let registry = ProviderRegistry::with_builtins();
    registry.register_provider(
        "memory",
        Box::new(MemoryProviderFactory::new(store.clone()).with_today(today)),
    );
    Arc::new(registry)
}

/// An active inventory entry
pub fn active(dns_name: &str, address: &str) -> StaticAddress {
    StaticAddress {
        dns_name: dns_name.to_string(),
        address: address.parse::<IpAddr>().unwrap(),
        status: "active".to_string(),
    }
}

/// Config with a static inventory and the given zones
pub fn config(addresses: Vec<StaticAddress>, zones: Vec<ZoneConfig>) -> ZonesyncConfig {
    ZonesyncConfig {
        inventory: InventoryConfig::Static { addresses },
        zones,
        ..ZonesyncConfig::default()
    }
}

/// A zone of the given type with TTL 300
pub fn zone(name: &str, zonetype: &str, delete_entries: bool) -> ZoneConfig {
    ZoneConfig::new(name, zonetype)
        .with_ttl(300)
        .with_delete_entries(delete_entries)
}

/// An A record with TTL 300
pub fn a(name: &str, address: &str) -> Record {
    Record::single(name, "A", 300, address)
}

/// A PTR record with TTL 300
pub fn ptr(name: &str, target: &str) -> Record {
    Record::single(name, "PTR", 300, target)
}

/// The date used for serial assertions
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 12, 30).unwrap()
}
