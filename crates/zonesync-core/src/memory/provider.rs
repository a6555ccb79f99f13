// # Memory Provider
//
// In-memory implementation of DnsProvider.
//
// ## Purpose
//
// Holds zones in a shared map instead of an external back end. Useful for
// tests, for embedding zonesync as a library, and for dry runs against a
// seeded snapshot.
//
// ## Staging
//
// Each zone keeps a committed record list and a working copy. Writes and
// removals touch the working copy only; `save` swaps it in and bumps the
// serial. If the serial policy fails the working copy is kept, so a later
// save can retry with the same changes.

use crate::config::{ZONETYPE_MEMORY, ZoneConfig};
use crate::error::{Error, Result};
use crate::model::{Record, Zone};
use crate::serial::increment_serial;
use crate::traits::{DnsProvider, DnsProviderFactory};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
struct MemoryZone {
    serial: u32,
    committed: Vec<Record>,
    working: Vec<Record>,
    pending: usize,
    saves: usize,
}

/// Shared storage behind every [`MemoryProvider`] created from one factory
///
/// Cloning is cheap; clones see the same zones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, MemoryZone>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a zone's committed contents
    pub async fn seed(&self, zone: &str, serial: u32, records: Vec<Record>) {
        let mut guard = self.inner.write().await;
        guard.insert(
            zone_key(zone),
            MemoryZone {
                serial,
                working: records.clone(),
                committed: records,
                pending: 0,
                saves: 0,
            },
        );
    }

    /// Committed records of a zone
    pub async fn records(&self, zone: &str) -> Vec<Record> {
        let guard = self.inner.read().await;
        guard
            .get(&zone_key(zone))
            .map(|z| z.committed.clone())
            .unwrap_or_default()
    }

    /// Current serial of a zone, if the zone exists
    pub async fn serial(&self, zone: &str) -> Option<u32> {
        let guard = self.inner.read().await;
        guard.get(&zone_key(zone)).map(|z| z.serial)
    }

    /// Number of staged, uncommitted changes in a zone
    pub async fn pending(&self, zone: &str) -> usize {
        let guard = self.inner.read().await;
        guard.get(&zone_key(zone)).map_or(0, |z| z.pending)
    }

    /// Number of successful saves that committed changes
    pub async fn save_count(&self, zone: &str) -> usize {
        let guard = self.inner.read().await;
        guard.get(&zone_key(zone)).map_or(0, |z| z.saves)
    }
}

fn zone_key(zone: &str) -> String {
    zone.trim_end_matches('.').to_ascii_lowercase()
}

/// In-memory DNS provider
///
/// # Example
///
/// ```rust,no_run
/// use zonesync_core::config::ZoneConfig;
/// use zonesync_core::memory::{MemoryProvider, MemoryStore};
/// use zonesync_core::{DnsProvider, Record};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///     let provider = MemoryProvider::new(store.clone());
///     let zone = ZoneConfig::new("example.com", "memory").with_ttl(300);
///
///     provider
///         .write_record(&zone, &Record::single("www.example.com.", "A", 300, "192.0.2.1"))
///         .await?;
///     provider.save(&zone).await?;
///
///     assert_eq!(store.records("example.com").await.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    store: MemoryStore,
    today: Option<NaiveDate>,
}

impl MemoryProvider {
    /// Create a provider backed by `store`
    pub fn new(store: MemoryStore) -> Self {
        Self { store, today: None }
    }

    /// Pin the date used by the serial policy
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    async fn import_zone(&self, zone: &ZoneConfig) -> Result<Zone> {
        let guard = self.store.inner.read().await;
        let mut imported = Zone::from_config(zone);

        if let Some(stored) = guard.get(&zone_key(&zone.name)) {
            for record in &stored.committed {
                imported.add_record(record.clone());
            }
        }

        debug!(
            "Imported {} records for zone {} from memory",
            imported.record_count(),
            zone.name
        );
        Ok(imported)
    }

    async fn write_record(&self, zone: &ZoneConfig, record: &Record) -> Result<()> {
        let mut guard = self.store.inner.write().await;
        let stored = guard.entry(zone_key(&zone.name)).or_default();
        stored.working.push(record.clone());
        stored.pending += 1;
        Ok(())
    }

    async fn remove_record(&self, zone: &ZoneConfig, record: &Record) -> Result<()> {
        let mut guard = self.store.inner.write().await;
        let stored = guard
            .get_mut(&zone_key(&zone.name))
            .ok_or_else(|| Error::not_found(format!("Zone {}", zone.name)))?;

        let position = stored
            .working
            .iter()
            .position(|existing| existing == record)
            .ok_or_else(|| Error::not_found(format!("Record {} in zone {}", record, zone.name)))?;

        stored.working.remove(position);
        stored.pending += 1;
        Ok(())
    }

    async fn save(&self, zone: &ZoneConfig) -> Result<()> {
        let mut guard = self.store.inner.write().await;
        let Some(stored) = guard.get_mut(&zone_key(&zone.name)) else {
            return Ok(());
        };

        if stored.pending == 0 {
            debug!("Nothing staged for zone {}, skipping save", zone.name);
            return Ok(());
        }

        let serial = increment_serial(stored.serial, self.today())?;
        info!(
            "Committing {} changes to zone {} (serial {} -> {})",
            stored.pending, zone.name, stored.serial, serial
        );

        stored.serial = serial;
        stored.committed = stored.working.clone();
        stored.pending = 0;
        stored.saves += 1;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        ZONETYPE_MEMORY
    }
}

/// Factory handing out [`MemoryProvider`]s over one shared store
#[derive(Debug, Clone, Default)]
pub struct MemoryProviderFactory {
    store: MemoryStore,
    today: Option<NaiveDate>,
}

impl MemoryProviderFactory {
    /// Create a factory over `store`
    pub fn new(store: MemoryStore) -> Self {
        Self { store, today: None }
    }

    /// Pin the date used by the serial policy of every created provider
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// The store shared by created providers
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl DnsProviderFactory for MemoryProviderFactory {
    fn create(&self, _zone: &ZoneConfig) -> Result<Box<dyn DnsProvider>> {
        let provider = MemoryProvider {
            store: self.store.clone(),
            today: self.today,
        };
        Ok(Box::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> ZoneConfig {
        ZoneConfig::new("example.com", "memory").with_ttl(300)
    }

    fn a(addr: &str) -> Record {
        Record::single("host.example.com.", "A", 300, addr)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 12, 30).unwrap()
    }

    #[tokio::test]
    async fn test_import_seeded_zone() {
        let store = MemoryStore::new();
        store
            .seed("example.com", 7, vec![a("192.0.2.1"), a("192.0.2.2")])
            .await;

        let provider = MemoryProvider::new(store);
        let imported = provider.import_zone(&zone()).await.unwrap();
        assert_eq!(imported.name(), "example.com");
        assert_eq!(imported.record_count(), 2);
        assert_eq!(imported.default_ttl(), 300);
    }

    #[tokio::test]
    async fn test_changes_are_staged_until_save() {
        let store = MemoryStore::new();
        store.seed("example.com", 7, vec![a("192.0.2.1")]).await;
        let provider = MemoryProvider::new(store.clone()).with_today(today());

        provider.remove_record(&zone(), &a("192.0.2.1")).await.unwrap();
        provider.write_record(&zone(), &a("192.0.2.9")).await.unwrap();
        assert_eq!(store.records("example.com").await, vec![a("192.0.2.1")]);
        assert_eq!(store.pending("example.com").await, 2);

        provider.save(&zone()).await.unwrap();
        assert_eq!(store.records("example.com").await, vec![a("192.0.2.9")]);
        assert_eq!(store.serial("example.com").await, Some(8));
        assert_eq!(store.save_count("example.com").await, 1);
    }

    #[tokio::test]
    async fn test_save_without_changes_keeps_serial() {
        let store = MemoryStore::new();
        store.seed("example.com", 2_022_123_005, Vec::new()).await;
        let provider = MemoryProvider::new(store.clone()).with_today(today());

        provider.save(&zone()).await.unwrap();
        provider.save(&zone()).await.unwrap();
        assert_eq!(store.serial("example.com").await, Some(2_022_123_005));
        assert_eq!(store.save_count("example.com").await, 0);
    }

    #[tokio::test]
    async fn test_serial_regression_keeps_staged_changes() {
        let store = MemoryStore::new();
        store.seed("example.com", 2_022_123_100, Vec::new()).await;
        let provider = MemoryProvider::new(store.clone()).with_today(today());

        provider.write_record(&zone(), &a("192.0.2.1")).await.unwrap();
        let err = provider.save(&zone()).await.unwrap_err();
        assert!(matches!(err, Error::SerialRegression { .. }));
        assert_eq!(store.pending("example.com").await, 1);
        assert!(store.records("example.com").await.is_empty());

        let retry = MemoryProvider::new(store.clone())
            .with_today(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        retry.save(&zone()).await.unwrap();
        assert_eq!(store.serial("example.com").await, Some(2_023_010_200));
        assert_eq!(store.records("example.com").await, vec![a("192.0.2.1")]);
    }

    #[tokio::test]
    async fn test_remove_missing_record_is_not_found() {
        let store = MemoryStore::new();
        store.seed("example.com", 1, vec![a("192.0.2.1")]).await;
        let provider = MemoryProvider::new(store);

        let err = provider
            .remove_record(&zone(), &a("192.0.2.2"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
