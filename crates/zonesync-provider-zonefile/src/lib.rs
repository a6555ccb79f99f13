// # Zone File Provider
//
// DnsProvider implementation for BIND-style master files.
//
// ## Lifecycle
//
// 1. `import_zone` reads and parses the file, and keeps the parsed copy
// 2. `write_record` / `remove_record` edit that copy in memory
// 3. `save` bumps the SOA serial and writes the file atomically
//
// ## Atomic Save
//
// The rendered zone goes to `<file>.tmp` first. The current file is copied
// to `<file>.backup`, then the temp file is renamed into place. A crash
// leaves either the old or the new zone on disk, never a mix.
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::ProviderRegistry;
//
// let registry = ProviderRegistry::with_builtins();
// zonesync_provider_zonefile::register(&registry);
// ```

pub mod parser;
pub mod zone_file;

pub use parser::ZoneFileParser;
pub use zone_file::{Soa, ZoneEntry, ZoneFile};

use async_trait::async_trait;
use chrono::NaiveDate;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zonesync_core::config::{ZONETYPE_ZONEFILE, ZoneConfig};
use zonesync_core::registry::ProviderRegistry;
use zonesync_core::serial::increment_serial;
use zonesync_core::traits::{DnsProvider, DnsProviderFactory};
use zonesync_core::{Error, Record, Result, Zone};

#[derive(Debug, Default)]
struct State {
    zone: Option<ZoneFile>,
    pending: usize,
}

/// Zone file provider for one zone
#[derive(Debug)]
pub struct ZoneFileProvider {
    path: PathBuf,
    today: Option<NaiveDate>,
    state: Mutex<State>,
}

impl ZoneFileProvider {
    /// Create a provider for the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            today: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Pin the date used by the serial policy
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Path of the managed zone file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self, config: &ZoneConfig) -> Result<ZoneFile> {
        let contents = fs::read_to_string(&self.path).await.map_err(|e| {
            Error::zone_file(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        ZoneFileParser::new(&config.name, config.effective_ttl()).parse(&contents)
    }

    /// Apply `f` to the parsed zone and count it as one staged change
    ///
    /// The file is loaded on first use when the zone was never imported.
    async fn stage(
        &self,
        config: &ZoneConfig,
        f: impl FnOnce(&mut ZoneFile) -> Result<()>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let zone = match state.zone.take() {
            Some(zone) => zone,
            None => self.load(config).await?,
        };
        let zone = state.zone.insert(zone);
        f(zone)?;
        state.pending += 1;
        Ok(())
    }

    async fn write_atomically(&self, contents: &str) -> Result<()> {
        let temp_path = sibling(&self.path, "tmp");
        fs::write(&temp_path, contents).await.map_err(|e| {
            Error::zone_file(format!(
                "Failed to write temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let backup_path = sibling(&self.path, "backup");
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                warn!("Failed to create backup {}: {}", backup_path.display(), e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::zone_file(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })
    }
}

/// `<path>.<suffix>`, keeping any existing extension
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

#[async_trait]
impl DnsProvider for ZoneFileProvider {
    async fn import_zone(&self, config: &ZoneConfig) -> Result<Zone> {
        let parsed = self.load(config).await?;

        let mut zone = Zone::from_config(config);
        for record in parsed.records() {
            zone.add_record(record);
        }

        debug!(
            "Imported {} records for zone {} from {}",
            zone.record_count(),
            config.name,
            self.path.display()
        );

        let mut state = self.state.lock().await;
        state.zone = Some(parsed);
        state.pending = 0;
        Ok(zone)
    }

    async fn write_record(&self, config: &ZoneConfig, record: &Record) -> Result<()> {
        self.stage(config, |zone| {
            zone.add_record(record);
            Ok(())
        })
        .await
    }

    async fn remove_record(&self, config: &ZoneConfig, record: &Record) -> Result<()> {
        self.stage(config, |zone| zone.remove_record(record)).await
    }

    async fn save(&self, config: &ZoneConfig) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.pending == 0 {
            debug!("Nothing staged for zone {}, skipping save", config.name);
            return Ok(());
        }

        let zone = state
            .zone
            .as_ref()
            .ok_or_else(|| Error::zone_file(format!("Zone {} not loaded", config.name)))?;

        let today = self
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let soa = zone.soa()?;
        let serial = increment_serial(soa.serial(), today)?;

        let mut updated = zone.clone();
        updated.set_soa(&soa.with_serial(serial))?;
        self.write_atomically(&updated.render()).await?;

        info!(
            "Wrote {} changes to {} (serial {} -> {})",
            state.pending,
            self.path.display(),
            soa.serial(),
            serial
        );

        state.zone = Some(updated);
        state.pending = 0;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        ZONETYPE_ZONEFILE
    }
}

/// Factory for the `zonefile` zone type
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneFileFactory;

impl DnsProviderFactory for ZoneFileFactory {
    fn create(&self, zone: &ZoneConfig) -> Result<Box<dyn DnsProvider>> {
        let filename = zone
            .filename
            .as_deref()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| Error::config(format!("Zone {} has no filename", zone.name)))?;
        Ok(Box::new(ZoneFileProvider::new(filename)))
    }
}

/// Register the zone file provider
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(ZONETYPE_ZONEFILE, Box::new(ZoneFileFactory));
}
