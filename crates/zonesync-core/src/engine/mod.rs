//! Zone sync engine
//!
//! The SyncEngine is responsible for:
//! - Importing the observed state of every configured zone
//! - Building the desired state from the inventory
//! - Comparing the two and filtering removals to managed record types
//! - Applying the delta through each zone's provider (push mode)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   import    ┌──────────────┐
//! │ DnsProvider  │────────────▶│  observed    │──┐
//! │ (per zone)   │             │  ZoneSet     │  │
//! └──────────────┘             └──────────────┘  │ compare
//!        ▲                                       ▼
//!        │ remove / write / save        ┌────────────────┐
//!        └──────────────────────────────│  ZoneDelta     │
//!                                       │  (per zone)    │
//! ┌──────────────┐  add_addresses       └────────────────┘
//! │ Inventory    │──────────────▶┌──────────────┐ ▲
//! │ Source       │               │  desired     │─┘
//! └──────────────┘               │  ZoneSet     │
//!                                └──────────────┘
//! ```
//!
//! ## Apply order
//!
//! Zones are processed one at a time, sorted by name. Within a zone all
//! removals go first, then all additions, then a single save. The first
//! provider error stops that zone; the engine moves on to the next one.

use crate::config::{ZoneConfig, ZonesyncConfig};
use crate::error::Result;
use crate::model::{Record, ZoneDelta, ZoneSet};
use crate::registry::ProviderRegistry;
use crate::traits::DnsProvider;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What a sync run does with the computed delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Compute and report only
    Diff,
    /// Compute, then apply through the providers
    Push,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Diff => write!(f, "diff"),
            SyncMode::Push => write!(f, "push"),
        }
    }
}

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Run started
    Started { mode: SyncMode, zones: usize },

    /// Observed state of a zone was read
    ZoneImported { zone: String, records: usize },

    /// Zone was imported but has no desired counterpart
    ZoneOnlyObserved { zone: String },

    /// Zone has desired records but was not imported
    ZoneOnlyDesired { zone: String },

    /// A removal was staged with the provider
    RecordRemoved { zone: String, record: Record },

    /// An addition was staged with the provider
    RecordAdded { zone: String, record: Record },

    /// Staged changes were committed
    ZoneSaved { zone: String, changes: usize },

    /// A provider call failed; the zone was left as is from that point on
    ZoneFailed { zone: String, error: String },

    /// Run finished
    Finished {
        added: usize,
        removed: usize,
        failed: usize,
    },
}

/// Outcome for one zone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ZoneReport {
    /// Zone name
    pub zone: String,
    /// Records to add (push mode: planned additions)
    pub added: Vec<Record>,
    /// Records to remove, after the managed-type filter
    pub removed: Vec<Record>,
    /// Provider calls that succeeded (push mode)
    pub applied: usize,
    /// Whether the provider committed the changes
    pub saved: bool,
    /// First provider error for this zone
    pub error: Option<String>,
}

impl ZoneReport {
    fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            ..Self::default()
        }
    }

    /// Whether there is nothing to change in this zone
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Number of planned changes
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}

/// Result of a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Mode the run was executed in
    pub mode: SyncMode,
    /// One entry per zone, sorted by zone name
    pub zones: Vec<ZoneReport>,
    /// PTR names for which no reverse zone is configured
    pub unrouted_reverse: Vec<String>,
}

impl SyncReport {
    /// Total number of additions across zones
    pub fn add_count(&self) -> usize {
        self.zones.iter().map(|z| z.added.len()).sum()
    }

    /// Total number of removals across zones
    pub fn remove_count(&self) -> usize {
        self.zones.iter().map(|z| z.removed.len()).sum()
    }

    /// Whether any zone reported an error
    pub fn has_failures(&self) -> bool {
        self.zones.iter().any(|z| z.error.is_some())
    }

    /// Look up the report for one zone
    pub fn zone(&self, name: &str) -> Option<&ZoneReport> {
        self.zones.iter().find(|z| z.zone == name)
    }
}

/// Core sync engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Call [`SyncEngine::run()`] once per sync
/// 3. Drain the event receiver if you care about progress
///
/// Every run builds its zone sets from scratch; nothing is carried over
/// between runs.
pub struct SyncEngine {
    /// Provider and inventory factories
    registry: Arc<ProviderRegistry>,

    /// Resolved configuration
    config: ZonesyncConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// The configuration is resolved (defaults applied, then validated)
    /// before the engine is built.
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields sync events
    pub fn new(
        registry: Arc<ProviderRegistry>,
        config: ZonesyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        let config = config.resolve()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            registry,
            config,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The resolved configuration
    pub fn config(&self) -> &ZonesyncConfig {
        &self.config
    }

    /// Run one sync
    ///
    /// # Returns
    ///
    /// - `Ok(SyncReport)`: the run completed; individual zones may still
    ///   have failed (see [`SyncReport::has_failures`])
    /// - `Err(Error)`: the run could not start or the desired state could not
    ///   be built (unknown zonetype, inventory failure, unroutable forward
    ///   record)
    pub async fn run(&self, mode: SyncMode) -> Result<SyncReport> {
        let mut zones: Vec<&ZoneConfig> = self.config.zones.iter().collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));

        self.emit_event(SyncEvent::Started {
            mode,
            zones: zones.len(),
        });
        info!("Starting {} of {} zones", mode, zones.len());

        let mut providers: BTreeMap<String, (&ZoneConfig, Box<dyn DnsProvider>)> = BTreeMap::new();
        for zone in &zones {
            let provider = self.registry.create_provider(zone)?;
            providers.insert(zone.name.trim_end_matches('.').to_string(), (*zone, provider));
        }

        let mut reports: BTreeMap<String, ZoneReport> = BTreeMap::new();

        // 1. Observed state
        let mut observed = ZoneSet::new();
        for (name, (zone, provider)) in &providers {
            match provider.import_zone(zone).await {
                Ok(imported) => {
                    debug!(
                        "Imported {} records for {} via {}",
                        imported.record_count(),
                        name,
                        provider.provider_name()
                    );
                    self.emit_event(SyncEvent::ZoneImported {
                        zone: name.clone(),
                        records: imported.record_count(),
                    });
                    observed.add_zone(imported);
                }
                Err(e) => {
                    error!("Failed to import zone {}: {}", name, e);
                    let mut report = ZoneReport::new(name);
                    self.fail_zone(&mut report, e.to_string());
                    reports.insert(name.clone(), report);
                }
            }
        }

        // 2. Desired state
        let mut desired = ZoneSet::from_configs(zones.iter().copied());
        let inventory = self.registry.create_inventory(&self.config.inventory)?;
        let addresses = inventory.list_addresses().await?;
        info!(
            "Fetched {} addresses from {} inventory",
            addresses.len(),
            inventory.source_name()
        );
        let stats = desired.add_addresses(&addresses)?;

        for zone in observed.names_missing_from(&desired) {
            warn!("Zone {} was imported but is not configured", zone);
            self.emit_event(SyncEvent::ZoneOnlyObserved { zone });
        }
        for zone in desired.names_missing_from(&observed) {
            if !reports.contains_key(&zone) {
                warn!("Zone {} has no observed state", zone);
                self.emit_event(SyncEvent::ZoneOnlyDesired { zone });
            }
        }

        // 3. Compare
        for delta in observed.compare(&desired) {
            let report = self.plan_zone(&delta);
            reports.insert(report.zone.clone(), report);
        }

        // 4. Apply
        if mode == SyncMode::Push {
            for (name, report) in reports.iter_mut() {
                if report.error.is_some() || report.is_empty() {
                    continue;
                }
                if let Some((zone, provider)) = providers.get(name) {
                    self.apply_zone(zone, provider.as_ref(), report).await;
                }
            }
        }

        let report = SyncReport {
            mode,
            zones: reports.into_values().collect(),
            unrouted_reverse: stats.unrouted_reverse,
        };

        let failed = report.zones.iter().filter(|z| z.error.is_some()).count();
        info!(
            "Finished {}: {} to add, {} to remove, {} failed zones",
            mode,
            report.add_count(),
            report.remove_count(),
            failed
        );
        self.emit_event(SyncEvent::Finished {
            added: report.add_count(),
            removed: report.remove_count(),
            failed,
        });

        Ok(report)
    }

    /// Turn a delta into a report, dropping removals of unmanaged types
    fn plan_zone(&self, delta: &ZoneDelta) -> ZoneReport {
        let managed = &self.config.engine.managed_types;
        let mut report = ZoneReport::new(delta.zone());

        report.added = delta.additions().cloned().collect();

        for record in delta.removals() {
            if record.is_type_in(managed) {
                report.removed.push(record.clone());
            } else {
                debug!("Keeping unmanaged record {}", record);
            }
        }

        debug!(
            "Zone {}: {} to add, {} to remove",
            report.zone,
            report.added.len(),
            report.removed.len()
        );
        report
    }

    /// Apply one zone's changes: removals, additions, then one save
    async fn apply_zone(&self, zone: &ZoneConfig, provider: &dyn DnsProvider, report: &mut ZoneReport) {
        let removed = report.removed.clone();
        let added = report.added.clone();

        for record in &removed {
            if let Err(e) = provider.remove_record(zone, record).await {
                error!("Failed to remove {} from {}: {}", record, report.zone, e);
                self.fail_zone(report, e.to_string());
                return;
            }
            report.applied += 1;
            self.emit_event(SyncEvent::RecordRemoved {
                zone: report.zone.clone(),
                record: record.clone(),
            });
        }

        for record in &added {
            if let Err(e) = provider.write_record(zone, record).await {
                error!("Failed to add {} to {}: {}", record, report.zone, e);
                self.fail_zone(report, e.to_string());
                return;
            }
            report.applied += 1;
            self.emit_event(SyncEvent::RecordAdded {
                zone: report.zone.clone(),
                record: record.clone(),
            });
        }

        if report.applied == 0 {
            return;
        }

        match provider.save(zone).await {
            Ok(()) => {
                info!("Saved {} changes to {}", report.applied, report.zone);
                report.saved = true;
                self.emit_event(SyncEvent::ZoneSaved {
                    zone: report.zone.clone(),
                    changes: report.applied,
                });
            }
            Err(e) => {
                error!("Failed to save {}: {}", report.zone, e);
                self.fail_zone(report, e.to_string());
            }
        }
    }

    fn fail_zone(&self, report: &mut ZoneReport, error: String) {
        self.emit_event(SyncEvent::ZoneFailed {
            zone: report.zone.clone(),
            error: error.clone(),
        });
        report.error = Some(error);
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, event discarded");
            }
        }
    }
}
