//! Configuration types for zonesync
//!
//! This module defines the configuration file schema, config discovery, and
//! the validation that turns a parsed file into a configuration the engine
//! can run with.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Zone type served by the in-memory provider
pub const ZONETYPE_MEMORY: &str = "memory";

/// Zone type served by the zone-file provider
pub const ZONETYPE_ZONEFILE: &str = "zonefile";

/// Zone type served by the managed DNS API provider
pub const ZONETYPE_CLOUDDNS: &str = "clouddns";

/// Directories searched by [`find_config`], in order
pub const DEFAULT_CONFIG_DIRS: &[&str] = &["/usr/local/etc/zonesync", "/etc/zonesync", "."];

/// File extensions searched by [`find_config`], in order
pub const DEFAULT_CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Main zonesync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZonesyncConfig {
    /// Where desired addresses come from
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Values applied to every zone that leaves them unset
    #[serde(default)]
    pub defaults: ZoneDefaults,

    /// Zones under management
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ZonesyncConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration file
    ///
    /// `.yaml` and `.yml` files are read as YAML, `.json` files as JSON.
    /// The result is not validated; call [`ZonesyncConfig::resolve`] next.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let content = std::fs::read_to_string(path)?;
        debug!("Loaded configuration from {}", path.display());

        match extension.as_str() {
            "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
            "json" => Ok(serde_json::from_str(&content)?),
            other => Err(Error::config(format!(
                "Unsupported configuration format {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    /// Apply defaults to every zone, then validate the result
    pub fn resolve(mut self) -> Result<Self> {
        for zone in &mut self.zones {
            zone.apply_defaults(&self.defaults);
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    ///
    /// Expects defaults to have been applied already.
    pub fn validate(&self) -> Result<()> {
        if self.zones.is_empty() {
            return Err(Error::config("No zones configured"));
        }

        let mut seen = HashSet::new();
        for zone in &self.zones {
            zone.validate()?;
            if !seen.insert(zone.name.trim_end_matches('.').to_ascii_lowercase()) {
                return Err(Error::config(format!("Zone {} is configured twice", zone.name)));
            }
        }

        self.inventory.validate()?;
        self.engine.validate()?;

        Ok(())
    }

    /// Look up a zone by name
    pub fn zone(&self, name: &str) -> Option<&ZoneConfig> {
        self.zones.iter().find(|zone| zone.name == name)
    }
}

/// Find the first `<basename>.<ext>` that exists in `dirs`
///
/// Directories are searched in order and, within each directory, extensions
/// in order.
pub fn find_config(basename: &str, dirs: &[&str], extensions: &[&str]) -> Result<PathBuf> {
    for dir in dirs {
        for ext in extensions {
            let candidate = Path::new(dir).join(format!("{}.{}", basename, ext));
            if candidate.is_file() {
                debug!("Found configuration file {}", candidate.display());
                return Ok(candidate);
            }
        }
    }

    Err(Error::config(format!(
        "No {}.{{{}}} found in {}",
        basename,
        extensions.join(","),
        dirs.join(", ")
    )))
}

/// Inventory configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryConfig {
    /// NetBox IPAM
    Netbox {
        /// NetBox host name (e.g., "netbox.example.com")
        host: String,
        /// API token
        token: String,
    },

    /// Fixed list of addresses
    Static {
        /// Inventory entries
        #[serde(default)]
        addresses: Vec<StaticAddress>,
    },

    /// Custom inventory source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl InventoryConfig {
    /// Validate the inventory configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            InventoryConfig::Netbox { host, token } => {
                if host.is_empty() {
                    return Err(Error::config("NetBox host cannot be empty"));
                }
                if token.is_empty() {
                    return Err(Error::config("NetBox token cannot be empty"));
                }
                Ok(())
            }
            InventoryConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(Error::config("Custom inventory factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(Error::config("Custom inventory config cannot be null"));
                }
                Ok(())
            }
            InventoryConfig::Static { .. } => Ok(()),
        }
    }

    /// Get the inventory type name
    pub fn type_name(&self) -> &str {
        match self {
            InventoryConfig::Netbox { .. } => "netbox",
            InventoryConfig::Static { .. } => "static",
            InventoryConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        InventoryConfig::Static {
            addresses: Vec::new(),
        }
    }
}

impl std::fmt::Debug for InventoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventoryConfig::Netbox { host, .. } => f
                .debug_struct("Netbox")
                .field("host", host)
                .field("token", &"<REDACTED>")
                .finish(),
            InventoryConfig::Static { addresses } => f
                .debug_struct("Static")
                .field("addresses", addresses)
                .finish(),
            InventoryConfig::Custom { factory, config } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", config)
                .finish(),
        }
    }
}

/// One entry of a static inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticAddress {
    /// Forward name (e.g., "host.example.com")
    pub dns_name: String,
    /// Address without prefix length
    pub address: IpAddr,
    /// Inventory status; only "active" entries are published
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    crate::model::ACTIVE_STATUS.to_string()
}

/// Defaults applied to zones that leave a field unset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneDefaults {
    /// Provider type
    pub zonetype: Option<String>,
    /// Default TTL in seconds
    pub ttl: Option<u32>,
    /// Managed DNS project
    pub project: Option<String>,
}

/// One managed zone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Zone apex (e.g., "example.com" or "2.0.192.in-addr.arpa")
    pub name: String,

    /// Provider type ("zonefile", "clouddns", "memory", ...)
    #[serde(default)]
    pub zonetype: Option<String>,

    /// Default TTL for records generated from the inventory
    #[serde(default)]
    pub ttl: Option<u32>,

    /// Remove observed records that the inventory does not produce
    #[serde(default)]
    pub delete_entries: bool,

    /// Managed zone identifier (clouddns)
    #[serde(default)]
    pub zonename: Option<String>,

    /// Managed DNS project (clouddns)
    #[serde(default)]
    pub project: Option<String>,

    /// Zone file path (zonefile)
    #[serde(default)]
    pub filename: Option<String>,
}

impl ZoneConfig {
    /// Create a zone configuration with a name and provider type
    pub fn new(name: impl Into<String>, zonetype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            zonetype: Some(zonetype.into()),
            ..Self::default()
        }
    }

    /// Set the default TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Enable or disable removal of unknown records
    pub fn with_delete_entries(mut self, delete_entries: bool) -> Self {
        self.delete_entries = delete_entries;
        self
    }

    /// Set the zone file path
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the managed zone project and identifier
    pub fn with_managed_zone(
        mut self,
        project: impl Into<String>,
        zonename: impl Into<String>,
    ) -> Self {
        self.project = Some(project.into());
        self.zonename = Some(zonename.into());
        self
    }

    /// Provider type, or an empty string when unset
    pub fn zone_type(&self) -> &str {
        self.zonetype.as_deref().unwrap_or_default()
    }

    /// Default TTL, or zero when unset
    pub fn effective_ttl(&self) -> u32 {
        self.ttl.unwrap_or_default()
    }

    /// Fill unset fields from `defaults`
    pub fn apply_defaults(&mut self, defaults: &ZoneDefaults) {
        if self.zonetype.is_none() {
            self.zonetype = defaults.zonetype.clone();
        }
        if self.ttl.is_none() {
            self.ttl = defaults.ttl;
        }
        if self.project.is_none() {
            self.project = defaults.project.clone();
        }
    }

    /// Validate a zone whose defaults have been applied
    pub fn validate(&self) -> Result<()> {
        if self.name.trim_end_matches('.').is_empty() {
            return Err(Error::config("Zone name cannot be empty"));
        }

        if self.effective_ttl() == 0 {
            return Err(Error::config(format!("Zone {} has no TTL", self.name)));
        }

        match self.zone_type() {
            "" => Err(Error::config(format!("Zone {} has no zonetype", self.name))),
            ZONETYPE_CLOUDDNS => {
                if is_blank(&self.zonename) {
                    return Err(Error::config(format!(
                        "Zone {} needs a zonename for clouddns",
                        self.name
                    )));
                }
                if is_blank(&self.project) {
                    return Err(Error::config(format!(
                        "Zone {} needs a project for clouddns",
                        self.name
                    )));
                }
                Ok(())
            }
            ZONETYPE_ZONEFILE => {
                if is_blank(&self.filename) {
                    return Err(Error::config(format!(
                        "Zone {} needs a filename for zonefile",
                        self.name
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Record types the engine is allowed to remove
    ///
    /// Removals of any other type are dropped from the delta, even in zones
    /// with `delete_entries` set. Additions are never filtered.
    #[serde(default = "default_managed_types")]
    pub managed_types: Vec<String>,

    /// Capacity of the sync event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            managed_types: default_managed_types(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_managed_types() -> Vec<String> {
    ["A", "AAAA", "PTR"].iter().map(|t| t.to_string()).collect()
}

fn default_event_channel_capacity() -> usize {
    1000
}
