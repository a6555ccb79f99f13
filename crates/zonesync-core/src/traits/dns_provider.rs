// # DNS Provider Trait
//
// Defines the interface every zone back end implements.
//
// ## Implementations
//
// - In-memory: `zonesync_core::memory::MemoryProvider`
// - Zone files: `zonesync-provider-zonefile` crate
// - Google Cloud DNS: `zonesync-provider-clouddns` crate
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::{DnsProvider, Record};
//
// async fn add_host(provider: &dyn DnsProvider, zone: &ZoneConfig) -> zonesync_core::Result<()> {
//     let observed = provider.import_zone(zone).await?;
//     println!("{} records in {}", observed.record_count(), observed.name());
//
//     provider
//         .write_record(zone, &Record::single("host.example.com.", "A", 300, "192.0.2.1"))
//         .await?;
//
//     // Nothing is durable until save
//     provider.save(zone).await
// }
// ```

use crate::config::ZoneConfig;
use crate::error::Result;
use crate::model::{Record, Zone};
use async_trait::async_trait;

/// Trait for DNS provider implementations
///
/// A provider instance is created for one zone and lives for one sync run.
/// Writes and removals are staged; [`DnsProvider::save`] commits them.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks. All
/// methods take `&self`; staged changes live behind interior mutability.
///
/// # Contract
///
/// - No retries and no internal timeouts beyond a transport timeout. A
///   failed call is returned to the engine, which stops that zone.
/// - `save` bumps the zone serial (see [`crate::serial`]) exactly once if
///   and only if something was staged since the last save. If the serial
///   policy fails, staged changes stay staged.
/// - Providers never decide what to change; they apply what they are given.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Read every record currently stored for a zone
    ///
    /// Record names in the returned zone are fully qualified.
    async fn import_zone(&self, zone: &ZoneConfig) -> Result<Zone>;

    /// Stage a record addition
    async fn write_record(&self, zone: &ZoneConfig, record: &Record) -> Result<()>;

    /// Stage a record removal
    async fn remove_record(&self, zone: &ZoneConfig, record: &Record) -> Result<()>;

    /// Commit staged changes
    async fn save(&self, zone: &ZoneConfig) -> Result<()>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a provider instance for one zone
    fn create(&self, zone: &ZoneConfig) -> Result<Box<dyn DnsProvider>>;
}
