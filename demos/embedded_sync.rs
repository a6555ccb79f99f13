//! Minimal embedding example for zonesync-core
//!
//! An application supplies its own inventory, keeps zones in the in-memory
//! provider, and drives a diff followed by a push. Nothing touches the
//! network or the filesystem.

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use zonesync_core::config::{InventoryConfig, ZONETYPE_MEMORY};
use zonesync_core::memory::{MemoryProviderFactory, MemoryStore};
use zonesync_core::traits::{InventoryAddress, InventorySource, InventorySourceFactory};
use zonesync_core::{
    ProviderRegistry, Record, Result, SyncEngine, SyncMode, SyncReport, ZoneConfig, ZonesyncConfig,
};

/// Inventory read from the application's own data
struct LabInventory {
    hosts: Vec<(String, IpAddr)>,
}

#[async_trait]
impl InventorySource for LabInventory {
    async fn list_addresses(&self) -> Result<Vec<InventoryAddress>> {
        Ok(self
            .hosts
            .iter()
            .map(|(name, ip)| InventoryAddress::new(name, *ip, "active"))
            .collect())
    }

    fn source_name(&self) -> &'static str {
        "lab"
    }
}

struct LabInventoryFactory;

impl InventorySourceFactory for LabInventoryFactory {
    fn create(&self, config: &InventoryConfig) -> Result<Box<dyn InventorySource>> {
        let InventoryConfig::Custom { config, .. } = config else {
            return Err(zonesync_core::Error::config("lab inventory needs a custom config"));
        };

        let hosts = config
            .as_object()
            .map(|hosts| {
                hosts
                    .iter()
                    .filter_map(|(name, ip)| Some((name.clone(), ip.as_str()?.parse().ok()?)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Box::new(LabInventory { hosts }))
    }
}

fn print_report(report: &SyncReport) {
    for zone in &report.zones {
        for record in &zone.removed {
            println!("  - {}", record);
        }
        for record in &zone.added {
            println!("  + {}", record);
        }
    }
    println!(
        "  {} complete: {} removals, {} additions",
        report.mode,
        report.remove_count(),
        report.add_count()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::WARN)
        .init();

    println!("=== Embedded zonesync-core Example ===\n");

    // Zones start with one stale record
    let store = MemoryStore::new();
    store
        .seed(
            "lab.example.com",
            1,
            vec![Record::single("old.lab.example.com.", "A", 300, "10.0.0.99")],
        )
        .await;
    store.seed("0.0.10.in-addr.arpa", 1, Vec::new()).await;

    let registry = ProviderRegistry::new();
    registry.register_provider(ZONETYPE_MEMORY, Box::new(MemoryProviderFactory::new(store.clone())));
    registry.register_inventory("lab", Box::new(LabInventoryFactory));

    let mut config = ZonesyncConfig::new();
    config.inventory = InventoryConfig::Custom {
        factory: "lab".to_string(),
        config: serde_json::json!({
            "web.lab.example.com": "10.0.0.10",
            "db.lab.example.com": "10.0.0.11",
        }),
    };
    config.zones = vec![
        ZoneConfig::new("lab.example.com", ZONETYPE_MEMORY)
            .with_ttl(300)
            .with_delete_entries(true),
        ZoneConfig::new("0.0.10.in-addr.arpa", ZONETYPE_MEMORY).with_ttl(300),
    ];

    println!("1. Creating engine...");
    let (engine, mut events) = SyncEngine::new(Arc::new(registry), config)?;

    let listener = tokio::spawn(async move {
        let mut count = 0;
        while events.recv().await.is_some() {
            count += 1;
        }
        count
    });

    println!("2. Diff:");
    print_report(&engine.run(SyncMode::Diff).await?);

    println!("\n3. Push:");
    print_report(&engine.run(SyncMode::Push).await?);

    println!("\n4. Diff after push:");
    print_report(&engine.run(SyncMode::Diff).await?);

    println!("\n5. Zone contents:");
    for zone in ["lab.example.com", "0.0.10.in-addr.arpa"] {
        println!(
            "  {} (serial {})",
            zone,
            store.serial(zone).await.unwrap_or_default()
        );
        for record in store.records(zone).await {
            println!("    {}", record);
        }
    }

    drop(engine);
    let events_seen = listener.await.unwrap_or_default();
    println!("\n{} sync events observed", events_seen);

    Ok(())
}
