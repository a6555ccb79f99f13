// # ZoneSet
//
// The collection of zones one sync run works on. A ZoneSet is built twice
// per run, once from the providers (observed) and once from the inventory
// (desired), and thrown away after the two are compared.
//
// Zones are also kept in a second view ordered by name length, longest
// first. Routing walks that view, so a record always lands in the most
// specific zone that covers it.

use super::delta::ZoneDelta;
use super::record::Record;
use super::zone::Zone;
use crate::config::ZoneConfig;
use crate::error::{Error, Result};
use crate::reverse::reverse_name;
use crate::traits::InventoryAddress;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Inventory status that marks an address as published in DNS
pub const ACTIVE_STATUS: &str = "active";

/// Outcome of feeding inventory addresses into a [`ZoneSet`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryStats {
    /// Forward (A/AAAA) records routed into a zone
    pub forward: usize,
    /// Reverse (PTR) records routed into a zone
    pub reverse: usize,
    /// Entries ignored because they are inactive or have no DNS name
    pub skipped: usize,
    /// Reverse names for which no zone is configured
    pub unrouted_reverse: Vec<String>,
}

/// Zones keyed by name, plus a longest-name-first routing order
#[derive(Debug, Clone, Default)]
pub struct ZoneSet {
    zones: HashMap<String, Zone>,
    by_length: Vec<String>,
}

impl ZoneSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set holding one empty zone per configuration entry
    pub fn from_configs<'a>(configs: impl IntoIterator<Item = &'a ZoneConfig>) -> Self {
        let mut set = Self::new();
        for config in configs {
            set.add_zone(Zone::from_config(config));
        }
        set
    }

    /// Insert a zone, replacing any zone with the same name
    pub fn add_zone(&mut self, zone: Zone) {
        self.zones.insert(zone.name().to_string(), zone);
        self.sort_zones();
    }

    fn sort_zones(&mut self) {
        let mut names: Vec<String> = self.zones.keys().cloned().collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        self.by_length = names;
    }

    /// Look up a zone by name
    pub fn get(&self, name: &str) -> Option<&Zone> {
        self.zones.get(name)
    }

    /// Number of zones
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Whether the set holds no zones
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Zone names in routing order (longest first)
    pub fn routing_order(&self) -> &[String] {
        &self.by_length
    }

    /// Zones in routing order (longest name first)
    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.by_length.iter().filter_map(|name| self.zones.get(name))
    }

    /// Find the zone that owns `record_name`
    ///
    /// Returns the zone with the longest name that covers the record, or
    /// [`Error::NoMatchingZone`] if none does.
    pub fn route(&self, record_name: &str) -> Result<&Zone> {
        self.iter()
            .find(|zone| zone.contains_name(record_name))
            .ok_or_else(|| Error::no_matching_zone(record_name))
    }

    /// Route a record to its owning zone and add it there
    ///
    /// Returns the name of the zone that received the record.
    pub fn add_record(&mut self, record: Record) -> Result<String> {
        let owner = self.route(record.name())?.name().to_string();
        if let Some(zone) = self.zones.get_mut(&owner) {
            zone.add_record(record);
        }
        Ok(owner)
    }

    /// Build desired records from inventory addresses
    ///
    /// Every active entry with a DNS name yields one forward record (A or
    /// AAAA) and one PTR record. A forward record without an owning zone is a
    /// configuration error and aborts the whole batch. A PTR record without an
    /// owning zone is logged and reported in
    /// [`InventoryStats::unrouted_reverse`].
    pub fn add_addresses(&mut self, addresses: &[InventoryAddress]) -> Result<InventoryStats> {
        let mut stats = InventoryStats::default();

        for entry in addresses {
            if !entry.is_active() {
                stats.skipped += 1;
                continue;
            }

            // Providers hand back owner names lowercased
            let target = format!(
                "{}.",
                entry.dns_name.trim_end_matches('.').to_ascii_lowercase()
            );
            let forward_type = if entry.address.is_ipv4() { "A" } else { "AAAA" };

            let forward = Record::single(&target, forward_type, 0, entry.address.to_string());
            if let Err(e) = self.add_record(forward) {
                warn!("Unable to add forward record for {}: {}", entry.dns_name, e);
                return Err(e);
            }
            stats.forward += 1;

            let reverse = Record::single(reverse_name(entry.address), "PTR", 0, &target);
            match self.add_record(reverse) {
                Ok(_) => stats.reverse += 1,
                Err(Error::NoMatchingZone { record }) => {
                    warn!("No reverse zone for {} ({})", record, entry.dns_name);
                    stats.unrouted_reverse.push(record);
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            "Inventory routed: {} forward, {} reverse, {} skipped, {} unrouted reverse",
            stats.forward,
            stats.reverse,
            stats.skipped,
            stats.unrouted_reverse.len()
        );

        Ok(stats)
    }

    /// Compare `self` (observed) with `desired`
    ///
    /// Returns one delta per zone present on both sides, ordered by zone
    /// name. Zones present on only one side are logged and skipped: there is
    /// nothing to reconcile them against.
    pub fn compare(&self, desired: &ZoneSet) -> Vec<ZoneDelta> {
        let names: BTreeSet<&String> = self.zones.keys().chain(desired.zones.keys()).collect();
        let mut deltas = Vec::new();

        for name in names {
            match (self.zones.get(name), desired.zones.get(name)) {
                (Some(observed), Some(wanted)) => deltas.push(observed.compare(wanted)),
                (None, Some(_)) => info!("Zone {} exists only in the desired state", name),
                (Some(_), None) => info!("Zone {} exists only in the observed state", name),
                (None, None) => {}
            }
        }

        deltas
    }

    /// Names of zones present in `self` but not in `other`, sorted
    pub fn names_missing_from(&self, other: &ZoneSet) -> Vec<String> {
        let mut names: Vec<String> = self
            .zones
            .keys()
            .filter(|name| !other.zones.contains_key(*name))
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn zones(names: &[&str]) -> ZoneSet {
        let mut set = ZoneSet::new();
        for name in names {
            set.add_zone(Zone::new(*name, 300, true));
        }
        set
    }

    fn addr(dns_name: &str, address: &str, status: &str) -> InventoryAddress {
        InventoryAddress {
            dns_name: dns_name.to_string(),
            address: address.parse::<IpAddr>().unwrap(),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_zones_sorted_by_length() {
        let set = zones(&["bb.com", "a.com", "ccc.com"]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.routing_order(), ["ccc.com", "bb.com", "a.com"]);
    }

    #[test]
    fn test_add_zone_overwrites() {
        let mut set = zones(&["example.com"]);
        set.add_zone(Zone::new("example.com", 60, false));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("example.com").unwrap().default_ttl(), 60);
        assert_eq!(set.routing_order().len(), 1);
    }

    #[test]
    fn test_route_prefers_longest_suffix() {
        let set = zones(&["example.com", "corp.example.com"]);
        assert_eq!(
            set.route("host.corp.example.com.").unwrap().name(),
            "corp.example.com"
        );
        assert_eq!(set.route("host.example.com.").unwrap().name(), "example.com");
        assert!(set.route("host.other.com.").unwrap_err().is_no_matching_zone());
    }

    #[test]
    fn test_add_addresses_builds_forward_and_reverse() {
        let mut set = zones(&["example.com", "2.0.192.in-addr.arpa"]);
        let stats = set
            .add_addresses(&[
                addr("host.example.com", "192.0.2.10", "active"),
                addr("", "192.0.2.11", "active"),
                addr("old.example.com", "192.0.2.12", "deprecated"),
            ])
            .unwrap();

        assert_eq!(stats.forward, 1);
        assert_eq!(stats.reverse, 1);
        assert_eq!(stats.skipped, 2);

        let forward = set.get("example.com").unwrap();
        let record = &forward.records_named("host.example.com.")[0];
        assert_eq!(record.record_type(), "A");
        assert_eq!(record.ttl(), 300);
        assert_eq!(record.data(), ["192.0.2.10"]);

        let reverse = set.get("2.0.192.in-addr.arpa").unwrap();
        let ptr = &reverse.records_named("10.2.0.192.in-addr.arpa.")[0];
        assert_eq!(ptr.record_type(), "PTR");
        assert_eq!(ptr.data(), ["host.example.com."]);
    }

    #[test]
    fn test_add_addresses_lowercases_names() {
        let mut set = zones(&["example.com", "2.0.192.in-addr.arpa"]);
        set.add_addresses(&[addr("Web.Example.COM", "192.0.2.20", "active")])
            .unwrap();

        let forward = set.get("example.com").unwrap();
        assert_eq!(forward.records_named("web.example.com.").len(), 1);
        assert!(forward.records_named("Web.Example.COM.").is_empty());

        let reverse = set.get("2.0.192.in-addr.arpa").unwrap();
        let ptr = &reverse.records_named("20.2.0.192.in-addr.arpa.")[0];
        assert_eq!(ptr.data(), ["web.example.com."]);

        let mut observed = zones(&["example.com", "2.0.192.in-addr.arpa"]);
        observed
            .add_addresses(&[addr("web.example.com", "192.0.2.20", "active")])
            .unwrap();
        assert!(observed.compare(&set).iter().all(|delta| delta.is_empty()));
    }

    #[test]
    fn test_add_addresses_ipv6_is_aaaa() {
        let mut set = zones(&["example.com"]);
        let stats = set
            .add_addresses(&[addr("v6.example.com", "2001:db8::1", "active")])
            .unwrap();
        let record = &set.get("example.com").unwrap().records_named("v6.example.com.")[0];
        assert_eq!(record.record_type(), "AAAA");
        assert_eq!(stats.unrouted_reverse.len(), 1);
        assert!(stats.unrouted_reverse[0].ends_with(".ip6.arpa."));
    }

    #[test]
    fn test_add_addresses_unrouted_forward_fails() {
        let mut set = zones(&["example.com"]);
        let err = set
            .add_addresses(&[addr("host.other.org", "192.0.2.1", "active")])
            .unwrap_err();
        assert!(err.is_no_matching_zone());
    }

    #[test]
    fn test_compare_skips_one_sided_zones() {
        let observed = zones(&["example.com", "old.example.net"]);
        let desired = zones(&["example.com", "new.example.org"]);
        let deltas = observed.compare(&desired);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].zone(), "example.com");
        assert_eq!(observed.names_missing_from(&desired), ["old.example.net"]);
        assert_eq!(desired.names_missing_from(&observed), ["new.example.org"]);
    }
}
