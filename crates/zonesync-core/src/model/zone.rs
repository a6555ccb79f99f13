// # Zone
//
// One DNS zone under management: its apex name, default TTL, the
// delete-protection flag, and the records it holds keyed by owner name.

use super::delta::{ZoneDelta, compare_record_sets};
use super::record::Record;
use crate::config::ZoneConfig;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A DNS zone and its records
///
/// Records are stored per owner name. Several records may share a name
/// (one per data value, or distinct TTLs left behind by a provider), so each
/// name maps to a sequence. The order inside a sequence is preserved for
/// output but never affects comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Zone {
    name: String,
    default_ttl: u32,
    delete_entries: bool,
    records: BTreeMap<String, Vec<Record>>,
}

impl Zone {
    /// Create an empty zone
    ///
    /// A trailing dot on `name` is dropped; the logical zone name never
    /// carries one.
    pub fn new(name: impl Into<String>, default_ttl: u32, delete_entries: bool) -> Self {
        let name = name.into();
        Self {
            name: name.trim_end_matches('.').to_string(),
            default_ttl,
            delete_entries,
            records: BTreeMap::new(),
        }
    }

    /// Create an empty zone from its configuration entry
    pub fn from_config(config: &ZoneConfig) -> Self {
        Self::new(&config.name, config.effective_ttl(), config.delete_entries)
    }

    /// Zone apex without trailing dot
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zone apex with trailing dot
    pub fn fqdn(&self) -> String {
        format!("{}.", self.name)
    }

    /// TTL given to records added with a TTL of zero
    pub fn default_ttl(&self) -> u32 {
        self.default_ttl
    }

    /// Whether records missing from the desired state may be removed
    pub fn delete_entries(&self) -> bool {
        self.delete_entries
    }

    /// All records keyed by owner name
    pub fn records(&self) -> &BTreeMap<String, Vec<Record>> {
        &self.records
    }

    /// Records stored under one owner name
    pub fn records_named(&self, name: &str) -> &[Record] {
        self.records.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate over every record in the zone
    pub fn iter_records(&self) -> impl Iterator<Item = &Record> {
        self.records.values().flatten()
    }

    /// Total number of records
    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// Whether the zone holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add a record under its owner name
    ///
    /// A TTL of zero is replaced by the zone's default TTL.
    pub fn add_record(&mut self, record: Record) {
        let record = if record.ttl() == 0 {
            record.with_ttl(self.default_ttl)
        } else {
            record
        };

        self.records
            .entry(record.name().to_string())
            .or_default()
            .push(record);
    }

    /// Whether `record_name` lies inside this zone
    ///
    /// The zone apex followed by a dot must be a suffix of the record name
    /// and must start on a label boundary, so "notexample.com." is not inside
    /// "example.com". Comparison is ASCII case-insensitive.
    pub fn contains_name(&self, record_name: &str) -> bool {
        let apex = self.fqdn().to_ascii_lowercase();
        let record_name = record_name.to_ascii_lowercase();

        match record_name.strip_suffix(apex.as_str()) {
            Some(prefix) => prefix.is_empty() || prefix.ends_with('.'),
            None => false,
        }
    }

    /// Compute the changes that turn `self` (observed) into `desired`
    ///
    /// - names only in `desired` are added in full
    /// - names only in `self` are removed in full, but only when
    ///   `self.delete_entries()` is set
    /// - names on both sides go through [`compare_record_sets`]
    pub fn compare(&self, desired: &Zone) -> ZoneDelta {
        let mut delta = ZoneDelta::new(&self.name);

        let names: BTreeSet<&String> = self.records.keys().chain(desired.records.keys()).collect();

        for name in names {
            match (self.records.get(name), desired.records.get(name)) {
                (None, Some(wanted)) => delta.push_add(name, wanted.clone()),
                (Some(existing), None) => {
                    if self.delete_entries {
                        delta.push_remove(name, existing.clone());
                    }
                }
                (Some(existing), Some(wanted)) => {
                    let (to_add, to_remove) = compare_record_sets(existing, wanted);
                    delta.push_add(name, to_add);
                    delta.push_remove(name, to_remove);
                }
                (None, None) => {}
            }
        }

        delta
    }
}
