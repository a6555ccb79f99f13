// # Zone deltas
//
// The output of comparing an observed zone with a desired one, and the
// per-name record-set comparison that produces it.

use super::record::Record;
use serde::Serialize;
use std::collections::BTreeMap;

/// Records to add and remove for one zone
///
/// Both maps are keyed by owner name. A name never maps to an empty
/// sequence, so a zone with nothing to do has two empty maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ZoneDelta {
    zone: String,
    add: BTreeMap<String, Vec<Record>>,
    remove: BTreeMap<String, Vec<Record>>,
}

impl ZoneDelta {
    pub(crate) fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            add: BTreeMap::new(),
            remove: BTreeMap::new(),
        }
    }

    pub(crate) fn push_add(&mut self, name: &str, records: Vec<Record>) {
        if !records.is_empty() {
            self.add.entry(name.to_string()).or_default().extend(records);
        }
    }

    pub(crate) fn push_remove(&mut self, name: &str, records: Vec<Record>) {
        if !records.is_empty() {
            self.remove
                .entry(name.to_string())
                .or_default()
                .extend(records);
        }
    }

    /// Name of the zone this delta applies to
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Records to create, keyed by owner name
    pub fn add(&self) -> &BTreeMap<String, Vec<Record>> {
        &self.add
    }

    /// Records to delete, keyed by owner name
    pub fn remove(&self) -> &BTreeMap<String, Vec<Record>> {
        &self.remove
    }

    /// Iterate over every record to create
    pub fn additions(&self) -> impl Iterator<Item = &Record> {
        self.add.values().flatten()
    }

    /// Iterate over every record to delete
    pub fn removals(&self) -> impl Iterator<Item = &Record> {
        self.remove.values().flatten()
    }

    /// Number of records to create
    pub fn add_count(&self) -> usize {
        self.add.values().map(Vec::len).sum()
    }

    /// Number of records to delete
    pub fn remove_count(&self) -> usize {
        self.remove.values().map(Vec::len).sum()
    }

    /// Whether the zone is already in the desired state
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Compare two record sequences that share an owner name
///
/// Both sides are treated as multisets. Each observed record cancels at
/// most one structurally identical desired record. What is left of
/// `desired` must be added; what is left of `observed` must be removed.
///
/// Returns `(to_add, to_remove)`. A TTL-only change shows up as one removal
/// plus one addition. Sets are small, so the pairwise scan is fine.
pub fn compare_record_sets(observed: &[Record], desired: &[Record]) -> (Vec<Record>, Vec<Record>) {
    let mut matched = vec![false; desired.len()];
    let mut to_remove = Vec::new();

    for record in observed {
        let hit = desired
            .iter()
            .enumerate()
            .position(|(i, wanted)| !matched[i] && record.same_rdata(wanted));

        match hit {
            Some(i) => matched[i] = true,
            None => to_remove.push(record.clone()),
        }
    }

    let to_add = desired
        .iter()
        .zip(&matched)
        .filter(|(_, matched)| !**matched)
        .map(|(record, _)| record.clone())
        .collect();

    (to_add, to_remove)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(addr: &str) -> Record {
        Record::single("host.example.com.", "A", 300, addr)
    }

    #[test]
    fn test_identical_sets_cancel() {
        let set = vec![a("192.0.2.1"), a("192.0.2.2")];
        let (add, remove) = compare_record_sets(&set, &set);
        assert!(add.is_empty());
        assert!(remove.is_empty());
    }

    #[test]
    fn test_order_does_not_matter() {
        let observed = vec![a("192.0.2.1"), a("192.0.2.2")];
        let desired = vec![a("192.0.2.2"), a("192.0.2.1")];
        let (add, remove) = compare_record_sets(&observed, &desired);
        assert!(add.is_empty());
        assert!(remove.is_empty());
    }

    #[test]
    fn test_changed_value() {
        let observed = vec![a("192.0.2.1"), a("192.0.2.2")];
        let desired = vec![a("192.0.2.1"), a("192.0.2.3")];
        let (add, remove) = compare_record_sets(&observed, &desired);
        assert_eq!(add, vec![a("192.0.2.3")]);
        assert_eq!(remove, vec![a("192.0.2.2")]);
    }

    #[test]
    fn test_duplicates_cancel_one_for_one() {
        let observed = vec![a("192.0.2.1"), a("192.0.2.1")];
        let desired = vec![a("192.0.2.1")];
        let (add, remove) = compare_record_sets(&observed, &desired);
        assert!(add.is_empty());
        assert_eq!(remove, vec![a("192.0.2.1")]);

        let (add, remove) = compare_record_sets(&desired, &observed);
        assert_eq!(add, vec![a("192.0.2.1")]);
        assert!(remove.is_empty());
    }

    #[test]
    fn test_empty_pushes_are_ignored() {
        let mut delta = ZoneDelta::new("example.com");
        delta.push_add("host.example.com.", Vec::new());
        delta.push_remove("host.example.com.", Vec::new());
        assert!(delta.is_empty());
        assert_eq!(delta.zone(), "example.com");
    }
}
