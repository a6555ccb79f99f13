// # Record
//
// One DNS resource record as zonesync sees it: owner name, type mnemonic,
// TTL, and one or more textual data values.
//
// Records are value objects. Once built they are only copied, never edited;
// `with_ttl` returns a new record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single DNS resource record
///
/// `name` is fully qualified and ends with a dot. A `ttl` of zero means
/// "use the zone default" and is rewritten when the record is added to a
/// [`Zone`](super::Zone).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    ttl: u32,
    data: Vec<String>,
}

impl Record {
    /// Create a new record
    ///
    /// The type mnemonic is upper-cased so "ptr" and "PTR" compare equal.
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        ttl: u32,
        data: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into().to_ascii_uppercase(),
            ttl,
            data,
        }
    }

    /// Create a record holding exactly one data value
    pub fn single(
        name: impl Into<String>,
        record_type: impl Into<String>,
        ttl: u32,
        value: impl Into<String>,
    ) -> Self {
        Self::new(name, record_type, ttl, vec![value.into()])
    }

    /// Fully-qualified owner name (with trailing dot)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owner name without the trailing dot
    pub fn name_no_dot(&self) -> &str {
        self.name.trim_end_matches('.')
    }

    /// Record type mnemonic ("A", "AAAA", "PTR", ...)
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// TTL in seconds (0 = inherit zone default)
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Ordered data values
    pub fn data(&self) -> &[String] {
        &self.data
    }

    /// Copy of this record with a different TTL
    pub fn with_ttl(&self, ttl: u32) -> Self {
        Self {
            ttl,
            ..self.clone()
        }
    }

    /// Whether this record has one of the given types
    pub fn is_type_in(&self, types: &[String]) -> bool {
        types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&self.record_type))
    }

    /// Field-wise comparison of everything except the owner name
    ///
    /// Records are grouped by name before they are compared, so the name is
    /// implied. Two records match only if type, TTL, and every data value (in
    /// order) are identical.
    pub fn same_rdata(&self, other: &Record) -> bool {
        self.record_type == other.record_type && self.ttl == other.ttl && self.data == other.data
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} [{}]",
            self.name,
            self.record_type,
            self.ttl,
            self.data.join(" ")
        )
    }
}
