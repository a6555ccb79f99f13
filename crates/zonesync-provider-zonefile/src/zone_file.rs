// # Zone file model
//
// A parsed master file kept as a flat list of entries, one per resource
// record. Owner names and domain-name RDATA are stored fully qualified so
// entries can be compared with imported records directly.

use zonesync_core::{Error, Record, Result};

/// One resource record line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneEntry {
    /// Fully-qualified owner name
    pub name: String,
    /// TTL in seconds
    pub ttl: u32,
    /// Class mnemonic ("IN")
    pub class: String,
    /// Type mnemonic, upper case
    pub rtype: String,
    /// RDATA as written, with domain names qualified
    pub rdata: String,
}

impl ZoneEntry {
    /// The entry as a single-valued record
    pub fn to_record(&self) -> Record {
        Record::single(&self.name, &self.rtype, self.ttl, &self.rdata)
    }

    fn matches(&self, name: &str, rtype: &str, ttl: u32, rdata: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            && self.rtype == rtype
            && self.ttl == ttl
            && self.rdata == rdata
    }
}

/// SOA RDATA split into its seven fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soa {
    fields: Vec<String>,
    serial: u32,
}

impl Soa {
    /// Parse `mname rname serial refresh retry expire minimum`
    pub fn parse(rdata: &str) -> Result<Self> {
        let fields: Vec<String> = rdata.split_whitespace().map(str::to_string).collect();
        if fields.len() != 7 {
            return Err(Error::zone_file(format!(
                "SOA record has {} fields, expected 7",
                fields.len()
            )));
        }

        let serial = fields[2]
            .parse()
            .map_err(|_| Error::zone_file(format!("Invalid SOA serial {:?}", fields[2])))?;

        Ok(Self { fields, serial })
    }

    /// Serial number
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Copy with a different serial
    pub fn with_serial(&self, serial: u32) -> Self {
        let mut fields = self.fields.clone();
        fields[2] = serial.to_string();
        Self { fields, serial }
    }

    /// Render back to RDATA
    pub fn to_rdata(&self) -> String {
        self.fields.join(" ")
    }
}

/// A parsed zone file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneFile {
    /// Origin without trailing dot
    pub origin: String,
    /// TTL written in the `$TTL` directive
    pub default_ttl: u32,
    /// Entries in file order
    pub entries: Vec<ZoneEntry>,
}

impl ZoneFile {
    /// Append one entry per data value of `record`
    ///
    /// A TTL of zero is replaced by the zone's default TTL.
    pub fn add_record(&mut self, record: &Record) {
        let ttl = if record.ttl() == 0 {
            self.default_ttl
        } else {
            record.ttl()
        };

        for value in record.data() {
            self.entries.push(ZoneEntry {
                name: record.name().to_string(),
                ttl,
                class: "IN".to_string(),
                rtype: record.record_type().to_string(),
                rdata: value.clone(),
            });
        }
    }

    /// Remove one matching entry per data value of `record`
    ///
    /// Nothing is removed unless every value has a match.
    pub fn remove_record(&mut self, record: &Record) -> Result<()> {
        let mut remaining = self.entries.clone();

        for value in record.data() {
            let position = remaining
                .iter()
                .position(|e| e.matches(record.name(), record.record_type(), record.ttl(), value))
                .ok_or_else(|| {
                    Error::not_found(format!(
                        "{} {} {} {} in zone {}",
                        record.name(),
                        record.record_type(),
                        record.ttl(),
                        value,
                        self.origin
                    ))
                })?;
            remaining.remove(position);
        }

        self.entries = remaining;
        Ok(())
    }

    /// Every entry as a single-valued record
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.entries.iter().map(ZoneEntry::to_record)
    }

    /// The zone's SOA
    pub fn soa(&self) -> Result<Soa> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.rtype == "SOA")
            .ok_or_else(|| Error::zone_file(format!("Zone {} has no SOA record", self.origin)))?;
        Soa::parse(&entry.rdata)
    }

    /// Replace the SOA RDATA
    pub fn set_soa(&mut self, soa: &Soa) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.rtype == "SOA")
            .ok_or_else(|| Error::zone_file(format!("Zone {} has no SOA record", self.origin)))?;
        entry.rdata = soa.to_rdata();
        Ok(())
    }

    /// Render the zone as master file text
    ///
    /// Output starts with `$ORIGIN` and `$TTL`, then the SOA, then every
    /// other entry ordered by owner name and type. Entries that tie keep
    /// their relative order.
    pub fn render(&self) -> String {
        let mut out = format!("$ORIGIN {}.\n$TTL {}\n", self.origin, self.default_ttl);

        let (soa, mut rest): (Vec<&ZoneEntry>, Vec<&ZoneEntry>) =
            self.entries.iter().partition(|e| e.rtype == "SOA");

        rest.sort_by(|a, b| {
            a.name
                .to_ascii_lowercase()
                .cmp(&b.name.to_ascii_lowercase())
                .then_with(|| a.rtype.cmp(&b.rtype))
        });

        for entry in soa.into_iter().chain(rest) {
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\n",
                entry.name, entry.ttl, entry.class, entry.rtype, entry.rdata
            ));
        }

        out
    }
}

/// Make `name` absolute relative to `origin`
///
/// `@` is the origin itself; a name with a trailing dot is already absolute.
pub(crate) fn qualify(name: &str, origin: &str) -> String {
    let origin = origin.trim_end_matches('.');
    if name == "@" {
        format!("{}.", origin)
    } else if name.ends_with('.') {
        name.to_string()
    } else if origin.is_empty() {
        format!("{}.", name)
    } else {
        format!("{}.{}.", name, origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ZoneFileParser;

    fn zone() -> ZoneFile {
        ZoneFileParser::new("example.com", 300)
            .parse(
                "www A 192.0.2.2\n\
                 @ 3600 SOA ns1 hostmaster 7 7200 3600 1209600 300\n\
                 @ NS ns1\n\
                 api A 192.0.2.3\n",
            )
            .unwrap()
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("@", "example.com"), "example.com.");
        assert_eq!(qualify("www", "example.com."), "www.example.com.");
        assert_eq!(qualify("host.example.org.", "example.com"), "host.example.org.");
    }

    #[test]
    fn test_soa_serial() {
        let zone = zone();
        let soa = zone.soa().unwrap();
        assert_eq!(soa.serial(), 7);
        assert_eq!(
            soa.with_serial(8).to_rdata(),
            "ns1.example.com. hostmaster.example.com. 8 7200 3600 1209600 300"
        );
        assert!(Soa::parse("ns1. hostmaster. x 1 2 3 4").is_err());
        assert!(Soa::parse("ns1. hostmaster. 1 2 3").is_err());
    }

    #[test]
    fn test_add_and_remove_split_values() {
        let mut zone = zone();
        let record = Record::new(
            "multi.example.com.",
            "A",
            0,
            vec!["192.0.2.10".to_string(), "192.0.2.11".to_string()],
        );
        zone.add_record(&record);
        assert_eq!(zone.entries.len(), 6);
        assert!(zone.entries.iter().all(|e| e.rtype != "A" || e.ttl == 300));

        let stored = Record::new(
            "multi.example.com.",
            "A",
            300,
            vec!["192.0.2.10".to_string(), "192.0.2.11".to_string()],
        );
        zone.remove_record(&stored).unwrap();
        assert_eq!(zone.entries.len(), 4);
    }

    #[test]
    fn test_remove_missing_changes_nothing() {
        let mut zone = zone();
        let record = Record::new(
            "www.example.com.",
            "A",
            300,
            vec!["192.0.2.2".to_string(), "192.0.2.99".to_string()],
        );
        let err = zone.remove_record(&record).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(zone.entries.len(), 4);
    }

    #[test]
    fn test_render_puts_soa_first_and_sorts() {
        let rendered = zone().render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "$ORIGIN example.com.");
        assert_eq!(lines[1], "$TTL 300");
        assert!(lines[2].contains("\tSOA\t"));
        assert!(lines[3].starts_with("api.example.com.\t300\tIN\tA\t"));
        assert!(lines[4].starts_with("example.com.\t300\tIN\tNS\t"));
        assert!(lines[5].starts_with("www.example.com."));

        let reparsed = ZoneFileParser::new("example.com", 300)
            .parse(&rendered)
            .unwrap();
        assert_eq!(reparsed.entries.len(), 4);
        assert_eq!(reparsed.soa().unwrap().serial(), 7);
    }
}
