//! Contract Test: Longest-Suffix Routing
//!
//! Constraints verified:
//! - A record lands in the most specific zone that covers it
//! - Zone matching happens on label boundaries
//! - A forward name with no owning zone fails the run
//! - A reverse name with no owning zone is reported, not dropped silently

mod common;

use common::*;
use zonesync_core::{Error, SyncEngine, SyncMode, Zone, ZoneSet};

#[test]
fn record_routes_to_longest_matching_zone() {
    let mut set = ZoneSet::new();
    set.add_zone(Zone::new("example.com", 300, false));
    set.add_zone(Zone::new("corp.example.com", 300, false));

    assert_eq!(
        set.route("host.corp.example.com.").unwrap().name(),
        "corp.example.com"
    );
    assert_eq!(set.route("host.example.com.").unwrap().name(), "example.com");

    let err = set.route("host.other.com.").unwrap_err();
    assert!(matches!(err, Error::NoMatchingZone { ref record } if record == "host.other.com."));
}

#[test]
fn routing_does_not_split_labels() {
    let mut set = ZoneSet::new();
    set.add_zone(Zone::new("example.com", 300, false));
    set.add_zone(Zone::new("p.example.com", 300, false));

    assert_eq!(set.route("shop.example.com.").unwrap().name(), "example.com");
    assert_eq!(set.route("x.p.example.com.").unwrap().name(), "p.example.com");
    assert!(set.route("myexample.com.").is_err());
}

#[tokio::test]
async fn engine_routes_inventory_into_nested_zones() {
    let provider = RecordingProvider::new();
    let cfg = config(
        vec![
            active("host.corp.example.com", "10.0.0.1"),
            active("www.example.com", "192.0.2.1"),
        ],
        vec![
            zone("example.com", "recording", false),
            zone("corp.example.com", "recording", false),
            zone("10.in-addr.arpa", "recording", false),
        ],
    );
    let (engine, _events) = SyncEngine::new(recording_registry(&provider), cfg).unwrap();

    let report = engine.run(SyncMode::Diff).await.unwrap();

    let corp = report.zone("corp.example.com").unwrap();
    assert_eq!(corp.added, vec![a("host.corp.example.com.", "10.0.0.1")]);

    let apex = report.zone("example.com").unwrap();
    assert_eq!(apex.added, vec![a("www.example.com.", "192.0.2.1")]);

    let reverse = report.zone("10.in-addr.arpa").unwrap();
    assert_eq!(
        reverse.added,
        vec![ptr("1.0.0.10.in-addr.arpa.", "host.corp.example.com.")]
    );

    assert_eq!(report.unrouted_reverse, vec!["1.2.0.192.in-addr.arpa."]);
}

#[tokio::test]
async fn unroutable_forward_record_fails_the_run() {
    let provider = RecordingProvider::new();
    let cfg = config(
        vec![active("host.other.org", "192.0.2.1")],
        vec![zone("example.com", "recording", false)],
    );
    let (engine, _events) = SyncEngine::new(recording_registry(&provider), cfg).unwrap();

    let err = engine.run(SyncMode::Push).await.unwrap_err();
    assert!(err.is_no_matching_zone());
    assert!(
        provider
            .calls()
            .iter()
            .all(|call| matches!(call, Call::Import(_)))
    );
}
