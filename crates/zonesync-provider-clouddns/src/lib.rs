// # Cloud DNS Provider
//
// DnsProvider implementation for Google Cloud DNS managed zones, talking to
// the v1 REST API with reqwest.
//
// ## How changes reach the API
//
// - `import_zone` lists every rrset of the managed zone, following
//   `nextPageToken`, and keeps two copies: the original and a working copy
// - `write_record` / `remove_record` only edit the working copy, keyed by
//   (owner name, type)
// - `save` diffs the copies and submits a single `changes` request holding
//   the old rrsets as deletions and the new ones as additions, together with
//   the SOA serial bump
//
// Cloud DNS applies a change atomically, so a zone is either fully updated
// or left as it was.
//
// ## Security
//
// - The bearer token comes from `ZONESYNC_CLOUDDNS_TOKEN`
// - The token never appears in logs or `Debug` output
//
// ## API Reference
//
// - List rrsets: GET `/projects/{project}/managedZones/{zone}/rrsets`
// - Create change: POST `/projects/{project}/managedZones/{zone}/changes`

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use zonesync_core::config::{ZONETYPE_CLOUDDNS, ZoneConfig};
use zonesync_core::registry::ProviderRegistry;
use zonesync_core::serial::increment_serial;
use zonesync_core::traits::{DnsProvider, DnsProviderFactory};
use zonesync_core::{Error, Record, Result, Zone};

/// Cloud DNS API base URL
pub const CLOUDDNS_API_BASE: &str = "https://dns.googleapis.com/dns/v1";

/// Environment variable holding the OAuth bearer token
pub const TOKEN_ENV: &str = "ZONESYNC_CLOUDDNS_TOKEN";

/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "ZONESYNC_CLOUDDNS_URL";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = ZONETYPE_CLOUDDNS;

/// (lower-cased owner name, type)
type RrsetKey = (String, String);

/// One Cloud DNS resource record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecordSet {
    /// Fully-qualified owner name
    pub name: String,
    /// Type mnemonic
    #[serde(rename = "type")]
    pub rtype: String,
    /// TTL shared by every value
    #[serde(default)]
    pub ttl: u32,
    /// Data values
    #[serde(default)]
    pub rrdatas: Vec<String>,
}

impl ResourceRecordSet {
    fn key(&self) -> RrsetKey {
        (self.name.to_ascii_lowercase(), self.rtype.to_ascii_uppercase())
    }

    /// One single-valued record per rrdata
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.rrdatas
            .iter()
            .map(|value| Record::single(&self.name, &self.rtype, self.ttl, value))
    }
}

fn record_key(record: &Record) -> RrsetKey {
    (
        record.name().to_ascii_lowercase(),
        record.record_type().to_string(),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RrsetPage {
    #[serde(default)]
    rrsets: Vec<ResourceRecordSet>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Body of a `changes` request
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Record sets to create
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additions: Vec<ResourceRecordSet>,
    /// Record sets to delete, exactly as currently stored
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deletions: Vec<ResourceRecordSet>,
}

impl Change {
    /// Changes turning `original` into `next`
    ///
    /// Each touched (name, type) contributes its original rrset as a
    /// deletion and its new rrset as an addition. Emptied rrsets are only
    /// deleted.
    fn between(
        original: &BTreeMap<RrsetKey, ResourceRecordSet>,
        next: &BTreeMap<RrsetKey, ResourceRecordSet>,
    ) -> Self {
        let mut change = Self::default();
        let keys: BTreeSet<&RrsetKey> = original.keys().chain(next.keys()).collect();

        for key in keys {
            let before = original.get(key);
            let after = next.get(key);
            if before == after {
                continue;
            }
            if let Some(before) = before {
                change.deletions.push(before.clone());
            }
            if let Some(after) = after.filter(|a| !a.rrdatas.is_empty()) {
                change.additions.push(after.clone());
            }
        }

        change
    }

    /// Whether the change does nothing
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }
}

#[derive(Debug, Default)]
struct State {
    loaded: bool,
    original: BTreeMap<RrsetKey, ResourceRecordSet>,
    working: BTreeMap<RrsetKey, ResourceRecordSet>,
    pending: usize,
}

/// Cloud DNS provider for one managed zone
pub struct CloudDnsProvider {
    /// OAuth bearer token, never logged
    api_token: String,
    base_url: String,
    project: String,
    zonename: String,
    client: reqwest::Client,
    today: Option<NaiveDate>,
    state: Mutex<State>,
}

impl std::fmt::Debug for CloudDnsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudDnsProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("project", &self.project)
            .field("zonename", &self.zonename)
            .finish()
    }
}

impl CloudDnsProvider {
    /// Create a provider for `projects/{project}/managedZones/{zonename}`
    ///
    /// Fails when the token is empty or the HTTP client cannot be built.
    pub fn new(
        api_token: impl Into<String>,
        project: impl Into<String>,
        zonename: impl Into<String>,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloud DNS API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: CLOUDDNS_API_BASE.to_string(),
            project: project.into(),
            zonename: zonename.into(),
            client,
            today: None,
            state: Mutex::new(State::default()),
        })
    }

    /// Point the provider at a different API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Pin the date used by the serial policy
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn zone_url(&self) -> String {
        format!(
            "{}/projects/{}/managedZones/{}",
            self.base_url, self.project, self.zonename
        )
    }

    /// List every rrset of the managed zone
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /projects/:project/managedZones/:zone/rrsets?pageToken=...
    /// Authorization: Bearer <token>
    /// ```
    async fn list_rrsets(&self) -> Result<Vec<ResourceRecordSet>> {
        let url = format!("{}/rrsets", self.zone_url());
        let mut rrsets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).bearer_auth(&self.api_token);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;
            let response = check_status(response, &format!("Managed zone {}", self.zonename)).await?;

            let page: RrsetPage = response
                .json()
                .await
                .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;

            debug!(
                "Fetched {} rrsets from managed zone {}",
                page.rrsets.len(),
                self.zonename
            );
            rrsets.extend(page.rrsets);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(rrsets)
    }

    /// Submit one change to the managed zone
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /projects/:project/managedZones/:zone/changes
    /// Authorization: Bearer <token>
    /// { "additions": [...], "deletions": [...] }
    /// ```
    async fn submit_change(&self, change: &Change) -> Result<()> {
        let url = format!("{}/changes", self.zone_url());
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(change)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;

        check_status(response, &format!("Managed zone {}", self.zonename)).await?;
        Ok(())
    }

    async fn load(&self, state: &mut State) -> Result<()> {
        let rrsets = self.list_rrsets().await?;
        state.original = rrsets.into_iter().map(|r| (r.key(), r)).collect();
        state.working = state.original.clone();
        state.pending = 0;
        state.loaded = true;
        Ok(())
    }

    /// Apply `f` to the working copy and count it as one staged change
    async fn stage(
        &self,
        f: impl FnOnce(&mut BTreeMap<RrsetKey, ResourceRecordSet>) -> Result<()>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.loaded {
            self.load(&mut state).await?;
        }
        f(&mut state.working)?;
        state.pending += 1;
        Ok(())
    }
}

/// Map a non-success response to an error
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    Err(match status.as_u16() {
        401 | 403 => Error::provider(
            PROVIDER,
            format!(
                "Authentication failed: invalid token or insufficient permissions. Status: {}",
                status
            ),
        ),
        404 => Error::not_found(format!("{} not found", what)),
        409 => Error::provider(
            PROVIDER,
            format!("Conflict: {} was changed concurrently. Status: {}", what, status),
        ),
        429 => Error::provider(
            PROVIDER,
            format!("Rate limit exceeded. Please retry later. Status: {}", status),
        ),
        500..=599 => Error::provider(
            PROVIDER,
            format!("Cloud DNS server error (transient): {} - {}", status, error_text),
        ),
        _ => Error::provider(
            PROVIDER,
            format!("Request failed: {} - {}", status, error_text),
        ),
    })
}

/// Replace the serial of the zone's SOA rrset, returning (old, new)
fn bump_soa(
    rrsets: &mut BTreeMap<RrsetKey, ResourceRecordSet>,
    zone: &str,
    today: NaiveDate,
) -> Result<(u32, u32)> {
    let key = (
        format!("{}.", zone.trim_end_matches('.')).to_ascii_lowercase(),
        "SOA".to_string(),
    );
    let no_soa = || Error::provider(PROVIDER, format!("Zone {} has no SOA record", zone));

    let rdata = rrsets
        .get_mut(&key)
        .and_then(|soa| soa.rrdatas.first_mut())
        .ok_or_else(no_soa)?;

    let mut fields: Vec<String> = rdata.split_whitespace().map(str::to_string).collect();
    let current: u32 = fields
        .get(2)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::provider(PROVIDER, format!("Invalid SOA for zone {}: {}", zone, rdata)))?;

    let next = increment_serial(current, today)?;
    fields[2] = next.to_string();
    *rdata = fields.join(" ");
    Ok((current, next))
}

#[async_trait]
impl DnsProvider for CloudDnsProvider {
    async fn import_zone(&self, config: &ZoneConfig) -> Result<Zone> {
        let mut state = self.state.lock().await;
        self.load(&mut state).await?;

        let mut zone = Zone::from_config(config);
        for rrset in state.original.values() {
            for record in rrset.records() {
                zone.add_record(record);
            }
        }

        debug!(
            "Imported {} records for zone {} from managed zone {}",
            zone.record_count(),
            config.name,
            self.zonename
        );
        Ok(zone)
    }

    async fn write_record(&self, config: &ZoneConfig, record: &Record) -> Result<()> {
        let ttl = match record.ttl() {
            0 => config.effective_ttl(),
            ttl => ttl,
        };

        self.stage(|working| {
            let rrset = working
                .entry(record_key(record))
                .or_insert_with(|| ResourceRecordSet {
                    name: record.name().to_string(),
                    rtype: record.record_type().to_string(),
                    ttl,
                    rrdatas: Vec::new(),
                });

            if rrset.ttl != ttl {
                debug!(
                    "Changing TTL of {} {} from {} to {}",
                    rrset.name, rrset.rtype, rrset.ttl, ttl
                );
                rrset.ttl = ttl;
            }

            for value in record.data() {
                if !rrset.rrdatas.contains(value) {
                    rrset.rrdatas.push(value.clone());
                }
            }
            Ok(())
        })
        .await
    }

    async fn remove_record(&self, _config: &ZoneConfig, record: &Record) -> Result<()> {
        self.stage(|working| {
            let key = record_key(record);
            let missing =
                || Error::not_found(format!("{} in managed zone {}", record, self.zonename));

            let rrset = working
                .get_mut(&key)
                .filter(|rrset| rrset.ttl == record.ttl())
                .ok_or_else(missing)?;
            if !record.data().iter().all(|v| rrset.rrdatas.contains(v)) {
                return Err(missing());
            }

            rrset.rrdatas.retain(|v| !record.data().contains(v));
            let emptied = rrset.rrdatas.is_empty();
            if emptied {
                working.remove(&key);
            }
            Ok(())
        })
        .await
    }

    async fn save(&self, config: &ZoneConfig) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.pending == 0 {
            debug!("Nothing staged for zone {}, skipping save", config.name);
            return Ok(());
        }

        let today = self
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());

        let mut next = state.working.clone();
        let (old_serial, new_serial) = bump_soa(&mut next, &config.name, today)?;

        let change = Change::between(&state.original, &next);
        self.submit_change(&change).await?;

        info!(
            "Submitted {} deletions and {} additions to managed zone {} (serial {} -> {})",
            change.deletions.len(),
            change.additions.len(),
            self.zonename,
            old_serial,
            new_serial
        );

        state.original = next.clone();
        state.working = next;
        state.pending = 0;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for the `clouddns` zone type
#[derive(Clone, Default)]
pub struct CloudDnsFactory {
    api_token: Option<String>,
    base_url: Option<String>,
    today: Option<NaiveDate>,
}

impl std::fmt::Debug for CloudDnsFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudDnsFactory")
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudDnsFactory {
    /// Factory using an explicit token
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: Some(api_token.into()),
            ..Self::default()
        }
    }

    /// Factory reading the token and base URL from the environment
    pub fn from_env() -> Self {
        Self {
            api_token: std::env::var(TOKEN_ENV).ok(),
            base_url: std::env::var(BASE_URL_ENV).ok(),
            today: None,
        }
    }

    /// Point created providers at a different API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Pin the date used by created providers
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

impl DnsProviderFactory for CloudDnsFactory {
    fn create(&self, zone: &ZoneConfig) -> Result<Box<dyn DnsProvider>> {
        let project = zone
            .project
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::config(format!("Zone {} has no project", zone.name)))?;
        let zonename = zone
            .zonename
            .as_deref()
            .filter(|z| !z.is_empty())
            .ok_or_else(|| Error::config(format!("Zone {} has no zonename", zone.name)))?;
        let api_token = self
            .api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "Cloud DNS token is required for zone {}; set {}",
                    zone.name, TOKEN_ENV
                ))
            })?;

        let mut provider = CloudDnsProvider::new(api_token, project, zonename)?;
        if let Some(base_url) = &self.base_url {
            provider = provider.with_base_url(base_url.as_str());
        }
        if let Some(today) = self.today {
            provider = provider.with_today(today);
        }
        Ok(Box::new(provider))
    }
}

/// Register the Cloud DNS provider, configured from the environment
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(ZONETYPE_CLOUDDNS, Box::new(CloudDnsFactory::from_env()));
}
