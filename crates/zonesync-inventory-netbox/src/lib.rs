// # NetBox Inventory
//
// InventorySource that reads IP addresses from NetBox IPAM.
//
// ## Data Flow
//
// ```text
// GET https://{host}/api/ipam/ip-addresses/?limit=1000
//   -> results[]: { address: "192.0.2.1/24", dns_name, status: { value } }
//   -> next: URL of the following page, or null
// ```
//
// Every page is fetched before anything is returned; a failure on any page
// fails the whole listing. Addresses are CIDR strings, and the prefix length
// is dropped once it has been checked.
//
// ## Security
//
// - The token is sent as `Authorization: Token <token>`
// - The token never appears in logs or `Debug` output

use async_trait::async_trait;
use ipnet::IpNet;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};
use zonesync_core::config::InventoryConfig;
use zonesync_core::registry::ProviderRegistry;
use zonesync_core::traits::{InventoryAddress, InventorySource, InventorySourceFactory};
use zonesync_core::{Error, Result};

/// Page size requested from NetBox
pub const PAGE_LIMIT: u32 = 1000;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<IpAddressEntry>,
}

#[derive(Debug, Deserialize)]
struct IpAddressEntry {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    dns_name: Option<String>,
    #[serde(default)]
    status: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    value: String,
}

/// Parse a NetBox CIDR address ("192.0.2.1/24", "2001:db8::1/64")
///
/// A bare address without prefix length is accepted as well.
pub fn parse_cidr(cidr: &str) -> Result<IpAddr> {
    let cidr = cidr.trim();
    cidr.parse::<IpNet>()
        .map(|net| net.addr())
        .or_else(|_| cidr.parse::<IpAddr>())
        .map_err(|_| Error::inventory(format!("Malformed address {:?}", cidr)))
}

/// NetBox IPAM inventory
pub struct NetboxInventory {
    base_url: String,
    /// API token, never logged
    token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for NetboxInventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetboxInventory")
            .field("base_url", &self.base_url)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl NetboxInventory {
    /// Create an inventory for `host`
    ///
    /// `host` is a bare host name, reached over HTTPS. A value that already
    /// carries a scheme is used as the base URL unchanged.
    pub fn new(host: &str, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if host.is_empty() {
            return Err(Error::config("NetBox host cannot be empty"));
        }
        if token.is_empty() {
            return Err(Error::config("NetBox token cannot be empty"));
        }

        let base_url = if host.contains("://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::inventory(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            token,
            client,
        })
    }

    fn first_page_url(&self) -> String {
        format!(
            "{}/api/ipam/ip-addresses/?limit={}",
            self.base_url, PAGE_LIMIT
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<Page> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::inventory(format!("NetBox request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(match status.as_u16() {
                401 | 403 => Error::inventory(format!(
                    "NetBox authentication failed: invalid token or insufficient permissions. Status: {}",
                    status
                )),
                429 => Error::inventory(format!(
                    "NetBox rate limit exceeded. Please retry later. Status: {}",
                    status
                )),
                _ => Error::inventory(format!(
                    "NetBox request failed: {} - {}",
                    status, error_text
                )),
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::inventory(format!("Failed to parse NetBox response: {}", e)))
    }
}

impl IpAddressEntry {
    /// Convert to an inventory entry, or `None` when NetBox has no address
    fn into_address(self) -> Result<Option<InventoryAddress>> {
        let Some(cidr) = self.address.filter(|a| !a.is_empty()) else {
            warn!("Skipping NetBox IP address {:?} without address", self.id);
            return Ok(None);
        };

        Ok(Some(InventoryAddress::new(
            self.dns_name.unwrap_or_default(),
            parse_cidr(&cidr)?,
            self.status.map(|s| s.value).unwrap_or_default(),
        )))
    }
}

#[async_trait]
impl InventorySource for NetboxInventory {
    async fn list_addresses(&self) -> Result<Vec<InventoryAddress>> {
        let mut addresses = Vec::new();
        let mut next = Some(self.first_page_url());

        while let Some(url) = next {
            let page = self.fetch_page(&url).await?;
            debug!("Fetched {} IP addresses from NetBox", page.results.len());

            for entry in page.results {
                if let Some(address) = entry.into_address()? {
                    addresses.push(address);
                }
            }
            next = page.next.filter(|n| !n.is_empty());
        }

        debug!("NetBox inventory holds {} addresses", addresses.len());
        Ok(addresses)
    }

    fn source_name(&self) -> &'static str {
        "netbox"
    }
}

/// Factory for the `netbox` inventory type
#[derive(Debug, Clone, Copy, Default)]
pub struct NetboxInventoryFactory;

impl InventorySourceFactory for NetboxInventoryFactory {
    fn create(&self, config: &InventoryConfig) -> Result<Box<dyn InventorySource>> {
        match config {
            InventoryConfig::Netbox { host, token } => {
                Ok(Box::new(NetboxInventory::new(host, token.as_str())?))
            }
            _ => Err(Error::config("Invalid config for NetBox inventory")),
        }
    }
}

/// Register the NetBox inventory
pub fn register(registry: &ProviderRegistry) {
    registry.register_inventory("netbox", Box::new(NetboxInventoryFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const IP_PATH: &str = "/api/ipam/ip-addresses/";

    fn inventory(server: &MockServer) -> NetboxInventory {
        NetboxInventory::new(&server.uri(), "secret-token").unwrap()
    }

    #[test]
    fn test_parse_cidr() {
        assert_eq!(
            parse_cidr("192.0.2.1/24").unwrap(),
            "192.0.2.1".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            parse_cidr("2001:db8::1/64").unwrap(),
            "2001:db8::1".parse::<IpAddr>().unwrap()
        );
        assert!(parse_cidr("10.0.0.5").is_ok());
        assert!(parse_cidr("10.0.0.5/33").is_err());
        assert!(parse_cidr("not-an-ip/24").is_err());
        assert!(parse_cidr("10.0.0.5/x").is_err());
        assert!(parse_cidr("2001:db8::1/129").is_err());
        assert!(parse_cidr("10.0.0.5/").is_err());
        assert_eq!(
            parse_cidr(" 10.0.0.5/8 ").unwrap(),
            "10.0.0.5".parse::<IpAddr>().unwrap()
        );
        assert!(matches!(parse_cidr("192.0.2.1/33"), Err(Error::Inventory(_))));
    }

    #[tokio::test]
    async fn test_list_follows_next_links() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(IP_PATH))
            .and(query_param("offset", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "next": null,
                "results": [
                    {"id": 3, "address": "2001:db8::1/64", "dns_name": "v6.example.com", "status": {"value": "active"}}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(IP_PATH))
            .and(query_param("limit", "1000"))
            .and(header("authorization", "Token secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "next": format!("{}{}?limit=1000&offset=1000", server.uri(), IP_PATH),
                "results": [
                    {"id": 1, "address": "192.0.2.1/24", "dns_name": "host.example.com", "status": {"value": "active"}},
                    {"id": 2, "address": "192.0.2.2/24", "dns_name": "", "status": {"value": "reserved"}}
                ]
            })))
            .mount(&server)
            .await;

        let addresses = inventory(&server).list_addresses().await.unwrap();
        assert_eq!(addresses.len(), 3);
        assert_eq!(addresses[0].dns_name, "host.example.com");
        assert!(addresses[0].is_active());
        assert_eq!(addresses[1].status, "reserved");
        assert_eq!(addresses[2].address, "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_malformed_address_fails_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(IP_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "next": null,
                "results": [
                    {"id": 1, "address": "192.0.2.300/24", "dns_name": "bad.example.com", "status": {"value": "active"}}
                ]
            })))
            .mount(&server)
            .await;

        let err = inventory(&server).list_addresses().await.unwrap_err();
        assert!(matches!(err, Error::Inventory(_)));
    }

    #[tokio::test]
    async fn test_missing_fields_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(IP_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": 1, "address": "192.0.2.1/32"},
                    {"id": 2, "address": null, "dns_name": "ghost.example.com"}
                ]
            })))
            .mount(&server)
            .await;

        let addresses = inventory(&server).list_addresses().await.unwrap();
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].dns_name, "");
        assert!(!addresses[0].is_active());
    }

    #[tokio::test]
    async fn test_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(IP_PATH))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = inventory(&server).list_addresses().await.unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
        assert!(!err.to_string().contains("secret-token"));
    }

    #[test]
    fn test_base_url_from_host() {
        let inventory = NetboxInventory::new("netbox.example.com", "t").unwrap();
        assert_eq!(
            inventory.first_page_url(),
            "https://netbox.example.com/api/ipam/ip-addresses/?limit=1000"
        );
        assert!(NetboxInventory::new("", "t").is_err());
        assert!(NetboxInventory::new("netbox.example.com", "").is_err());
    }

    #[test]
    fn test_token_not_exposed_in_debug() {
        let inventory = NetboxInventory::new("netbox.example.com", "secret_token_12345").unwrap();
        assert!(!format!("{:?}", inventory).contains("secret_token"));
    }

    #[test]
    fn test_factory() {
        let config = InventoryConfig::Netbox {
            host: "netbox.example.com".to_string(),
            token: "token".to_string(),
        };
        let source = NetboxInventoryFactory.create(&config).unwrap();
        assert_eq!(source.source_name(), "netbox");
        assert!(NetboxInventoryFactory.create(&InventoryConfig::default()).is_err());
    }
}
