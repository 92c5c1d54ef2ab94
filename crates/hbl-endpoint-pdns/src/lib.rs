// # PowerDNS Endpoint
//
// Publishes blocked addresses in a DNS block list (RBL) zone served by a
// PowerDNS authoritative server.
//
// The artifact for an address is an `A` record `127.0.0.1` at the reversed
// address under the zone, so `203.0.113.5` in `rbl.example.net` becomes
// `5.113.0.203.rbl.example.net.`. IPv6 addresses are reversed nibble by
// nibble.
//
// ## API Reference
//
// - Patch zone: PATCH `/zones/:zone_id` with `REPLACE` / `DELETE` rrsets (204)
// - Read rrset: GET `/zones/:zone_id?rrset_name=...&rrset_type=A` (200)
// - Authentication: `X-API-Key` header

use async_trait::async_trait;
use hbl_core::config::EndpointConfig;
use hbl_core::traits::{Endpoint, EndpointFactory};
use hbl_core::{Error, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Address every listed name resolves to
const LISTED_CONTENT: &str = "127.0.0.1";

/// TTL of published records
const RECORD_TTL: u32 = 3600;

const ENDPOINT_NAME: &str = "PowerDNS";

/// PowerDNS RBL endpoint
pub struct PowerDnsEndpoint {
    base_url: String,
    zone: String,
    api_key: String,
    client: reqwest::Client,
    dry_run: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for PowerDnsEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerDnsEndpoint")
            .field("base_url", &self.base_url)
            .field("zone", &self.zone)
            .field("api_key", &"<REDACTED>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeType {
    Replace,
    Delete,
}

impl ChangeType {
    fn as_str(self) -> &'static str {
        match self {
            ChangeType::Replace => "REPLACE",
            ChangeType::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    content: String,
    #[serde(default)]
    disabled: bool,
}

#[derive(Debug, Serialize)]
struct RrSetPatch {
    name: String,
    #[serde(rename = "type")]
    record_type: &'static str,
    ttl: u32,
    changetype: &'static str,
    records: Vec<Record>,
}

#[derive(Debug, Serialize)]
struct ZonePatch {
    rrsets: Vec<RrSetPatch>,
}

#[derive(Debug, Deserialize)]
struct RrSet {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Zone {
    #[serde(default)]
    rrsets: Vec<RrSet>,
}

impl PowerDnsEndpoint {
    /// Create a new PowerDNS endpoint
    ///
    /// `base_url` points at the server API
    /// (e.g. `http://127.0.0.1:8081/api/v1/servers/localhost`).
    pub fn new(
        base_url: impl Into<String>,
        zone: impl Into<String>,
        api_key: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let zone = zone.into().trim_end_matches('.').to_string();
        let api_key = api_key.into();

        if zone.is_empty() {
            return Err(Error::config("PowerDNS zone cannot be empty"));
        }
        if api_key.is_empty() {
            return Err(Error::config("PowerDNS API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            zone,
            api_key,
            client,
            dry_run,
        })
    }

    fn zone_url(&self) -> String {
        format!("{}/zones/{}.", self.base_url, self.zone)
    }

    /// Fully qualified record name for `ip`
    fn record_name(&self, ip: IpAddr) -> String {
        format!("{}.{}.", reverse_name(ip), self.zone)
    }

    fn patch_body(&self, ip: IpAddr, change: ChangeType) -> ZonePatch {
        let records = match change {
            ChangeType::Replace => vec![Record {
                content: LISTED_CONTENT.to_string(),
                disabled: false,
            }],
            ChangeType::Delete => Vec::new(),
        };

        ZonePatch {
            rrsets: vec![RrSetPatch {
                name: self.record_name(ip),
                record_type: "A",
                ttl: RECORD_TTL,
                changetype: change.as_str(),
                records,
            }],
        }
    }

    async fn patch_zone(&self, ip: IpAddr, change: ChangeType) -> Result<()> {
        let body = self.patch_body(ip, change);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would PATCH {} with {} {}",
                self.zone_url(),
                change.as_str(),
                self.record_name(ip)
            );
            return Ok(());
        }

        let response = self
            .client
            .patch(self.zone_url())
            .header("X-API-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::provider("powerdns", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(error_for_status(status, &error_text));
        }

        tracing::info!(ip = %ip, change = change.as_str(), "PowerDNS zone patched");
        Ok(())
    }
}

/// Reverse an address into RBL label order
///
/// IPv4 reverses the octets, IPv6 reverses all 32 nibbles.
pub fn reverse_name(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{}.{}.{}.{}", d, c, b, a)
        }
        IpAddr::V6(v6) => {
            let mut name = String::with_capacity(63);
            for byte in v6.octets().iter().rev() {
                if !name.is_empty() {
                    name.push('.');
                }
                let _ = write!(name, "{:x}.{:x}", byte & 0x0f, byte >> 4);
            }
            name
        }
    }
}

fn error_for_status(status: StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!("PowerDNS rejected the API key. Status: {}", status)),
        404 => Error::not_found("PowerDNS zone not found"),
        422 => Error::provider("powerdns", format!("PowerDNS rejected the change: {}", body)),
        500..=599 => Error::provider(
            "powerdns",
            format!("PowerDNS server error (transient): {} - {}", status, body),
        ),
        _ => Error::provider("powerdns", format!("Unexpected status {}: {}", status, body)),
    }
}

#[async_trait]
impl Endpoint for PowerDnsEndpoint {
    fn name(&self) -> &str {
        ENDPOINT_NAME
    }

    async fn block(&self, ip: IpAddr) -> Result<()> {
        self.patch_zone(ip, ChangeType::Replace).await
    }

    // Deleting an absent rrset is accepted by the server, so this is a
    // no-op success for unlisted addresses.
    async fn unblock(&self, ip: IpAddr) -> Result<()> {
        self.patch_zone(ip, ChangeType::Delete).await
    }

    async fn exists(&self, ip: IpAddr) -> Result<bool> {
        let name = self.record_name(ip);
        let response = self
            .client
            .get(self.zone_url())
            .header("X-API-Key", &self.api_key)
            .query(&[("rrset_name", name.as_str()), ("rrset_type", "A")])
            .send()
            .await
            .map_err(|e| Error::provider("powerdns", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(error_for_status(status, &error_text));
        }

        let zone: Zone = response
            .json()
            .await
            .map_err(|e| Error::provider("powerdns", format!("Failed to parse zone: {}", e)))?;

        Ok(is_listed(&zone, &name))
    }
}

fn is_listed(zone: &Zone, name: &str) -> bool {
    zone.rrsets.iter().any(|rrset| {
        rrset.record_type == "A"
            && rrset.name.eq_ignore_ascii_case(name)
            && rrset.records.iter().any(|r| !r.disabled)
    })
}

/// Factory for creating PowerDNS endpoints
pub struct PowerDnsFactory;

impl EndpointFactory for PowerDnsFactory {
    fn create(&self, config: &EndpointConfig, dry_run: bool) -> Result<Arc<dyn Endpoint>> {
        match config {
            EndpointConfig::PowerDns {
                base_url,
                zone,
                api_key,
            } => {
                if dry_run {
                    tracing::warn!("PowerDNS endpoint running in DRY-RUN mode - the zone will not be changed");
                }
                Ok(Arc::new(PowerDnsEndpoint::new(
                    base_url.clone(),
                    zone.clone(),
                    api_key.clone(),
                    dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for PowerDNS endpoint")),
        }
    }
}

/// Register the PowerDNS endpoint factory
pub fn register(registry: &hbl_core::FactoryRegistry) {
    registry.register_endpoint_factory("powerdns", Box::new(PowerDnsFactory));
}
