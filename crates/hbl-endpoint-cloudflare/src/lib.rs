// # Cloudflare Endpoint
//
// Enforces blocks as account-level IP access rules.
//
// The artifact for an address is an access rule with mode `block` whose
// target is `ip` (IPv4) or `ip6` (IPv6) and whose value is the address.
//
// ## Behaviour
//
// - `block`: creates a rule unless a matching one already exists
// - `unblock`: deletes every matching rule, succeeds when there are none
// - `exists`: lists rules filtered by mode, target and value
// - No retries and no caching; the service owns convergence through sync
//
// ## Security Requirements
//
// - API token and key NEVER appear in logs or `Debug` output
// - Credentials come from configuration only
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List rules: GET `/accounts/:account_id/firewall/access_rules/rules`
// - Create rule: POST `/accounts/:account_id/firewall/access_rules/rules`
// - Delete rule: DELETE `/accounts/:account_id/firewall/access_rules/rules/:rule_id`

use async_trait::async_trait;
use hbl_core::config::EndpointConfig;
use hbl_core::traits::{Endpoint, EndpointFactory};
use hbl_core::{Error, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Notes attached to every rule this endpoint creates
const RULE_NOTES: &str = "Created automatically by HBL API.";

const ENDPOINT_NAME: &str = "Cloudflare";

/// How requests authenticate
#[derive(Clone)]
pub enum Credentials {
    /// Scoped API token (bearer)
    Token(String),
    /// Account email plus global API key
    Key { email: String, key: String },
}

impl Credentials {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::Key { email, key } => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Credentials::Token(_) => "token",
            Credentials::Key { .. } => "email+key",
        }
    }
}

/// Cloudflare access-rule endpoint
///
/// # Dry-Run Mode
///
/// When `dry_run` is true the endpoint still lists rules, but logs the
/// intended create/delete instead of sending it.
pub struct CloudflareEndpoint {
    account_id: String,
    credentials: Credentials,
    base_url: String,
    client: reqwest::Client,
    dry_run: bool,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareEndpoint")
            .field("account_id", &self.account_id)
            .field("credentials", &format_args!("<REDACTED {}>", self.credentials.kind()))
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct AccessRule {
    id: String,
}

impl CloudflareEndpoint {
    /// Create a new Cloudflare endpoint
    pub fn new(account_id: impl Into<String>, credentials: Credentials, dry_run: bool) -> Result<Self> {
        Self::with_base_url(account_id, credentials, CLOUDFLARE_API_BASE, dry_run)
    }

    /// Create an endpoint talking to a different API base (e.g. a proxy)
    pub fn with_base_url(
        account_id: impl Into<String>,
        credentials: Credentials,
        base_url: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let account_id = account_id.into();
        if account_id.is_empty() {
            return Err(Error::config("Cloudflare account ID cannot be empty"));
        }
        let has_secret = match &credentials {
            Credentials::Token(token) => !token.is_empty(),
            Credentials::Key { email, key } => !email.is_empty() && !key.is_empty(),
        };
        if !has_secret {
            return Err(Error::config("Cloudflare credentials cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            account_id,
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            dry_run,
        })
    }

    fn rules_url(&self) -> String {
        format!(
            "{}/accounts/{}/firewall/access_rules/rules",
            self.base_url, self.account_id
        )
    }

    fn rule_url(&self, rule_id: &str) -> String {
        format!("{}/{}", self.rules_url(), rule_id)
    }

    /// IDs of every block rule matching `ip`
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /accounts/:account_id/firewall/access_rules/rules?mode=block&configuration.target=ip&configuration.value=1.2.3.4
    /// ```
    async fn matching_rules(&self, ip: IpAddr) -> Result<Vec<String>> {
        let value = ip.to_string();
        let request = self.client.get(self.rules_url()).query(&[
            ("mode", "block"),
            ("configuration.target", target_for(ip)),
            ("configuration.value", value.as_str()),
            ("match", "all"),
        ]);

        let rules: Vec<AccessRule> = self.send(request, "Rule lookup").await?.unwrap_or_default();
        tracing::debug!(ip = %ip, count = rules.len(), "Listed Cloudflare access rules");
        Ok(rules.into_iter().map(|rule| rule.id).collect())
    }

    async fn create_rule(&self, ip: IpAddr) -> Result<()> {
        let payload = rule_payload(ip);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would POST {} with payload: {}", self.rules_url(), payload);
            return Ok(());
        }

        let request = self.client.post(self.rules_url()).json(&payload);
        let _: Option<Value> = self.send(request, "Rule creation").await?;
        tracing::info!(ip = %ip, "Cloudflare access rule created");
        Ok(())
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!("[DRY-RUN] Would DELETE {}", self.rule_url(rule_id));
            return Ok(());
        }

        let request = self.client.delete(self.rule_url(rule_id));
        match self.send::<Value>(request, "Rule deletion").await {
            Ok(_) => Ok(()),
            // Removed concurrently
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Send an authenticated request and unwrap the API envelope
    async fn send<T>(&self, request: RequestBuilder, context: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .credentials
            .apply(request)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(error_for_status(status, &error_text, context));
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("Failed to parse response: {}", e)))?;

        if !envelope.success {
            let reasons: Vec<String> = envelope
                .errors
                .iter()
                .map(|m| format!("{} ({})", m.message, m.code))
                .collect();
            return Err(Error::provider(
                "cloudflare",
                format!("{} rejected: {}", context, reasons.join(", ")),
            ));
        }

        Ok(envelope.result)
    }
}

/// Access rule target for an address family
fn target_for(ip: IpAddr) -> &'static str {
    match ip {
        IpAddr::V4(_) => "ip",
        IpAddr::V6(_) => "ip6",
    }
}

fn rule_payload(ip: IpAddr) -> Value {
    json!({
        "mode": "block",
        "configuration": {
            "target": target_for(ip),
            "value": ip.to_string(),
        },
        "notes": RULE_NOTES,
    })
}

/// Map an unsuccessful HTTP status to an error
fn error_for_status(status: StatusCode, body: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Cloudflare rejected the credentials or they lack permission. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{}: Cloudflare resource not found", context)),
        429 => Error::rate_limited(format!("Cloudflare rate limit exceeded. Status: {}", status)),
        500..=599 => Error::provider(
            "cloudflare",
            format!("Cloudflare server error (transient): {} - {}", status, body),
        ),
        _ => Error::provider("cloudflare", format!("{} failed: {} - {}", context, status, body)),
    }
}

#[async_trait]
impl Endpoint for CloudflareEndpoint {
    fn name(&self) -> &str {
        ENDPOINT_NAME
    }

    async fn block(&self, ip: IpAddr) -> Result<()> {
        if !self.matching_rules(ip).await?.is_empty() {
            tracing::debug!(ip = %ip, "Cloudflare access rule already present");
            return Ok(());
        }
        self.create_rule(ip).await
    }

    async fn unblock(&self, ip: IpAddr) -> Result<()> {
        let rules = self.matching_rules(ip).await?;
        if rules.is_empty() {
            tracing::debug!(ip = %ip, "No Cloudflare access rule to remove");
            return Ok(());
        }

        for rule_id in &rules {
            self.delete_rule(rule_id).await?;
        }
        tracing::info!(ip = %ip, removed = rules.len(), "Cloudflare access rules removed");
        Ok(())
    }

    async fn exists(&self, ip: IpAddr) -> Result<bool> {
        Ok(!self.matching_rules(ip).await?.is_empty())
    }
}

/// Factory for creating Cloudflare endpoints
pub struct CloudflareFactory;

impl EndpointFactory for CloudflareFactory {
    fn create(&self, config: &EndpointConfig, dry_run: bool) -> Result<Arc<dyn Endpoint>> {
        let EndpointConfig::Cloudflare {
            account_id,
            api_token,
            api_email,
            api_key,
        } = config
        else {
            return Err(Error::config("Invalid config for Cloudflare endpoint"));
        };

        let credentials = match (api_token, api_email, api_key) {
            (Some(token), _, _) if !token.is_empty() => Credentials::Token(token.clone()),
            (_, Some(email), Some(key)) => Credentials::Key {
                email: email.clone(),
                key: key.clone(),
            },
            _ => {
                return Err(Error::config(
                    "Cloudflare requires an API token or an email and API key",
                ));
            }
        };

        if dry_run {
            tracing::warn!("Cloudflare endpoint running in DRY-RUN mode - no rules will be changed");
        }

        Ok(Arc::new(CloudflareEndpoint::new(
            account_id.clone(),
            credentials,
            dry_run,
        )?))
    }
}

/// Register the Cloudflare endpoint factory
///
/// # Example
///
/// ```rust
/// use hbl_core::FactoryRegistry;
///
/// let registry = FactoryRegistry::new();
/// hbl_endpoint_cloudflare::register(&registry);
/// assert!(registry.has_endpoint_factory("cloudflare"));
/// ```
pub fn register(registry: &hbl_core::FactoryRegistry) {
    registry.register_endpoint_factory("cloudflare", Box::new(CloudflareFactory));
}
