//! Configuration types for the HBL system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main HBL configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HblConfig {
    /// Record and report store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Enforcement backends
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    /// Reputation checkers
    #[serde(default)]
    pub checkers: Vec<CheckerConfig>,

    /// Notification sinks
    #[serde(default)]
    pub alerters: Vec<AlerterConfig>,

    /// Optional service settings
    #[serde(default)]
    pub service: ServiceConfig,
}

impl HblConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.store.validate()?;

        for endpoint in &self.endpoints {
            endpoint.validate()?;
        }
        for checker in &self.checkers {
            checker.validate()?;
        }
        for alerter in &self.alerters {
            alerter.validate()?;
        }

        self.service.validate()
    }
}

/// Store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// File-based store
    File {
        /// Path to the store file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.trim().is_empty() => {
                Err(crate::Error::config("File store path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndpointConfig {
    /// Cloudflare account access rules
    Cloudflare {
        /// Account that owns the access rules
        account_id: String,
        /// API token (preferred)
        #[serde(default)]
        api_token: Option<String>,
        /// Account email, used with `api_key`
        #[serde(default)]
        api_email: Option<String>,
        /// Global API key, used with `api_email`
        #[serde(default)]
        api_key: Option<String>,
    },

    /// PowerDNS RBL zone
    PowerDns {
        /// Base URL of the server API (e.g. "http://127.0.0.1:8081/api/v1/servers/localhost")
        base_url: String,
        /// RBL zone name (e.g. "rbl.example.net")
        zone: String,
        /// API key
        api_key: String,
    },

    /// Custom endpoint
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl EndpointConfig {
    /// Validate the endpoint configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            EndpointConfig::Cloudflare {
                account_id,
                api_token,
                api_email,
                api_key,
            } => {
                if account_id.is_empty() {
                    return Err(crate::Error::config("Cloudflare account ID cannot be empty"));
                }
                let has_token = api_token.as_deref().is_some_and(|t| !t.is_empty());
                let has_key = api_email.as_deref().is_some_and(|e| !e.is_empty())
                    && api_key.as_deref().is_some_and(|k| !k.is_empty());
                if !has_token && !has_key {
                    return Err(crate::Error::config(
                        "Cloudflare requires an API token or an email and API key",
                    ));
                }
                Ok(())
            }
            EndpointConfig::PowerDns {
                base_url,
                zone,
                api_key,
            } => {
                if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "PowerDNS base URL must use HTTP or HTTPS scheme. Got: {}",
                        base_url
                    )));
                }
                if zone.trim_end_matches('.').is_empty() {
                    return Err(crate::Error::config("PowerDNS zone cannot be empty"));
                }
                if api_key.is_empty() {
                    return Err(crate::Error::config("PowerDNS API key cannot be empty"));
                }
                Ok(())
            }
            EndpointConfig::Custom { factory, config } => {
                validate_custom("endpoint", factory, config)
            }
        }
    }

    /// Get the endpoint type name
    pub fn type_name(&self) -> &str {
        match self {
            EndpointConfig::Cloudflare { .. } => "cloudflare",
            EndpointConfig::PowerDns { .. } => "powerdns",
            EndpointConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Reputation checker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckerConfig {
    /// AbuseIPDB check API
    AbuseIpDb {
        /// API key
        api_key: String,
        /// Only consider reports newer than this many days
        #[serde(default = "default_max_age_days")]
        max_age_days: u32,
    },

    /// Custom checker
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl CheckerConfig {
    /// Validate the checker configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            CheckerConfig::AbuseIpDb {
                api_key,
                max_age_days,
            } => {
                if api_key.is_empty() {
                    return Err(crate::Error::config("AbuseIPDB API key cannot be empty"));
                }
                if !(1..=365).contains(max_age_days) {
                    return Err(crate::Error::config(format!(
                        "AbuseIPDB max age must be between 1 and 365 days. Got: {}",
                        max_age_days
                    )));
                }
                Ok(())
            }
            CheckerConfig::Custom { factory, config } => validate_custom("checker", factory, config),
        }
    }

    /// Get the checker type name
    pub fn type_name(&self) -> &str {
        match self {
            CheckerConfig::AbuseIpDb { .. } => "abuseipdb",
            CheckerConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Alerter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlerterConfig {
    /// Slack incoming webhook
    Slack {
        /// Webhook URL
        webhook_url: String,
        /// Channel override
        #[serde(default)]
        channel: Option<String>,
        /// Username override
        #[serde(default)]
        username: Option<String>,
    },

    /// Custom alerter
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl AlerterConfig {
    /// Validate the alerter configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            AlerterConfig::Slack { webhook_url, .. } => {
                if !webhook_url.starts_with("https://") {
                    return Err(crate::Error::config("Slack webhook URL must use HTTPS"));
                }
                Ok(())
            }
            AlerterConfig::Custom { factory, config } => validate_custom("alerter", factory, config),
        }
    }

    /// Get the alerter type name
    pub fn type_name(&self) -> &str {
        match self {
            AlerterConfig::Slack { .. } => "slack",
            AlerterConfig::Custom { factory, .. } => factory,
        }
    }
}

fn validate_custom(
    kind: &str,
    factory: &str,
    config: &serde_json::Value,
) -> Result<(), crate::Error> {
    if factory.is_empty() {
        return Err(crate::Error::config(format!(
            "Custom {} factory cannot be empty",
            kind
        )));
    }
    if config.is_null() {
        return Err(crate::Error::config(format!(
            "Custom {} config cannot be null",
            kind
        )));
    }
    Ok(())
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Upper bound for a single backend call (in seconds)
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    /// How long a cached reputation report stays fresh (in seconds)
    ///
    /// `None` keeps cached reports forever; they are only replaced when the
    /// address is deleted and checked again.
    #[serde(default)]
    pub report_ttl_secs: Option<u64>,

    /// Perform backend reads but skip mutating calls
    #[serde(default)]
    pub dry_run: bool,
}

impl ServiceConfig {
    /// Validate the service configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.backend_timeout_secs == 0 {
            return Err(crate::Error::config("Backend timeout must be > 0"));
        }
        if self.report_ttl_secs == Some(0) {
            return Err(crate::Error::config(
                "Report TTL must be > 0 (omit it to keep reports forever)",
            ));
        }
        Ok(())
    }

    /// Backend timeout as a duration
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    /// Report TTL as a duration
    pub fn report_ttl(&self) -> Option<Duration> {
        self.report_ttl_secs.map(Duration::from_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            backend_timeout_secs: default_backend_timeout_secs(),
            report_ttl_secs: None,
            dry_run: false,
        }
    }
}

fn default_backend_timeout_secs() -> u64 {
    10
}

fn default_max_age_days() -> u32 {
    90
}
