//! Environment configuration
//!
//! Every setting comes from an environment variable. Errors name the
//! variable that needs fixing.

use anyhow::{Context, Result, bail};
use hbl_core::{AlerterConfig, CheckerConfig, EndpointConfig, HblConfig, ServiceConfig, StoreConfig};
use std::str::FromStr;

const SUPPORTED_ENDPOINTS: &str = "cloudflare, powerdns";
const SUPPORTED_CHECKERS: &str = "abuseipdb";
const SUPPORTED_ALERTERS: &str = "slack";

/// Build an [`HblConfig`] from the process environment
pub fn from_env() -> Result<HblConfig> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Build an [`HblConfig`] from any key lookup
///
/// Empty values are treated as unset.
pub fn from_lookup<F>(lookup: F) -> Result<HblConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env(lookup);

    let config = HblConfig {
        store: store(&env)?,
        endpoints: env
            .list("HBL_ENDPOINTS")
            .iter()
            .map(|kind| endpoint(&env, kind))
            .collect::<Result<_>>()?,
        checkers: env
            .list("HBL_CHECKERS")
            .iter()
            .map(|kind| checker(&env, kind))
            .collect::<Result<_>>()?,
        alerters: env
            .list("HBL_ALERTERS")
            .iter()
            .map(|kind| alerter(&env, kind))
            .collect::<Result<_>>()?,
        service: service(&env)?,
    };

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str, context: &str) -> Result<String> {
        match self.get(key) {
            Some(value) => Ok(value),
            None => bail!(
                "{} is required when {}. Set it via: export {}=...",
                key,
                context,
                key
            ),
        }
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => match raw.parse() {
                Ok(value) => Ok(Some(value)),
                Err(e) => bail!("{} has an invalid value '{}': {}", key, raw, e),
            },
            None => Ok(None),
        }
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn store<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<StoreConfig> {
    let kind = env
        .get("HBL_STORE_TYPE")
        .unwrap_or_else(|| "file".to_string());

    match kind.to_lowercase().as_str() {
        "file" => Ok(StoreConfig::File {
            path: env.require("HBL_STORE_PATH", "HBL_STORE_TYPE=file")?,
        }),
        "memory" => Ok(StoreConfig::Memory),
        other => bail!(
            "HBL_STORE_TYPE '{}' is not supported. Supported types: file, memory",
            other
        ),
    }
}

fn endpoint<F: Fn(&str) -> Option<String>>(env: &Env<F>, kind: &str) -> Result<EndpointConfig> {
    match kind {
        "cloudflare" => {
            let when = "HBL_ENDPOINTS contains cloudflare";
            let api_token = env.get("CF_API_TOKEN");
            let api_email = env.get("CF_API_EMAIL");
            let api_key = env.get("CF_API_KEY");
            if api_token.is_none() && (api_email.is_none() || api_key.is_none()) {
                bail!("CF_API_TOKEN, or both CF_API_EMAIL and CF_API_KEY, are required when {}", when);
            }
            Ok(EndpointConfig::Cloudflare {
                account_id: env.require("CF_API_ACCOUNT", when)?,
                api_token,
                api_email,
                api_key,
            })
        }
        "powerdns" | "pdns" => {
            let when = "HBL_ENDPOINTS contains powerdns";
            Ok(EndpointConfig::PowerDns {
                base_url: env.require("PDNS_API_URL", when)?,
                zone: env.require("PDNS_API_ZONE", when)?,
                api_key: env.require("PDNS_API_KEY", when)?,
            })
        }
        other => bail!(
            "HBL_ENDPOINTS entry '{}' is not supported. Supported endpoints: {}",
            other,
            SUPPORTED_ENDPOINTS
        ),
    }
}

fn checker<F: Fn(&str) -> Option<String>>(env: &Env<F>, kind: &str) -> Result<CheckerConfig> {
    match kind {
        "abuseipdb" => Ok(CheckerConfig::AbuseIpDb {
            api_key: env.require("ABUSEIPDB_API_KEY", "HBL_CHECKERS contains abuseipdb")?,
            max_age_days: env.parse("ABUSEIPDB_MAX_AGE_DAYS")?.unwrap_or(90),
        }),
        other => bail!(
            "HBL_CHECKERS entry '{}' is not supported. Supported checkers: {}",
            other,
            SUPPORTED_CHECKERS
        ),
    }
}

fn alerter<F: Fn(&str) -> Option<String>>(env: &Env<F>, kind: &str) -> Result<AlerterConfig> {
    match kind {
        "slack" => Ok(AlerterConfig::Slack {
            webhook_url: env.require("SLACK_WEBHOOK_URL", "HBL_ALERTERS contains slack")?,
            channel: env.get("SLACK_WEBHOOK_CHANNEL"),
            username: env.get("SLACK_WEBHOOK_USERNAME"),
        }),
        other => bail!(
            "HBL_ALERTERS entry '{}' is not supported. Supported alerters: {}",
            other,
            SUPPORTED_ALERTERS
        ),
    }
}

fn service<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<ServiceConfig> {
    let defaults = ServiceConfig::default();

    let backend_timeout_secs = env
        .parse("HBL_BACKEND_TIMEOUT_SECS")?
        .unwrap_or(defaults.backend_timeout_secs);
    if !(1..=300).contains(&backend_timeout_secs) {
        bail!(
            "HBL_BACKEND_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
            backend_timeout_secs
        );
    }

    let report_ttl_secs: Option<u64> = env.parse("HBL_REPORT_TTL_SECS")?;
    if report_ttl_secs == Some(0) {
        bail!("HBL_REPORT_TTL_SECS must be > 0. Unset it to keep reports forever");
    }

    let dry_run = match env.get("HBL_MODE").as_deref().map(str::to_lowercase) {
        None => false,
        Some(mode) if mode == "live" => false,
        Some(mode) if mode == "dry-run" => true,
        Some(mode) => bail!(
            "HBL_MODE '{}' is not valid. Valid modes: live, dry-run",
            mode
        ),
    };

    Ok(ServiceConfig {
        backend_timeout_secs,
        report_ttl_secs,
        dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_memory_store_without_backends() {
        let config = from_lookup(lookup(&[("HBL_STORE_TYPE", "memory")])).unwrap();
        assert!(matches!(config.store, StoreConfig::Memory));
        assert!(config.endpoints.is_empty());
        assert!(!config.service.dry_run);
        assert_eq!(config.service.backend_timeout_secs, 10);
    }

    #[test]
    fn test_file_store_requires_path() {
        let err = from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("HBL_STORE_PATH"));
    }

    #[test]
    fn test_full_backend_set() {
        let config = from_lookup(lookup(&[
            ("HBL_STORE_TYPE", "file"),
            ("HBL_STORE_PATH", "/var/lib/hbl/store.json"),
            ("HBL_ENDPOINTS", "cloudflare, PowerDNS"),
            ("HBL_CHECKERS", "abuseipdb"),
            ("HBL_ALERTERS", "slack"),
            ("CF_API_ACCOUNT", "acct-1"),
            ("CF_API_TOKEN", "cf-token"),
            ("PDNS_API_URL", "http://127.0.0.1:8081/api/v1/servers/localhost"),
            ("PDNS_API_ZONE", "rbl.example.net"),
            ("PDNS_API_KEY", "pdns-key"),
            ("ABUSEIPDB_API_KEY", "abuse-key"),
            ("ABUSEIPDB_MAX_AGE_DAYS", "30"),
            ("SLACK_WEBHOOK_URL", "https://hooks.slack.com/services/T/B/X"),
            ("HBL_REPORT_TTL_SECS", "3600"),
            ("HBL_MODE", "dry-run"),
        ]))
        .unwrap();

        let endpoints: Vec<&str> = config.endpoints.iter().map(|e| e.type_name()).collect();
        assert_eq!(endpoints, vec!["cloudflare", "powerdns"]);
        assert!(matches!(
            config.checkers[0],
            CheckerConfig::AbuseIpDb { max_age_days: 30, .. }
        ));
        assert_eq!(config.alerters[0].type_name(), "slack");
        assert_eq!(config.service.report_ttl_secs, Some(3600));
        assert!(config.service.dry_run);
    }

    #[test]
    fn test_errors_name_the_variable() {
        let base = [("HBL_STORE_TYPE", "memory")];

        let err = from_lookup(lookup(&[base[0], ("HBL_ENDPOINTS", "powerdns")])).unwrap_err();
        assert!(err.to_string().contains("PDNS_API_URL"));

        let err = from_lookup(lookup(&[
            base[0],
            ("HBL_CHECKERS", "abuseipdb"),
            ("ABUSEIPDB_API_KEY", "k"),
            ("ABUSEIPDB_MAX_AGE_DAYS", "thirty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("ABUSEIPDB_MAX_AGE_DAYS"));

        let err = from_lookup(lookup(&[base[0], ("HBL_MODE", "yolo")])).unwrap_err();
        assert!(err.to_string().contains("HBL_MODE"));

        let err = from_lookup(lookup(&[base[0], ("HBL_ENDPOINTS", "route53")])).unwrap_err();
        assert!(err.to_string().contains("HBL_ENDPOINTS"));
    }

    #[test]
    fn test_cloudflare_key_pair_auth() {
        let config = from_lookup(lookup(&[
            ("HBL_STORE_TYPE", "memory"),
            ("HBL_ENDPOINTS", "cloudflare"),
            ("CF_API_ACCOUNT", "acct-1"),
            ("CF_API_EMAIL", "ops@example.com"),
            ("CF_API_KEY", "global-key"),
        ]))
        .unwrap();
        assert!(matches!(
            &config.endpoints[0],
            EndpointConfig::Cloudflare { api_token: None, .. }
        ));

        let err = from_lookup(lookup(&[
            ("HBL_STORE_TYPE", "memory"),
            ("HBL_ENDPOINTS", "cloudflare"),
            ("CF_API_ACCOUNT", "acct-1"),
            ("CF_API_EMAIL", "ops@example.com"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("CF_API_TOKEN"));
    }
}
