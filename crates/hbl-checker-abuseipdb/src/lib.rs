// # AbuseIPDB Source
//
// Remote half of the AbuseIPDB checker: one `GET /check` per call, mapped
// into a `ReputationReport`. Caching is applied by `hbl_core::CachingChecker`.
//
// ## API Reference
//
// - Check endpoint: GET `/api/v2/check?ipAddress=...&maxAgeInDays=...`
// - Headers: `Key: <api key>`, `Accept: application/json`
// - https://docs.abuseipdb.com/#check-endpoint

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hbl_core::config::CheckerConfig;
use hbl_core::traits::{ReputationSource, SourceFactory};
use hbl_core::{Error, ReputationReport, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// AbuseIPDB API base URL
const ABUSEIPDB_API_BASE: &str = "https://api.abuseipdb.com/api/v2";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

const SOURCE_NAME: &str = "AbuseIPDB";

/// AbuseIPDB API response
#[derive(Debug, Deserialize)]
struct CheckResponse {
    data: CheckData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckData {
    abuse_confidence_score: u8,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    usage_type: Option<String>,
    #[serde(default)]
    isp: Option<String>,
    #[serde(default)]
    total_reports: u32,
    #[serde(default)]
    num_distinct_users: u32,
    #[serde(default)]
    last_reported_at: Option<DateTime<Utc>>,
}

impl CheckData {
    fn into_report(self, ip: IpAddr) -> ReputationReport {
        ReputationReport {
            ip,
            abuse_confidence_score: self.abuse_confidence_score.min(100),
            country_code: self.country_code,
            usage_type: self.usage_type,
            isp: self.isp,
            total_reports: self.total_reports,
            num_distinct_users: self.num_distinct_users,
            last_reported_at: self.last_reported_at,
            fetched_at: Utc::now(),
        }
    }
}

/// AbuseIPDB reputation source
pub struct AbuseIpDbSource {
    api_key: String,
    max_age_days: u32,
    base_url: String,
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for AbuseIpDbSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbuseIpDbSource")
            .field("api_key", &"<REDACTED>")
            .field("max_age_days", &self.max_age_days)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AbuseIpDbSource {
    pub fn new(api_key: impl Into<String>, max_age_days: u32) -> Result<Self> {
        Self::with_base_url(api_key, max_age_days, ABUSEIPDB_API_BASE)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        max_age_days: u32,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("AbuseIPDB API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            max_age_days,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn check_url(&self) -> String {
        format!("{}/check", self.base_url)
    }
}

fn error_for_status(status: StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!("AbuseIPDB rejected the API key. Status: {}", status)),
        422 => Error::invalid_input(format!("AbuseIPDB rejected the request: {}", body)),
        429 => Error::rate_limited("AbuseIPDB daily check quota exceeded"),
        _ => Error::provider("abuseipdb", format!("HTTP {}: {}", status, body)),
    }
}

#[async_trait]
impl ReputationSource for AbuseIpDbSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self, ip: IpAddr) -> Result<ReputationReport> {
        tracing::debug!(ip = %ip, "Querying AbuseIPDB");

        let address = ip.to_string();
        let max_age = self.max_age_days.to_string();
        let response = self
            .client
            .get(self.check_url())
            .query(&[("ipAddress", address.as_str()), ("maxAgeInDays", max_age.as_str())])
            .header("Key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider("abuseipdb", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!("AbuseIPDB rate limit exceeded");
            }
            return Err(error_for_status(status, &body));
        }

        let parsed: CheckResponse = response
            .json()
            .await
            .map_err(|e| Error::provider("abuseipdb", format!("Failed to parse response: {}", e)))?;

        let report = parsed.data.into_report(ip);
        tracing::debug!(ip = %ip, score = report.abuse_confidence_score, "AbuseIPDB report received");
        Ok(report)
    }
}

/// Factory for creating AbuseIPDB sources
pub struct AbuseIpDbFactory;

impl SourceFactory for AbuseIpDbFactory {
    fn create(&self, config: &CheckerConfig) -> Result<Arc<dyn ReputationSource>> {
        match config {
            CheckerConfig::AbuseIpDb {
                api_key,
                max_age_days,
            } => Ok(Arc::new(AbuseIpDbSource::new(api_key.clone(), *max_age_days)?)),
            _ => Err(Error::config("Invalid config for AbuseIPDB checker")),
        }
    }
}

/// Register the AbuseIPDB source factory
pub fn register(registry: &hbl_core::FactoryRegistry) {
    registry.register_source_factory("abuseipdb", Box::new(AbuseIpDbFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_mapping() {
        let body = serde_json::json!({
            "data": {
                "ipAddress": "118.25.6.39",
                "isPublic": true,
                "ipVersion": 4,
                "isWhitelisted": false,
                "abuseConfidenceScore": 100,
                "countryCode": "CN",
                "usageType": "Data Center/Web Hosting/Transit",
                "isp": "Tencent Cloud Computing (Beijing) Co. Ltd",
                "domain": "tencent.com",
                "hostnames": [],
                "totalReports": 1,
                "numDistinctUsers": 1,
                "lastReportedAt": "2018-12-20T20:55:14+00:00"
            }
        });

        let parsed: CheckResponse = serde_json::from_value(body).unwrap();
        let ip: IpAddr = "118.25.6.39".parse().unwrap();
        let report = parsed.data.into_report(ip);

        assert_eq!(report.ip, ip);
        assert_eq!(report.abuse_confidence_score, 100);
        assert_eq!(report.country_code.as_deref(), Some("CN"));
        assert_eq!(report.total_reports, 1);
        assert_eq!(
            report.last_reported_at.unwrap().to_rfc3339(),
            "2018-12-20T20:55:14+00:00"
        );
    }

    #[test]
    fn test_never_reported_address() {
        let body = serde_json::json!({
            "data": {
                "ipAddress": "192.0.2.1",
                "abuseConfidenceScore": 0,
                "countryCode": null,
                "usageType": null,
                "isp": null,
                "totalReports": 0,
                "numDistinctUsers": 0,
                "lastReportedAt": null
            }
        });

        let parsed: CheckResponse = serde_json::from_value(body).unwrap();
        let report = parsed.data.into_report("192.0.2.1".parse().unwrap());
        assert!(report.last_reported_at.is_none());
        assert!(report.isp.is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, ""),
            Error::RateLimited(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, ""),
            Error::Authentication(_)
        ));
    }

    #[test]
    fn test_factory_and_redaction() {
        let config = CheckerConfig::AbuseIpDb {
            api_key: "abuse-secret".to_string(),
            max_age_days: 30,
        };
        let source = AbuseIpDbFactory.create(&config).unwrap();
        assert_eq!(source.name(), "AbuseIPDB");

        let direct = AbuseIpDbSource::new("abuse-secret", 30).unwrap();
        assert_eq!(direct.check_url(), "https://api.abuseipdb.com/api/v2/check");
        assert!(!format!("{:?}", direct).contains("abuse-secret"));
        assert!(AbuseIpDbSource::new("", 30).is_err());
    }
}
