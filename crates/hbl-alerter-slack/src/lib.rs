// # Slack Alerter
//
// Posts one message per completed action to a Slack incoming webhook.
//
// The webhook URL is a secret and never appears in logs or `Debug` output.

use async_trait::async_trait;
use hbl_core::config::AlerterConfig;
use hbl_core::traits::{Alerter, AlerterFactory};
use hbl_core::{Alert, Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

const ALERTER_NAME: &str = "Slack";

/// Slack webhook alerter
pub struct SlackAlerter {
    webhook_url: String,
    channel: Option<String>,
    username: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for SlackAlerter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackAlerter")
            .field("webhook_url", &"<REDACTED>")
            .field("channel", &self.channel)
            .field("username", &self.username)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    /// Notification fallback for clients that do not render blocks
    text: String,
    blocks: Vec<SectionBlock>,
}

#[derive(Debug, Serialize)]
struct SectionBlock {
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextObject,
    fields: Vec<TextObject>,
}

#[derive(Debug, Serialize)]
struct TextObject {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

impl TextObject {
    fn markdown(text: impl Into<String>) -> Self {
        Self {
            kind: "mrkdwn",
            text: text.into(),
        }
    }
}

impl SlackAlerter {
    pub fn new(
        webhook_url: impl Into<String>,
        channel: Option<String>,
        username: Option<String>,
    ) -> Result<Self> {
        let webhook_url = webhook_url.into();
        if !webhook_url.starts_with("https://") {
            return Err(Error::config("Slack webhook URL must use HTTPS"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            webhook_url,
            channel: channel.filter(|c| !c.is_empty()),
            username: username.filter(|u| !u.is_empty()),
            client,
        })
    }

    fn message<'a>(&'a self, alert: &Alert) -> WebhookMessage<'a> {
        let headline = format!(
            "Received a new *{}* action for the following address.",
            alert.action.as_str().to_uppercase()
        );

        WebhookMessage {
            username: self.username.as_deref(),
            channel: self.channel.as_deref(),
            text: format!("{} action for {}", alert.action, alert.ip),
            blocks: vec![SectionBlock {
                kind: "section",
                text: TextObject::markdown(headline),
                fields: vec![
                    TextObject::markdown(format!("*IP*\n{}", alert.ip)),
                    TextObject::markdown(format!("*Author*\n{}", alert.author)),
                    TextObject::markdown(format!("*Reason*\n{}", alert.comment)),
                ],
            }],
        }
    }
}

#[async_trait]
impl Alerter for SlackAlerter {
    fn name(&self) -> &str {
        ALERTER_NAME
    }

    async fn alert(&self, alert: &Alert) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.message(alert))
            .send()
            .await
            .map_err(|e| Error::http(format!("Slack webhook request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(
                "slack",
                format!("Webhook returned {}: {}", status, body),
            ));
        }

        tracing::debug!(ip = %alert.ip, action = %alert.action, "Slack alert posted");
        Ok(())
    }
}

/// Factory for creating Slack alerters
pub struct SlackFactory;

impl AlerterFactory for SlackFactory {
    fn create(&self, config: &AlerterConfig) -> Result<Arc<dyn Alerter>> {
        match config {
            AlerterConfig::Slack {
                webhook_url,
                channel,
                username,
            } => Ok(Arc::new(SlackAlerter::new(
                webhook_url.clone(),
                channel.clone(),
                username.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for Slack alerter")),
        }
    }
}

/// Register the Slack alerter factory
pub fn register(registry: &hbl_core::FactoryRegistry) {
    registry.register_alerter_factory("slack", Box::new(SlackFactory));
}
