// # Alerter Trait
//
// Defines the interface for notification sinks.
//
// Alerters are told about an action after it has been recorded and
// enforced. They are best-effort: a failing alerter is logged and skipped,
// never reported as the failure of the operation that triggered it.
//
// ## Implementations
//
// - Slack: `hbl-alerter-slack` crate
// - Channel: `hbl_core::ChannelAlerter` (in-process observers)

use async_trait::async_trait;

use crate::model::Alert;

/// Trait for notification sinks
#[async_trait]
pub trait Alerter: Send + Sync {
    /// Stable unique name (e.g. "Slack")
    fn name(&self) -> &str;

    /// Deliver one alert
    async fn alert(&self, alert: &Alert) -> Result<(), crate::Error>;
}

/// Helper trait for constructing alerters from configuration
pub trait AlerterFactory: Send + Sync {
    /// Create an Alerter instance from configuration
    fn create(
        &self,
        config: &crate::config::AlerterConfig,
    ) -> Result<std::sync::Arc<dyn Alerter>, crate::Error>;
}
