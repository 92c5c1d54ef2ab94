use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{DEFAULT_BACKEND_TIMEOUT, Registry, bounded};
use crate::model::Alert;
use crate::traits::Alerter;

/// Registry of notification sinks
///
/// Delivery is best-effort. A failing or slow alerter is logged and the
/// remaining alerters still receive the alert.
pub struct AlerterRegistry {
    inner: Registry<dyn Alerter>,
    timeout: Duration,
}

impl AlerterRegistry {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_BACKEND_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Registry::new("alerter"),
            timeout,
        }
    }

    /// Register an alerter under its own name; first registration wins
    pub fn register(&self, alerter: Arc<dyn Alerter>) -> bool {
        let name = alerter.name().to_string();
        self.inner.register(&name, alerter)
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.names()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `alert` to every alerter
    ///
    /// Returns the number of alerters that accepted it.
    pub async fn alert_on_all(&self, alert: &Alert) -> usize {
        let mut delivered = 0;

        for alerter in self.inner.snapshot() {
            let name = alerter.name();
            match bounded(name, self.timeout, alerter.alert(alert)).await {
                Ok(()) => {
                    debug!(alerter = name, ip = %alert.ip, action = %alert.action, "Alert delivered");
                    delivered += 1;
                }
                Err(e) => {
                    warn!(alerter = name, ip = %alert.ip, action = %alert.action, "Alert failed: {}", e);
                }
            }
        }

        delivered
    }
}

impl Default for AlerterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::model::AlertAction;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Sink {
        name: &'static str,
        fail: bool,
        seen: AtomicUsize,
    }

    #[async_trait]
    impl Alerter for Sink {
        fn name(&self) -> &str {
            self.name
        }

        async fn alert(&self, _alert: &Alert) -> Result<()> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::http("webhook returned 500"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failing_alerter_does_not_stop_delivery() {
        let broken = Arc::new(Sink { name: "broken", fail: true, seen: AtomicUsize::new(0) });
        let healthy = Arc::new(Sink { name: "healthy", fail: false, seen: AtomicUsize::new(0) });

        let registry = AlerterRegistry::new();
        registry.register(broken.clone());
        registry.register(healthy.clone());

        let alert = Alert {
            ip: "198.51.100.1".parse().unwrap(),
            action: AlertAction::Block,
            author: "ops".to_string(),
            comment: "scanner".to_string(),
        };

        assert_eq!(registry.alert_on_all(&alert).await, 1);
        assert_eq!(broken.seen.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.seen.load(Ordering::SeqCst), 1);
    }
}
