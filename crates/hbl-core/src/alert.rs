use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::Result;
use crate::model::Alert;
use crate::traits::Alerter;

/// Alerter that forwards alerts into a bounded channel
///
/// Lets an embedding application observe completed actions. When the
/// receiver lags behind and the channel is full, the alert is dropped and
/// logged; the operation that produced it is never slowed down.
pub struct ChannelAlerter {
    tx: mpsc::Sender<Alert>,
}

impl ChannelAlerter {
    /// Create the alerter and the receiving end of its channel
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Alert>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Alerter for ChannelAlerter {
    fn name(&self) -> &str {
        "Channel"
    }

    async fn alert(&self, alert: &Alert) -> Result<()> {
        match self.tx.try_send(alert.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(ip = %dropped.ip, action = %dropped.action, "Alert channel full, dropping alert");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Alert receiver dropped, discarding alert");
            }
        }
        Ok(())
    }
}
