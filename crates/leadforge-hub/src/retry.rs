//! Retry queue for enqueue failures against slow/full client queues.

use crate::client::{ClientHandle, ClientId};
use crate::config::HubConfig;
use crate::message::Envelope;
use crate::metrics::HubMetrics;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A single parked delivery, with the attempt count so far.
pub struct RetryItem {
    /// The client this was originally addressed to.
    pub client_id: ClientId,
    /// The envelope to redeliver.
    pub envelope: Envelope,
    /// Attempts made so far (starts at `1` for the first retry).
    pub attempt: u32,
}

/// Spawn the background retry worker. Backoff is exponential: attempt `n`
/// waits `base * n` before redelivery is attempted. A retry is attempted only if the target client is still
/// registered; on exhaustion the attempt is dropped with a logged error.
pub fn spawn_retry_worker(
    mut rx: mpsc::Receiver<RetryItem>,
    tx: mpsc::Sender<RetryItem>,
    clients: Arc<DashMap<ClientId, ClientHandle>>,
    metrics: Arc<HubMetrics>,
    config: HubConfig,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let item = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                item = rx.recv() => item,
            };
            let Some(item) = item else { break };

            let backoff = config.retry_backoff_base * item.attempt;
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(backoff) => {}
            }

            let Some(handle) = clients.get(&item.client_id) else {
                // Client disconnected while parked; nothing to redeliver.
                continue;
            };

            if handle.try_send(item.envelope.clone()) {
                metrics.record_retry_succeeded();
                continue;
            }
            drop(handle);

            if item.attempt >= config.max_retry_attempts {
                metrics.record_drop();
                tracing::error!(
                    client_id = %item.client_id,
                    attempts = item.attempt,
                    "retry queue exhausted, dropping event"
                );
                continue;
            }

            metrics.record_retry_queued();
            let next = RetryItem { attempt: item.attempt + 1, ..item };
            if tx.try_send(next).is_err() {
                metrics.record_drop();
                tracing::error!("retry queue saturated, dropping event without further attempts");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{NotificationLevel, OutboundMessage};
    use leadforge_types::ids::EventId;
    use std::time::Duration;

    fn envelope() -> Envelope {
        Envelope {
            id: EventId::new(),
            timestamp: chrono::Utc::now(),
            seq: 0,
            campaign_id: None,
            message: OutboundMessage::SystemNotification {
                level: NotificationLevel::Info,
                message: "hi".to_string(),
                category: "test".to_string(),
                actionable: false,
            },
        }
    }

    #[tokio::test]
    async fn redelivers_once_client_has_room() {
        let clients: Arc<DashMap<ClientId, ClientHandle>> = Arc::new(DashMap::new());
        let client_id = ClientId::new();
        let (client_tx, mut client_rx) = mpsc::channel(8);
        clients.insert(
            client_id,
            ClientHandle {
                sender: client_tx,
                subscriptions: crate::client::SubscriptionSet::default(),
                security: crate::client::SecurityContext::default(),
            },
        );

        let (tx, rx) = mpsc::channel(8);
        let metrics = Arc::new(HubMetrics::default());
        let cancel = CancellationToken::new();
        let mut config = HubConfig::default();
        config.retry_backoff_base = Duration::from_millis(1);
        let handle = spawn_retry_worker(rx, tx.clone(), clients, metrics, config, cancel.clone());

        tx.send(RetryItem { client_id, envelope: envelope(), attempt: 1 }).await.unwrap();

        let delivered = tokio::time::timeout(Duration::from_secs(1), client_rx.recv()).await;
        assert!(delivered.is_ok() && delivered.unwrap().is_some());

        cancel.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn drops_after_max_attempts_when_client_queue_stays_full() {
        let clients: Arc<DashMap<ClientId, ClientHandle>> = Arc::new(DashMap::new());
        let client_id = ClientId::new();
        let (client_tx, _client_rx) = mpsc::channel(1);
        // Fill the client's queue so every redelivery attempt fails.
        client_tx.try_send(envelope()).unwrap();
        clients.insert(
            client_id,
            ClientHandle {
                sender: client_tx,
                subscriptions: crate::client::SubscriptionSet::default(),
                security: crate::client::SecurityContext::default(),
            },
        );

        let (tx, rx) = mpsc::channel(8);
        let metrics = Arc::new(HubMetrics::default());
        let cancel = CancellationToken::new();
        let mut config = HubConfig::default();
        config.retry_backoff_base = Duration::from_millis(1);
        config.max_retry_attempts = 2;
        let handle = spawn_retry_worker(rx, tx.clone(), clients, Arc::clone(&metrics), config, cancel.clone());

        tx.send(RetryItem { client_id, envelope: envelope(), attempt: 1 }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(metrics.snapshot().drops, 1);

        cancel.cancel();
        let _ = handle.await;
    }
}
