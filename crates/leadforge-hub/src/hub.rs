//! The broadcast hub itself (component F).
//!
//! Cyclic-dependency note: the hub depends on the orchestrator
//! only through the minimal [`EventSink`]/[`ProgressSnapshotSource`] seams;
//! it never imports orchestrator internals. Likewise it depends on the
//! proxy pool only through [`ProxyStatusSink`].

use crate::client::{ClientHandle, ClientId, SecurityContext, SubscriptionSet};
use crate::config::HubConfig;
use crate::message::{
    CampaignListAction, Envelope, InboundMessage, OutboundMessage, SubscriptionTarget,
};
use crate::metrics::{HubMetrics, HubMetricsSnapshot};
use crate::ring::CampaignChannel;
use crate::retry::{spawn_retry_worker, RetryItem};
use async_trait::async_trait;
use dashmap::DashMap;
use leadforge_orchestrator::events::{EventSink, OrchestratorEvent, ProgressSnapshotSource};
use leadforge_proxy::sink::{ProxyStatusChange, ProxyStatusSink};
use leadforge_types::ids::CampaignId;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors specific to the hub's own wire-level plumbing. These are pure
/// transport concerns, not among the shared error kinds the rest of the
/// workspace uses.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// An inbound frame's `type` or shape could not be interpreted.
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// Real-time broadcast hub: client registry, campaign-scoped fan-out,
/// sequencing/dedup/retry, and late-join resync.
pub struct BroadcastHub {
    config: HubConfig,
    clients: Arc<DashMap<ClientId, ClientHandle>>,
    campaigns: DashMap<CampaignId, Mutex<CampaignChannel>>,
    metrics: Arc<HubMetrics>,
    retry_tx: mpsc::Sender<RetryItem>,
    snapshot_source: Arc<dyn ProgressSnapshotSource>,
    _retry_worker: tokio::task::JoinHandle<()>,
}

impl BroadcastHub {
    /// Build a hub wired to `snapshot_source` for late-join resync. The
    /// retry worker is spawned immediately and tied to `shutdown` for
    /// cooperative cancellation.
    #[must_use]
    pub fn new(
        config: HubConfig,
        snapshot_source: Arc<dyn ProgressSnapshotSource>,
        shutdown: CancellationToken,
    ) -> Self {
        let clients: Arc<DashMap<ClientId, ClientHandle>> = Arc::new(DashMap::new());
        let metrics = Arc::new(HubMetrics::default());
        let (retry_tx, retry_rx) = mpsc::channel(1024);
        let retry_worker = spawn_retry_worker(
            retry_rx,
            retry_tx.clone(),
            Arc::clone(&clients),
            Arc::clone(&metrics),
            config.clone(),
            shutdown,
        );
        Self {
            config,
            clients,
            campaigns: DashMap::new(),
            metrics,
            retry_tx,
            snapshot_source,
            _retry_worker: retry_worker,
        }
    }

    /// Register a new client connection. Returns its id and the receiving
    /// half of its outbound queue; the transport layer owns pumping that
    /// receiver onto the wire.
    pub fn register(&self, security: SecurityContext) -> (ClientId, mpsc::Receiver<Envelope>) {
        let client_id = ClientId::new();
        let (sender, receiver) = mpsc::channel(self.config.client_queue_capacity);
        self.clients.insert(
            client_id,
            ClientHandle { sender, subscriptions: SubscriptionSet::default(), security },
        );
        self.metrics.record_register();
        tracing::info!(%client_id, "client registered");
        (client_id, receiver)
    }

    /// Unregister a client. Idempotent: unregistering an unknown or
    /// already-removed id is a no-op.
    pub fn unregister(&self, client_id: ClientId) {
        if self.clients.remove(&client_id).is_some() {
            self.metrics.record_unregister();
            tracing::info!(%client_id, "client unregistered");
        }
    }

    /// Handle an inbound frame from a registered client.
    /// Subscribing to a specific campaign triggers an immediate late-join
    /// resync to that client alone before any further live events are
    /// delivered to it for that campaign.
    pub async fn handle_inbound(&self, client_id: ClientId, message: InboundMessage) -> Result<(), HubError> {
        match message {
            InboundMessage::ConnectionInit | InboundMessage::Ping => Ok(()),
            InboundMessage::Subscribe { channels } => {
                let mut targets = Vec::with_capacity(channels.len());
                for channel in &channels {
                    match crate::message::parse_channel(channel) {
                        Some(target) => targets.push(target),
                        None => return Err(HubError::BadRequest(format!("unrecognized channel: {channel}"))),
                    }
                }
                for target in targets {
                    match target {
                        SubscriptionTarget::Wildcard => self.subscribe_wildcard(client_id),
                        SubscriptionTarget::Campaign(campaign_id) => {
                            self.subscribe_campaign(client_id, campaign_id);
                            self.send_state_sync(client_id, campaign_id).await;
                        }
                    }
                }
                Ok(())
            }
            InboundMessage::SubscribeCampaign { campaign_id } => {
                self.subscribe_campaign(client_id, campaign_id);
                self.send_state_sync(client_id, campaign_id).await;
                Ok(())
            }
            InboundMessage::UnsubscribeCampaign { campaign_id } => {
                if let Some(mut entry) = self.clients.get_mut(&client_id) {
                    entry.subscriptions.unsubscribe_campaign(campaign_id);
                }
                Ok(())
            }
        }
    }

    fn subscribe_wildcard(&self, client_id: ClientId) {
        if let Some(mut entry) = self.clients.get_mut(&client_id) {
            entry.subscriptions.subscribe_wildcard();
        }
    }

    fn subscribe_campaign(&self, client_id: ClientId, campaign_id: CampaignId) {
        if let Some(mut entry) = self.clients.get_mut(&client_id) {
            entry.subscriptions.subscribe_campaign(campaign_id);
        }
    }

    /// Late-join resync: pull a fresh progress snapshot and deliver it plus
    /// a completion marker to `client_id` alone. Delivery
    /// failures here follow the same slow-client policy as any other send.
    async fn send_state_sync(&self, client_id: ClientId, campaign_id: CampaignId) {
        let snapshot = match self.snapshot_source.snapshot(campaign_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::error!(%client_id, %campaign_id, error = %err, "failed to build late-join snapshot");
                return;
            }
        };
        let seq = self.campaigns.get(&campaign_id).map_or(0, |c| c.lock().current_seq());
        let progress = Envelope {
            id: leadforge_types::ids::EventId::new(),
            timestamp: chrono::Utc::now(),
            seq,
            campaign_id: Some(campaign_id),
            message: OutboundMessage::CampaignProgress(snapshot),
        };
        self.deliver_to_one(client_id, progress);
        let complete = Envelope {
            id: leadforge_types::ids::EventId::new(),
            timestamp: chrono::Utc::now(),
            seq,
            campaign_id: Some(campaign_id),
            message: OutboundMessage::CampaignStateSyncComplete { campaign_id },
        };
        self.deliver_to_one(client_id, complete);
    }

    /// Recover events a client missed while disconnected: every ring-
    /// retained event for `campaign_id` with `seq > last_seq`.
    #[must_use]
    pub fn recover_missed(&self, campaign_id: CampaignId, last_seq: u64) -> Vec<Envelope> {
        self.campaigns.get(&campaign_id).map(|c| c.lock().events_since(last_seq)).unwrap_or_default()
    }

    /// Broadcast a message scoped to one campaign to every subscribed
    /// client (specific subscription or wildcard). A full client queue does
    /// not block the hub: the client is unregistered and the message is
    /// parked on the retry queue.
    pub fn broadcast_to_campaign(&self, campaign_id: CampaignId, message: OutboundMessage) {
        let channel_entry =
            self.campaigns.entry(campaign_id).or_insert_with(|| Mutex::new(CampaignChannel::new(self.config.ring_capacity)));
        let envelope = channel_entry.lock().record(campaign_id, message);
        let Some(envelope) = envelope else {
            return; // duplicate, already delivered under an earlier seq
        };
        self.deliver(envelope, |subs| subs.matches(campaign_id));
    }

    /// Broadcast a message to every registered client regardless of
    /// subscriptions (e.g. `system.notification`), with the same
    /// slow-client policy.
    pub fn broadcast_all(&self, message: OutboundMessage) {
        let envelope = Envelope {
            id: leadforge_types::ids::EventId::new(),
            timestamp: chrono::Utc::now(),
            seq: 0,
            campaign_id: message.campaign_id(),
            message,
        };
        self.deliver(envelope, |_| true);
    }

    /// Snapshot the matching client ids first so delivery never holds the
    /// registry lock while sending.
    fn deliver(&self, envelope: Envelope, matches: impl Fn(&SubscriptionSet) -> bool) {
        let targets: Vec<ClientId> =
            self.clients.iter().filter(|entry| matches(&entry.value().subscriptions)).map(|entry| *entry.key()).collect();
        for client_id in targets {
            self.deliver_to_one(client_id, envelope.clone());
        }
    }

    fn deliver_to_one(&self, client_id: ClientId, envelope: Envelope) {
        let Some(handle) = self.clients.get(&client_id) else { return };
        if handle.try_send(envelope.clone()) {
            self.metrics.record_sent();
            return;
        }
        drop(handle);
        // Queue full: do not block the hub. Unregister the slow client and
        // park the message on the retry queue.
        self.unregister(client_id);
        self.metrics.record_retry_queued();
        if self.retry_tx.try_send(RetryItem { client_id, envelope, attempt: 1 }).is_err() {
            self.metrics.record_drop();
            tracing::error!(%client_id, "retry queue saturated, dropping event immediately");
        }
    }

    /// Point-in-time metrics snapshot.
    #[must_use]
    pub fn metrics(&self) -> HubMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of currently registered clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

#[async_trait]
impl EventSink for BroadcastHub {
    async fn emit(&self, event: OrchestratorEvent) {
        match event {
            OrchestratorEvent::CampaignProgress(snapshot) => {
                let campaign_id = snapshot.campaign_id;
                self.broadcast_to_campaign(campaign_id, OutboundMessage::CampaignProgress(snapshot));
            }
            OrchestratorEvent::CampaignStatus { campaign_id, state, reason, error_code } => {
                self.broadcast_to_campaign(
                    campaign_id,
                    OutboundMessage::CampaignStatus { campaign_id, state, reason, error_code },
                );
            }
            OrchestratorEvent::PhaseTransition(transition) => {
                let campaign_id = transition.campaign_id;
                self.broadcast_to_campaign(campaign_id, OutboundMessage::CampaignPhaseTransition(transition));
            }
        }
    }
}

#[async_trait]
impl ProxyStatusSink for BroadcastHub {
    async fn proxy_status_changed(&self, change: ProxyStatusChange) {
        let ProxyStatusChange { proxy_id, is_healthy, is_active } = change;
        self.broadcast_all(OutboundMessage::ProxyStatus {
            proxy_id,
            status: if is_active { "active".to_string() } else { "inactive".to_string() },
            health: is_healthy,
            response_time_ms: None,
        });
    }
}

/// Publish a `campaign.list.update` event to every client.
/// Not gated by campaign subscription since list-level changes are global.
pub fn campaign_list_update(
    hub: &BroadcastHub,
    action: CampaignListAction,
    campaign_id: Option<CampaignId>,
    campaign: Option<serde_json::Value>,
) {
    hub.broadcast_all(OutboundMessage::CampaignListUpdate { action, campaign_id, campaign });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::NotificationLevel;
    use async_trait::async_trait as async_trait_attr;
    use leadforge_orchestrator::events::CampaignProgressSnapshot;
    use leadforge_types::enums::{PhaseKind, PhaseStatus};
    use std::time::Duration;

    struct StubSnapshotSource;

    #[async_trait_attr]
    impl ProgressSnapshotSource for StubSnapshotSource {
        async fn snapshot(&self, campaign_id: CampaignId) -> leadforge_types::Result<CampaignProgressSnapshot> {
            Ok(CampaignProgressSnapshot {
                campaign_id,
                total_items: 10,
                processed_items: 5,
                successful_items: 2,
                failed_items: 3,
                progress_percent: 50.0,
                current_phase: PhaseKind::DnsValidation,
                phase_status: PhaseStatus::InProgress,
            })
        }
    }

    fn hub() -> BroadcastHub {
        BroadcastHub::new(HubConfig::default(), Arc::new(StubSnapshotSource), CancellationToken::new())
    }

    #[tokio::test]
    async fn register_and_unregister_is_idempotent() {
        let hub = hub();
        let (client_id, _rx) = hub.register(SecurityContext::default());
        assert_eq!(hub.client_count(), 1);
        hub.unregister(client_id);
        assert_eq!(hub.client_count(), 0);
        hub.unregister(client_id); // idempotent
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn subscribed_client_receives_campaign_broadcast() {
        let hub = hub();
        let (client_id, mut rx) = hub.register(SecurityContext::default());
        let campaign_id = CampaignId::new();
        hub.handle_inbound(client_id, InboundMessage::SubscribeCampaign { campaign_id }).await.unwrap();

        // Late-join resync: progress snapshot then completion marker.
        let first = rx.recv().await.unwrap();
        assert!(matches!(first.message, OutboundMessage::CampaignProgress(_)));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second.message, OutboundMessage::CampaignStateSyncComplete { .. }));

        hub.broadcast_to_campaign(
            campaign_id,
            OutboundMessage::SystemNotification {
                level: NotificationLevel::Info,
                message: "hello".to_string(),
                category: "test".to_string(),
                actionable: false,
            },
        );
        let live = rx.recv().await.unwrap();
        assert!(matches!(live.message, OutboundMessage::SystemNotification { .. }));
    }

    #[tokio::test]
    async fn unsubscribed_client_does_not_receive_campaign_broadcast() {
        let hub = hub();
        let (_client_id, mut rx) = hub.register(SecurityContext::default());
        let campaign_id = CampaignId::new();
        hub.broadcast_to_campaign(
            campaign_id,
            OutboundMessage::SystemNotification {
                level: NotificationLevel::Info,
                message: "hello".to_string(),
                category: "test".to_string(),
                actionable: false,
            },
        );
        let received = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(received.is_err(), "unsubscribed client should not receive campaign-scoped events");
    }

    #[tokio::test]
    async fn wildcard_subscriber_receives_every_campaign() {
        let hub = hub();
        let (client_id, mut rx) = hub.register(SecurityContext::default());
        hub.handle_inbound(client_id, InboundMessage::Subscribe { channels: vec!["*".to_string()] })
            .await
            .unwrap();
        hub.broadcast_to_campaign(
            CampaignId::new(),
            OutboundMessage::SystemNotification {
                level: NotificationLevel::Info,
                message: "hello".to_string(),
                category: "test".to_string(),
                actionable: false,
            },
        );
        let received = rx.recv().await.unwrap();
        assert!(matches!(received.message, OutboundMessage::SystemNotification { .. }));
    }

    #[tokio::test]
    async fn full_queue_unregisters_client_and_queues_retry() {
        let mut config = HubConfig::default();
        config.client_queue_capacity = 1;
        let hub = BroadcastHub::new(config, Arc::new(StubSnapshotSource), CancellationToken::new());
        let (client_id, _rx) = hub.register(SecurityContext::default());
        let campaign_id = CampaignId::new();
        hub.subscribe_campaign(client_id, campaign_id);

        // Fill the client's queue with one event so the next send overflows.
        hub.broadcast_to_campaign(
            campaign_id,
            OutboundMessage::SystemNotification {
                level: NotificationLevel::Info,
                message: "first".to_string(),
                category: "test".to_string(),
                actionable: false,
            },
        );
        hub.broadcast_to_campaign(
            campaign_id,
            OutboundMessage::SystemNotification {
                level: NotificationLevel::Info,
                message: "second".to_string(),
                category: "test".to_string(),
                actionable: false,
            },
        );

        assert_eq!(hub.client_count(), 0, "slow client must be unregistered before broadcast returns");
        assert_eq!(hub.metrics().retries_queued, 1);
    }

    #[tokio::test]
    async fn recover_missed_replays_only_events_after_last_seq() {
        let hub = hub();
        let campaign_id = CampaignId::new();
        for i in 0..3 {
            hub.broadcast_to_campaign(
                campaign_id,
                OutboundMessage::SystemNotification {
                    level: NotificationLevel::Info,
                    message: format!("event-{i}"),
                    category: "test".to_string(),
                    actionable: false,
                },
            );
        }
        let recovered = hub.recover_missed(campaign_id, 1);
        assert_eq!(recovered.len(), 2);
        assert_eq!(recovered[0].seq, 2);
        assert_eq!(recovered[1].seq, 3);
    }

    #[tokio::test]
    async fn duplicate_event_is_not_delivered_twice() {
        let hub = hub();
        let (client_id, mut rx) = hub.register(SecurityContext::default());
        let campaign_id = CampaignId::new();
        hub.subscribe_campaign(client_id, campaign_id);

        let make = || OutboundMessage::SystemNotification {
            level: NotificationLevel::Info,
            message: "same".to_string(),
            category: "test".to_string(),
            actionable: false,
        };
        hub.broadcast_to_campaign(campaign_id, make());
        hub.broadcast_to_campaign(campaign_id, make());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.seq, 1);
        let nothing = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(nothing.is_err(), "duplicate event must be dropped, not redelivered");
    }
}
