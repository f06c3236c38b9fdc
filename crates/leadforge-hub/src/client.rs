//! Per-client registration state.

use crate::message::Envelope;
use leadforge_types::ids::CampaignId;
use std::collections::HashSet;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque per-connection client identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Generate a fresh client id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A client's subscription set: specific campaigns plus an optional
/// wildcard.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionSet {
    campaigns: HashSet<CampaignId>,
    wildcard: bool,
}

impl SubscriptionSet {
    /// Add a specific campaign to the set.
    pub fn subscribe_campaign(&mut self, campaign_id: CampaignId) {
        self.campaigns.insert(campaign_id);
    }

    /// Remove a specific campaign from the set.
    pub fn unsubscribe_campaign(&mut self, campaign_id: CampaignId) {
        self.campaigns.remove(&campaign_id);
    }

    /// Subscribe to every campaign (the `"*"` wildcard channel).
    pub fn subscribe_wildcard(&mut self) {
        self.wildcard = true;
    }

    /// Whether this set would receive an event scoped to `campaign_id`.
    #[must_use]
    pub fn matches(&self, campaign_id: CampaignId) -> bool {
        self.wildcard || self.campaigns.contains(&campaign_id)
    }

    /// Whether this set subscribes to the wildcard channel.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.wildcard
    }

    /// The specific campaigns in this set (excludes the wildcard flag).
    #[must_use]
    pub fn campaigns(&self) -> &HashSet<CampaignId> {
        &self.campaigns
    }
}

/// Security/auth context attached to a client connection. Concrete identity
/// and session handling are external collaborators; the hub
/// only carries an opaque label for logging and audit.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    /// Opaque principal label, if the transport layer supplied one.
    pub principal: Option<String>,
}

/// A registered client: its outbound queue and its current subscriptions.
pub struct ClientHandle {
    /// Outbound sender; the transport layer holds the paired `Receiver`.
    pub sender: mpsc::Sender<Envelope>,
    /// Current subscription set.
    pub subscriptions: SubscriptionSet,
    /// Optional security context.
    pub security: SecurityContext,
}

impl ClientHandle {
    /// Try to enqueue a message without blocking. Returns `false` if the
    /// queue is full (the caller must apply the slow-client policy:
    /// unregister and hand the message to the retry worker).
    pub fn try_send(&self, envelope: Envelope) -> bool {
        self.sender.try_send(envelope).is_ok()
    }
}
