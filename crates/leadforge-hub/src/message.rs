//! Wire protocol: the inbound/outbound message taxonomy.
//!
//! The hub models the taxonomy as a tagged sum type, one variant per
//! discriminant string, following a dynamic-message-types discipline:
//! framing (WebSocket upgrade, text-vs-binary frames) is an external
//! collaborator's concern; this module only knows about the JSON shape of a
//! frame's payload.

use leadforge_orchestrator::events::{CampaignProgressSnapshot, PhaseTransitionEvent};
use leadforge_types::enums::CampaignState;
use leadforge_types::ids::{CampaignId, EventId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `campaign.list.update`'s `action` discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignListAction {
    /// A campaign was created.
    Create,
    /// A campaign was updated.
    Update,
    /// A campaign was deleted.
    Delete,
    /// Several campaigns changed at once.
    BulkUpdate,
}

/// `system.notification`'s severity discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    /// Informational, no action expected.
    Info,
    /// Worth the operator's attention.
    Warning,
    /// User-visible failure.
    Error,
}

/// The exhaustive message taxonomy the core emits. The
/// `campaign.state.sync` family in the taxonomy table is represented here as
/// two concrete wire types, not one: the snapshot payload is carried by
/// [`OutboundMessage::CampaignProgress`] (reused, matching the late-join
/// behavior of emitting a single progress update plus a completion marker),
/// and completion is its own marker variant. See `DESIGN.md` for this
/// resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Progress update for a running phase.
    #[serde(rename = "campaign_progress")]
    CampaignProgress(CampaignProgressSnapshot),

    /// Status or phase change, with optional human context.
    #[serde(rename = "campaign_status")]
    CampaignStatus {
        /// Campaign under transition.
        campaign_id: CampaignId,
        /// New aggregate state.
        state: CampaignState,
        /// Optional human-readable reason.
        reason: Option<String>,
        /// Optional error code, present on failure transitions.
        error_code: Option<String>,
    },

    /// Full phase-transition context.
    #[serde(rename = "campaign.phase.transition")]
    CampaignPhaseTransition(PhaseTransitionEvent),

    /// Bulk or single campaign list mutation.
    #[serde(rename = "campaign.list.update")]
    CampaignListUpdate {
        /// What happened.
        action: CampaignListAction,
        /// The affected campaign, for single-campaign actions.
        campaign_id: Option<CampaignId>,
        /// The campaign payload itself, for `create`/`update`.
        campaign: Option<Value>,
    },

    /// A proxy health or enablement transition.
    #[serde(rename = "proxy.status")]
    ProxyStatus {
        /// The proxy whose status changed.
        proxy_id: String,
        /// Human-readable status label.
        status: String,
        /// Whether it is currently healthy.
        health: bool,
        /// Last observed response time, if measured.
        response_time_ms: Option<u64>,
    },

    /// An operator-facing notification unrelated to a specific campaign.
    #[serde(rename = "system.notification")]
    SystemNotification {
        /// Severity.
        level: NotificationLevel,
        /// Human-readable text.
        message: String,
        /// Coarse grouping (e.g. `"proxy"`, `"lock"`).
        category: String,
        /// Whether the operator can act on this directly.
        actionable: bool,
    },

    /// Marks the end of a late-join resync for a campaign.
    #[serde(rename = "campaign.state.sync.complete")]
    CampaignStateSyncComplete {
        /// The campaign that just finished resyncing.
        campaign_id: CampaignId,
    },

    /// A user-visible failure.
    #[serde(rename = "campaign_error")]
    CampaignError {
        /// The affected campaign.
        campaign_id: CampaignId,
        /// Error kind string.
        error_kind: String,
        /// Human-readable message.
        message: String,
    },

    /// The server rejected an inbound frame it could not interpret.
    #[serde(rename = "bad_request")]
    BadRequest {
        /// Why the frame was rejected.
        reason: String,
    },
}

impl OutboundMessage {
    /// The campaign this message is scoped to, if any (used to populate the
    /// envelope's `campaignId` and to route delivery).
    #[must_use]
    pub fn campaign_id(&self) -> Option<CampaignId> {
        match self {
            Self::CampaignProgress(snapshot) => Some(snapshot.campaign_id),
            Self::CampaignStatus { campaign_id, .. }
            | Self::CampaignListUpdate { campaign_id: Some(campaign_id), .. }
            | Self::CampaignStateSyncComplete { campaign_id }
            | Self::CampaignError { campaign_id, .. } => Some(*campaign_id),
            Self::CampaignPhaseTransition(event) => Some(event.campaign_id),
            Self::CampaignListUpdate { campaign_id: None, .. }
            | Self::ProxyStatus { .. }
            | Self::SystemNotification { .. }
            | Self::BadRequest { .. } => None,
        }
    }

    /// The wire `type` discriminant, used for dedup-hash content and tests.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::CampaignProgress(_) => "campaign_progress",
            Self::CampaignStatus { .. } => "campaign_status",
            Self::CampaignPhaseTransition(_) => "campaign.phase.transition",
            Self::CampaignListUpdate { .. } => "campaign.list.update",
            Self::ProxyStatus { .. } => "proxy.status",
            Self::SystemNotification { .. } => "system.notification",
            Self::CampaignStateSyncComplete { .. } => "campaign.state.sync.complete",
            Self::CampaignError { .. } => "campaign_error",
            Self::BadRequest { .. } => "bad_request",
        }
    }
}

/// The envelope every outbound frame is wrapped in: `{ id,
/// timestamp, type, campaignId? }` plus the type-specific `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Stable event id.
    pub id: EventId,
    /// Wall-clock emission time.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Per-campaign monotonic sequence number; `0` for global/non-sequenced
    /// messages (e.g. `proxy.status`, `system.notification`).
    pub seq: u64,
    /// Scope, if this event belongs to one campaign.
    #[serde(rename = "campaignId", skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    /// The message itself; its own `type` tag is flattened into the envelope.
    #[serde(flatten)]
    pub message: OutboundMessage,
}

/// Inbound frame shape: `{ type, campaignId?, data? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// First frame a client sends after the transport-level handshake.
    ConnectionInit,
    /// Subscribe to a list of channel names (`"*"` or `"campaign-<id>"`).
    Subscribe {
        /// Requested channel names.
        channels: Vec<String>,
    },
    /// Subscribe to a single campaign by id directly.
    SubscribeCampaign {
        /// The campaign id.
        #[serde(rename = "campaignId")]
        campaign_id: CampaignId,
    },
    /// Unsubscribe from a single campaign by id.
    UnsubscribeCampaign {
        /// The campaign id.
        #[serde(rename = "campaignId")]
        campaign_id: CampaignId,
    },
    /// Liveness probe; answered with a `pong`-shaped acknowledgement by the
    /// transport layer (out of scope here).
    Ping,
}

/// A parsed subscription target: either the wildcard or a specific campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionTarget {
    /// The `"*"` wildcard: every campaign.
    Wildcard,
    /// A single campaign, parsed from a `"campaign-<id>"` channel string or
    /// supplied directly.
    Campaign(CampaignId),
}

/// Parse a channel string: `"*"` is the wildcard; strings
/// prefixed `"campaign-"` are interpreted as `"campaign-<id>"` and the bare
/// id is extracted. Returns `None` for a malformed channel string (the
/// caller should treat this as a `bad_request`).
#[must_use]
pub fn parse_channel(channel: &str) -> Option<SubscriptionTarget> {
    if channel == "*" {
        return Some(SubscriptionTarget::Wildcard);
    }
    let id_str = channel.strip_prefix("campaign-")?;
    let uuid = uuid::Uuid::parse_str(id_str).ok()?;
    Some(SubscriptionTarget::Campaign(CampaignId(uuid)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_channel_parses() {
        assert_eq!(parse_channel("*"), Some(SubscriptionTarget::Wildcard));
    }

    #[test]
    fn campaign_channel_parses_bare_id() {
        let id = CampaignId::new();
        let channel = format!("campaign-{id}");
        assert_eq!(parse_channel(&channel), Some(SubscriptionTarget::Campaign(id)));
    }

    #[test]
    fn malformed_channel_is_none() {
        assert_eq!(parse_channel("not-a-channel"), None);
        assert_eq!(parse_channel("campaign-not-a-uuid"), None);
    }

    #[test]
    fn envelope_flattens_type_tag() {
        let msg = OutboundMessage::BadRequest { reason: "unknown type".to_string() };
        let envelope = Envelope {
            id: EventId::new(),
            timestamp: chrono::Utc::now(),
            seq: 0,
            campaign_id: None,
            message: msg,
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "bad_request");
        assert_eq!(json["reason"], "unknown type");
    }

    #[test]
    fn inbound_subscribe_campaign_round_trips() {
        let id = CampaignId::new();
        let msg = InboundMessage::SubscribeCampaign { campaign_id: id };
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: InboundMessage = serde_json::from_str(&json).unwrap();
        match parsed {
            InboundMessage::SubscribeCampaign { campaign_id } => assert_eq!(campaign_id, id),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_inbound_type_fails_to_parse() {
        let raw = serde_json::json!({"type": "does_not_exist"});
        let result: Result<InboundMessage, _> = serde_json::from_value(raw);
        assert!(result.is_err());
    }
}
