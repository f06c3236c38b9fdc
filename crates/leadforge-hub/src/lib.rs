//! Real-time broadcast hub (component F): routes progress/state events from
//! the phase orchestrator to subscribed clients with bounded latency,
//! per-campaign ordering, and best-effort recovery.
//!
//! The hub is a pure seam consumer: it depends on the orchestrator only
//! through [`leadforge_orchestrator::events::EventSink`] /
//! [`leadforge_orchestrator::events::ProgressSnapshotSource`], and on the
//! proxy pool only through [`leadforge_proxy::sink::ProxyStatusSink`] —
//! neither the orchestrator nor the proxy pool ever imports the hub
//! concretely.

pub mod client;
pub mod config;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod retry;
pub mod ring;

pub use client::{ClientHandle, ClientId, SecurityContext, SubscriptionSet};
pub use config::HubConfig;
pub use hub::{campaign_list_update, BroadcastHub, HubError};
pub use message::{
    CampaignListAction, Envelope, InboundMessage, NotificationLevel, OutboundMessage,
    SubscriptionTarget,
};
pub use metrics::{HubMetrics, HubMetricsSnapshot};
