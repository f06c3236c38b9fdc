//! Events the orchestrator emits and the snapshot seam the hub pulls from
//! for late-join resync.
//!
//! The orchestrator never imports the hub concretely; it depends only on
//! [`EventSink`], a minimal `emit` method.

use async_trait::async_trait;
use leadforge_types::enums::{CampaignState, PhaseKind, PhaseStatus};
use leadforge_types::ids::CampaignId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Progress snapshot for a single campaign, computed exactly as the
/// progress-accounting rules describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignProgressSnapshot {
    /// The campaign this snapshot describes.
    pub campaign_id: CampaignId,
    /// Total candidate domains generated so far.
    pub total_items: u64,
    /// Domains that have reached a terminal per-phase status.
    pub processed_items: u64,
    /// Domains ultimately qualified.
    pub successful_items: u64,
    /// Domains ultimately rejected.
    pub failed_items: u64,
    /// `processed_items / total_items * 100`, or 0 when `total_items == 0`.
    pub progress_percent: f64,
    /// The phase currently being driven.
    pub current_phase: PhaseKind,
    /// That phase's status.
    pub phase_status: PhaseStatus,
}

/// Full transition context emitted on every phase transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransitionEvent {
    /// Campaign under transition.
    pub campaign_id: CampaignId,
    /// Phase before the transition.
    pub previous_phase: PhaseKind,
    /// Phase after the transition.
    pub new_phase: PhaseKind,
    /// The new phase's status.
    pub new_status: PhaseStatus,
    /// Whether the gating prerequisites were satisfied.
    pub prerequisites_met: bool,
    /// Whether the data-integrity check for the phase passed.
    pub data_integrity_check: bool,
    /// Snapshot of counters at the moment of transition.
    pub counts: leadforge_types::domain::CampaignCounters,
    /// Rollback payload, present only when the transition reverts progress.
    pub rollback_data: Option<Value>,
}

/// The taxonomy of events the orchestrator itself originates (a subset of
/// the hub's full message taxonomy — `proxy.status` and
/// `campaign.list.update` originate elsewhere).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// Progress update for a running phase.
    CampaignProgress(CampaignProgressSnapshot),
    /// Campaign state or phase-status change.
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
    /// A full phase transition.
    PhaseTransition(PhaseTransitionEvent),
}

/// Minimal emit-only seam the orchestrator depends on instead of importing
/// the hub concretely.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emit a single event. Implementations must not block the orchestrator
    /// on a slow consumer.
    async fn emit(&self, event: OrchestratorEvent);
}

/// A sink that discards every event (tests, or when no hub is wired up).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn emit(&self, _event: OrchestratorEvent) {}
}

/// The read-only interface the hub pulls a snapshot from for late-join
/// resync. Implemented by the orchestrator; the hub never
/// reaches into orchestrator internals beyond this trait.
#[async_trait]
pub trait ProgressSnapshotSource: Send + Sync {
    /// Compute a fresh progress snapshot for `campaign_id` from authoritative
    /// counters, the same way a reconciliation pass would.
    async fn snapshot(&self, campaign_id: CampaignId) -> leadforge_types::Result<CampaignProgressSnapshot>;
}
