//! Phase orchestrator (component B): drives campaigns through their phase
//! pipeline, keeps durable progress counters accurate via idempotent
//! reconciliation, and publishes events through a hub-agnostic seam.

pub mod collaborators;
pub mod config;
pub mod events;
pub mod orchestrator;
pub mod rate_limiter;
pub mod reconcile;
pub mod rejection;

pub use collaborators::{DnsOutcome, DnsProbe, DomainGenerator, HttpOutcome, HttpProbe};
pub use config::OrchestratorConfig;
pub use events::{
    CampaignProgressSnapshot, EventSink, NullEventSink, OrchestratorEvent, PhaseTransitionEvent,
    ProgressSnapshotSource,
};
pub use orchestrator::PhaseOrchestrator;
pub use rate_limiter::RateLimiter;
pub use reconcile::{reconcile, ReconciliationOutcome};
pub use rejection::classify_rejection;
