//! Shared identifiers, enums, error taxonomy, and persistence traits for the
//! LeadForge lead-generation pipeline core.
//!
//! Every other crate in the workspace depends on this one; it carries no
//! dependency of its own on any other `leadforge-*` crate.

pub mod domain;
pub mod enums;
pub mod error;
pub mod ids;
pub mod store;

pub use domain::{Campaign, CampaignCounters, GeneratedDomain};
pub use enums::{
    CampaignState, DnsStatus, HttpStatus, LeadStatus, LockKind, PhaseKind, PhaseStatus,
    RejectionReason,
};
pub use error::{Error, Result};
pub use ids::{CampaignId, DomainOffset, EventId, LockId};
