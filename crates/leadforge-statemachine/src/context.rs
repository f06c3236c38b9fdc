//! Context threaded through a transition and its hooks.

use leadforge_types::CampaignId;
use std::collections::HashMap;

/// Caller-supplied context for a single transition, passed verbatim to every
/// pre- and post-hook registered for that `(from, to)` pair.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    /// The campaign this transition applies to.
    pub campaign_id: CampaignId,
    /// Freeform reason supplied by the caller (audit trail, UI display).
    pub reason: Option<String>,
    /// Additional metadata hooks may need (e.g. broadcast payload extras).
    pub metadata: HashMap<String, serde_json::Value>,
}

impl TransitionContext {
    /// Build a bare context with no reason or metadata.
    #[must_use]
    pub fn new(campaign_id: CampaignId) -> Self {
        Self { campaign_id, reason: None, metadata: HashMap::new() }
    }

    /// Attach a human-readable reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
