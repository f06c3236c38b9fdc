//! External collaborator seams the orchestrator hands work to without
//! implementing itself: candidate domain generation, DNS resolution, and
//! HTTP/keyword probing are explicitly out of scope.

use async_trait::async_trait;
use leadforge_types::enums::{DnsStatus, HttpStatus, LeadStatus};
use tokio_util::sync::CancellationToken;

/// Produces candidate domain names for a campaign's domain-generation phase.
#[async_trait]
pub trait DomainGenerator: Send + Sync {
    /// Generate up to `count` candidate names starting at `start_offset`,
    /// observing `cancel` between units of work.
    async fn generate(
        &self,
        config_fingerprint: &str,
        start_offset: u64,
        count: u64,
        cancel: &CancellationToken,
    ) -> leadforge_types::Result<Vec<String>>;
}

/// Outcome of a single DNS probe.
#[derive(Debug, Clone, Copy)]
pub struct DnsOutcome {
    /// The probe's terminal status. Never a bare `timeout` string; already
    /// mapped to the closed [`DnsStatus`] enum.
    pub status: DnsStatus,
}

/// Resolves candidate domains. A probe-level failure (timeout, NXDOMAIN,
/// refused connection) is reported as a status, never as an `Err` — only a
/// structural failure (e.g. resolver unreachable for the whole phase) should
/// propagate as an error from the phase driver, not from a single probe.
#[async_trait]
pub trait DnsProbe: Send + Sync {
    /// Resolve a single candidate domain.
    async fn probe(&self, domain: &str, cancel: &CancellationToken) -> DnsOutcome;
}

/// Outcome of a single HTTP + keyword-classification probe.
#[derive(Debug, Clone)]
pub struct HttpOutcome {
    /// The probe's terminal status.
    pub status: HttpStatus,
    /// Extracted keywords, if the probe reached the classification step.
    pub keywords: Option<Vec<String>>,
    /// Qualification score assigned by the downstream classifier.
    pub score: Option<f64>,
    /// Downstream classifier's match/no-match verdict.
    pub lead_status: LeadStatus,
    /// Whether the target is a parked domain.
    pub is_parked: bool,
}

/// Probes a domain over HTTP, optionally through a dispensed proxy, and
/// classifies the response. Keyword-matching itself is an external
/// collaborator; this trait only carries its result.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    /// Probe a single domain, optionally routed through `proxy_url`.
    async fn probe(&self, domain: &str, proxy_url: Option<&str>, cancel: &CancellationToken) -> HttpOutcome;
}
