//! Closed enums from the data model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate campaign state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignState {
    /// Newly created, not yet started.
    Draft,
    /// Actively being worked by the orchestrator.
    Running,
    /// Suspended by an operator or cancellation request.
    Paused,
    /// All phases finished successfully.
    Completed,
    /// A structural failure halted the campaign.
    Failed,
    /// An operator cancelled the campaign.
    Cancelled,
    /// Terminal: retained for history, no further work expected.
    Archived,
}

impl CampaignState {
    /// All states, in the fixed order used for exhaustive iteration in tests.
    pub const ALL: [Self; 7] = [
        Self::Draft,
        Self::Running,
        Self::Paused,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
        Self::Archived,
    ];

    /// Lowercase snake_case name, used to build hook keys (`"pre_<from>_to_<to>"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for CampaignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline phase kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// No phase is active yet.
    None,
    /// Candidate domain generation.
    DomainGeneration,
    /// DNS validation of generated domains.
    DnsValidation,
    /// HTTP probing and keyword classification.
    HttpKeywordValidation,
    /// Final analysis / qualification pass.
    Analysis,
}

impl PhaseKind {
    /// The phase that strictly follows this one in the pipeline, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::None => Some(Self::DomainGeneration),
            Self::DomainGeneration => Some(Self::DnsValidation),
            Self::DnsValidation => Some(Self::HttpKeywordValidation),
            Self::HttpKeywordValidation => Some(Self::Analysis),
            Self::Analysis => None,
        }
    }

    /// Lowercase snake_case name, matching the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::DomainGeneration => "domain_generation",
            Self::DnsValidation => "dns_validation",
            Self::HttpKeywordValidation => "http_keyword_validation",
            Self::Analysis => "analysis",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single phase within a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Not yet dispatched.
    NotStarted,
    /// Actively running.
    InProgress,
    /// Suspended mid-run.
    Paused,
    /// Finished without structural failure.
    Completed,
    /// Structural failure; surfaced as `phase_failed`.
    Failed,
}

impl PhaseStatus {
    /// Lowercase snake_case name, used to build hook keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// All statuses, in a fixed order for exhaustive iteration in tests.
    pub const ALL: [Self; 5] = [
        Self::NotStarted,
        Self::InProgress,
        Self::Paused,
        Self::Completed,
        Self::Failed,
    ];
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a DNS resolution probe on a generated domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsStatus {
    /// Not probed yet.
    Pending,
    /// Resolved successfully.
    Ok,
    /// Resolution failed.
    Error,
    /// Resolution exceeded its deadline.
    Timeout,
}

/// Outcome of an HTTP probe on a generated domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpStatus {
    /// Not probed yet.
    Pending,
    /// Probed successfully.
    Ok,
    /// Probe failed.
    Error,
    /// Probe exceeded its deadline.
    Timeout,
}

/// Outcome of downstream keyword/lead classification (an external collaborator's verdict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// Not classified yet.
    Pending,
    /// Keywords matched the qualification criteria.
    Match,
    /// Keywords were present but did not qualify.
    NoMatch,
}

/// Closed rejection-reason enum. No generic `timeout`, no `legacy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Passed every check; a qualified lead.
    Qualified,
    /// Scored below the qualification threshold.
    LowScore,
    /// No keywords were found at all.
    NoKeywords,
    /// The domain is parked.
    Parked,
    /// DNS resolution failed.
    DnsError,
    /// DNS resolution timed out.
    DnsTimeout,
    /// HTTP probe failed.
    HttpError,
    /// HTTP probe timed out.
    HttpTimeout,
    /// No terminal classification has been reached yet.
    Pending,
}

/// Lock kind: an advisory label the store treats as opaque (glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    /// Shared, advisory read lock.
    Read,
    /// Exclusive write lock.
    Write,
    /// Exclusive lock with no concurrent readers implied.
    Exclusive,
}
