//! Error taxonomy shared across every component.
//!
//! Variant names track a `kind` exactly, so callers can match on them the
//! same way across every crate in the workspace.

/// Result type used throughout the LeadForge core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the LeadForge core. Never swallowed
/// silently; transient errors on non-critical paths are logged at their call
/// site instead of being folded into this enum.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transition not allowed by the state graph.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Source state/phase, as its string form.
        from: String,
        /// Target state/phase, as its string form.
        to: String,
    },

    /// A pre-transition hook rejected the transition.
    #[error("pre-transition hook failed: {0}")]
    PreHookFailed(String),

    /// Fingerprint already locked by a different owner.
    #[error("lock conflict on fingerprint {fingerprint}: held by {held_by} until {expires_at:?}")]
    LockConflict {
        /// Fingerprint under contention.
        fingerprint: String,
        /// The current owner.
        held_by: String,
        /// When the current lock expires, if it has an expiry.
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    },

    /// A lock operation was attempted by a caller that is not the owner.
    #[error("wrong owner for lock {lock_id}: expected {expected}, got {actual}")]
    WrongOwner {
        /// Lock under contention.
        lock_id: String,
        /// The owner on record.
        expected: String,
        /// The caller that attempted the operation.
        actual: String,
    },

    /// The referenced lock does not exist (or is no longer active).
    #[error("lock not found: {0}")]
    LockNotFound(String),

    /// A checksum mismatch was found for a production fingerprint.
    #[error("integrity violation for {fingerprint}: expected {expected}, got {actual}")]
    IntegrityViolation {
        /// Fingerprint under verification.
        fingerprint: String,
        /// The digest recomputed from persisted content.
        expected: String,
        /// The digest supplied by the caller.
        actual: String,
    },

    /// One or more corruption predicates held (detect_corruption).
    #[error("corruption detected: {0:?}")]
    CorruptionDetected(Vec<String>),

    /// No healthy proxy was available to dispense.
    #[error("no healthy proxy available")]
    NoHealthyProxy,

    /// A structural failure occurred (missing configuration, unreadable store).
    #[error("phase failed: {0}")]
    PhaseFailed(String),

    /// The retry queue was saturated; the enqueue was dropped.
    #[error("retry queue overflow, dropped after {attempts} attempts")]
    QueueOverflow {
        /// Number of attempts made before the drop.
        attempts: u32,
    },

    /// A call into the persistence seam failed.
    #[error("store error: {0}")]
    Store(String),

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,
}
