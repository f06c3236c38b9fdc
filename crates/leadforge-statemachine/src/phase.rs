//! Phase transition graph.

use leadforge_types::{Error, PhaseStatus, Result};

/// Whether `from -> to` is one of the exhaustive phase-status transitions.
/// All pairs not listed here are illegal.
#[must_use]
pub fn can_transition(from: PhaseStatus, to: PhaseStatus) -> bool {
    use PhaseStatus::{Completed, Failed, InProgress, NotStarted, Paused};

    matches!(
        (from, to),
        (NotStarted, InProgress)
            | (NotStarted, Failed)
            | (InProgress, Paused)
            | (InProgress, Completed)
            | (InProgress, Failed)
            | (Paused, InProgress)
            | (Paused, Failed)
            | (Completed, InProgress)
            | (Failed, NotStarted)
            | (Failed, InProgress)
    )
}

/// Reject illegal transitions with `Error::InvalidStateTransition`.
pub fn validate_transition(from: PhaseStatus, to: PhaseStatus) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(Error::InvalidStateTransition { from: from.to_string(), to: to.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PhaseStatus::{Completed, Failed, InProgress, NotStarted, Paused};

    #[test]
    fn not_started_transitions() {
        assert!(can_transition(NotStarted, InProgress));
        assert!(can_transition(NotStarted, Failed));
        assert!(!can_transition(NotStarted, Completed));
        assert!(!can_transition(NotStarted, Paused));
    }

    #[test]
    fn completed_can_only_restart() {
        assert!(can_transition(Completed, InProgress));
        assert!(!can_transition(Completed, Failed));
        assert!(!can_transition(Completed, Paused));
        assert!(!can_transition(Completed, NotStarted));
    }

    #[test]
    fn failed_can_reset_or_retry() {
        assert!(can_transition(Failed, NotStarted));
        assert!(can_transition(Failed, InProgress));
        assert!(!can_transition(Failed, Completed));
        assert!(!can_transition(Failed, Paused));
    }

    proptest::proptest! {
        #[test]
        fn no_transition_is_a_self_loop(i in 0usize..5) {
            let s = PhaseStatus::ALL[i];
            proptest::prop_assert!(!can_transition(s, s));
        }
    }
}
