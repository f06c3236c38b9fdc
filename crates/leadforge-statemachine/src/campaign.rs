//! Campaign transition graph.

use leadforge_types::{CampaignState, Error, Result};

/// Whether `from -> to` is one of the exhaustive campaign-state transitions.
/// All pairs not listed here are illegal.
#[must_use]
pub fn can_transition(from: CampaignState, to: CampaignState) -> bool {
    use CampaignState::{Archived, Cancelled, Completed, Draft, Failed, Paused, Running};

    matches!(
        (from, to),
        (Draft, Running)
            | (Draft, Cancelled)
            | (Running, Paused)
            | (Running, Completed)
            | (Running, Failed)
            | (Running, Cancelled)
            | (Paused, Running)
            | (Paused, Cancelled)
            | (Paused, Completed)
            | (Failed, Running)
            | (Failed, Cancelled)
            | (Completed, Archived)
            | (Completed, Running)
            | (Cancelled, Archived)
    )
}

/// Reject illegal transitions with `Error::InvalidStateTransition`; pure and
/// concurrency-safe.
pub fn validate_transition(from: CampaignState, to: CampaignState) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(Error::InvalidStateTransition { from: from.to_string(), to: to.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CampaignState::{Archived, Cancelled, Completed, Draft, Failed, Paused, Running};

    #[test]
    fn draft_can_only_run_or_cancel() {
        assert!(can_transition(Draft, Running));
        assert!(can_transition(Draft, Cancelled));
        assert!(!can_transition(Draft, Completed));
        assert!(!can_transition(Draft, Paused));
        assert!(!can_transition(Draft, Archived));
        assert!(!can_transition(Draft, Failed));
    }

    #[test]
    fn archived_is_terminal() {
        for to in CampaignState::ALL {
            assert!(!can_transition(Archived, to), "archived -> {to} must be illegal");
        }
    }

    #[test]
    fn completed_can_archive_or_restart() {
        assert!(can_transition(Completed, Archived));
        assert!(can_transition(Completed, Running));
        assert!(!can_transition(Completed, Draft));
        assert!(!can_transition(Completed, Paused));
    }

    #[test]
    fn invalid_transition_reports_both_ends() {
        let err = validate_transition(Draft, Archived).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("draft"));
        assert!(message.contains("archived"));
    }

    proptest::proptest! {
        #[test]
        fn every_state_has_an_edge_to_somewhere_except_archived(i in 0usize..7) {
            let from = CampaignState::ALL[i];
            if from != Archived {
                let reachable = CampaignState::ALL.iter().any(|&to| can_transition(from, to));
                proptest::prop_assert!(reachable, "{:?} has no outgoing transition", from);
            }
        }
    }
}
