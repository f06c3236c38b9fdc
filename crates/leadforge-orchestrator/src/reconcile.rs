//! Counter reconciliation:
//! idempotent recomputation of durable counters from authoritative
//! generated-domain rows. Never incremental arithmetic.

use leadforge_types::domain::CampaignCounters;
use leadforge_types::error::Result;
use leadforge_types::ids::CampaignId;
use leadforge_types::store::CampaignStore;
use std::sync::Arc;

/// Outcome of a single reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconciliationOutcome {
    /// The counters read before reconciliation.
    pub persisted: CampaignCounters,
    /// The freshly aggregated, authoritative counters.
    pub authoritative: CampaignCounters,
    /// Relative drift between the two.
    pub drift_fraction: f64,
    /// Whether drift exceeded the configured threshold.
    pub drift_detected: bool,
    /// Whether the persisted counters were overwritten this pass.
    pub corrected: bool,
}

/// Recompute `campaign_id`'s counters from its generated-domain rows and,
/// when drift exceeds `drift_threshold` and `auto_correct` is set, overwrite
/// the durable counters row. Running this twice in a row with no
/// intervening domain changes always yields `drift_fraction == 0.0` and
/// `corrected == false` on the second pass (idempotence).
pub async fn reconcile(
    store: &Arc<dyn CampaignStore>,
    campaign_id: CampaignId,
    drift_threshold: f64,
    auto_correct: bool,
) -> Result<ReconciliationOutcome> {
    let domains = store.domains(campaign_id).await?;
    let authoritative = CampaignCounters::aggregate(&domains);
    let persisted = store.counters(campaign_id).await?;

    let drift_fraction = persisted.drift_fraction(&authoritative);
    let drift_detected = drift_fraction > drift_threshold;

    let corrected = if drift_detected && auto_correct {
        store.put_counters(campaign_id, authoritative).await?;
        true
    } else {
        false
    };

    Ok(ReconciliationOutcome { persisted, authoritative, drift_fraction, drift_detected, corrected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadforge_types::domain::GeneratedDomain;
    use leadforge_types::enums::{DnsStatus, HttpStatus, LeadStatus, RejectionReason};
    use leadforge_types::store::memory::MemoryCampaignStore;

    fn domain(campaign_id: CampaignId, offset: u64) -> GeneratedDomain {
        GeneratedDomain {
            campaign_id,
            offset_index: offset,
            domain_name: format!("example-{offset}.test"),
            dns_status: DnsStatus::Ok,
            http_status: HttpStatus::Ok,
            keywords: None,
            keyword_score: None,
            lead_status: LeadStatus::Pending,
            is_parked: false,
            rejection_reason: RejectionReason::Pending,
        }
    }

    #[tokio::test]
    async fn detects_simulated_drift_and_corrects_it_idempotently() {
        let store: Arc<dyn CampaignStore> = Arc::new(MemoryCampaignStore::default());
        let campaign_id = CampaignId::new();
        for i in 0..500 {
            store.put_domain(domain(campaign_id, i)).await.unwrap();
        }

        let authoritative = CampaignCounters::aggregate(&store.domains(campaign_id).await.unwrap());
        let mut drifted = authoritative;
        drifted.http_ok = drifted.http_ok.saturating_sub(7);
        store.put_counters(campaign_id, drifted).await.unwrap();

        let first = reconcile(&store, campaign_id, 0.0001, true).await.unwrap();
        assert!(first.drift_detected);
        assert!(first.corrected);
        assert_eq!(first.authoritative, authoritative);

        let second = reconcile(&store, campaign_id, 0.0001, true).await.unwrap();
        assert!(!second.drift_detected);
        assert!(!second.corrected);
        assert_eq!(second.drift_fraction, 0.0);
    }

    #[tokio::test]
    async fn drift_below_threshold_is_not_corrected() {
        let store: Arc<dyn CampaignStore> = Arc::new(MemoryCampaignStore::default());
        let campaign_id = CampaignId::new();
        for i in 0..10_000 {
            store.put_domain(domain(campaign_id, i)).await.unwrap();
        }
        let authoritative = CampaignCounters::aggregate(&store.domains(campaign_id).await.unwrap());
        let mut nearly_exact = authoritative;
        nearly_exact.http_ok = nearly_exact.http_ok.saturating_sub(1);
        store.put_counters(campaign_id, nearly_exact).await.unwrap();

        let outcome = reconcile(&store, campaign_id, 0.0001, true).await.unwrap();
        assert!(!outcome.drift_detected);
        assert!(!outcome.corrected);
    }
}
