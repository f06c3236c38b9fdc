//! Phase orchestrator (component B): drives a running campaign through its
//! phase pipeline, keeps durable counters accurate, and publishes events.

use crate::collaborators::{DnsProbe, DomainGenerator, HttpProbe};
use crate::config::OrchestratorConfig;
use crate::events::{CampaignProgressSnapshot, EventSink, OrchestratorEvent, PhaseTransitionEvent, ProgressSnapshotSource};
use crate::rate_limiter::RateLimiter;
use crate::rejection::classify_rejection;
use crate::reconcile::reconcile;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use leadforge_consistency::ConsistencyEngine;
use leadforge_lock::LockService;
use leadforge_proxy::ProxyPool;
use leadforge_statemachine::{self as sm, TransitionContext};
use leadforge_types::domain::{Campaign, CampaignCounters, GeneratedDomain};
use leadforge_types::enums::{CampaignState, PhaseKind, PhaseStatus};
use leadforge_types::error::{Error, Result};
use leadforge_types::ids::CampaignId;
use leadforge_types::store::CampaignStore;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

/// Owner identity the orchestrator presents to the lock service when
/// checking for conflicting external config writers (it does not itself
/// hold a lock across a whole phase run; it only checks for one).
const GATING_CHECK_OWNER_PREFIX: &str = "orchestrator";

/// Drives one campaign through Domain Generation → DNS Validation →
/// HTTP/Keyword Validation → Analysis (component B).
pub struct PhaseOrchestrator {
    store: Arc<dyn CampaignStore>,
    hooks: sm::HookRegistry,
    lock_service: Arc<LockService>,
    consistency: Arc<ConsistencyEngine>,
    proxies: Arc<ProxyPool>,
    domain_generator: Arc<dyn DomainGenerator>,
    dns_prober: Arc<dyn DnsProbe>,
    http_prober: Arc<dyn HttpProbe>,
    sink: Arc<dyn EventSink>,
    config: OrchestratorConfig,
    shutdown: CancellationToken,
    campaign_mutexes: DashMap<CampaignId, Arc<AsyncMutex<()>>>,
    cancellations: DashMap<CampaignId, CancellationToken>,
}

#[allow(clippy::too_many_arguments)]
impl PhaseOrchestrator {
    /// Build an orchestrator over its collaborators.
    pub fn new(
        store: Arc<dyn CampaignStore>,
        hooks: sm::HookRegistry,
        lock_service: Arc<LockService>,
        consistency: Arc<ConsistencyEngine>,
        proxies: Arc<ProxyPool>,
        domain_generator: Arc<dyn DomainGenerator>,
        dns_prober: Arc<dyn DnsProbe>,
        http_prober: Arc<dyn HttpProbe>,
        sink: Arc<dyn EventSink>,
        config: OrchestratorConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            hooks,
            lock_service,
            consistency,
            proxies,
            domain_generator,
            dns_prober,
            http_prober,
            sink,
            config,
            shutdown,
            campaign_mutexes: DashMap::new(),
            cancellations: DashMap::new(),
        }
    }

    fn campaign_mutex(&self, id: CampaignId) -> Arc<AsyncMutex<()>> {
        self.campaign_mutexes.entry(id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    fn cancellation_token(&self, id: CampaignId) -> CancellationToken {
        self.cancellations.entry(id).or_insert_with(|| self.shutdown.child_token()).clone()
    }

    /// Deliver cancellation to in-flight work for `id`. Called automatically
    /// by [`Self::transition_campaign`] when the new state is `paused`,
    /// `cancelled`, or `failed`.
    pub fn cancel_campaign_work(&self, id: CampaignId) {
        self.cancellation_token(id).cancel();
    }

    /// Validate and execute a campaign-level state transition, serialized by
    /// a per-campaign critical section, with hook dispatch via the shared
    /// state machine (component A).
    pub async fn transition_campaign(&self, id: CampaignId, to: CampaignState, reason: Option<String>) -> Result<()> {
        let mutex = self.campaign_mutex(id);
        let _guard = mutex.lock().await;

        let Some(mut campaign) = self.store.get_campaign(id).await? else {
            return Err(Error::Store(format!("no such campaign {id}")));
        };
        let from = campaign.state;
        let ctx = TransitionContext::new(id).with_reason(reason.clone().unwrap_or_default());

        sm::execute_transition(&self.hooks, sm::campaign::can_transition, from, to, ctx, &self.shutdown, {
            let store = self.store.clone();
            || async move {
                campaign.state = to;
                campaign.updated_at = chrono::Utc::now();
                store.put_campaign(campaign).await
            }
        })
        .await?;

        if matches!(to, CampaignState::Paused | CampaignState::Cancelled | CampaignState::Failed) {
            self.cancel_campaign_work(id);
        }

        self.sink
            .emit(OrchestratorEvent::CampaignStatus { campaign_id: id, state: to, reason, error_code: None })
            .await;
        Ok(())
    }

    /// Whether the campaign may advance from its current phase to the next:
    /// (i) current phase status is `completed`, (ii) the config's integrity
    /// check is clean, (iii) no active config lock is held by another owner.
    async fn gating_checks_pass(&self, campaign: &Campaign) -> Result<bool> {
        if campaign.phase_status != PhaseStatus::Completed {
            return Ok(false);
        }

        let report = self.consistency.detect_corruption(&campaign.config_fingerprint).await?;
        if !report.is_clean() {
            return Ok(false);
        }

        let (locked, lock) = self.lock_service.is_locked(&campaign.config_fingerprint).await?;
        if locked {
            let owner = lock.map(|l| l.owner).unwrap_or_default();
            if !owner.starts_with(GATING_CHECK_OWNER_PREFIX) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Advance to the next phase in the pipeline, gated per
    /// [`Self::gating_checks_pass`], emitting a `campaign.phase.transition`
    /// event with the full transition context either way.
    pub async fn advance_phase(&self, id: CampaignId) -> Result<bool> {
        let mutex = self.campaign_mutex(id);
        let _guard = mutex.lock().await;

        let Some(mut campaign) = self.store.get_campaign(id).await? else {
            return Err(Error::Store(format!("no such campaign {id}")));
        };
        let previous_phase = campaign.current_phase;

        let prerequisites_met = self.gating_checks_pass(&campaign).await?;
        let data_integrity_check = prerequisites_met; // folded into the same check above
        let domains = self.store.domains(id).await?;
        let counts = CampaignCounters::aggregate(&domains);

        if !prerequisites_met {
            self.sink
                .emit(OrchestratorEvent::PhaseTransition(PhaseTransitionEvent {
                    campaign_id: id,
                    previous_phase,
                    new_phase: previous_phase,
                    new_status: campaign.phase_status,
                    prerequisites_met,
                    data_integrity_check,
                    counts,
                    rollback_data: None,
                }))
                .await;
            return Ok(false);
        }

        let Some(next_phase) = previous_phase.next() else {
            return Ok(false);
        };

        campaign.current_phase = next_phase;
        campaign.phase_status = PhaseStatus::NotStarted;
        campaign.updated_at = chrono::Utc::now();
        self.store.put_campaign(campaign).await?;

        self.sink
            .emit(OrchestratorEvent::PhaseTransition(PhaseTransitionEvent {
                campaign_id: id,
                previous_phase,
                new_phase: next_phase,
                new_status: PhaseStatus::NotStarted,
                prerequisites_met,
                data_integrity_check,
                counts,
                rollback_data: None,
            }))
            .await;
        Ok(true)
    }

    async fn set_phase_status(&self, id: CampaignId, to: PhaseStatus) -> Result<()> {
        let Some(mut campaign) = self.store.get_campaign(id).await? else {
            return Err(Error::Store(format!("no such campaign {id}")));
        };
        let from = campaign.phase_status;
        sm::phase::validate_transition(from, to)?;
        campaign.phase_status = to;
        campaign.updated_at = chrono::Utc::now();
        self.store.put_campaign(campaign).await
    }

    async fn fail_phase(&self, id: CampaignId, message: impl Into<String>) -> Error {
        let message = message.into();
        if let Err(error) = self.set_phase_status(id, PhaseStatus::Failed).await {
            tracing::error!(campaign_id = %id, %error, "failed to persist phase failure");
        }
        self.sink
            .emit(OrchestratorEvent::CampaignStatus {
                campaign_id: id,
                state: CampaignState::Failed,
                reason: Some(message.clone()),
                error_code: Some("phase_failed".to_string()),
            })
            .await;
        Error::PhaseFailed(message)
    }

    /// Run the Domain Generation phase to completion for `target_count`
    /// candidates.
    pub async fn run_domain_generation(&self, id: CampaignId, target_count: u64) -> Result<()> {
        let cancel = self.cancellation_token(id);
        self.set_phase_status(id, PhaseStatus::InProgress).await?;

        let Some(campaign) = self.store.get_campaign(id).await? else {
            return Err(self.fail_phase(id, "campaign disappeared during domain generation").await);
        };

        let existing = self.store.domains(id).await?.len() as u64;
        if existing < target_count {
            let names = self
                .domain_generator
                .generate(&campaign.config_fingerprint, existing, target_count - existing, &cancel)
                .await
                .map_err(|error| Error::PhaseFailed(format!("domain generation failed: {error}")))?;

            for (offset, name) in names.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                let domain = GeneratedDomain {
                    campaign_id: id,
                    offset_index: existing + offset as u64,
                    domain_name: name,
                    dns_status: leadforge_types::enums::DnsStatus::Pending,
                    http_status: leadforge_types::enums::HttpStatus::Pending,
                    keywords: None,
                    keyword_score: None,
                    lead_status: leadforge_types::enums::LeadStatus::Pending,
                    is_parked: false,
                    rejection_reason: leadforge_types::enums::RejectionReason::Pending,
                };
                self.store.put_domain(domain).await?;
            }
        }

        self.set_phase_status(id, PhaseStatus::Completed).await?;
        self.emit_progress(id).await?;
        Ok(())
    }

    /// Run the DNS Validation phase over every generated domain, bounded by
    /// `max_concurrent_goroutines` and rate-limited
    pub async fn run_dns_validation(&self, id: CampaignId) -> Result<()> {
        self.run_probe_phase(id, PhaseProbeKind::Dns).await
    }

    /// Run the HTTP/Keyword Validation phase over every generated domain.
    pub async fn run_http_keyword_validation(&self, id: CampaignId) -> Result<()> {
        self.run_probe_phase(id, PhaseProbeKind::Http).await
    }

    async fn run_probe_phase(&self, id: CampaignId, kind: PhaseProbeKind) -> Result<()> {
        let cancel = self.cancellation_token(id);
        self.set_phase_status(id, PhaseStatus::InProgress).await?;

        let domains = self.store.domains(id).await?;
        let limiter = Arc::new(RateLimiter::new(self.config.requests_per_second, self.config.burst));
        let concurrency = self.config.max_concurrent_goroutines.max(1);

        let results = stream::iter(domains.into_iter())
            .map(|mut domain| {
                let cancel = cancel.clone();
                let limiter = limiter.clone();
                let this = self;
                async move {
                    if cancel.is_cancelled() {
                        return domain;
                    }
                    limiter.acquire().await;
                    this.apply_probe(&mut domain, kind, &cancel).await;
                    domain.rejection_reason = classify_rejection(&domain);
                    domain
                }
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .await;

        for domain in results {
            if cancel.is_cancelled() {
                break;
            }
            self.store.put_domain(domain).await?;
        }

        if cancel.is_cancelled() {
            return Ok(());
        }

        self.set_phase_status(id, PhaseStatus::Completed).await?;
        self.emit_progress(id).await?;
        Ok(())
    }

    async fn apply_probe(&self, domain: &mut GeneratedDomain, kind: PhaseProbeKind, cancel: &CancellationToken) {
        match kind {
            PhaseProbeKind::Dns => {
                let outcome = self.dns_prober.probe(&domain.domain_name, cancel).await;
                domain.dns_status = outcome.status;
            }
            PhaseProbeKind::Http => {
                let proxy = self.proxies.get_proxy().ok();
                let proxy_url = proxy.as_ref().map(leadforge_proxy::ProxyEntry::url);
                let outcome = self.http_prober.probe(&domain.domain_name, proxy_url.as_deref(), cancel).await;
                if let Some(proxy) = &proxy {
                    let success = !matches!(
                        outcome.status,
                        leadforge_types::enums::HttpStatus::Error | leadforge_types::enums::HttpStatus::Timeout
                    );
                    self.proxies.report_health(&proxy.id, success, None).await;
                }
                domain.http_status = outcome.status;
                domain.keywords = outcome.keywords;
                domain.keyword_score = outcome.score;
                domain.lead_status = outcome.lead_status;
                domain.is_parked = outcome.is_parked;
            }
        }
    }

    /// Run the Analysis phase: finalize rejection reasons for every domain
    /// and complete the campaign if this was the last phase.
    pub async fn run_analysis(&self, id: CampaignId) -> Result<()> {
        self.set_phase_status(id, PhaseStatus::InProgress).await?;
        let domains = self.store.domains(id).await?;
        for mut domain in domains {
            domain.rejection_reason = classify_rejection(&domain);
            self.store.put_domain(domain).await?;
        }
        self.set_phase_status(id, PhaseStatus::Completed).await?;
        self.emit_progress(id).await?;
        self.transition_campaign(id, CampaignState::Completed, Some("analysis complete".to_string())).await
    }

    /// Run a reconciliation pass for `id` using the orchestrator's
    /// configured drift threshold and auto-correct policy.
    pub async fn reconcile_counters(&self, id: CampaignId) -> Result<crate::reconcile::ReconciliationOutcome> {
        reconcile(&self.store, id, self.config.drift_threshold, self.config.auto_correct).await
    }

    async fn emit_progress(&self, id: CampaignId) -> Result<()> {
        let snapshot = self.snapshot(id).await?;
        self.sink.emit(OrchestratorEvent::CampaignProgress(snapshot)).await;
        Ok(())
    }
}

#[async_trait]
impl ProgressSnapshotSource for PhaseOrchestrator {
    async fn snapshot(&self, campaign_id: CampaignId) -> Result<CampaignProgressSnapshot> {
        let Some(campaign) = self.store.get_campaign(campaign_id).await? else {
            return Err(Error::Store(format!("no such campaign {campaign_id}")));
        };
        let domains = self.store.domains(campaign_id).await?;
        let total_items = domains.len() as u64;
        let processed_items = domains
            .iter()
            .filter(|d| d.rejection_reason != leadforge_types::enums::RejectionReason::Pending)
            .count() as u64;
        let successful_items =
            domains.iter().filter(|d| d.rejection_reason == leadforge_types::enums::RejectionReason::Qualified).count() as u64;
        let failed_items = processed_items.saturating_sub(successful_items);
        let progress_percent = if total_items == 0 { 0.0 } else { processed_items as f64 / total_items as f64 * 100.0 };

        Ok(CampaignProgressSnapshot {
            campaign_id,
            total_items,
            processed_items,
            successful_items,
            failed_items,
            progress_percent,
            current_phase: campaign.current_phase,
            phase_status: campaign.phase_status,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum PhaseProbeKind {
    Dns,
    Http,
}
