//! Proxy pool manager: maintains the active subset, dispenses round-robin,
//! and runs concurrent health checks.

use crate::config::ProxyPoolConfig;
use crate::entry::ProxyEntry;
use crate::sink::{NullStatusSink, ProxyStatusChange, ProxyStatusSink};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use leadforge_types::error::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;

struct PoolState {
    entries: Vec<ProxyEntry>,
    active_ids: Vec<String>,
    cursor: usize,
}

impl PoolState {
    fn rebuild_active(&mut self) {
        self.active_ids = self.entries.iter().filter(|entry| entry.is_active()).map(|entry| entry.id.clone()).collect();
        self.cursor = if self.active_ids.is_empty() { 0 } else { self.cursor % self.active_ids.len() };
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut ProxyEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }
}

/// The managed proxy pool (component E).
pub struct ProxyPool {
    state: RwLock<PoolState>,
    config: ProxyPoolConfig,
    sink: Arc<dyn ProxyStatusSink>,
}

impl ProxyPool {
    /// Build a pool from a starting entry list. The active set is derived
    /// from the entries' initial `is_healthy`/`user_enabled` fields; callers
    /// typically follow up with [`ProxyPool::run_initial_health_checks`].
    #[must_use]
    pub fn new(entries: Vec<ProxyEntry>, config: ProxyPoolConfig, sink: Arc<dyn ProxyStatusSink>) -> Self {
        let mut state = PoolState { entries, active_ids: Vec::new(), cursor: 0 };
        state.rebuild_active();
        Self { state: RwLock::new(state), config, sink }
    }

    /// Build a pool with a sink that discards every status change.
    #[must_use]
    pub fn with_null_sink(entries: Vec<ProxyEntry>, config: ProxyPoolConfig) -> Self {
        Self::new(entries, config, Arc::new(NullStatusSink))
    }

    /// Dispense the next proxy in round-robin order from the active set.
    /// O(1): takes the writer lock briefly to advance the cursor.
    pub fn get_proxy(&self) -> Result<ProxyEntry> {
        let mut state = self.state.write();
        if state.active_ids.is_empty() {
            return Err(Error::NoHealthyProxy);
        }
        let len = state.active_ids.len();
        let idx = state.cursor % len;
        let id = state.active_ids[idx].clone();
        state.cursor = (idx + 1) % len;
        state.entries.iter().find(|entry| entry.id == id).cloned().ok_or(Error::NoHealthyProxy)
    }

    /// Record the outcome of a probe made through `id`. Demotes on failure,
    /// promotes on success, and rebuilds the active set (emitting a
    /// `proxy.status` change) only when the transition actually changes
    /// membership.
    pub async fn report_health(&self, id: &str, success: bool, err: Option<&str>) {
        let change = {
            let mut state = self.state.write();
            let Some(entry) = state.find_mut(id) else { return };
            let was_active = entry.is_active();

            if success {
                entry.is_healthy = true;
                entry.consecutive_failures = 0;
            } else {
                entry.is_healthy = false;
                entry.consecutive_failures += 1;
                entry.last_failure = Some(Utc::now());
                if let Some(message) = err {
                    tracing::debug!(proxy_id = %id, message, "proxy probe failed");
                }
            }

            let is_active = entry.is_active();
            let is_healthy = entry.is_healthy;
            let transitioned = was_active != is_active;
            if transitioned {
                state.rebuild_active();
            }
            transitioned.then(|| ProxyStatusChange { proxy_id: id.to_string(), is_healthy, is_active })
        };

        if let Some(change) = change {
            self.sink.proxy_status_changed(change).await;
        }
    }

    /// Update the operator override flag. Rebuilds the active set only if
    /// the flag actually changed.
    pub async fn set_user_enabled(&self, id: &str, enabled: bool) {
        let change = {
            let mut state = self.state.write();
            let Some(entry) = state.find_mut(id) else { return };
            if entry.user_enabled == Some(enabled) {
                return;
            }
            let was_active = entry.is_active();
            entry.user_enabled = Some(enabled);
            let is_active = entry.is_active();
            let is_healthy = entry.is_healthy;
            if was_active != is_active {
                state.rebuild_active();
            }
            (was_active != is_active).then(|| ProxyStatusChange { proxy_id: id.to_string(), is_healthy, is_active })
        };
        if let Some(change) = change {
            self.sink.proxy_status_changed(change).await;
        }
    }

    /// Synchronously re-check a single proxy's health against the echo
    /// endpoint, updating and (on transition) broadcasting its status.
    pub async fn force_check(&self, id: &str) -> Result<bool> {
        let entry = {
            let state = self.state.read();
            state.entries.iter().find(|entry| entry.id == id).cloned()
        };
        let Some(entry) = entry else {
            return Err(Error::Store(format!("unknown proxy id {id}")));
        };

        let healthy = probe(&entry, &self.config).await;
        self.report_health(id, healthy, (!healthy).then_some("health check failed")).await;
        Ok(healthy)
    }

    /// Bounded-concurrency re-check of several proxies at once.
    pub async fn force_check_async(&self, ids: &[String]) {
        let max_concurrent = self.config.max_concurrent_initial_checks.max(1);
        stream::iter(ids.iter().cloned())
            .for_each_concurrent(max_concurrent, |id| async move {
                let _ = self.force_check(&id).await;
            })
            .await;
    }

    /// Run the bounded-concurrency startup health sweep over every entry.
    pub async fn run_initial_health_checks(&self) {
        let ids: Vec<String> = {
            let state = self.state.read();
            state.entries.iter().map(|entry| entry.id.clone()).collect()
        };
        self.force_check_async(&ids).await;
    }

    /// Snapshot the full entry list (for diagnostics/UI listing).
    #[must_use]
    pub fn snapshot(&self) -> Vec<ProxyEntry> {
        self.state.read().entries.clone()
    }

    /// Number of entries currently in the active dispensable set.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.state.read().active_ids.len()
    }
}

async fn probe(entry: &ProxyEntry, config: &ProxyPoolConfig) -> bool {
    let Ok(proxy) = reqwest::Proxy::all(entry.url()) else { return false };
    let client = match reqwest::Client::builder()
        .proxy(proxy)
        .timeout(config.initial_health_check_timeout)
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client.get(&config.echo_url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}
