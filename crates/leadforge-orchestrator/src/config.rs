//! Phase orchestrator tunables.

use std::time::Duration;

/// Tunables governing a single phase orchestrator instance.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on concurrent probes per domain (a domain rarely needs
    /// more than one in flight; this guards against retries overlapping).
    pub max_concurrent_per_domain: usize,
    /// Upper bound on concurrent probes across the whole phase.
    pub max_concurrent_goroutines: usize,
    /// Steady-state requests-per-second for the phase's rate limiter.
    pub requests_per_second: f64,
    /// Burst capacity for the phase's rate limiter.
    pub burst: u32,
    /// How often the cancellation-delivery loop polls for a cancelled token.
    pub poll_interval: Duration,
    /// Relative drift fraction above which reconciliation corrects counters.
    pub drift_threshold: f64,
    /// Whether reconciliation overwrites counters once drift is detected.
    pub auto_correct: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_per_domain: 1,
            max_concurrent_goroutines: 50,
            requests_per_second: 20.0,
            burst: 40,
            poll_interval: Duration::from_millis(500),
            drift_threshold: 0.0001, // 0.01%
            auto_correct: true,
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_per_domain: env_usize("LEADFORGE_MAX_CONCURRENT_PER_DOMAIN", defaults.max_concurrent_per_domain),
            max_concurrent_goroutines: env_usize("LEADFORGE_MAX_CONCURRENT_GOROUTINES", defaults.max_concurrent_goroutines),
            requests_per_second: env_f64("LEADFORGE_RATE_LIMIT_RPS", defaults.requests_per_second),
            burst: env_usize("LEADFORGE_RATE_LIMIT_BURST", defaults.burst as usize) as u32,
            poll_interval: std::env::var("LEADFORGE_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            drift_threshold: env_f64("LEADFORGE_DRIFT_THRESHOLD", defaults.drift_threshold),
            auto_correct: std::env::var("LEADFORGE_AUTO_CORRECT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.auto_correct),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
