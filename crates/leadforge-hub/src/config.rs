//! Broadcast hub configuration.

use std::time::Duration;

/// Tunables for the broadcast hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Bound on each client's outbound send queue.
    pub client_queue_capacity: usize,
    /// Number of recent events retained per campaign for late-join recovery.
    pub ring_capacity: usize,
    /// Maximum retry attempts before a dropped enqueue is given up on.
    pub max_retry_attempts: u32,
    /// Base backoff for retry attempts; attempt `n` waits `base * n`.
    pub retry_backoff_base: Duration,
    /// Graceful-shutdown drain window.
    pub drain_window: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            client_queue_capacity: 256,
            ring_capacity: 512,
            max_retry_attempts: 3,
            retry_backoff_base: Duration::from_millis(1000),
            drain_window: Duration::from_secs(5),
        }
    }
}

impl HubConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable, mirroring
    /// `CollabConfig::from_env`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            client_queue_capacity: std::env::var("LEADFORGE_HUB_CLIENT_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.client_queue_capacity),
            ring_capacity: std::env::var("LEADFORGE_HUB_RING_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ring_capacity),
            max_retry_attempts: std::env::var("LEADFORGE_HUB_MAX_RETRY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retry_attempts),
            retry_backoff_base: std::env::var("LEADFORGE_HUB_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff_base),
            drain_window: std::env::var("LEADFORGE_HUB_DRAIN_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.drain_window),
        }
    }
}
