//! Proxy pool configuration.

use std::time::Duration;

/// Tunables for the proxy pool manager.
#[derive(Debug, Clone)]
pub struct ProxyPoolConfig {
    /// Bound on concurrent health checks performed at startup.
    pub max_concurrent_initial_checks: usize,
    /// Per-check timeout used during the startup sweep and `force_check`.
    pub initial_health_check_timeout: Duration,
    /// Well-known echo endpoint probed through each proxy.
    pub echo_url: String,
}

impl Default for ProxyPoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent_initial_checks: 10,
            initial_health_check_timeout: Duration::from_secs(7),
            echo_url: "https://echo.leadforge.dev/health".to_string(),
        }
    }
}

impl ProxyPoolConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_initial_checks: std::env::var("LEADFORGE_PROXY_MAX_CONCURRENT_CHECKS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_concurrent_initial_checks),
            initial_health_check_timeout: std::env::var("LEADFORGE_PROXY_HEALTH_CHECK_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.initial_health_check_timeout),
            echo_url: std::env::var("LEADFORGE_PROXY_ECHO_URL").unwrap_or(defaults.echo_url),
        }
    }
}
