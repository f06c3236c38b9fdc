//! Lock service configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the lock service. Acquisition timeouts themselves are
/// always caller-supplied ("lock acquisition — caller-supplied,
/// no implicit default"); this struct only covers the service's own
/// maintenance cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockServiceConfig {
    /// How often a background caller should invoke `cleanup_expired`.
    #[serde(with = "humantime_duration")]
    pub reap_interval: Duration,
}

impl Default for LockServiceConfig {
    fn default() -> Self {
        Self { reap_interval: Duration::from_secs(30) }
    }
}

impl LockServiceConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset, mirroring `CollabConfig::from_env`.
    #[must_use]
    pub fn from_env() -> Self {
        let reap_interval = std::env::var("LEADFORGE_LOCK_REAP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map_or_else(|| Self::default().reap_interval, Duration::from_secs);
        Self { reap_interval }
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
