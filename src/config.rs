use std::time::Duration;

/// Tunables for the balance coordinator. Retry count, backoff and TTL are
/// deliberately configuration rather than constants so deployments can match
/// them to their lock backend.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long an acquired user lock stays valid without release.
    pub lock_ttl: Duration,
    /// Total acquisition attempts before giving up with `LockTimeout`.
    pub lock_max_attempts: u32,
    /// Base sleep between acquisition attempts.
    pub lock_retry_delay: Duration,
    /// Upper bound of the random jitter added to each retry sleep, in ms.
    pub lock_retry_jitter_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(10),
            lock_max_attempts: 20,
            lock_retry_delay: Duration::from_millis(50),
            lock_retry_jitter_ms: 25,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lock_ttl: Duration::from_millis(
                env_u64("LOCK_TTL_MS", defaults.lock_ttl.as_millis() as u64),
            ),
            lock_max_attempts: env_u64("LOCK_MAX_ATTEMPTS", defaults.lock_max_attempts as u64)
                as u32,
            lock_retry_delay: Duration::from_millis(env_u64(
                "LOCK_RETRY_DELAY_MS",
                defaults.lock_retry_delay.as_millis() as u64,
            )),
            lock_retry_jitter_ms: env_u64("LOCK_RETRY_JITTER_MS", defaults.lock_retry_jitter_ms),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
