use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use tokio::time::{sleep, Duration, Instant};
use tracing::warn;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::errors::AppError;

/// Token proving ownership of a held lock. Release is a no-op unless the
/// token still matches, so a TTL-expired lock taken over by another holder
/// cannot be released by the original one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(Uuid);

/// SET-NX-with-TTL style mutual exclusion. A single `acquire` attempt never
/// blocks; retry policy belongs to the caller. Backends are swappable: this
/// process-local one suits a single-node deployment, a distributed cache
/// can stand in behind the same interface.
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Returns `None` when the key is currently held and unexpired.
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockToken>, AppError>;

    async fn release(&self, key: &str, token: &LockToken) -> Result<(), AppError>;
}

struct LockEntry {
    token: LockToken,
    expires_at: Instant,
}

#[derive(Default)]
pub struct InMemoryLockProvider {
    locks: DashMap<String, LockEntry>,
}

impl InMemoryLockProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockProvider for InMemoryLockProvider {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockToken>, AppError> {
        let token = LockToken(Uuid::new_v4());
        let entry = LockEntry {
            token: token.clone(),
            expires_at: Instant::now() + ttl,
        };
        match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut held) => {
                if held.get().expires_at > Instant::now() {
                    return Ok(None);
                }
                // Previous holder crashed or stalled past its TTL; take over.
                held.insert(entry);
                Ok(Some(token))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                Ok(Some(token))
            }
        }
    }

    async fn release(&self, key: &str, token: &LockToken) -> Result<(), AppError> {
        self.locks
            .remove_if(key, |_, held| held.token == *token);
        Ok(())
    }
}

/// Per-user mutual exclusion guarding every balance mutation. At most one
/// in-flight mutation per user; operations on distinct users never contend.
#[derive(Clone)]
pub struct UserLockService {
    provider: Arc<dyn LockProvider>,
    config: EngineConfig,
}

impl UserLockService {
    pub fn new(provider: Arc<dyn LockProvider>, config: EngineConfig) -> Self {
        Self { provider, config }
    }

    /// Runs `f` with the user's lock held. The critical section must cover
    /// the whole read-balance -> compute -> persist sequence; the lock is
    /// released on every exit path, and the TTL bounds a crashed holder.
    pub async fn with_user_lock<F, Fut, T>(&self, user_id: Uuid, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let key = format!("balance:{user_id}");
        let token = self.acquire_with_retry(&key).await?;

        let result = f().await;

        if let Err(e) = self.provider.release(&key, &token).await {
            // The TTL will reap the stale entry; the operation itself is done.
            warn!("Failed to release lock {}: {}", key, e);
        }

        result
    }

    async fn acquire_with_retry(&self, key: &str) -> Result<LockToken, AppError> {
        for attempt in 1..=self.config.lock_max_attempts {
            if let Some(token) = self.provider.acquire(key, self.config.lock_ttl).await? {
                return Ok(token);
            }
            if attempt == self.config.lock_max_attempts {
                break;
            }
            let jitter_ms = rand::rng().random_range(0..=self.config.lock_retry_jitter_ms);
            sleep(self.config.lock_retry_delay + Duration::from_millis(jitter_ms)).await;
        }
        warn!(
            "Lock {} still contended after {} attempts",
            key, self.config.lock_max_attempts
        );
        Err(AppError::LockTimeout)
    }
}
