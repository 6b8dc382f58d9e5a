// Policy source
//
// The reservation core reads its hold duration through `PolicySource`. In
// production that is `SettingsStore`, which caches the `global_settings`
// singleton row for a short TTL; tests use `StaticPolicy`.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::settings::{Policy, SettingsError};

/// Default time-to-live for the cached policy
pub const DEFAULT_POLICY_TTL: Duration = Duration::from_secs(60);

/// Read-only access to the current policy
#[async_trait]
pub trait PolicySource: Send + Sync {
    async fn policy(&self) -> Result<Policy, SettingsError>;
}

/// Fixed policy, mainly for tests and local runs
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPolicy(pub Policy);

#[async_trait]
impl PolicySource for StaticPolicy {
    async fn policy(&self) -> Result<Policy, SettingsError> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Default)]
struct PolicyCache {
    policy: Option<Policy>,
    loaded_at: Option<Instant>,
}

impl PolicyCache {
    fn fresh(&self, ttl: Duration) -> Option<Policy> {
        match (self.policy, self.loaded_at) {
            (Some(policy), Some(loaded_at)) if loaded_at.elapsed() <= ttl => Some(policy),
            _ => None,
        }
    }

    fn store(&mut self, policy: Policy) {
        self.policy = Some(policy);
        self.loaded_at = Some(Instant::now());
    }

    fn clear(&mut self) {
        self.loaded_at = None;
    }
}

/// Policy backed by the `global_settings` table
pub struct SettingsStore {
    pool: PgPool,
    cache: Arc<RwLock<PolicyCache>>,
    cache_ttl: Duration,
}

impl SettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_ttl(pool, DEFAULT_POLICY_TTL)
    }

    pub fn with_ttl(pool: PgPool, cache_ttl: Duration) -> Self {
        Self {
            pool,
            cache: Arc::new(RwLock::new(PolicyCache::default())),
            cache_ttl,
        }
    }

    /// Load and validate the settings row
    ///
    /// A missing row yields the default policy; an out-of-range row is an error.
    pub async fn load_policy(&self) -> Result<Policy, SettingsError> {
        let row = sqlx::query_as::<_, Policy>(
            r#"
            SELECT reservation_duration_minutes, merchant_edit_window_hours
            FROM global_settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(policy) => {
                policy.validate()?;
                Ok(policy)
            }
            None => {
                warn!("global_settings row missing, using default policy");
                Ok(Policy::default())
            }
        }
    }

    /// Force the next lookup to hit the database
    pub async fn invalidate(&self) {
        self.cache.write().await.clear();
    }
}

#[async_trait]
impl PolicySource for SettingsStore {
    async fn policy(&self) -> Result<Policy, SettingsError> {
        // Fast path under the read lock
        if let Some(policy) = self.cache.read().await.fresh(self.cache_ttl) {
            return Ok(policy);
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited
        if let Some(policy) = cache.fresh(self.cache_ttl) {
            return Ok(policy);
        }

        let policy = self.load_policy().await?;
        debug!(
            reservation_duration_minutes = policy.reservation_duration_minutes,
            "Policy cache refreshed"
        );
        cache.store(policy);
        Ok(policy)
    }
}
