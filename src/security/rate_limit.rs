//! Fixed-window rate limiting keyed by client.
//!
//! Each client key owns at most one [`ClientRateRecord`]. The first request of
//! a window creates (or replaces) the record with `count = 1`; later requests
//! in the same window increment it until `max_requests` is reached, after
//! which the client is rejected until the window resets.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::{mapref::entry::Entry, DashMap};

use crate::config::RateLimitConfig;
use crate::http::error::GatewayError;
use crate::observability::metrics;
use crate::security::client::client_key;

/// Per-client counter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRateRecord {
    pub count: u32,
    pub window_reset_at: DateTime<Utc>,
}

/// Window length and per-window cap.
#[derive(Debug, Clone, Copy)]
pub struct WindowPolicy {
    pub window: Duration,
    pub max_requests: u32,
}

impl WindowPolicy {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
        }
    }

    /// End of a window opened at `now`.
    pub fn reset_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.window)
            .ok()
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl From<&RateLimitConfig> for WindowPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self::new(config.window(), config.max_requests)
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub record: ClientRateRecord,
}

/// Error raised by a rate limit store backend.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit store unavailable: {0}")]
    Backend(String),
}

impl From<RateLimitError> for GatewayError {
    fn from(err: RateLimitError) -> Self {
        GatewayError::internal(err)
    }
}

/// Storage for client rate records.
///
/// `admit` must apply the whole read-check-write for one key atomically; a
/// shared backend implements it as a single increment-then-compare operation.
#[async_trait]
pub trait RateLimitStore: Send + Sync + 'static {
    /// Apply fixed-window admission for `key` at `now`.
    async fn admit(
        &self,
        key: &str,
        policy: &WindowPolicy,
        now: DateTime<Utc>,
    ) -> Result<Admission, RateLimitError>;

    /// Current record for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<ClientRateRecord>, RateLimitError>;

    /// Drop records whose window ended before `now`. Returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, RateLimitError>;
}

/// In-process store for single-instance deployments.
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    records: DashMap<String, ClientRateRecord>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn admit(
        &self,
        key: &str,
        policy: &WindowPolicy,
        now: DateTime<Utc>,
    ) -> Result<Admission, RateLimitError> {
        let fresh = ClientRateRecord {
            count: 1,
            window_reset_at: policy.reset_at(now),
        };

        // The entry guard holds the shard lock for the whole decision.
        let admission = match self.records.entry(key.to_string()) {
            Entry::Occupied(mut entry) if now <= entry.get().window_reset_at => {
                let record = entry.get_mut();
                let allowed = record.count < policy.max_requests;
                if allowed {
                    record.count += 1;
                }
                Admission {
                    allowed,
                    record: *record,
                }
            }
            Entry::Occupied(mut entry) => {
                entry.insert(fresh);
                Admission {
                    allowed: true,
                    record: fresh,
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(fresh);
                Admission {
                    allowed: true,
                    record: fresh,
                }
            }
        };

        Ok(admission)
    }

    async fn get(&self, key: &str) -> Result<Option<ClientRateRecord>, RateLimitError> {
        Ok(self.records.get(key).map(|record| *record))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, RateLimitError> {
        let before = self.records.len();
        self.records.retain(|_, record| record.window_reset_at >= now);
        Ok(before.saturating_sub(self.records.len()))
    }
}

/// Fixed-window limiter over a pluggable store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: WindowPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, policy: WindowPolicy) -> Self {
        Self { store, policy }
    }

    /// Limiter backed by a fresh in-memory store.
    pub fn in_memory(policy: WindowPolicy) -> Self {
        Self::new(Arc::new(MemoryRateLimitStore::new()), policy)
    }

    pub async fn admit(&self, key: &str) -> Result<Admission, RateLimitError> {
        self.admit_at(key, Utc::now()).await
    }

    pub async fn admit_at(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Admission, RateLimitError> {
        self.store.admit(key, &self.policy, now).await
    }
}

/// Middleware gate: rejects clients over their window budget with 429.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let key = client_key(request.headers());
    let admission = limiter.admit(&key).await?;

    if admission.allowed {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(
            client = %key,
            count = admission.record.count,
            reset_at = %admission.record.window_reset_at,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited();
        Err(GatewayError::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32) -> RateLimiter {
        RateLimiter::in_memory(WindowPolicy::new(Duration::from_secs(60), max))
    }

    #[tokio::test]
    async fn test_admits_up_to_max() {
        let limiter = limiter(3);
        let now = Utc::now();

        for expected in 1..=3 {
            let admission = limiter.admit_at("1.2.3.4", now).await.unwrap();
            assert!(admission.allowed);
            assert_eq!(admission.record.count, expected);
        }

        let rejected = limiter.admit_at("1.2.3.4", now).await.unwrap();
        assert!(!rejected.allowed);
        assert_eq!(rejected.record.count, 3, "rejections do not increment");
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = limiter(1);
        let now = Utc::now();

        assert!(limiter.admit_at("a", now).await.unwrap().allowed);
        assert!(!limiter.admit_at("a", now).await.unwrap().allowed);
        assert!(limiter.admit_at("b", now).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_window_rollover_resets_to_one() {
        let limiter = limiter(2);
        let start = Utc::now();

        limiter.admit_at("c", start).await.unwrap();
        limiter.admit_at("c", start).await.unwrap();
        assert!(!limiter.admit_at("c", start).await.unwrap().allowed);

        // Still inside the window at exactly the reset instant.
        let reset_at = start + TimeDelta::seconds(60);
        assert!(!limiter.admit_at("c", reset_at).await.unwrap().allowed);

        let later = reset_at + TimeDelta::milliseconds(1);
        let admission = limiter.admit_at("c", later).await.unwrap();
        assert!(admission.allowed);
        assert_eq!(admission.record.count, 1);
        assert_eq!(admission.record.window_reset_at, later + TimeDelta::seconds(60));
    }

    #[tokio::test]
    async fn test_record_is_replaced_not_merged() {
        let store = MemoryRateLimitStore::new();
        let policy = WindowPolicy::new(Duration::from_secs(10), 5);
        let start = Utc::now();

        store.admit("k", &policy, start).await.unwrap();
        store.admit("k", &policy, start).await.unwrap();
        let next_window = start + TimeDelta::seconds(11);
        store.admit("k", &policy, next_window).await.unwrap();

        let record = store.get("k").await.unwrap().unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryRateLimitStore::new();
        let policy = WindowPolicy::new(Duration::from_secs(10), 5);
        let start = Utc::now();

        store.admit("old", &policy, start).await.unwrap();
        store
            .admit("new", &policy, start + TimeDelta::seconds(8))
            .await
            .unwrap();

        let removed = store
            .purge_expired(start + TimeDelta::seconds(12))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.get("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_admission_never_over_admits() {
        let limiter = Arc::new(limiter(50));
        let now = Utc::now();

        let mut tasks = Vec::new();
        for _ in 0..200 {
            let limiter = limiter.clone();
            tasks.push(tokio::spawn(async move {
                limiter.admit_at("shared", now).await.unwrap().allowed
            }));
        }

        let mut admitted = 0;
        for task in tasks {
            if task.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 50);
    }

    #[test]
    fn test_huge_window_saturates() {
        let policy = WindowPolicy::new(Duration::from_secs(u64::MAX), 1);
        assert_eq!(policy.reset_at(Utc::now()), DateTime::<Utc>::MAX_UTC);
    }
}
