/// Per-user sliding-window limiter for AI calls
///
/// Each user owns an ordered list of accepted call instants. On every attempt,
/// instants at least one window old are dropped; the call is accepted iff fewer
/// than `max_calls` remain, and only an accepted call records its instant.
///
/// # Scaling limitation
///
/// [`SlidingWindowLimiter`] keeps its state in process memory. Two service
/// instances each grant the full quota. A shared counter behind
/// [`CallLimiter`] is required before running more than one instance.
///
/// Buckets whose calls have all left the window are evicted every
/// [`EVICTION_INTERVAL`] new keys, so memory tracks recently active users rather
/// than every user ever seen.
///
/// # Example
///
/// ```
/// use teamboard_shared::ai::rate_limit::{CallLimiter, SlidingWindowLimiter};
/// use uuid::Uuid;
///
/// # async fn example() {
/// let limiter = SlidingWindowLimiter::default();
/// let decision = limiter.try_acquire(Uuid::new_v4()).await;
/// assert!(decision.allowed);
/// assert_eq!(decision.remaining, 9);
/// # }
/// ```

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

/// Default accepted calls per window
pub const DEFAULT_MAX_CALLS: usize = 10;

/// Default window length
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// New keys between two idle-bucket sweeps
pub const EVICTION_INTERVAL: usize = 256;

/// Outcome of one acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,

    /// Calls still available in the current window after this one
    pub remaining: u32,

    /// Time until the oldest recorded call leaves the window (zero when allowed)
    pub retry_after: Duration,
}

impl RateDecision {
    /// Whole seconds to wait, rounded up and never zero for a rejection
    pub fn retry_after_secs(&self) -> u64 {
        if self.allowed {
            return 0;
        }
        let secs = self.retry_after.as_secs();
        if self.retry_after.subsec_nanos() > 0 || secs == 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Counter interface consulted by the AI gateway
#[async_trait]
pub trait CallLimiter: Send + Sync {
    /// Attempts to record one call for `key`
    async fn try_acquire(&self, key: Uuid) -> RateDecision;
}

type Bucket = Arc<Mutex<VecDeque<Instant>>>;

/// In-memory sliding-window limiter
///
/// Attempts for the same key are serialized by a per-key mutex; different keys
/// never contend beyond the brief map lookup.
pub struct SlidingWindowLimiter {
    max_calls: usize,
    window: Duration,
    buckets: RwLock<HashMap<Uuid, Bucket>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently tracked
    pub async fn tracked_keys(&self) -> usize {
        self.buckets.read().await.len()
    }

    /// Drops buckets with no call left in the window, returns how many went
    ///
    /// A bucket still referenced by an in-flight attempt is kept.
    pub async fn evict_idle(&self) -> usize {
        let mut buckets = self.buckets.write().await;
        self.evict_locked(&mut buckets)
    }

    fn evict_locked(&self, buckets: &mut HashMap<Uuid, Bucket>) -> usize {
        let now = Instant::now();
        let before = buckets.len();

        buckets.retain(|_, bucket| {
            if Arc::strong_count(bucket) > 1 {
                return true;
            }
            match bucket.try_lock() {
                Ok(calls) => calls
                    .back()
                    .map_or(false, |newest| now.duration_since(*newest) < self.window),
                Err(_) => true,
            }
        });

        before - buckets.len()
    }

    async fn bucket(&self, key: Uuid) -> Bucket {
        if let Some(bucket) = self.buckets.read().await.get(&key) {
            return bucket.clone();
        }

        let mut buckets = self.buckets.write().await;
        if !buckets.contains_key(&key) && buckets.len() % EVICTION_INTERVAL == EVICTION_INTERVAL - 1 {
            let evicted = self.evict_locked(&mut buckets);
            if evicted > 0 {
                tracing::debug!(evicted, tracked = buckets.len(), "Evicted idle rate-limit buckets");
            }
        }
        buckets
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::new())))
            .clone()
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALLS, DEFAULT_WINDOW)
    }
}

#[async_trait]
impl CallLimiter for SlidingWindowLimiter {
    async fn try_acquire(&self, key: Uuid) -> RateDecision {
        let bucket = self.bucket(key).await;
        let mut calls = bucket.lock().await;
        let now = Instant::now();

        while let Some(oldest) = calls.front() {
            if now.duration_since(*oldest) >= self.window {
                calls.pop_front();
            } else {
                break;
            }
        }

        if calls.len() < self.max_calls {
            calls.push_back(now);
            return RateDecision {
                allowed: true,
                remaining: (self.max_calls - calls.len()) as u32,
                retry_after: Duration::ZERO,
            };
        }

        let retry_after = calls
            .front()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or(self.window);

        RateDecision {
            allowed: false,
            remaining: 0,
            retry_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_eleventh_call_rejected_until_window_passes() {
        let limiter = SlidingWindowLimiter::default();
        let user = Uuid::new_v4();

        for i in 0..10 {
            let decision = limiter.try_acquire(user).await;
            assert!(decision.allowed, "call {} should pass", i + 1);
            advance(Duration::from_secs(1)).await;
        }

        let rejected = limiter.try_acquire(user).await;
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
        // First call was 10s ago
        assert_eq!(rejected.retry_after, Duration::from_secs(50));
        assert_eq!(rejected.retry_after_secs(), 50);

        // 60s after the first call, its slot frees up
        advance(Duration::from_secs(50)).await;
        assert!(limiter.try_acquire(user).await.allowed);

        // Only one slot freed
        assert!(!limiter.try_acquire(user).await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_do_not_extend_window() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));
        let user = Uuid::new_v4();

        assert!(limiter.try_acquire(user).await.allowed);
        for _ in 0..5 {
            advance(Duration::from_secs(10)).await;
            assert!(!limiter.try_acquire(user).await.allowed);
        }

        advance(Duration::from_secs(10)).await;
        assert!(limiter.try_acquire(user).await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_users_are_independent() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(60));
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(limiter.try_acquire(alice).await.allowed);
        assert!(limiter.try_acquire(alice).await.allowed);
        assert!(!limiter.try_acquire(alice).await.allowed);

        let decision = limiter.try_acquire(bob).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_attempts_never_exceed_limit() {
        let limiter = Arc::new(SlidingWindowLimiter::default());
        let user = Uuid::new_v4();

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.try_acquire(user).await.allowed })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_buckets_evicted() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(60));
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(limiter.try_acquire(alice).await.allowed);
        advance(Duration::from_secs(30)).await;
        assert!(limiter.try_acquire(bob).await.allowed);
        assert_eq!(limiter.tracked_keys().await, 2);

        // Alice's only call is now outside the window, Bob's is not
        advance(Duration::from_secs(31)).await;
        assert_eq!(limiter.evict_idle().await, 1);
        assert_eq!(limiter.tracked_keys().await, 1);

        // An evicted user starts with a fresh window
        let decision = limiter.try_acquire(alice).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_keys_trigger_periodic_sweep() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));

        for _ in 0..EVICTION_INTERVAL - 1 {
            assert!(limiter.try_acquire(Uuid::new_v4()).await.allowed);
        }
        advance(Duration::from_secs(61)).await;

        assert!(limiter.try_acquire(Uuid::new_v4()).await.allowed);
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[test]
    fn test_retry_after_secs_rounds_up() {
        let decision = RateDecision {
            allowed: false,
            remaining: 0,
            retry_after: Duration::from_millis(12_300),
        };
        assert_eq!(decision.retry_after_secs(), 13);

        let decision = RateDecision {
            allowed: false,
            remaining: 0,
            retry_after: Duration::ZERO,
        };
        assert_eq!(decision.retry_after_secs(), 1);
    }
}
