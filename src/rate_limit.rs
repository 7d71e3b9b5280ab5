//! Per-user request rate limiting.
//!
//! Generation endpoints are gated by a fixed window (default 10 requests per
//! 60 seconds per user). The limiter sits behind a trait so a multi-instance
//! deployment can swap in a shared external counter; the default
//! implementation is a process-local map, which is intentionally best-effort:
//! losing it on restart only resets abuse protection, never correctness.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Interval between background sweeps of expired windows.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Request-frequency gate consulted before any generation work starts.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check whether `user_id` may start another request, consuming one slot
    /// if allowed. A denied request consumes nothing.
    async fn check(&self, user_id: &str) -> bool;
}

/// One user's counter within the current window.
#[derive(Debug)]
struct WindowEntry {
    count: u32,
    reset_at: Instant,
}

/// In-memory fixed-window limiter.
///
/// # Behavior
///
/// - First request in a window creates the entry and is allowed
/// - Subsequent requests increment the counter while under the limit
/// - Requests at the limit are denied without incrementing
/// - An expired window is lazily replaced on the next request
/// - A background task periodically drops expired entries so idle users
///   don't accumulate in the map
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Drop all entries whose window has already ended.
    fn sweep_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("rate limit map poisoned");
        entries.retain(|_, entry| entry.reset_at > now);
    }

    /// Spawn the periodic cleanup task for this limiter.
    pub fn spawn_sweeper(self: &Arc<Self>) {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.sweep_expired();
            }
        });
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn check(&self, user_id: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("rate limit map poisoned");

        match entries.get_mut(user_id) {
            Some(entry) if entry.reset_at > now => {
                if entry.count >= self.limit {
                    return false;
                }
                entry.count += 1;
                true
            }
            _ => {
                // No entry yet, or the window expired: start a fresh one.
                entries.insert(
                    user_id.to_string(),
                    WindowEntry {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_exactly_limit_requests_per_window() {
        let limiter = FixedWindowLimiter::new(10, Duration::from_secs(60));

        for _ in 0..10 {
            assert!(limiter.check("user-a").await);
        }
        assert!(!limiter.check("user-a").await);
        // Denials do not consume: still denied, not re-counted.
        assert!(!limiter.check("user-a").await);
    }

    #[tokio::test]
    async fn users_are_counted_independently() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.check("user-a").await);
        assert!(!limiter.check("user-a").await);
        assert!(limiter.check("user-b").await);
    }

    #[tokio::test]
    async fn expired_window_resets_the_counter() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_millis(20));

        assert!(limiter.check("user-a").await);
        assert!(limiter.check("user-a").await);
        assert!(!limiter.check("user-a").await);

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(limiter.check("user-a").await);
        assert!(limiter.check("user-a").await);
        assert!(!limiter.check("user-a").await);
    }

    #[tokio::test]
    async fn sweep_drops_only_expired_entries() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_millis(20));
        limiter.check("stale").await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        let limiter_live = FixedWindowLimiter::new(5, Duration::from_secs(60));
        limiter_live.check("live").await;

        limiter.sweep_expired();
        limiter_live.sweep_expired();

        assert_eq!(limiter.entries.lock().unwrap().len(), 0);
        assert_eq!(limiter_live.entries.lock().unwrap().len(), 1);
    }
}
