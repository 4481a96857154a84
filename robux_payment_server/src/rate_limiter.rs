//! Fixed-window rate limiter for the mutating endpoints.
//!
//! Owned explicitly by the server and handed to handlers as shared app data, so it can be constructed with
//! test-friendly limits and swapped out wholesale under horizontal scaling.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::debug;

/// How long a client's window entry may sit idle before the sweeper drops it.
pub const SWEEP_IDLE_THRESHOLD: Duration = Duration::from_secs(3600);

struct Window {
    count: u32,
    started_at: Instant,
}

pub struct RateLimiter {
    windows: DashMap<String, Window>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { windows: DashMap::new(), limit, window }
    }

    /// Returns true when the request is within the client's budget for the current window.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    // The entry guard holds the shard lock for the whole increment-or-reset, keeping it atomic under
    // concurrent requests from the same client.
    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window { count: 0, started_at: now });
        if now.duration_since(entry.started_at) >= self.window {
            entry.count = 0;
            entry.started_at = now;
        }
        entry.count = entry.count.saturating_add(1);
        let allowed = entry.count <= self.limit;
        if !allowed {
            debug!("⏱️ Rate limit exceeded for {key} ({} requests this window)", entry.count);
        }
        allowed
    }

    /// Drop entries that have been idle longer than `idle_for`. Called periodically to bound memory.
    pub fn sweep(&self, idle_for: Duration) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, w| now.duration_since(w.started_at) < idle_for);
        let dropped = before - self.windows.len();
        if dropped > 0 {
            debug!("⏱️ Swept {dropped} idle rate-limit entries");
        }
    }
}
