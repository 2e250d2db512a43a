//! Fixed-window request counter keyed by client address.
//!
//! ```text
//! first request ──► window opens, count = 1
//! ...           ──► count += 1, rejected once count > max
//! window elapsed ─► count resets on the next request
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// Entries beyond this count trigger a sweep of expired windows.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count a request from `key` at `now`. Returns `false` when the
    /// request exceeds the limit for the current window.
    pub fn check(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if windows.len() > PRUNE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) <= window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) > self.window {
            entry.started = now;
            entry.count = 0;
        }
        entry.count += 1;

        let allowed = entry.count <= self.max_requests;
        if !allowed {
            debug!("Rate limit hit for {} ({} requests)", key, entry.count);
        }
        allowed
    }
}
