//! Per-caller fixed-window rate limiting.
//!
//! Each caller gets a counter that resets once its window expires. Denied
//! attempts still increment the counter, so a caller hammering the gateway
//! stays locked out until the window rolls over.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window admission control keyed by caller id.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, RateWindow>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Count one request for `caller_id` and report whether it is allowed.
    pub async fn admit(&self, caller_id: &str) -> bool {
        let now = self.clock.now();
        let mut windows = self.windows.lock().await;

        let entry = windows
            .entry(caller_id.to_string())
            .or_insert(RateWindow {
                count: 0,
                reset_at: now + self.window,
            });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }

        entry.count = entry.count.saturating_add(1);
        entry.count <= self.limit
    }
}
