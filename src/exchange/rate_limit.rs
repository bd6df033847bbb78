// =============================================================================
// Request-weight tracker: keeps kline paging clear of Binance 429s
// =============================================================================
//
// Binance reports the request weight used in the current minute through the
// `X-MBX-USED-WEIGHT-1M` response header (limit 1200 / minute, we hard-cap
// ourselves at 1000).  The tracker stores the latest value in an atomic so
// concurrent fetch tasks sharing one client can read it lock-free, and turns
// it into an extra pause between pages once usage gets high.
// =============================================================================

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

/// Hard ceiling at which paging waits for the minute window to roll over.
const WEIGHT_HARD_LIMIT: u32 = 1000;
/// Soft threshold at which paging slows down.
const WEIGHT_WARN_THRESHOLD: u32 = 800;

/// Thread-safe weight tracker backed by an atomic counter.
pub struct RateLimitTracker {
    used_weight_1m: AtomicU32,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            used_weight_1m: AtomicU32::new(0),
        }
    }

    /// Update the counter from the response headers of a Binance request.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let Some(weight) = headers
            .get("X-MBX-USED-WEIGHT-1M")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok())
        else {
            return;
        };

        let prev = self.used_weight_1m.swap(weight, Ordering::Relaxed);
        if weight >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "rate-limit weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = weight, "rate-limit weight updated from header");
    }

    pub fn used_weight(&self) -> u32 {
        self.used_weight_1m.load(Ordering::Relaxed)
    }

    /// Extra pause to add before the next page on top of the configured
    /// politeness delay.
    pub fn throttle_delay(&self) -> Duration {
        match self.used_weight() {
            w if w >= WEIGHT_HARD_LIMIT => Duration::from_secs(60),
            w if w >= WEIGHT_WARN_THRESHOLD => Duration::from_secs(2),
            _ => Duration::ZERO,
        }
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("used_weight_1m", &self.used_weight())
            .finish()
    }
}
