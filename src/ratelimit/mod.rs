//! Per-address connection rate limiting
//!
//! Each source address keeps the time of its last accepted request and
//! the timestamps accepted in the trailing window. A request is refused
//! when it comes sooner than the cooldown after the last accepted one,
//! or when the window already holds the maximum number of requests.
//!
//! Idle addresses are evicted by a housekeeping pass that piggybacks on
//! `check` calls; there is no background timer.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rate limit tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum gap between accepted requests from one address
    pub cooldown_ms: u64,
    /// Maximum accepted requests per window
    pub max_requests: usize,
    /// Length of the sliding window
    pub window_secs: u64,
    /// Idle time after which an address is forgotten
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 1000,
            max_requests: 30,
            window_secs: 60,
            cleanup_interval_secs: 300,
        }
    }
}

impl RateLimitConfig {
    fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

#[derive(Debug, Default)]
struct Ledger {
    last_accepted: Option<Instant>,
    accepted: VecDeque<Instant>,
}

impl Ledger {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.accepted.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.accepted.pop_front();
            } else {
                break;
            }
        }
    }

    fn idle_for(&self, now: Instant) -> Duration {
        self.last_accepted
            .map_or(Duration::MAX, |t| now.saturating_duration_since(t))
    }
}

/// Sliding-window limiter keyed by source address
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    ledgers: RwLock<HashMap<IpAddr, Arc<Mutex<Ledger>>>>,
    last_cleanup: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            ledgers: RwLock::new(HashMap::new()),
            last_cleanup: Mutex::new(Instant::now()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Record a request from `addr`; false means refuse it
    pub fn check(&self, addr: IpAddr) -> bool {
        self.check_at(addr, Instant::now())
    }

    /// `check` against an explicit clock
    pub fn check_at(&self, addr: IpAddr, now: Instant) -> bool {
        self.maybe_cleanup(now);

        let ledger = self.ledger(addr);
        let mut ledger = ledger.lock();
        ledger.prune(now, self.config.window());

        if let Some(last) = ledger.last_accepted {
            if now.saturating_duration_since(last) < self.config.cooldown() {
                debug!(%addr, "rate limited: cooldown");
                return false;
            }
        }
        if ledger.accepted.len() >= self.config.max_requests {
            debug!(%addr, count = ledger.accepted.len(), "rate limited: window full");
            return false;
        }

        ledger.accepted.push_back(now);
        ledger.last_accepted = Some(now);
        true
    }

    /// Number of addresses currently tracked
    pub fn tracked(&self) -> usize {
        self.ledgers.read().len()
    }

    fn ledger(&self, addr: IpAddr) -> Arc<Mutex<Ledger>> {
        if let Some(ledger) = self.ledgers.read().get(&addr) {
            return ledger.clone();
        }
        self.ledgers.write().entry(addr).or_default().clone()
    }

    fn maybe_cleanup(&self, now: Instant) {
        let interval = self.config.cleanup_interval();
        {
            let mut last = self.last_cleanup.lock();
            if now.saturating_duration_since(*last) < interval {
                return;
            }
            *last = now;
        }

        let mut ledgers = self.ledgers.write();
        let before = ledgers.len();
        ledgers.retain(|_, ledger| ledger.lock().idle_for(now) < interval);
        let evicted = before - ledgers.len();
        if evicted > 0 {
            debug!(evicted, remaining = ledgers.len(), "rate limiter housekeeping");
        }
    }
}
