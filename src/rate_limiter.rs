//! Quota-unit token bucket for Gmail read calls
//!
//! Gmail charges each call against a per-user budget of quota units per second
//! (250 by default). The three calls this crate makes cost:
//! - `labels.list`: 1 unit
//! - `messages.list`: 5 units
//! - `messages.get`: 5 units
//!
//! Callers wait for units instead of being rejected, so a large label fans out
//! no faster than the account's quota refills.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::config::GmailConfig;

/// Gmail API calls and their quota cost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaCost {
    LabelsList,
    MessagesList,
    MessagesGet,
}

impl QuotaCost {
    pub fn units(&self) -> u32 {
        match self {
            QuotaCost::LabelsList => 1,
            QuotaCost::MessagesList => 5,
            QuotaCost::MessagesGet => 5,
        }
    }
}

/// Shared token bucket; clones draw from the same budget
#[derive(Debug, Clone)]
pub struct QuotaRateLimiter {
    inner: Arc<Mutex<Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    available: f64,
    capacity: f64,
    units_per_second: f64,
    last_refill: Instant,
    units_consumed: u64,
    calls: u64,
}

impl Bucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.available = (self.available + elapsed * self.units_per_second).min(self.capacity);
        self.last_refill = now;
    }

    fn take(&mut self, units: f64) {
        self.available -= units;
        self.units_consumed += units as u64;
        self.calls += 1;
    }
}

impl QuotaRateLimiter {
    /// A bucket that starts full
    pub fn new(units_per_second: u32, burst_units: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Bucket {
                available: f64::from(burst_units),
                capacity: f64::from(burst_units),
                units_per_second: f64::from(units_per_second),
                last_refill: Instant::now(),
                units_consumed: 0,
                calls: 0,
            })),
        }
    }

    pub fn from_config(config: &GmailConfig) -> Self {
        Self::new(config.quota_units_per_second, config.quota_burst_units)
    }

    /// Wait until the bucket holds enough units for `cost`, then spend them
    pub async fn acquire(&self, cost: QuotaCost) {
        let needed = f64::from(cost.units());

        loop {
            let wait = {
                let mut bucket = self.inner.lock().await;
                bucket.refill();

                trace!(
                    "Quota {:.1}/{:.1} units, {:?} needs {}",
                    bucket.available,
                    bucket.capacity,
                    cost,
                    needed
                );

                if bucket.available >= needed {
                    bucket.take(needed);
                    return;
                }

                Duration::from_secs_f64((needed - bucket.available) / bucket.units_per_second)
            };

            // Sleep outside the lock so other callers can refill and spend
            debug!("Quota exhausted, waiting {:.3}s for {:?}", wait.as_secs_f64(), cost);
            tokio::time::sleep(wait).await;
        }
    }

    pub async fn stats(&self) -> QuotaStats {
        let mut bucket = self.inner.lock().await;
        bucket.refill();
        QuotaStats {
            available_units: bucket.available as u32,
            units_consumed: bucket.units_consumed,
            calls: bucket.calls,
        }
    }
}

impl Default for QuotaRateLimiter {
    fn default() -> Self {
        Self::from_config(&GmailConfig::default())
    }
}

/// Snapshot of quota usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaStats {
    pub available_units: u32,
    pub units_consumed: u64,
    pub calls: u64,
}
