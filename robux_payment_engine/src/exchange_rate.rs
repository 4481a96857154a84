//! A small TTL cache in front of the exchange-rate source.
//!
//! Checkout availability beats settlement-currency precision: if the upstream source errors or times out, the
//! lookup falls back to a configured constant instead of surfacing an error. The TTL bounds both staleness and the
//! request rate against the upstream source.

use std::time::{Duration, Instant};

use log::*;
use tokio::sync::RwLock;

use crate::traits::RateSource;

/// Approximate USDT→ARS rate used when the source is unreachable. A safe non-zero value; never let a rate failure
/// price anything at zero.
pub const FALLBACK_USDT_ARS: f64 = 1400.0;

pub const DEFAULT_RATE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    rate: f64,
    fetched_at: Instant,
}

pub struct CachedRate<S> {
    source: S,
    ttl: Duration,
    fallback: f64,
    cached: RwLock<Option<CacheEntry>>,
}

impl<S> CachedRate<S>
where S: RateSource
{
    pub fn new(source: S) -> Self {
        Self::with_ttl(source, DEFAULT_RATE_TTL, FALLBACK_USDT_ARS)
    }

    pub fn with_ttl(source: S, ttl: Duration, fallback: f64) -> Self {
        Self { source, ttl, fallback, cached: RwLock::new(None) }
    }

    /// The current rate. Never fails; a failed or timed-out upstream lookup yields the fallback rate, which is
    /// cached like any other value so a flapping source doesn't get hammered.
    pub async fn get(&self) -> f64 {
        if let Some(entry) = *self.cached.read().await {
            if entry.fetched_at.elapsed() < self.ttl {
                return entry.rate;
            }
        }
        let mut guard = self.cached.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(entry) = *guard {
            if entry.fetched_at.elapsed() < self.ttl {
                return entry.rate;
            }
        }
        let rate = match self.source.fetch_rate().await {
            Ok(rate) => {
                info!("💱️ Exchange rate refreshed: {rate}");
                rate
            },
            Err(e) => {
                warn!("💱️ Could not fetch exchange rate ({e}). Using the fallback rate of {}.", self.fallback);
                self.fallback
            },
        };
        *guard = Some(CacheEntry { rate, fetched_at: Instant::now() });
        rate
    }
}
