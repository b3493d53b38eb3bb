//! Quote and COT sources
//!
//! HTTP-backed sources share the health bookkeeping and request helper below.

pub mod alpha_vantage;
pub mod cftc;
pub mod exchange_rate;
pub mod placeholder;

use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::instruments::Instrument;
use crate::types::{MarketDataError, Result, SourceHealth};

/// Internal health tracking for API-free health checks
pub(crate) struct HealthTracker {
    /// Timestamp of last successful request (millis since epoch)
    last_success_ms: AtomicU64,
    /// Timestamp of last failed request (millis since epoch)
    last_failure_ms: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    /// Last known latency in ms
    last_latency_ms: AtomicU64,
}

impl HealthTracker {
    pub(crate) fn new() -> Self {
        Self {
            last_success_ms: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            last_latency_ms: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_success(&self, latency_ms: u64) {
        let now_ms = Utc::now().timestamp_millis() as u64;
        self.last_success_ms.store(now_ms, Ordering::Relaxed);
        self.last_latency_ms.store(latency_ms, Ordering::Relaxed);
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        let now_ms = Utc::now().timestamp_millis() as u64;
        self.last_failure_ms.store(now_ms, Ordering::Relaxed);
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    fn is_healthy(&self) -> bool {
        let last_success = self.last_success_ms.load(Ordering::Relaxed);
        let last_failure = self.last_failure_ms.load(Ordering::Relaxed);

        // Healthy if: had at least one success AND (no failures OR last success >= last failure)
        last_success > 0 && (last_failure == 0 || last_success >= last_failure)
    }

    fn success_rate(&self) -> f64 {
        let successes = self.success_count.load(Ordering::Relaxed);
        let failures = self.failure_count.load(Ordering::Relaxed);
        let total = successes + failures;
        if total == 0 {
            return 1.0; // No requests yet, assume healthy
        }
        successes as f64 / total as f64
    }

    pub(crate) fn snapshot(&self, source: &str) -> SourceHealth {
        let last_success_ms = self.last_success_ms.load(Ordering::Relaxed);
        let last_success = if last_success_ms > 0 {
            DateTime::from_timestamp_millis(last_success_ms as i64)
        } else {
            None
        };
        let is_healthy = self.is_healthy();

        SourceHealth {
            source: source.to_string(),
            is_healthy,
            last_success,
            last_error: if is_healthy {
                None
            } else {
                Some("Recent failures detected".to_string())
            },
            success_rate: self.success_rate(),
            avg_latency_ms: self.last_latency_ms.load(Ordering::Relaxed),
        }
    }
}

/// GET a JSON document, recording the outcome on the tracker
pub(crate) async fn fetch_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    provider: &str,
    tracker: &HealthTracker,
) -> Result<T> {
    let started = Instant::now();

    let response = client.get(url).send().await.map_err(|e| {
        tracker.record_failure();
        MarketDataError::ApiError(format!("{} request failed: {}", provider, e))
    })?;

    let status = response.status();
    if status.as_u16() == 429 {
        tracker.record_failure();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        return Err(MarketDataError::RateLimit {
            provider: provider.to_string(),
            retry_after,
        });
    }

    if !status.is_success() {
        tracker.record_failure();
        let text = response.text().await.unwrap_or_default();
        return Err(MarketDataError::ApiError(format!(
            "{} API error ({}): {}",
            provider, status, text
        )));
    }

    let parsed = response.json::<T>().await.map_err(|e| {
        tracker.record_failure();
        MarketDataError::InvalidResponse(format!("{}: {}", provider, e))
    })?;

    tracker.record_success(started.elapsed().as_millis() as u64);
    Ok(parsed)
}

/// Remembers the last price seen per instrument so rate-only APIs can report a change
pub(crate) struct LastPrices {
    prices: Mutex<HashMap<Instrument, Decimal>>,
}

impl LastPrices {
    pub(crate) fn new() -> Self {
        Self {
            prices: Mutex::new(HashMap::new()),
        }
    }

    /// Record `price` and return the change against the previous observation
    pub(crate) fn observe(&self, instrument: Instrument, price: Decimal) -> Decimal {
        let mut prices = match self.prices.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let previous = prices.insert(instrument, price);
        previous.map(|p| price - p).unwrap_or(Decimal::ZERO)
    }
}
