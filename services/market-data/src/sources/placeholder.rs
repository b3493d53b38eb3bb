//! Synthetic quotes and COT history
//!
//! Used whenever every real provider fails, and as the only source in demos.
//! Output is random but reproducible for a given seed.

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Mutex;

use crate::instruments::Instrument;
use crate::types::{
    CotHistory, CotPoint, CotSource, Quote, QuoteSource, Result, SourceHealth,
};

pub const SOURCE_NAME: &str = "placeholder";

/// Weekly reports returned per currency
pub const COT_WEEKS: usize = 6;

/// Rough mid prices the synthetic quotes wander around
fn reference_price(instrument: Instrument) -> f64 {
    match instrument.symbol() {
        "EUR/USD" => 1.0850,
        "GBP/USD" => 1.2700,
        "USD/JPY" => 149.50,
        "USD/CHF" => 0.8800,
        "AUD/USD" => 0.6550,
        "USD/CAD" => 1.3600,
        "NZD/USD" => 0.6100,
        "EUR/GBP" => 0.8550,
        "EUR/JPY" => 162.20,
        "GBP/JPY" => 189.90,
        "EUR/CHF" => 0.9550,
        "EUR/AUD" => 1.6550,
        "GBP/CHF" => 1.1180,
        "AUD/JPY" => 97.90,
        "CAD/JPY" => 109.90,
        "CHF/JPY" => 169.80,
        "AUD/NZD" => 1.0740,
        "EUR/CAD" => 1.4750,
        "GBP/AUD" => 1.9390,
        "AUD/CAD" => 0.8910,
        "NZD/JPY" => 91.20,
        "EUR/NZD" => 1.7800,
        "USD/TRY" => 32.40,
        "USD/ZAR" => 18.70,
        "USD/MXN" => 17.10,
        "USD/SGD" => 1.3450,
        "EUR/TRY" => 35.10,
        "XAU/USD" => 2350.0,
        "XAG/USD" => 28.50,
        _ => 1.0,
    }
}

fn decimals_for(instrument: Instrument) -> u32 {
    if instrument.pip_size() >= 0.01 {
        3
    } else {
        5
    }
}

/// Seeded generator shared by the placeholder quote and COT sources
pub struct PlaceholderGenerator {
    rng: Mutex<StdRng>,
}

impl PlaceholderGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut rng)
    }

    /// A quote within ±1% of the instrument's reference price
    pub fn quote(&self, instrument: Instrument) -> Quote {
        let reference = reference_price(instrument);
        let pct: f64 = self.with_rng(|rng| rng.gen_range(-1.0..=1.0));
        let dp = decimals_for(instrument);

        let reference_dec = Decimal::try_from(reference).unwrap_or(Decimal::ONE);
        let price = Decimal::try_from(reference * (1.0 + pct / 100.0))
            .unwrap_or(reference_dec)
            .round_dp(dp);
        let change = (price - reference_dec).round_dp(dp);
        let change_percent = (change / reference_dec * Decimal::from(100))
            .round_dp(3)
            .to_f64()
            .unwrap_or(0.0);

        Quote {
            instrument,
            price,
            change,
            change_percent,
            source: SOURCE_NAME.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Six weekly reports ending on the most recent Tuesday, oldest first
    pub fn cot_history(&self, currency: &str) -> CotHistory {
        let last_report = most_recent_tuesday(Utc::now().date_naive());

        let points = self.with_rng(|rng| {
            let mut long: f64 = rng.gen_range(40_000.0..160_000.0);
            let mut short: f64 = rng.gen_range(40_000.0..160_000.0);
            let drift: f64 = rng.gen_range(-0.08..0.08);

            (0..COT_WEEKS)
                .map(|i| {
                    let weeks_back = (COT_WEEKS - 1 - i) as i64;
                    long = (long * (1.0 + drift + rng.gen_range(-0.03..0.03))).max(1_000.0);
                    short = (short * (1.0 - drift + rng.gen_range(-0.03..0.03))).max(1_000.0);
                    CotPoint {
                        date: last_report - Duration::weeks(weeks_back),
                        long_position: long.round() as u64,
                        short_position: short.round() as u64,
                    }
                })
                .collect()
        });

        CotHistory {
            currency: currency.to_uppercase(),
            points,
            source: SOURCE_NAME.to_string(),
        }
    }
}

impl Default for PlaceholderGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// COT reports are dated on Tuesdays
fn most_recent_tuesday(today: NaiveDate) -> NaiveDate {
    let offset = (today.weekday().num_days_from_monday() + 7
        - Weekday::Tue.num_days_from_monday())
        % 7;
    today - Duration::days(offset as i64)
}

/// Quote source that never fails
pub struct PlaceholderQuotes {
    generator: PlaceholderGenerator,
}

impl PlaceholderQuotes {
    pub fn new(generator: PlaceholderGenerator) -> Self {
        Self { generator }
    }

    pub fn quote(&self, instrument: Instrument) -> Quote {
        self.generator.quote(instrument)
    }
}

#[async_trait::async_trait]
impl QuoteSource for PlaceholderQuotes {
    async fn get_quotes(&self, instruments: &[Instrument]) -> Result<Vec<Quote>> {
        Ok(instruments.iter().map(|i| self.generator.quote(*i)).collect())
    }

    async fn health(&self) -> SourceHealth {
        SourceHealth {
            source: SOURCE_NAME.to_string(),
            is_healthy: true,
            last_success: Some(Utc::now()),
            last_error: None,
            success_rate: 1.0,
            avg_latency_ms: 0,
        }
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

/// COT source that never fails
pub struct PlaceholderCot {
    generator: PlaceholderGenerator,
}

impl PlaceholderCot {
    pub fn new(generator: PlaceholderGenerator) -> Self {
        Self { generator }
    }

    pub fn history(&self, currency: &str) -> CotHistory {
        self.generator.cot_history(currency)
    }
}

#[async_trait::async_trait]
impl CotSource for PlaceholderCot {
    async fn get_history(&self, currency: &str) -> Result<CotHistory> {
        Ok(self.generator.cot_history(currency))
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}
