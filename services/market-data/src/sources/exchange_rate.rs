use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, warn};

use super::{fetch_json, HealthTracker, LastPrices};
use crate::instruments::{Instrument, InstrumentClass};
use crate::types::{MarketDataError, Quote, QuoteSource, Result, SourceHealth};

const DEFAULT_BASE_URL: &str = "https://api.exchangerate-api.com";
const SOURCE_NAME: &str = "exchangerate-api";

/// Free forex data from exchangerate-api.com (no API key required for basic tier)
///
/// One request per base currency returns every cross rate, so a batch of
/// instruments costs at most one call per distinct base.
pub struct ExchangeRateApiClient {
    client: Client,
    base_url: String,
    health_tracker: HealthTracker,
    last_prices: LastPrices,
}

#[derive(Debug, Deserialize)]
struct ExchangeRateApiResponse {
    base_code: String,
    rates: HashMap<String, f64>,
    time_last_update_unix: i64,
}

impl ExchangeRateApiClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            health_tracker: HealthTracker::new(),
            last_prices: LastPrices::new(),
        }
    }

    /// All rates for one base currency
    async fn get_rates(&self, base_currency: &str) -> Result<ExchangeRateApiResponse> {
        let url = format!("{}/v4/latest/{}", self.base_url, base_currency.to_uppercase());
        debug!("Fetching exchange rates for base {}", base_currency);

        let data: ExchangeRateApiResponse =
            fetch_json(&self.client, &url, SOURCE_NAME, &self.health_tracker).await?;

        if !data.base_code.eq_ignore_ascii_case(base_currency) {
            return Err(MarketDataError::InvalidResponse(format!(
                "Asked for base {} but got {}",
                base_currency, data.base_code
            )));
        }

        Ok(data)
    }

    fn to_quote(&self, instrument: Instrument, rate: f64, updated: DateTime<Utc>) -> Option<Quote> {
        let price = Decimal::try_from(rate).ok()?.round_dp(6);
        if price <= Decimal::ZERO {
            return None;
        }
        let change = self.last_prices.observe(instrument, price);
        let previous = price - change;
        let change_percent = if previous > Decimal::ZERO {
            (change / previous * Decimal::from(100)).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };

        Some(Quote {
            instrument,
            price,
            change,
            change_percent,
            source: SOURCE_NAME.to_string(),
            timestamp: updated,
        })
    }
}

impl Default for ExchangeRateApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl QuoteSource for ExchangeRateApiClient {
    async fn get_quotes(&self, instruments: &[Instrument]) -> Result<Vec<Quote>> {
        // Metals are not served by this API
        let mut by_base: BTreeMap<&str, Vec<Instrument>> = BTreeMap::new();
        for inst in instruments
            .iter()
            .filter(|i| i.class() != InstrumentClass::Metal)
        {
            by_base.entry(inst.base()).or_default().push(*inst);
        }

        let mut quotes = Vec::new();
        let mut last_error = None;

        for (base, group) in by_base {
            match self.get_rates(base).await {
                Ok(data) => {
                    let updated = DateTime::from_timestamp(data.time_last_update_unix, 0)
                        .unwrap_or_else(Utc::now);
                    for inst in group {
                        match data.rates.get(inst.quote()) {
                            Some(rate) => {
                                if let Some(q) = self.to_quote(inst, *rate, updated) {
                                    quotes.push(q);
                                }
                            }
                            None => debug!("{} missing from {} rates", inst, base),
                        }
                    }
                }
                Err(e) => {
                    warn!("exchangerate-api failed for base {}: {}", base, e);
                    last_error = Some(e);
                }
            }
        }

        // Only a failure if nothing at all came back
        match (quotes.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(quotes),
        }
    }

    async fn health(&self) -> SourceHealth {
        self.health_tracker.snapshot(SOURCE_NAME)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}
