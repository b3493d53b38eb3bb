use chrono::{NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{fetch_json, HealthTracker, LastPrices};
use crate::instruments::Instrument;
use crate::types::{MarketDataError, Quote, QuoteSource, Result, SourceHealth};

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";
const SOURCE_NAME: &str = "alphavantage";

/// Alpha Vantage API client for forex and metals
/// Free tier: 25 calls/day, so it sits behind the free sources in the chain
/// Docs: https://www.alphavantage.co/documentation/
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
    health_tracker: HealthTracker,
    last_prices: LastPrices,
}

#[derive(Debug, Deserialize)]
struct ExchangeRateData {
    #[serde(rename = "1. From_Currency Code")]
    from_currency: String,
    #[serde(rename = "3. To_Currency Code")]
    to_currency: String,
    #[serde(rename = "5. Exchange Rate")]
    exchange_rate: String,
    #[serde(rename = "6. Last Refreshed")]
    last_refreshed: String,
}

impl AlphaVantageClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            health_tracker: HealthTracker::new(),
            last_prices: LastPrices::new(),
        }
    }

    /// Get one exchange rate (e.g. EUR/USD, XAU/USD)
    pub async fn get_forex_rate(&self, instrument: Instrument) -> Result<Quote> {
        let url = url::Url::parse_with_params(
            &format!("{}/query", self.base_url),
            &[
                ("function", "CURRENCY_EXCHANGE_RATE"),
                ("from_currency", instrument.base()),
                ("to_currency", instrument.quote()),
                ("apikey", self.api_key.as_str()),
            ],
        )
        .map_err(|e| MarketDataError::ApiError(e.to_string()))?;

        debug!("Fetching Alpha Vantage rate for {}", instrument);

        // Throttling comes back as a 200 with a "Note"/"Information" body
        let body: serde_json::Value =
            fetch_json(&self.client, url.as_str(), SOURCE_NAME, &self.health_tracker).await?;

        if body.get("Note").is_some() || body.get("Information").is_some() {
            self.health_tracker.record_failure();
            return Err(MarketDataError::RateLimit {
                provider: SOURCE_NAME.to_string(),
                retry_after: None,
            });
        }

        let data: ExchangeRateData = body
            .get("Realtime Currency Exchange Rate")
            .cloned()
            .map(serde_json::from_value::<ExchangeRateData>)
            .transpose()
            .map_err(|e| MarketDataError::InvalidResponse(e.to_string()))?
            .ok_or_else(|| MarketDataError::NotFound(instrument.to_string()))?;

        if !data.from_currency.eq_ignore_ascii_case(instrument.base())
            || !data.to_currency.eq_ignore_ascii_case(instrument.quote())
        {
            return Err(MarketDataError::InvalidResponse(format!(
                "Rate for {}/{} returned when {} was requested",
                data.from_currency, data.to_currency, instrument
            )));
        }

        let price = Decimal::from_str(data.exchange_rate.trim())
            .map_err(|e| MarketDataError::InvalidResponse(e.to_string()))?;

        let timestamp = NaiveDateTime::parse_from_str(&data.last_refreshed, "%Y-%m-%d %H:%M:%S")
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or_else(|_| Utc::now());

        let change = self.last_prices.observe(instrument, price);
        let previous = price - change;
        let change_percent = if previous > Decimal::ZERO {
            (change / previous * Decimal::from(100)).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };

        info!("Forex rate {}: {}", instrument, price);

        Ok(Quote {
            instrument,
            price,
            change,
            change_percent,
            source: SOURCE_NAME.to_string(),
            timestamp,
        })
    }
}

#[async_trait::async_trait]
impl QuoteSource for AlphaVantageClient {
    async fn get_quotes(&self, instruments: &[Instrument]) -> Result<Vec<Quote>> {
        let mut quotes = Vec::with_capacity(instruments.len());

        for inst in instruments {
            match self.get_forex_rate(*inst).await {
                Ok(q) => quotes.push(q),
                Err(MarketDataError::RateLimit { provider, retry_after }) => {
                    // Out of quota: later calls would fail the same way
                    warn!("Alpha Vantage quota exhausted after {} quotes", quotes.len());
                    if quotes.is_empty() {
                        return Err(MarketDataError::RateLimit { provider, retry_after });
                    }
                    break;
                }
                Err(e) => warn!("Alpha Vantage error for {}: {}", inst, e),
            }
        }

        Ok(quotes)
    }

    async fn health(&self) -> SourceHealth {
        self.health_tracker.snapshot(SOURCE_NAME)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}
