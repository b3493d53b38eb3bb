use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::placeholder::COT_WEEKS;
use super::{fetch_json, HealthTracker};
use crate::types::{CotHistory, CotPoint, CotSource, MarketDataError, Result, SourceHealth};

const DEFAULT_BASE_URL: &str = "https://publicreporting.cftc.gov";
/// Legacy futures-only report
const DATASET: &str = "6dca-aqww";
const SOURCE_NAME: &str = "cftc";

/// CFTC market names for the currencies and metals we track
fn market_prefix(currency: &str) -> Option<&'static str> {
    match currency {
        "EUR" => Some("EURO FX - CHICAGO MERCANTILE EXCHANGE"),
        "GBP" => Some("BRITISH POUND - CHICAGO MERCANTILE EXCHANGE"),
        "JPY" => Some("JAPANESE YEN - CHICAGO MERCANTILE EXCHANGE"),
        "CHF" => Some("SWISS FRANC - CHICAGO MERCANTILE EXCHANGE"),
        "CAD" => Some("CANADIAN DOLLAR - CHICAGO MERCANTILE EXCHANGE"),
        "AUD" => Some("AUSTRALIAN DOLLAR - CHICAGO MERCANTILE EXCHANGE"),
        "NZD" => Some("NZ DOLLAR - CHICAGO MERCANTILE EXCHANGE"),
        "MXN" => Some("MEXICAN PESO - CHICAGO MERCANTILE EXCHANGE"),
        "ZAR" => Some("SO AFRICAN RAND - CHICAGO MERCANTILE EXCHANGE"),
        "USD" => Some("USD INDEX - ICE FUTURES U.S."),
        "XAU" => Some("GOLD - COMMODITY EXCHANGE INC."),
        "XAG" => Some("SILVER - COMMODITY EXCHANGE INC."),
        _ => None,
    }
}

/// Commitment of Traders history from the CFTC public reporting API
pub struct CftcClient {
    client: Client,
    base_url: String,
    health_tracker: HealthTracker,
}

#[derive(Debug, Deserialize)]
struct CotRow {
    report_date_as_yyyy_mm_dd: String,
    noncomm_positions_long_all: String,
    noncomm_positions_short_all: String,
}

impl CotRow {
    fn into_point(self) -> Result<CotPoint> {
        // "2026-10-13T00:00:00.000"
        let date_part = self.report_date_as_yyyy_mm_dd.get(..10).unwrap_or_default();
        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
            MarketDataError::InvalidResponse(format!(
                "Bad report date {}: {}",
                self.report_date_as_yyyy_mm_dd, e
            ))
        })?;

        let parse = |raw: &str| {
            raw.trim().parse::<u64>().map_err(|e| {
                MarketDataError::InvalidResponse(format!("Bad position count {}: {}", raw, e))
            })
        };

        Ok(CotPoint {
            date,
            long_position: parse(&self.noncomm_positions_long_all)?,
            short_position: parse(&self.noncomm_positions_short_all)?,
        })
    }
}

impl CftcClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            health_tracker: HealthTracker::new(),
        }
    }

    pub fn supports(currency: &str) -> bool {
        market_prefix(&currency.to_uppercase()).is_some()
    }

    pub async fn health(&self) -> SourceHealth {
        self.health_tracker.snapshot(SOURCE_NAME)
    }
}

impl Default for CftcClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CotSource for CftcClient {
    async fn get_history(&self, currency: &str) -> Result<CotHistory> {
        let currency = currency.to_uppercase();
        let market = market_prefix(&currency)
            .ok_or_else(|| MarketDataError::NotFound(format!("COT market for {}", currency)))?;

        let limit = COT_WEEKS.to_string();
        let url = url::Url::parse_with_params(
            &format!("{}/resource/{}.json", self.base_url, DATASET),
            &[
                ("market_and_exchange_names", market),
                ("$order", "report_date_as_yyyy_mm_dd DESC"),
                ("$limit", limit.as_str()),
            ],
        )
        .map_err(|e| MarketDataError::ApiError(e.to_string()))?;

        debug!("Fetching COT history for {}", currency);
        let rows: Vec<CotRow> =
            fetch_json(&self.client, url.as_str(), SOURCE_NAME, &self.health_tracker).await?;

        if rows.is_empty() {
            return Err(MarketDataError::NotFound(format!("COT reports for {}", currency)));
        }

        let mut points = rows
            .into_iter()
            .map(CotRow::into_point)
            .collect::<Result<Vec<_>>>()?;
        points.sort_by_key(|p| p.date);

        Ok(CotHistory {
            currency,
            points,
            source: SOURCE_NAME.to_string(),
        })
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}
