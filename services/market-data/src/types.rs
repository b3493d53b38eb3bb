use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::instruments::Instrument;

/// Live quote for one instrument from any source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub instrument: Instrument,
    pub price: Decimal,
    /// Absolute change over the source's reference period
    pub change: Decimal,
    pub change_percent: f64,
    pub source: String,          // "exchangerate-api", "alphavantage", "placeholder"
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    pub fn is_placeholder(&self) -> bool {
        self.source == crate::sources::placeholder::SOURCE_NAME
    }
}

/// One weekly Commitment of Traders data point (non-commercial positions)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CotPoint {
    pub date: NaiveDate,
    pub long_position: u64,
    pub short_position: u64,
}

impl CotPoint {
    /// Net positioning as a percentage of open speculative interest (-100..=100)
    pub fn net_percent(&self) -> f64 {
        let total = self.long_position + self.short_position;
        if total == 0 {
            return 0.0;
        }
        (self.long_position as f64 - self.short_position as f64) / total as f64 * 100.0
    }
}

/// COT history for one currency, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CotHistory {
    pub currency: String,
    pub points: Vec<CotPoint>,
    pub source: String,
}

impl CotHistory {
    /// Net positioning of the most recent report, if any
    pub fn latest_net_percent(&self) -> Option<f64> {
        self.points.last().map(CotPoint::net_percent)
    }
}

/// Expected market impact of a calendar event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl std::str::FromStr for Impact {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Impact::Low),
            "medium" => Ok(Impact::Medium),
            "high" => Ok(Impact::High),
            other => Err(MarketDataError::InvalidResponse(format!(
                "Unknown impact level: {}",
                other
            ))),
        }
    }
}

/// Economic calendar entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub time: DateTime<Utc>,
    pub currency: String,
    pub impact: Impact,
    pub title: String,
    pub forecast: Option<String>,
    pub previous: Option<String>,
}

/// Data source health/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHealth {
    pub source: String,
    pub is_healthy: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub success_rate: f64,
    pub avg_latency_ms: u64,
}

/// Error types for market data retrieval
#[derive(Debug, thiserror::Error)]
pub enum MarketDataError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded for {provider}")]
    RateLimit { provider: String, retry_after: Option<u64> },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("No data for {0}")]
    NotFound(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Source unhealthy: {0}")]
    SourceUnhealthy(String),

    #[error("{provider} timed out after {millis}ms")]
    Timeout { provider: String, millis: u64 },
}

impl From<reqwest::Error> for MarketDataError {
    fn from(e: reqwest::Error) -> Self {
        MarketDataError::ApiError(e.to_string())
    }
}

/// Result type for market data operations
pub type Result<T> = std::result::Result<T, MarketDataError>;

/// Trait for live quote sources
#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    /// Quotes for as many of the requested instruments as the source knows.
    /// Missing instruments are simply absent from the result.
    async fn get_quotes(&self, instruments: &[Instrument]) -> Result<Vec<Quote>>;

    /// Get source health status
    async fn health(&self) -> SourceHealth;

    /// Source name
    fn name(&self) -> &str;
}

/// Trait for COT history sources
#[async_trait::async_trait]
pub trait CotSource: Send + Sync {
    /// The six most recent weekly reports for a currency (or metal), oldest first
    async fn get_history(&self, currency: &str) -> Result<CotHistory>;

    fn name(&self) -> &str;
}
