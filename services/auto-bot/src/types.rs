//! Scanner view models and errors
//!
//! These are the read-only shapes the dashboard renders.

use chrono::{DateTime, Utc};
use market_data::{Instrument, MarketDataError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bots::SimulatedBot;
use crate::brain::{DSizeResult, EntryStatus, SetupQuality};

/// Snapshot of one instrument that passed the scanner band on a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityRecord {
    pub instrument: Instrument,
    pub dsize: f64,
    pub entry_signal: EntryStatus,
    pub quality: SetupQuality,
    pub trend_alignment: u8,
    pub scanned_at: DateTime<Utc>,
}

impl OpportunityRecord {
    pub fn from_result(result: &DSizeResult, scanned_at: DateTime<Utc>) -> Self {
        Self {
            instrument: result.instrument,
            dsize: result.dsize,
            entry_signal: result.entry_status,
            quality: result.setup_quality,
            trend_alignment: result.trend.alignment,
            scanned_at,
        }
    }
}

/// What triggered a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanTrigger {
    Timer,
    Manual,
}

/// Summary of a completed scan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub trigger: ScanTrigger,
    pub scanned: usize,
    pub opportunities: usize,
    /// Instruments whose signal source failed and were scored on stand-in inputs
    pub fallbacks: usize,
    pub launched: Option<SimulatedBot>,
    pub stopped: Vec<SimulatedBot>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    Completed(ScanReport),
    /// Another scan was already in flight
    Skipped,
    /// The scanner was disabled while this scan ran
    Discarded,
}

impl ScanOutcome {
    pub fn report(&self) -> Option<&ScanReport> {
        match self {
            ScanOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerStatus {
    pub enabled: bool,
    pub scanning: bool,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub next_scan_at: Option<DateTime<Utc>>,
    pub opportunity_count: usize,
    pub running_auto_bots: usize,
    pub max_concurrent_bots: u32,
    pub signal_source: String,
}

/// Error types for the scanner
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("Invalid scanner config: {0}")]
    InvalidConfig(String),

    #[error("No current opportunity for {0}")]
    NoOpportunity(Instrument),

    #[error("Bot not found: {0}")]
    BotNotFound(Uuid),

    #[error("Bot {0} is already stopped")]
    BotAlreadyStopped(Uuid),

    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),
}

pub type Result<T> = std::result::Result<T, ScannerError>;
