//! Simulated bot registry
//!
//! Bots are paper positions only: launching records which instrument, side
//! and D-Size the bot started on, stopping records why.

use chrono::{DateTime, Duration, Utc};
use market_data::Instrument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::brain::TradeSide;
use crate::types::{Result, ScannerError};

/// Who launched the bot. Only Auto bots count against the scanner's cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotKind {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotStatus {
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedBot {
    pub id: Uuid,
    pub instrument: Instrument,
    pub kind: BotKind,
    pub side: TradeSide,
    pub entry_dsize: f64,
    pub status: BotStatus,
    pub stop_reason: Option<String>,
    pub launched_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl SimulatedBot {
    pub fn is_running(&self) -> bool {
        self.status == BotStatus::Running
    }
}

/// In-memory registry of simulated bots
pub struct BotRegistry {
    bots: HashMap<Uuid, SimulatedBot>,
    /// How long stopped bots stay listed
    retention: Duration,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self {
            bots: HashMap::new(),
            retention: Duration::hours(24),
        }
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            bots: HashMap::new(),
            retention,
        }
    }

    pub fn launch(
        &mut self,
        instrument: Instrument,
        kind: BotKind,
        side: TradeSide,
        entry_dsize: f64,
    ) -> SimulatedBot {
        let bot = SimulatedBot {
            id: Uuid::new_v4(),
            instrument,
            kind,
            side,
            entry_dsize,
            status: BotStatus::Running,
            stop_reason: None,
            launched_at: Utc::now(),
            stopped_at: None,
        };

        self.bots.insert(bot.id, bot.clone());
        info!(
            "Launched {:?} bot {} on {} ({:?}, D-Size {:.1})",
            kind, bot.id, instrument, side, entry_dsize
        );

        bot
    }

    pub fn get(&self, id: Uuid) -> Option<&SimulatedBot> {
        self.bots.get(&id)
    }

    pub fn stop(&mut self, id: Uuid, reason: &str) -> Result<SimulatedBot> {
        let bot = self.bots.get_mut(&id).ok_or(ScannerError::BotNotFound(id))?;
        if !bot.is_running() {
            return Err(ScannerError::BotAlreadyStopped(id));
        }

        bot.status = BotStatus::Stopped;
        bot.stop_reason = Some(reason.to_string());
        bot.stopped_at = Some(Utc::now());
        info!("Stopped bot {} on {}: {}", id, bot.instrument, reason);

        Ok(bot.clone())
    }

    /// All bots, newest first
    pub fn list(&self) -> Vec<SimulatedBot> {
        let mut bots: Vec<SimulatedBot> = self.bots.values().cloned().collect();
        bots.sort_by(|a, b| b.launched_at.cmp(&a.launched_at));
        bots
    }

    pub fn running(&self, kind: BotKind) -> impl Iterator<Item = &SimulatedBot> {
        self.bots
            .values()
            .filter(move |b| b.kind == kind && b.is_running())
    }

    pub fn running_count(&self, kind: BotKind) -> usize {
        self.running(kind).count()
    }

    pub fn is_running_on(&self, instrument: Instrument, kind: BotKind) -> bool {
        self.running(kind).any(|b| b.instrument == instrument)
    }

    /// Drop stopped bots past the retention window
    pub fn cleanup(&mut self) {
        let cutoff = Utc::now() - self.retention;
        let before = self.bots.len();
        self.bots.retain(|_, bot| match bot.stopped_at {
            Some(stopped) => stopped > cutoff,
            None => true,
        });
        let removed = before - self.bots.len();
        if removed > 0 {
            debug!("Cleaned up {} stopped bots", removed);
        }
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

impl Default for BotRegistry {
    fn default() -> Self {
        Self::new()
    }
}
