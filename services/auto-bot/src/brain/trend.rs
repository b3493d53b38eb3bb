//! Multi-timeframe trend classifier

use serde::{Deserialize, Serialize};

/// Trend label for one timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

impl TrendDirection {
    pub const ALL: [TrendDirection; 3] = [TrendDirection::Up, TrendDirection::Down, TrendDirection::Neutral];
}

/// Overall market direction across timeframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

/// H4 / D1 / W1 trend labels for one instrument at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendSample {
    pub h4: TrendDirection,
    pub d1: TrendDirection,
    pub w1: TrendDirection,
}

impl TrendSample {
    pub fn new(h4: TrendDirection, d1: TrendDirection, w1: TrendDirection) -> Self {
        Self { h4, d1, w1 }
    }

    pub fn classify(&self) -> TrendResult {
        classify(self.h4, self.d1, self.w1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    pub direction: Direction,
    /// Size of the largest agreeing bloc (display only)
    pub alignment: u8,
    /// 0-3
    pub trend_confirmation_score: u8,
}

/// Classify three timeframe labels.
///
/// The confirmation score uses a purity rule: any Up/Down conflict scores 0,
/// otherwise two or three agreeing directional labels score their count.
pub fn classify(h4: TrendDirection, d1: TrendDirection, w1: TrendDirection) -> TrendResult {
    let labels = [h4, d1, w1];
    let count = |d: TrendDirection| labels.iter().filter(|l| **l == d).count() as u8;
    let up = count(TrendDirection::Up);
    let down = count(TrendDirection::Down);
    let neutral = count(TrendDirection::Neutral);

    let trend_confirmation_score = if up >= 2 && down == 0 {
        up
    } else if down >= 2 && up == 0 {
        down
    } else {
        0
    };

    let direction = if up > down && up > neutral {
        Direction::Bullish
    } else if down > up && down > neutral {
        Direction::Bearish
    } else {
        Direction::Neutral
    };

    TrendResult {
        direction,
        alignment: up.max(down).max(neutral),
        trend_confirmation_score,
    }
}
