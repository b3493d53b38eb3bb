//! Entry decision rule

use serde::{Deserialize, Serialize};

use super::trend::Direction;

/// Minimum D-Size for any entry. Fixed; the scanner band can only narrow it.
pub const ENTRY_THRESHOLD: f64 = 7.0;

/// Side a bot trades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Entry signal shown next to each instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    #[serde(rename = "Block")]
    Block,
    #[serde(rename = "Allow Buy")]
    AllowBuy,
    #[serde(rename = "Allow Sell")]
    AllowSell,
    #[serde(rename = "Allow Trade")]
    AllowTrade,
}

impl EntryStatus {
    pub fn is_allow(&self) -> bool {
        !matches!(self, EntryStatus::Block)
    }

    /// Side a bot launched on this signal takes; Allow Trade defaults to Buy
    pub fn side(&self) -> Option<TradeSide> {
        match self {
            EntryStatus::Block => None,
            EntryStatus::AllowBuy | EntryStatus::AllowTrade => Some(TradeSide::Buy),
            EntryStatus::AllowSell => Some(TradeSide::Sell),
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryStatus::Block => "Block",
            EntryStatus::AllowBuy => "Allow Buy",
            EntryStatus::AllowSell => "Allow Sell",
            EntryStatus::AllowTrade => "Allow Trade",
        };
        f.write_str(s)
    }
}

/// Map a D-Size and direction to an entry signal.
///
/// A neutral direction falls back to the sign of the recent price change.
pub fn decide(dsize: f64, direction: Direction, recent_price_change: f64) -> EntryStatus {
    if dsize < ENTRY_THRESHOLD {
        return EntryStatus::Block;
    }

    match direction {
        Direction::Bullish => EntryStatus::AllowBuy,
        Direction::Bearish => EntryStatus::AllowSell,
        Direction::Neutral => {
            if recent_price_change > 0.0 {
                EntryStatus::AllowBuy
            } else if recent_price_change < 0.0 {
                EntryStatus::AllowSell
            } else {
                EntryStatus::AllowTrade
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_below_threshold_regardless_of_direction() {
        for dsize in [0.0, 3.0, 6.0, 6.5, 6.9999] {
            for direction in [Direction::Bullish, Direction::Bearish, Direction::Neutral] {
                for change in [-1.0, 0.0, 1.0] {
                    assert_eq!(decide(dsize, direction, change), EntryStatus::Block);
                }
            }
        }
    }

    #[test]
    fn test_never_blocks_at_threshold_with_direction() {
        for dsize in [7.0, 8.0, 9.5, 10.0] {
            assert_eq!(decide(dsize, Direction::Bullish, -2.0), EntryStatus::AllowBuy);
            assert_eq!(decide(dsize, Direction::Bearish, 2.0), EntryStatus::AllowSell);
        }
    }

    #[test]
    fn test_neutral_follows_price_change() {
        assert_eq!(decide(7.0, Direction::Neutral, 0.4), EntryStatus::AllowBuy);
        assert_eq!(decide(7.0, Direction::Neutral, -0.4), EntryStatus::AllowSell);
        assert_eq!(decide(7.0, Direction::Neutral, 0.0), EntryStatus::AllowTrade);
    }

    #[test]
    fn test_sides_and_wire_names() {
        assert_eq!(EntryStatus::AllowTrade.side(), Some(TradeSide::Buy));
        assert_eq!(EntryStatus::AllowSell.side(), Some(TradeSide::Sell));
        assert_eq!(EntryStatus::Block.side(), None);
        assert!(!EntryStatus::Block.is_allow());

        let json = serde_json::to_string(&EntryStatus::AllowBuy).unwrap();
        assert_eq!(json, "\"Allow Buy\"");
        assert_eq!(EntryStatus::AllowTrade.to_string(), "Allow Trade");
    }
}
