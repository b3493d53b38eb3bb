//! Brain module - trend classification, D-Size scoring and the entry rule
//!
//! Everything here is synchronous and pure. Market readings come in through
//! [`MarketInputs`]; where they come from is the signal source's business.

pub mod entry;
pub mod scoring;
pub mod trend;

// Re-export main types for convenience
pub use entry::{decide, EntryStatus, TradeSide, ENTRY_THRESHOLD};
pub use scoring::{
    evaluate, score, setup_quality, DSizeComponents, DSizeResult, MarketInputs, ScoreComponent,
    SetupQuality,
};
pub use trend::{classify, Direction, TrendDirection, TrendResult, TrendSample};
