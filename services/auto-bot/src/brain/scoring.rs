//! D-Size scoring engine
//!
//! Six independent sub-scores summed into a 0-10 trade-setup score. The engine
//! is pure: every reading it needs arrives in [`MarketInputs`], so the same
//! inputs always produce the same result.

use chrono::{DateTime, Utc};
use market_data::Instrument;
use serde::{Deserialize, Serialize};

use super::entry::{decide, EntryStatus};
use super::trend::{TrendResult, TrendSample};

/// COT net positioning (percentage points) for a strong bias
pub const COT_STRONG: f64 = 40.0;
pub const COT_WEAK: f64 = 15.0;
/// ADX at or above this means the market is trending
pub const ADX_TRENDING: f64 = 25.0;
/// Distance to the nearest support/resistance level, in pips
pub const RETEST_AT_LEVEL_PIPS: f64 = 10.0;
pub const RETEST_NEAR_LEVEL_PIPS: f64 = 25.0;
/// Spreads strictly below this earn the spread point
pub const MAX_SPREAD_PIPS: f64 = 2.0;

/// Raw per-instrument readings the engine scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInputs {
    pub trend: TrendSample,
    /// Base minus quote currency speculative net positioning, -100..=100
    pub cot_net: f64,
    pub adx: f64,
    pub level_distance_pips: f64,
    /// Higher highs/lows (or lower lows/highs) confirmed
    pub structure_confirmed: bool,
    pub spread_pips: f64,
    /// Recent price change in percent; tie-breaker for neutral trends
    pub recent_change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub score: u8,
    pub label: String,
    pub description: String,
}

impl ScoreComponent {
    fn new(score: u8, max: u8, label: &str, description: String) -> Self {
        Self {
            score: score.min(max),
            label: label.to_string(),
            description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DSizeComponents {
    pub cot_bias: ScoreComponent,
    pub trend_confirmation: ScoreComponent,
    pub adx_strength: ScoreComponent,
    pub support_retest: ScoreComponent,
    pub price_structure: ScoreComponent,
    pub spread_check: ScoreComponent,
}

impl DSizeComponents {
    pub fn iter(&self) -> impl Iterator<Item = &ScoreComponent> {
        [
            &self.cot_bias,
            &self.trend_confirmation,
            &self.adx_strength,
            &self.support_retest,
            &self.price_structure,
            &self.spread_check,
        ]
        .into_iter()
    }

    pub fn total(&self) -> f64 {
        self.iter().map(|c| f64::from(c.score)).sum()
    }
}

/// Coarse grade of a D-Size
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SetupQuality {
    A,
    B,
    C,
}

pub fn setup_quality(dsize: f64) -> SetupQuality {
    if dsize >= 8.0 {
        SetupQuality::A
    } else if dsize >= 6.0 {
        SetupQuality::B
    } else {
        SetupQuality::C
    }
}

/// Complete evaluation of one instrument. Built in one go by [`score`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DSizeResult {
    pub instrument: Instrument,
    pub components: DSizeComponents,
    pub dsize: f64,
    pub setup_quality: SetupQuality,
    pub entry_status: EntryStatus,
    pub trend: TrendResult,
    pub evaluated_at: DateTime<Utc>,
}

pub fn cot_bias(net: f64) -> ScoreComponent {
    let strength = net.abs();
    let side = if net >= 0.0 { "long" } else { "short" };
    let (score, label) = if strength >= COT_STRONG {
        (2, "Strong")
    } else if strength >= COT_WEAK {
        (1, "Weak")
    } else {
        (0, "None")
    };
    ScoreComponent::new(
        score,
        2,
        label,
        format!("Speculators net {} {:.1}%", side, strength),
    )
}

pub fn trend_confirmation(trend: &TrendResult) -> ScoreComponent {
    let label = match trend.trend_confirmation_score {
        3 => "Full",
        2 => "Partial",
        _ => "None",
    };
    ScoreComponent::new(
        trend.trend_confirmation_score,
        3,
        label,
        format!(
            "{}/3 timeframes aligned, {:?}",
            trend.alignment, trend.direction
        ),
    )
}

pub fn adx_strength(adx: f64) -> ScoreComponent {
    let trending = adx >= ADX_TRENDING;
    ScoreComponent::new(
        u8::from(trending),
        1,
        if trending { "Trending" } else { "Ranging" },
        format!("ADX {:.1}", adx),
    )
}

pub fn support_retest(distance_pips: f64) -> ScoreComponent {
    let distance = distance_pips.abs();
    let (score, label) = if distance <= RETEST_AT_LEVEL_PIPS {
        (2, "At level")
    } else if distance <= RETEST_NEAR_LEVEL_PIPS {
        (1, "Near level")
    } else {
        (0, "Away")
    };
    ScoreComponent::new(
        score,
        2,
        label,
        format!("{:.1} pips from nearest level", distance),
    )
}

pub fn price_structure(confirmed: bool) -> ScoreComponent {
    ScoreComponent::new(
        u8::from(confirmed),
        1,
        if confirmed { "Confirmed" } else { "Unclear" },
        if confirmed {
            "Swing structure confirms the trend".to_string()
        } else {
            "No clean higher highs or lower lows".to_string()
        },
    )
}

pub fn spread_check(spread_pips: f64) -> ScoreComponent {
    let tight = spread_pips < MAX_SPREAD_PIPS;
    ScoreComponent::new(
        u8::from(tight),
        1,
        if tight { "Tight" } else { "Wide" },
        format!("Spread {:.1} pips", spread_pips),
    )
}

/// Score one instrument
pub fn score(instrument: Instrument, trend: TrendResult, inputs: &MarketInputs) -> DSizeResult {
    let components = DSizeComponents {
        cot_bias: cot_bias(inputs.cot_net),
        trend_confirmation: trend_confirmation(&trend),
        adx_strength: adx_strength(inputs.adx),
        support_retest: support_retest(inputs.level_distance_pips),
        price_structure: price_structure(inputs.structure_confirmed),
        spread_check: spread_check(inputs.spread_pips),
    };
    let dsize = components.total();

    DSizeResult {
        instrument,
        dsize,
        setup_quality: setup_quality(dsize),
        entry_status: decide(dsize, trend.direction, inputs.recent_change_pct),
        components,
        trend,
        evaluated_at: Utc::now(),
    }
}

/// Classify the sampled trend and score in one step
pub fn evaluate(instrument: Instrument, inputs: &MarketInputs) -> DSizeResult {
    score(instrument, inputs.trend.classify(), inputs)
}
