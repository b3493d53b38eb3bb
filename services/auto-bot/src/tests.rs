//! Cross-module checks for the scoring pipeline

use market_data::Instrument;

use crate::brain::{
    classify, decide, evaluate, setup_quality, Direction, EntryStatus, MarketInputs,
    SetupQuality, TrendDirection, TrendSample,
};
use crate::signals::RandomSignalSource;

#[test]
fn test_random_readings_produce_consistent_results() {
    let source = RandomSignalSource::seeded(2024);
    for instrument in Instrument::all() {
        for _ in 0..25 {
            let inputs = source.generate(instrument);
            let result = evaluate(instrument, &inputs);

            let sum: u8 = result.components.iter().map(|c| c.score).sum();
            assert_eq!(result.dsize, f64::from(sum));
            assert!((0.0..=10.0).contains(&result.dsize));
            assert_eq!(result.setup_quality, setup_quality(result.dsize));
            assert_eq!(
                result.entry_status,
                decide(result.dsize, result.trend.direction, inputs.recent_change_pct)
            );
            assert_eq!(result.trend, inputs.trend.classify());

            if result.dsize < 7.0 {
                assert_eq!(result.entry_status, EntryStatus::Block);
            } else if result.trend.direction != Direction::Neutral {
                assert_ne!(result.entry_status, EntryStatus::Block);
            }
        }
    }
}

#[test]
fn test_neutral_trend_full_score_uses_price_change() {
    use TrendDirection::*;

    // Neutral direction with a perfect score elsewhere still cannot pass the
    // trend points, so it tops out at 7
    let inputs = MarketInputs {
        trend: TrendSample::new(Neutral, Neutral, Up),
        cot_net: -45.0,
        adx: 40.0,
        level_distance_pips: 2.0,
        structure_confirmed: true,
        spread_pips: 0.4,
        recent_change_pct: -0.6,
    };
    let eur = Instrument::parse("EUR/USD").unwrap();
    let result = evaluate(eur, &inputs);

    assert_eq!(result.trend, classify(Neutral, Neutral, Up));
    assert_eq!(result.dsize, 7.0);
    assert_eq!(result.setup_quality, SetupQuality::B);
    assert_eq!(result.entry_status, EntryStatus::AllowSell);

    let flat = MarketInputs {
        recent_change_pct: 0.0,
        ..inputs
    };
    assert_eq!(evaluate(eur, &flat).entry_status, EntryStatus::AllowTrade);
}
