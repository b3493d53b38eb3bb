//! Market signal sources
//!
//! The scanner asks a [`MarketSignalSource`] for the raw readings of one
//! instrument and hands them to the scoring engine. [`RandomSignalSource`]
//! produces stand-in readings; [`FeedSignalSource`] fills what it can from the
//! market data providers and uses the random readings for the rest.

use async_trait::async_trait;
use market_data::{CotService, Instrument, QuoteAggregator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::brain::{MarketInputs, TrendDirection, TrendSample};
use crate::types::Result;

#[async_trait]
pub trait MarketSignalSource: Send + Sync {
    async fn sample(&self, instrument: Instrument) -> Result<MarketInputs>;

    fn name(&self) -> &str;
}

/// Seeded stand-in readings.
///
/// Distributions: each timeframe trend Up/Down 40% each, Neutral 20%; COT net
/// uniform in ±70; ADX uniform 10-45; level distance uniform 0-60 pips;
/// structure confirmed half the time; spread uniform in the instrument
/// class baseline; recent change uniform in ±1.5%.
pub struct RandomSignalSource {
    rng: Mutex<StdRng>,
}

impl RandomSignalSource {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Draw a full set of readings; never fails
    pub fn generate(&self, instrument: Instrument) -> MarketInputs {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut trend = || match rng.gen_range(0..10) {
            0..=3 => TrendDirection::Up,
            4..=7 => TrendDirection::Down,
            _ => TrendDirection::Neutral,
        };
        let sample = TrendSample::new(trend(), trend(), trend());

        let (spread_min, spread_max) = instrument.class().spread_baseline();

        MarketInputs {
            trend: sample,
            cot_net: rng.gen_range(-70.0..=70.0),
            adx: rng.gen_range(10.0..=45.0),
            level_distance_pips: rng.gen_range(0.0..=60.0),
            structure_confirmed: rng.gen_bool(0.5),
            spread_pips: rng.gen_range(spread_min..=spread_max),
            recent_change_pct: rng.gen_range(-1.5..=1.5),
        }
    }
}

impl Default for RandomSignalSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketSignalSource for RandomSignalSource {
    async fn sample(&self, instrument: Instrument) -> Result<MarketInputs> {
        Ok(self.generate(instrument))
    }

    fn name(&self) -> &str {
        "random"
    }
}

/// Readings backed by the market data providers.
///
/// Recent change comes from live quotes and COT bias from the CFTC history of
/// the pair's two currencies. Trend, ADX, levels, structure and spread have no
/// feed yet and come from the random source, as does any field whose provider
/// fails.
///
/// Providers report change against the previous price this process saw. The
/// free FX rates refresh roughly once a day, so most polls see no movement at
/// all; a zero change counts as no reading rather than a flat market, which
/// would otherwise push every neutral trend to Allow Trade.
pub struct FeedSignalSource {
    quotes: Arc<QuoteAggregator>,
    cot: Arc<CotService>,
    fallback: RandomSignalSource,
    timeout: Duration,
}

impl FeedSignalSource {
    pub fn new(
        quotes: Arc<QuoteAggregator>,
        cot: Arc<CotService>,
        fallback: RandomSignalSource,
        timeout: Duration,
    ) -> Self {
        Self {
            quotes,
            cot,
            fallback,
            timeout,
        }
    }

    async fn recent_change(&self, instrument: Instrument) -> Option<f64> {
        let wanted = [instrument];
        let fetch = market_data::with_timeout("quotes", self.timeout, self.quotes.fetch_live(&wanted));
        match fetch.await {
            Ok(quotes) => quotes
                .into_iter()
                .find(|q| q.instrument == instrument)
                .map(|q| q.change_percent)
                .filter(|change| *change != 0.0),
            Err(e) => {
                warn!("No live quote for {}: {}", instrument, e);
                None
            }
        }
    }

    async fn cot_bias(&self, instrument: Instrument) -> Option<f64> {
        match tokio::time::timeout(self.timeout, self.cot.pair_bias(instrument)).await {
            Ok(net) => Some(net),
            Err(_) => {
                warn!("COT lookup for {} timed out", instrument);
                None
            }
        }
    }
}

#[async_trait]
impl MarketSignalSource for FeedSignalSource {
    async fn sample(&self, instrument: Instrument) -> Result<MarketInputs> {
        let mut inputs = self.fallback.generate(instrument);

        let (change, cot) = futures::join!(self.recent_change(instrument), self.cot_bias(instrument));
        if let Some(change) = change {
            inputs.recent_change_pct = change;
        }
        if let Some(net) = cot {
            inputs.cot_net = net;
        }

        debug!(
            "Sampled {}: change {:.3}%, COT net {:.1}",
            instrument, inputs.recent_change_pct, inputs.cot_net
        );
        Ok(inputs)
    }

    fn name(&self) -> &str {
        "feed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_data::{
        PlaceholderCot, PlaceholderGenerator, PlaceholderQuotes, Quote, QuoteSource, SourceHealth,
    };

    /// Live source whose quotes carry a fixed change percent
    struct FixedChange(f64);

    #[async_trait]
    impl QuoteSource for FixedChange {
        async fn get_quotes(&self, instruments: &[Instrument]) -> market_data::Result<Vec<Quote>> {
            let generator = PlaceholderGenerator::seeded(9);
            Ok(instruments
                .iter()
                .map(|i| Quote {
                    change_percent: self.0,
                    source: "fixed".to_string(),
                    ..generator.quote(*i)
                })
                .collect())
        }

        async fn health(&self) -> SourceHealth {
            SourceHealth {
                source: "fixed".to_string(),
                is_healthy: true,
                last_success: None,
                last_error: None,
                success_rate: 1.0,
                avg_latency_ms: 0,
            }
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn feed_with_change(change: f64, seed: u64) -> FeedSignalSource {
        let mut quotes = QuoteAggregator::new(PlaceholderQuotes::new(PlaceholderGenerator::seeded(1)));
        quotes.add_source(Arc::new(FixedChange(change)));
        let cot = Arc::new(CotService::new(PlaceholderCot::new(PlaceholderGenerator::seeded(2))));
        FeedSignalSource::new(
            Arc::new(quotes),
            cot,
            RandomSignalSource::seeded(seed),
            Duration::from_secs(1),
        )
    }

    fn inst(s: &str) -> Instrument {
        Instrument::parse(s).unwrap()
    }

    #[test]
    fn test_random_readings_stay_in_range() {
        let source = RandomSignalSource::seeded(11);
        for instrument in Instrument::all() {
            let (lo, hi) = instrument.class().spread_baseline();
            for _ in 0..20 {
                let inputs = source.generate(instrument);
                assert!(inputs.cot_net.abs() <= 70.0);
                assert!((10.0..=45.0).contains(&inputs.adx));
                assert!((0.0..=60.0).contains(&inputs.level_distance_pips));
                assert!(inputs.spread_pips >= lo && inputs.spread_pips <= hi);
                assert!(inputs.recent_change_pct.abs() <= 1.5);
            }
        }
    }

    #[test]
    fn test_same_seed_same_readings() {
        let a = RandomSignalSource::seeded(5);
        let b = RandomSignalSource::seeded(5);
        let eur = inst("EUR/USD");
        assert_eq!(a.generate(eur), b.generate(eur));
    }

    #[tokio::test]
    async fn test_feed_without_providers_uses_placeholders() {
        // No real sources: quotes fail over, COT comes from the placeholder history
        let quotes = Arc::new(QuoteAggregator::new(PlaceholderQuotes::new(
            PlaceholderGenerator::seeded(1),
        )));
        let cot = Arc::new(CotService::new(PlaceholderCot::new(PlaceholderGenerator::seeded(2))));
        let feed = FeedSignalSource::new(
            quotes,
            cot,
            RandomSignalSource::seeded(3),
            Duration::from_secs(1),
        );

        let inputs = feed.sample(inst("GBP/JPY")).await.unwrap();
        assert!(inputs.cot_net.abs() <= 100.0);
        assert!(inputs.recent_change_pct.abs() <= 1.5);
        assert_eq!(feed.name(), "feed");
    }

    #[tokio::test]
    async fn test_feed_uses_live_change() {
        let feed = feed_with_change(0.42, 7);
        let inputs = feed.sample(inst("EUR/USD")).await.unwrap();
        assert_eq!(inputs.recent_change_pct, 0.42);
    }

    #[tokio::test]
    async fn test_feed_ignores_unmoved_quote() {
        let feed = feed_with_change(0.0, 7);
        let inputs = feed.sample(inst("EUR/USD")).await.unwrap();

        // Same draw the fallback makes first
        let expected = RandomSignalSource::seeded(7).generate(inst("EUR/USD"));
        assert_eq!(inputs.recent_change_pct, expected.recent_change_pct);
    }
}
