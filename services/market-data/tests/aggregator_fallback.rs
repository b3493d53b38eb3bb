//! Quote aggregation and COT fallback across misbehaving sources

use async_trait::async_trait;
use chrono::Utc;
use market_data::{
    CotHistory, CotService, CotSource, Instrument, MarketDataError, PlaceholderCot,
    PlaceholderGenerator, PlaceholderQuotes, Quote, QuoteAggregator, QuoteSource, Result,
    SourceHealth,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

enum Behavior {
    Fail,
    Hang,
    Serve(Vec<&'static str>),
}

struct MockQuotes {
    name: &'static str,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockQuotes {
    fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }
}

fn quote(inst: Instrument, source: &str) -> Quote {
    Quote {
        instrument: inst,
        price: Decimal::from_str("1.2345").unwrap(),
        change: Decimal::ZERO,
        change_percent: 0.0,
        source: source.to_string(),
        timestamp: Utc::now(),
    }
}

#[async_trait]
impl QuoteSource for MockQuotes {
    async fn get_quotes(&self, instruments: &[Instrument]) -> Result<Vec<Quote>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Fail => Err(MarketDataError::ApiError("boom".to_string())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }
            Behavior::Serve(symbols) => Ok(instruments
                .iter()
                .filter(|i| symbols.contains(&i.symbol()))
                .map(|i| quote(*i, self.name))
                .collect()),
        }
    }

    async fn health(&self) -> SourceHealth {
        SourceHealth {
            source: self.name.to_string(),
            is_healthy: !matches!(self.behavior, Behavior::Fail),
            last_success: None,
            last_error: None,
            success_rate: 1.0,
            avg_latency_ms: 0,
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn aggregator() -> QuoteAggregator {
    QuoteAggregator::new(PlaceholderQuotes::new(PlaceholderGenerator::seeded(1)))
        .with_timeout(Duration::from_millis(100))
}

fn inst(s: &str) -> Instrument {
    Instrument::parse(s).unwrap()
}

#[tokio::test]
async fn test_falls_through_to_next_source() {
    let failing = MockQuotes::new("failing", Behavior::Fail);
    let backup = MockQuotes::new("backup", Behavior::Serve(vec!["EUR/USD", "GBP/USD"]));

    let mut agg = aggregator();
    agg.add_source(failing.clone());
    agg.add_source(backup.clone());

    let quotes = agg.get_quotes(&[inst("GBP/USD"), inst("EUR/USD")]).await;

    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0].instrument, inst("GBP/USD"));
    assert!(quotes.iter().all(|q| q.source == "backup"));
    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_hanging_source_times_out() {
    let hanging = MockQuotes::new("hanging", Behavior::Hang);
    let backup = MockQuotes::new("backup", Behavior::Serve(vec!["USD/JPY"]));

    let mut agg = aggregator();
    agg.add_source(hanging);
    agg.add_source(backup);

    let started = std::time::Instant::now();
    let quotes = agg.get_quotes(&[inst("USD/JPY")]).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(quotes[0].source, "backup");
}

#[tokio::test]
async fn test_gaps_filled_with_placeholders() {
    let partial = MockQuotes::new("partial", Behavior::Serve(vec!["EUR/USD"]));

    let mut agg = aggregator();
    agg.add_source(partial);

    let quotes = agg.get_quotes(&[inst("EUR/USD"), inst("XAU/USD")]).await;

    assert_eq!(quotes.len(), 2);
    assert!(!quotes[0].is_placeholder());
    assert!(quotes[1].is_placeholder());
    assert_eq!(quotes[1].instrument, inst("XAU/USD"));
}

#[tokio::test]
async fn test_all_sources_down() {
    let mut agg = aggregator();
    agg.add_source(MockQuotes::new("a", Behavior::Fail));

    assert!(agg.fetch_live(&[inst("EUR/USD")]).await.is_err());

    let quotes = agg.get_quotes(&[inst("EUR/USD")]).await;
    assert_eq!(quotes.len(), 1);
    assert!(quotes[0].is_placeholder());
}

#[tokio::test]
async fn test_recent_quotes_served_from_memory() {
    let source = MockQuotes::new("counted", Behavior::Serve(vec!["EUR/USD"]));

    let mut agg = aggregator();
    agg.add_source(source.clone());

    agg.get_quotes(&[inst("EUR/USD")]).await;
    agg.get_quotes(&[inst("EUR/USD")]).await;

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_health_includes_placeholder() {
    let mut agg = aggregator();
    agg.add_source(MockQuotes::new("down", Behavior::Fail));

    let health = agg.health_check().await;
    assert_eq!(health.len(), 2);
    assert!(!health[0].is_healthy);
    assert_eq!(health[1].source, "placeholder");
}

struct FixedCot {
    net_long: u64,
    net_short: u64,
}

#[async_trait]
impl CotSource for FixedCot {
    async fn get_history(&self, currency: &str) -> Result<CotHistory> {
        if currency == "CHF" {
            return Err(MarketDataError::ApiError("down".to_string()));
        }
        Ok(CotHistory {
            currency: currency.to_string(),
            points: vec![market_data::CotPoint {
                date: Utc::now().date_naive(),
                long_position: self.net_long,
                short_position: self.net_short,
            }],
            source: "fixed".to_string(),
        })
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[tokio::test]
async fn test_cot_falls_back_to_placeholder() {
    let service = CotService::new(PlaceholderCot::new(PlaceholderGenerator::seeded(2)))
        .with_source(Arc::new(FixedCot {
            net_long: 75,
            net_short: 25,
        }));

    let eur = service.history("EUR").await;
    assert_eq!(eur.source, "fixed");

    let chf = service.history("CHF").await;
    assert_eq!(chf.source, "placeholder");
    assert_eq!(chf.points.len(), 6);
}

#[tokio::test]
async fn test_pair_bias_treats_unlisted_currency_as_flat() {
    let service = CotService::new(PlaceholderCot::new(PlaceholderGenerator::seeded(2)))
        .with_source(Arc::new(FixedCot {
            net_long: 75,
            net_short: 25,
        }));

    // EUR +50, USD +50
    assert!(service.pair_bias(inst("EUR/USD")).await.abs() < 1e-9);
    // USD +50, TRY has no COT market
    assert!((service.pair_bias(inst("USD/TRY")).await - 50.0).abs() < 1e-9);
}

#[test]
fn test_cot_without_source_is_placeholder() {
    let service = CotService::new(PlaceholderCot::new(PlaceholderGenerator::seeded(3)));

    tokio_test::assert_err!(tokio_test::block_on(service.fetch("EUR")));
    let history = tokio_test::block_on(service.history("EUR"));
    assert_eq!(history.source, "placeholder");
}
