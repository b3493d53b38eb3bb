pub mod types;
pub mod instruments;
pub mod sources;
pub mod normalizers;
pub mod aggregators;
pub mod cache;
pub mod calendar;
pub mod settings;

pub use types::*;
pub use instruments::{Instrument, InstrumentClass};
pub use sources::alpha_vantage::AlphaVantageClient;
pub use sources::cftc::CftcClient;
pub use sources::exchange_rate::ExchangeRateApiClient;
pub use sources::placeholder::{PlaceholderCot, PlaceholderGenerator, PlaceholderQuotes};
pub use calendar::{CalendarFilter, CalendarGenerator};
pub use settings::Settings;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Quotes fetched more recently than this are served from memory
const QUOTE_TTL_SECONDS: i64 = 30;

/// Default bound on any single provider call
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a provider call under a timeout, mapping expiry to `MarketDataError::Timeout`
pub async fn with_timeout<T>(
    provider: &str,
    limit: Duration,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(MarketDataError::Timeout {
            provider: provider.to_string(),
            millis: limit.as_millis() as u64,
        }),
    }
}

#[derive(Clone)]
struct CachedQuote {
    quote: Quote,
    fetched_at: DateTime<Utc>,
}

/// Ordered-fallback quote aggregator
///
/// Sources are tried in the order they were added. Each call is bounded by the
/// provider timeout; whatever is still missing afterwards is filled from the
/// placeholder generator, so callers always get one quote per instrument.
pub struct QuoteAggregator {
    sources: Vec<Arc<dyn QuoteSource>>,
    placeholder: PlaceholderQuotes,
    timeout: Duration,
    cache: Option<cache::RedisCache>,
    latest_quotes: Arc<RwLock<HashMap<Instrument, CachedQuote>>>,
}

impl QuoteAggregator {
    pub fn new(placeholder: PlaceholderQuotes) -> Self {
        Self {
            sources: Vec::new(),
            placeholder,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            cache: None,
            latest_quotes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn add_source(&mut self, source: Arc<dyn QuoteSource>) {
        self.sources.push(source);
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache(mut self, cache: cache::RedisCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Quotes from real providers only. Fails if no provider returned anything.
    pub async fn fetch_live(&self, instruments: &[Instrument]) -> Result<Vec<Quote>> {
        let mut merged: HashMap<Instrument, Quote> = HashMap::new();

        // Memory first
        {
            let now = Utc::now();
            let ttl = ChronoDuration::seconds(QUOTE_TTL_SECONDS);
            let latest = self.latest_quotes.read().await;
            for inst in instruments {
                if let Some(cached) = latest.get(inst) {
                    if now - cached.fetched_at < ttl {
                        merged.insert(*inst, cached.quote.clone());
                    }
                }
            }
        }

        // Then the shared cache
        if let Some(ref cache) = self.cache {
            for inst in aggregators::missing(instruments, &merged) {
                match cache.get_quote(inst).await {
                    Ok(Some(q)) => {
                        merged.insert(inst, q);
                    }
                    Ok(None) => {}
                    Err(e) => debug!("Quote cache miss for {}: {}", inst, e),
                }
            }
        }

        let mut fetched = Vec::new();
        for source in &self.sources {
            let wanted = aggregators::missing(instruments, &merged);
            if wanted.is_empty() {
                break;
            }

            match with_timeout(source.name(), self.timeout, source.get_quotes(&wanted)).await {
                Ok(batch) => {
                    fetched.extend(
                        batch
                            .iter()
                            .filter(|q| normalizers::validate_quote(q).is_ok())
                            .cloned(),
                    );
                    let added = aggregators::merge_batch(&mut merged, batch);
                    debug!("{} supplied {} of {} quotes", source.name(), added, wanted.len());
                }
                Err(e) => warn!("Quote source {} unavailable: {}", source.name(), e),
            }
        }

        if merged.is_empty() {
            return Err(MarketDataError::SourceUnhealthy(
                "All quote sources failed".to_string(),
            ));
        }

        self.remember(&fetched).await;
        Ok(aggregators::in_request_order(instruments, merged))
    }

    /// One quote per instrument; providers first, placeholders for the rest
    pub async fn get_quotes(&self, instruments: &[Instrument]) -> Vec<Quote> {
        let live = match self.fetch_live(instruments).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("Using placeholder quotes for all {} instruments: {}", instruments.len(), e);
                Vec::new()
            }
        };

        let mut merged: HashMap<Instrument, Quote> =
            live.into_iter().map(|q| (q.instrument, q)).collect();
        let gaps = aggregators::missing(instruments, &merged);
        if !gaps.is_empty() && !merged.is_empty() {
            info!("Filling {} instruments with placeholder quotes", gaps.len());
        }
        for inst in gaps {
            merged.insert(inst, self.placeholder.quote(inst));
        }

        aggregators::in_request_order(instruments, merged)
    }

    /// Quote for a single instrument (never fails)
    pub async fn get_quote(&self, instrument: Instrument) -> Quote {
        self.get_quotes(&[instrument])
            .await
            .pop()
            .unwrap_or_else(|| self.placeholder.quote(instrument))
    }

    async fn remember(&self, quotes: &[Quote]) {
        if quotes.is_empty() {
            return;
        }
        let now = Utc::now();
        {
            let mut latest = self.latest_quotes.write().await;
            for q in quotes {
                latest.insert(
                    q.instrument,
                    CachedQuote {
                        quote: q.clone(),
                        fetched_at: now,
                    },
                );
            }
        }

        if let Some(ref cache) = self.cache {
            for q in quotes {
                if let Err(e) = cache.set_quote(q).await {
                    debug!("Failed to cache quote for {}: {}", q.instrument, e);
                }
            }
        }
    }

    /// Get health status of all sources
    pub async fn health_check(&self) -> Vec<SourceHealth> {
        let mut healths = Vec::with_capacity(self.sources.len() + 1);
        for source in &self.sources {
            healths.push(source.health().await);
        }
        healths.push(self.placeholder.health().await);
        healths
    }
}

/// COT history with timeout and placeholder fallback
pub struct CotService {
    source: Option<Arc<dyn CotSource>>,
    placeholder: PlaceholderCot,
    timeout: Duration,
    cache: Option<cache::RedisCache>,
}

impl CotService {
    pub fn new(placeholder: PlaceholderCot) -> Self {
        Self {
            source: None,
            placeholder,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            cache: None,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn CotSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache(mut self, cache: cache::RedisCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// History from the real source only
    pub async fn fetch(&self, currency: &str) -> Result<CotHistory> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| MarketDataError::SourceUnhealthy("No COT source configured".to_string()))?;

        if let Some(ref cache) = self.cache {
            if let Ok(Some(cached)) = cache.get_cot(currency).await {
                return Ok(cached);
            }
        }

        let history = with_timeout(source.name(), self.timeout, source.get_history(currency)).await?;

        if let Some(ref cache) = self.cache {
            if let Err(e) = cache.set_cot(&history).await {
                debug!("Failed to cache COT for {}: {}", currency, e);
            }
        }
        Ok(history)
    }

    /// History for a currency; placeholder data if the source fails
    pub async fn history(&self, currency: &str) -> CotHistory {
        match self.fetch(currency).await {
            Ok(h) => h,
            Err(e) => {
                warn!("Using placeholder COT for {}: {}", currency, e);
                self.placeholder.history(currency)
            }
        }
    }

    /// Net speculative positioning of a currency in percentage points.
    ///
    /// Currencies without a COT market count as flat rather than being invented.
    pub async fn net_positioning(&self, currency: &str) -> f64 {
        if self.source.is_some() && !CftcClient::supports(currency) {
            return 0.0;
        }
        self.history(currency).await.latest_net_percent().unwrap_or(0.0)
    }

    /// Positioning bias of a pair: base currency net minus quote currency net,
    /// clamped to -100..=100
    pub async fn pair_bias(&self, instrument: Instrument) -> f64 {
        let (base, quote) = futures::join!(
            self.net_positioning(instrument.base()),
            self.net_positioning(instrument.quote())
        );
        (base - quote).clamp(-100.0, 100.0)
    }
}

/// List of supported symbols by class
#[derive(Debug, Clone, serde::Serialize)]
pub struct SupportedInstruments {
    pub majors: Vec<Instrument>,
    pub minors: Vec<Instrument>,
    pub exotics: Vec<Instrument>,
    pub metals: Vec<Instrument>,
}

impl SupportedInstruments {
    pub fn from_catalog() -> Self {
        let all = Instrument::all();
        let of = |class: InstrumentClass| {
            all.iter()
                .filter(|i| i.class() == class)
                .copied()
                .collect::<Vec<_>>()
        };
        Self {
            majors: of(InstrumentClass::Major),
            minors: of(InstrumentClass::Minor),
            exotics: of(InstrumentClass::Exotic),
            metals: of(InstrumentClass::Metal),
        }
    }
}
