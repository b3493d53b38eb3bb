//! Auto Bot - opportunity scanner service
//!
//! 1. Loads settings (defaults, `auto-bot.toml`, `AUTOBOT_*` env)
//! 2. Builds the signal source (random stand-in or market data feed)
//! 3. Starts the scanner, armed if configured to
//! 4. Serves the control API

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use auto_bot::{
    app, AppState, FeedSignalSource, MarketSignalSource, OpportunityScanner, RandomSignalSource,
    Settings, SignalMode,
};
use market_data::{
    AlphaVantageClient, CftcClient, CotService, ExchangeRateApiClient, PlaceholderCot,
    PlaceholderGenerator, PlaceholderQuotes, QuoteAggregator,
};

fn random_source(seed: Option<u64>, offset: u64) -> RandomSignalSource {
    match seed {
        Some(s) => RandomSignalSource::seeded(s.wrapping_add(offset)),
        None => RandomSignalSource::new(),
    }
}

fn placeholder_generator(seed: Option<u64>, offset: u64) -> PlaceholderGenerator {
    match seed {
        Some(s) => PlaceholderGenerator::seeded(s.wrapping_add(offset)),
        None => PlaceholderGenerator::new(),
    }
}

/// Market data wired in-process, the same way the market-data service does it
fn feed_source(settings: &Settings) -> FeedSignalSource {
    let timeout = settings.provider_timeout();

    let mut quotes = QuoteAggregator::new(PlaceholderQuotes::new(placeholder_generator(
        settings.seed,
        10,
    )))
    .with_timeout(timeout);
    quotes.add_source(Arc::new(ExchangeRateApiClient::new()));
    if let Some(ref key) = settings.alpha_vantage_key {
        quotes.add_source(Arc::new(AlphaVantageClient::new(key.clone())));
    }

    let mut cot = CotService::new(PlaceholderCot::new(placeholder_generator(settings.seed, 11)))
        .with_timeout(timeout);
    if settings.cot_enabled {
        cot = cot.with_source(Arc::new(CftcClient::new()));
    } else {
        warn!("⚠ COT source disabled, using placeholder positioning");
    }

    FeedSignalSource::new(
        Arc::new(quotes),
        Arc::new(cot),
        random_source(settings.seed, 1),
        timeout,
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::load()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    info!("Starting Auto Bot...");

    let source: Arc<dyn MarketSignalSource> = match settings.signal_mode {
        SignalMode::Random => Arc::new(random_source(settings.seed, 1)),
        SignalMode::Feed => Arc::new(feed_source(&settings)),
    };
    info!("✓ Signal source: {}", source.name());

    let scanner = OpportunityScanner::new(
        settings.scanner.clone(),
        source,
        random_source(settings.seed, 2),
        settings.provider_timeout(),
    )?;
    info!(
        "✓ Scanner ready: {} instruments every {} min, band {}-{}",
        settings.scanner.allowed_instruments.len(),
        settings.scanner.scan_interval_minutes,
        settings.scanner.min_score,
        settings.scanner.max_score
    );

    if settings.enable_on_start {
        scanner.enable();
    }

    let state = Arc::new(AppState { scanner });
    let router = app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?;
    info!("🚀 Auto Bot listening on port {}", settings.port);

    axum::serve(listener, router).await?;

    Ok(())
}
