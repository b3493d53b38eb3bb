use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use market_data::{
    AlphaVantageClient, CalendarGenerator, CftcClient, CotService, ExchangeRateApiClient,
    PlaceholderCot, PlaceholderGenerator, PlaceholderQuotes, QuoteAggregator, Settings,
};

/// Application state shared across handlers
pub struct AppState {
    pub quotes: QuoteAggregator,
    pub cot: CotService,
    pub calendar: CalendarGenerator,
}

fn placeholder_generator(seed: Option<u64>, offset: u64) -> PlaceholderGenerator {
    match seed {
        Some(s) => PlaceholderGenerator::seeded(s.wrapping_add(offset)),
        None => PlaceholderGenerator::new(),
    }
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

    info!("Starting Market Data Service...");

    let mut aggregator = QuoteAggregator::new(PlaceholderQuotes::new(placeholder_generator(
        settings.seed,
        0,
    )))
    .with_timeout(settings.provider_timeout());

    let exchange_rate = match settings.exchange_rate_url {
        Some(ref url) => ExchangeRateApiClient::with_base_url(url.clone()),
        None => ExchangeRateApiClient::new(),
    };
    aggregator.add_source(Arc::new(exchange_rate));
    info!("✓ ExchangeRate-API client initialized");

    if let Some(ref key) = settings.alpha_vantage_key {
        aggregator.add_source(Arc::new(AlphaVantageClient::new(key.clone())));
        info!("✓ Alpha Vantage client initialized");
    } else {
        warn!("⚠ No Alpha Vantage key, metals will use placeholder quotes");
    }

    let mut cot = CotService::new(PlaceholderCot::new(placeholder_generator(settings.seed, 1)))
        .with_timeout(settings.provider_timeout());
    if settings.cot_enabled {
        let cftc = match settings.cftc_url {
            Some(ref url) => CftcClient::with_base_url(url.clone()),
            None => CftcClient::new(),
        };
        cot = cot.with_source(Arc::new(cftc));
        info!("✓ CFTC COT client initialized");
    }

    // Redis is optional; without it each instance keeps its own memory cache
    if let Some(ref url) = settings.redis_url {
        match market_data::cache::RedisCache::new(url, settings.quote_ttl_secs).await {
            Ok(cache) => {
                aggregator = aggregator.with_cache(cache.clone());
                cot = cot.with_cache(cache);
                info!("✓ Redis cache connected");
            }
            Err(e) => warn!("⚠ Redis unavailable ({}), continuing without shared cache", e),
        }
    }

    let calendar = match settings.seed {
        Some(s) => CalendarGenerator::seeded(s),
        None => CalendarGenerator::new(),
    };

    let state = Arc::new(AppState {
        quotes: aggregator,
        cot,
        calendar,
    });

    // Build router
    let app = Router::new()
        .route("/quotes", get(handlers::get_quotes))
        .route("/cot/:currency", get(handlers::get_cot))
        .route("/calendar", get(handlers::get_calendar))
        .route("/instruments", get(handlers::get_instruments))
        .route("/health", get(handlers::health_check))
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?;
    info!("🚀 Market Data Service listening on port {}", settings.port);

    axum::serve(listener, app).await?;

    Ok(())
}

mod handlers;
