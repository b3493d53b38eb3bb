use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::AppState;
use market_data::{
    instruments, CalendarEvent, CalendarFilter, CotHistory, Impact, Instrument, Quote,
    SourceHealth, SupportedInstruments,
};

#[derive(Debug, serde::Deserialize)]
pub struct QuotesQuery {
    /// Comma separated; the whole catalog when absent
    symbols: Option<String>,
}

/// GET /quotes?symbols=EUR/USD,XAU/USD - Quotes, placeholders filling any gaps
pub async fn get_quotes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuotesQuery>,
) -> Result<Json<QuotesResponse>, (StatusCode, String)> {
    let wanted = match query.symbols.as_deref() {
        Some(raw) => instruments::parse_list(raw)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
        None => Instrument::all(),
    };
    if wanted.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No symbols requested".to_string()));
    }

    info!("Fetching {} quotes", wanted.len());
    let quotes = state.quotes.get_quotes(&wanted).await;
    let placeholders = quotes.iter().filter(|q| q.is_placeholder()).count();
    if placeholders > 0 {
        warn!("{} of {} quotes are placeholders", placeholders, quotes.len());
    }

    Ok(Json(QuotesResponse {
        quotes,
        placeholders,
    }))
}

/// GET /cot/:currency - Weekly COT history for one currency
pub async fn get_cot(
    State(state): State<Arc<AppState>>,
    Path(currency): Path<String>,
) -> Result<Json<CotHistory>, (StatusCode, String)> {
    let currency = currency.to_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Invalid currency code: {}", currency),
        ));
    }

    Ok(Json(state.cot.history(&currency).await))
}

#[derive(Debug, serde::Deserialize)]
pub struct CalendarQuery {
    currency: Option<String>,
    impact: Option<String>,
}

/// GET /calendar?currency=USD&impact=high - This week's events
pub async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Vec<CalendarEvent>>, (StatusCode, String)> {
    let min_impact = query
        .impact
        .as_deref()
        .map(str::parse::<Impact>)
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let filter = CalendarFilter {
        currency: query.currency,
        min_impact,
    };
    Ok(Json(state.calendar.this_week(&filter)))
}

/// GET /instruments - Catalog grouped by class
pub async fn get_instruments() -> Json<SupportedInstruments> {
    Json(SupportedInstruments::from_catalog())
}

/// GET /health - Service health check
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let source_health = state.quotes.health_check().await;

    let all_healthy = source_health.iter().all(|h| h.is_healthy);

    Json(HealthResponse {
        status: if all_healthy { "healthy".to_string() } else { "degraded".to_string() },
        sources: source_health,
    })
}

// Response types
#[derive(Debug, serde::Serialize)]
pub struct QuotesResponse {
    pub quotes: Vec<Quote>,
    pub placeholders: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub sources: Vec<SourceHealth>,
}
