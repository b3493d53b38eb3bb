//! Control API handlers
//!
//! Read-only views of the scanner plus its documented operations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use market_data::Instrument;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bots::SimulatedBot;
use crate::brain::DSizeResult;
use crate::config::ScannerConfig;
use crate::types::{OpportunityRecord, ScanOutcome, ScannerError, ScannerStatus};
use crate::AppState;

fn error_response(e: ScannerError) -> (StatusCode, String) {
    let status = match &e {
        ScannerError::InvalidConfig(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ScannerError::NoOpportunity(_) | ScannerError::BotNotFound(_) => StatusCode::NOT_FOUND,
        ScannerError::BotAlreadyStopped(_) => StatusCode::CONFLICT,
        ScannerError::MarketData(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    warn!("Request failed: {}", e);
    (status, e.to_string())
}

fn parse_instrument(raw: &str) -> Result<Instrument, (StatusCode, String)> {
    Instrument::parse(raw).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

/// GET /scanner - Scanner status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ScannerStatus> {
    Json(state.scanner.status().await)
}

/// POST /scanner/enable
pub async fn enable(State(state): State<Arc<AppState>>) -> Json<ScannerStatus> {
    state.scanner.enable();
    Json(state.scanner.status().await)
}

/// POST /scanner/disable
pub async fn disable(State(state): State<Arc<AppState>>) -> Json<ScannerStatus> {
    state.scanner.disable().await;
    Json(state.scanner.status().await)
}

/// POST /scanner/scan - Manual scan; skipped if one is already running
pub async fn scan_now(State(state): State<Arc<AppState>>) -> Json<ScanOutcome> {
    info!("Manual scan requested");
    Json(state.scanner.scan_now().await)
}

/// GET /scanner/config
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ScannerConfig> {
    Json(state.scanner.config().await)
}

/// PUT /scanner/config
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(config): Json<ScannerConfig>,
) -> Result<Json<ScannerConfig>, (StatusCode, String)> {
    state
        .scanner
        .update_config(config)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /opportunities - Current list, best first
pub async fn list_opportunities(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<OpportunityRecord>> {
    Json(state.scanner.opportunities().await.as_ref().clone())
}

#[derive(Debug, serde::Deserialize)]
pub struct LaunchRequest {
    pub instrument: String,
}

/// POST /opportunities/launch - Launch a bot on a listed opportunity
pub async fn launch_bot(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LaunchRequest>,
) -> Result<Json<SimulatedBot>, (StatusCode, String)> {
    let instrument = parse_instrument(&req.instrument)?;
    state
        .scanner
        .launch_bot_for(instrument)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /bots
pub async fn list_bots(State(state): State<Arc<AppState>>) -> Json<ListBotsResponse> {
    let bots = state.scanner.bots().await;
    let running = bots.iter().filter(|b| b.is_running()).count();
    Json(ListBotsResponse { bots, running })
}

/// POST /bots/:id/stop
pub async fn stop_bot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SimulatedBot>, (StatusCode, String)> {
    state
        .scanner
        .stop_bot(id)
        .await
        .map(Json)
        .map_err(error_response)
}

#[derive(Debug, serde::Deserialize)]
pub struct DsizeQuery {
    pub symbol: String,
}

/// GET /dsize?symbol=EUR/USD - Fresh D-Size breakdown for one instrument
pub async fn get_dsize(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DsizeQuery>,
) -> Result<Json<DSizeResult>, (StatusCode, String)> {
    let instrument = parse_instrument(&query.symbol)?;
    Ok(Json(state.scanner.evaluate(instrument).await))
}

#[derive(Debug, serde::Serialize)]
pub struct ListBotsResponse {
    pub bots: Vec<SimulatedBot>,
    pub running: usize,
}
