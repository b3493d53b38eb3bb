//! Auto Bot
//!
//! D-Size scoring, the periodic opportunity scanner and its simulated bots,
//! exposed over a small JSON control API.

pub mod bots;
pub mod brain;
pub mod config;
pub mod handlers;
pub mod scanner;
pub mod signals;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

// Re-export main types for convenience
pub use bots::{BotKind, BotRegistry, BotStatus, SimulatedBot};
pub use config::{ScannerConfig, Settings, SignalMode};
pub use scanner::OpportunityScanner;
pub use signals::{FeedSignalSource, MarketSignalSource, RandomSignalSource};
pub use types::{
    OpportunityRecord, Result, ScanOutcome, ScanReport, ScanTrigger, ScannerError, ScannerStatus,
};

/// Application state shared across handlers. View-only concerns (sorting,
/// expanded rows) belong to the dashboard, not here.
pub struct AppState {
    pub scanner: OpportunityScanner,
}

/// Build the API router
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/scanner", get(handlers::get_status))
        .route("/scanner/enable", post(handlers::enable))
        .route("/scanner/disable", post(handlers::disable))
        .route("/scanner/scan", post(handlers::scan_now))
        .route(
            "/scanner/config",
            get(handlers::get_config).put(handlers::update_config),
        )
        .route("/opportunities", get(handlers::list_opportunities))
        .route("/opportunities/launch", post(handlers::launch_bot))
        .route("/bots", get(handlers::list_bots))
        .route("/bots/:id/stop", post(handlers::stop_bot))
        .route("/dsize", get(handlers::get_dsize))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests;
