use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::application::{AdvisoryEngine, Aggregator, FeedHub};
use crate::domain::query::QueryEngine;
use crate::presentation::websocket::ws_handler;

/// Application state shared across handlers
pub struct AppState {
    pub query_engine: QueryEngine,
    pub aggregator: Arc<Aggregator>,
    pub advisor: Arc<AdvisoryEngine>,
    pub hub: Arc<FeedHub>,
    pub placeholder_symbol: String,
}

impl AppState {
    pub fn new(
        query_engine: QueryEngine,
        aggregator: Arc<Aggregator>,
        advisor: Arc<AdvisoryEngine>,
        hub: Arc<FeedHub>,
    ) -> Self {
        let placeholder_symbol = aggregator.config().placeholder_symbol.clone();
        AppState {
            query_engine,
            aggregator,
            advisor,
            hub,
            placeholder_symbol,
        }
    }
}

/// Create the HTTP router, push feed included
pub fn create_router(state: Arc<AppState>, socket_path: &str) -> Router {
    Router::new()
        .route("/yields", get(handlers::yields))
        .route("/api/yields", get(handlers::yields))
        .route("/yields-curated", get(handlers::yields_curated))
        .route("/api/yields-curated", get(handlers::yields_curated))
        .route("/agent", post(handlers::agent))
        .route("/api/agent", post(handlers::agent))
        .route("/health", get(handlers::health))
        .route(socket_path, get(ws_handler))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
