use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::domain::query::{QueryOptions, QueryPage};
use crate::presentation::rest::{ApiError, dto::*};
use crate::shared::types::Snapshot;

use super::AppState;

/// Aggregate and run `select` off the request task. A panic in
/// either becomes a 500 instead of a dropped connection.
async fn snapshot_page<F>(
    state: &Arc<AppState>,
    select: F,
) -> Result<(Snapshot, QueryPage), ApiError>
where
    F: FnOnce(&AppState, &Snapshot) -> QueryPage + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::spawn(async move {
        let snapshot = state.aggregator.build_snapshot().await;
        let page = select(&state, &snapshot);
        (snapshot, page)
    })
    .await
    .map_err(|e| {
        error!(error = %e, "❌ Snapshot query failed");
        ApiError::internal()
    })
}

fn yields_response(snapshot: &Snapshot, page: QueryPage) -> Json<YieldsResponse> {
    Json(YieldsResponse {
        timestamp: snapshot.timestamp_iso(),
        data: page.pools,
        pagination: page.pagination,
    })
}

/// GET /yields
pub async fn yields(
    State(state): State<Arc<AppState>>,
    params: Result<Query<YieldsParams>, QueryRejection>,
) -> Result<Json<YieldsResponse>, ApiError> {
    // undecodable query strings get the same JSON error body as bad values
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let options = params.into_options()?;
    debug!(?options, "Yields query");

    let (snapshot, page) = snapshot_page(&state, move |state, snapshot| {
        state.query_engine.query(snapshot, &options)
    })
    .await?;
    Ok(yields_response(&snapshot, page))
}

/// GET /yields-curated
pub async fn yields_curated(
    State(state): State<Arc<AppState>>,
) -> Result<Json<YieldsResponse>, ApiError> {
    let (snapshot, page) = snapshot_page(&state, |state, snapshot| {
        state.query_engine.curated(snapshot, &state.placeholder_symbol)
    })
    .await?;
    Ok(yields_response(&snapshot, page))
}

/// POST /agent
pub async fn agent(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, ApiError> {
    let request: AgentRequest = if body.iter().all(u8::is_ascii_whitespace) {
        AgentRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?
    };

    let pools = match request.market_pools() {
        Some(pools) => pools,
        None => {
            snapshot_page(&state, |state, snapshot| {
                state.query_engine.query(snapshot, &QueryOptions::default())
            })
            .await?
            .1
            .pools
        }
    };

    let advice = state
        .advisor
        .advise(&pools, request.messages.as_deref(), request.budget())
        .await;

    let response = match request.messages {
        Some(_) => Json(ChatReply {
            role: "assistant",
            content: advice.text,
            kind: advice.kind,
        })
        .into_response(),
        None => Json(AnalysisReply {
            analysis: advice.text,
            kind: advice.kind,
        })
        .into_response(),
    };
    Ok(response)
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        scheduler: state.hub.state(),
        subscribers: state.hub.subscriber_count(),
        last_sequence: state.hub.last_sequence().await,
    })
}
