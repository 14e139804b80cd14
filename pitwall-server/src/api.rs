//! REST API and SSE routes

use crate::ingest::{IdentityUpdate, IngestControl};
use crate::state::{AppState, IngestStatsSnapshot};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use pitwall_core::model::{BestLap, FieldMask};
use pitwall_core::{CompletedLapRecord, LapStore, SessionState, StoreError};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;

/// Laps returned by `/api/laps` when no limit is given
const DEFAULT_LAP_LIMIT: usize = 50;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/data", get(current_snapshot))
        .route("/api/telemetry/stream", get(telemetry_stream))
        .route("/api/laps", get(recent_laps))
        .route("/api/laps/session/:id", get(session_laps))
        .route("/api/best", get(best_lap))
        .route("/api/identity", post(set_identity))
        .route("/api/errors/stream", get(error_stream))
        .route("/api/stats", get(ingest_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Snapshot Endpoints ===

async fn current_snapshot(State(state): State<AppState>) -> Json<SessionState> {
    let snapshot = state.snapshot.read().await;
    Json(snapshot.clone())
}

#[derive(Deserialize)]
struct StreamQuery {
    fields: Option<String>,
}

async fn telemetry_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let field_mask = query.fields.map(|f| FieldMask::parse(&f));

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let mask = field_mask.clone();
        async move {
            match result {
                Ok(snapshot) => match snapshot.to_json_filtered(mask.as_ref()) {
                    Ok(json) => Some(Ok(Event::default().data(json))),
                    Err(e) => {
                        tracing::error!("Failed to serialize snapshot: {}", e);
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!("Broadcast stream error: {}", e);
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn best_lap(State(state): State<AppState>) -> Result<Json<BestLap>, (StatusCode, String)> {
    let snapshot = state.snapshot.read().await;
    snapshot
        .best_lap
        .clone()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "No valid lap completed yet".to_string()))
}

async fn ingest_stats(State(state): State<AppState>) -> Json<IngestStatsSnapshot> {
    Json(state.stats.snapshot())
}

// === Lap Store Endpoints ===

#[derive(Deserialize)]
struct LapsQuery {
    limit: Option<usize>,
}

/// Run a store query on the blocking pool
async fn query_store<F>(
    state: &AppState,
    query: F,
) -> Result<Json<Vec<CompletedLapRecord>>, (StatusCode, String)>
where
    F: FnOnce(&dyn LapStore) -> Result<Vec<CompletedLapRecord>, StoreError>
        + Send
        + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || query(store.as_ref()))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store task failed: {}", e)))?
        .map(Json)
        .map_err(|e| {
            tracing::error!("Lap store query failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}

async fn recent_laps(
    State(state): State<AppState>,
    Query(query): Query<LapsQuery>,
) -> Result<Json<Vec<CompletedLapRecord>>, (StatusCode, String)> {
    let limit = query.limit.unwrap_or(DEFAULT_LAP_LIMIT);
    query_store(&state, move |store| store.recent(limit)).await
}

async fn session_laps(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CompletedLapRecord>>, (StatusCode, String)> {
    query_store(&state, move |store| store.by_session(&id)).await
}

// === Identity ===

async fn set_identity(
    State(state): State<AppState>,
    Json(update): Json<IdentityUpdate>,
) -> impl IntoResponse {
    if update.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Expected driverName and/or sessionId".to_string(),
        );
    }

    match state.control_tx.send(IngestControl::SetIdentity(update)).await {
        Ok(()) => (StatusCode::ACCEPTED, "Identity update queued".to_string()),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Ingest loop is not running".to_string(),
        ),
    }
}

// === Error Stream ===

async fn error_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe_errors();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(failure) => match serde_json::to_string(&failure) {
                Ok(json) => Some(Ok(Event::default().event("persistence_failure").data(json))),
                Err(e) => {
                    tracing::error!("Failed to serialize persistence failure: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Error stream lagged: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
