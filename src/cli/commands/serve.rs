//! HTTP API server.
//!
//! Exposes ingest and query over REST. Error bodies are `{"detail": "..."}`
//! and keep the three failure categories apart: 404 for a missing transcript,
//! 404 for a video that was never ingested, 500 for everything else.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::{ErrorCategory, VidsageError};
use crate::orchestrator::{IndexedVideo, Orchestrator};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    query_timeout: Duration,
    ingest_timeout: Duration,
}

impl AppState {
    fn new(orchestrator: Orchestrator) -> Self {
        let server = &orchestrator.settings().server;
        let query_timeout = Duration::from_secs(server.query_timeout_secs);
        let ingest_timeout = Duration::from_secs(server.ingest_timeout_secs);
        Self {
            orchestrator,
            query_timeout,
            ingest_timeout,
        }
    }
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Orchestrator::new(settings)?;
    let app = router(Arc::new(AppState::new(orchestrator)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("VidSage API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Ingest", "POST   /ingest/{video_id}");
    Output::kv("Query", "POST   /query");
    Output::kv("List Videos", "GET    /videos");
    Output::kv("Evict Video", "DELETE /videos/{video_id}");
    Output::kv("Clear Session", "DELETE /sessions/{session_id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ingest/{video_id}", post(ingest))
        .route("/query", post(query))
        .route("/videos", get(list_videos))
        .route("/videos/{video_id}", delete(evict_video))
        .route("/sessions/{session_id}", delete(clear_session))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    embedding_provider: String,
    generation_provider: String,
}

#[derive(Serialize)]
struct IngestResponse {
    status: &'static str,
    video_id: String,
    chunks: usize,
}

#[derive(Deserialize)]
struct QueryRequest {
    session_id: String,
    video_id: String,
    question: String,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    source_chunks: Vec<String>,
}

#[derive(Serialize)]
struct VideoListResponse {
    videos: Vec<IndexedVideo>,
    total: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(ErrorResponse { detail })).into_response()
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        embedding_provider: state.orchestrator.embedding_provider().to_string(),
        generation_provider: state.orchestrator.generation_provider().to_string(),
    })
}

async fn ingest(State(state): State<Arc<AppState>>, Path(video_id): Path<String>) -> Response {
    match state
        .orchestrator
        .ingest_async(&video_id, state.ingest_timeout)
        .await
    {
        Ok(result) => {
            info!("Ingested {} ({} chunks)", result.video_id, result.chunks);
            Json(IngestResponse {
                status: "ok",
                video_id: result.video_id,
                chunks: result.chunks,
            })
            .into_response()
        }
        Err(e @ VidsageError::Timeout(_)) => {
            error_response(StatusCode::GATEWAY_TIMEOUT, format!("Indexing error: {}", e))
        }
        Err(e) => match e.category() {
            ErrorCategory::TranscriptUnavailable => {
                error_response(StatusCode::NOT_FOUND, format!("Could not fetch transcript: {}", e))
            }
            _ => {
                error!("Ingest of {} failed: {}", video_id, e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Indexing error: {}", e))
            }
        },
    }
}

async fn query(State(state): State<Arc<AppState>>, Json(req): Json<QueryRequest>) -> Response {
    match state
        .orchestrator
        .query_async(&req.session_id, &req.video_id, &req.question, state.query_timeout)
        .await
    {
        Ok(response) => Json(QueryResponse {
            answer: response.answer,
            source_chunks: response.source_snippets,
        })
        .into_response(),
        Err(e @ VidsageError::Timeout(_)) => error_response(
            StatusCode::GATEWAY_TIMEOUT,
            format!("Error answering question: {}", e),
        ),
        Err(e) => match e.category() {
            ErrorCategory::NotIngested => error_response(
                StatusCode::NOT_FOUND,
                "Video not ingested. Call /ingest/{video_id} first.".to_string(),
            ),
            _ => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error answering question: {}", e),
            ),
        },
    }
}

async fn list_videos(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let videos = state.orchestrator.indexed_videos();
    let total = videos.len();
    Json(VideoListResponse { videos, total })
}

async fn evict_video(State(state): State<Arc<AppState>>, Path(video_id): Path<String>) -> StatusCode {
    state.orchestrator.evict(&video_id);
    StatusCode::NO_CONTENT
}

async fn clear_session(State(state): State<Arc<AppState>>, Path(session_id): Path<String>) -> StatusCode {
    state.orchestrator.clear_session(&session_id);
    StatusCode::NO_CONTENT
}
