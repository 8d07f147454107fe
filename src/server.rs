use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::agents::RigSectionWriter;
use crate::archive::Archivist;
use crate::drafter::JournalistDrafter;
use crate::error::{ArchiveError, NarrationError};
use crate::fetcher::{Category, CricketApiClient, PlayerCategory};
use crate::narration::Narrator;
use crate::orchestrator::{ArchiveStatus, Orchestrator, RunError, Stage};
use crate::query::Query;
use crate::report::markdown_to_html;
use crate::research::WebResearcher;
use crate::resolver::SearchResolver;

/// The production orchestrator wiring.
pub type SportsDesk =
    Orchestrator<SearchResolver, CricketApiClient, WebResearcher, JournalistDrafter<RigSectionWriter>>;

pub struct ServerState {
    pub desk: SportsDesk,
    pub archivist: Archivist,
    pub narrator: Narrator,
    /// Caps concurrent report runs; queries share no other state.
    pub limiter: Semaphore,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub input: String,
}

#[derive(Debug, Deserialize)]
pub struct NarrationRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct NarrationResponse {
    pub audio_url: String,
    pub filename: String,
}

/// Structured error payload naming the failed stage.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub stage: String,
    pub error: String,
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/report", post(get_report))
        .route("/batting", post(get_batting))
        .route("/bowling", post(get_bowling))
        .route("/reports/{name}", get(download_report))
        .route("/narrate", post(narrate))
        .route("/audio/{file}", get(serve_audio))
        .with_state(state)
}

/// Runs the full workflow and returns the rendered document. The caller
/// receives either a complete report or a structured error, never a
/// half-drafted document presented as complete.
async fn get_report(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ReportRequest>,
) -> Response {
    let Ok(_permit) = state.limiter.acquire().await else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let query = Query::new(request.input);
    match state.desk.run(&query).await {
        Ok(outcome) => {
            let mut response = Html(markdown_to_html(&outcome.markdown)).into_response();
            if let Some(ArchiveStatus::Saved { entry, .. }) = &outcome.archive {
                if let Ok(value) = header::HeaderValue::from_str(&entry.file_name) {
                    response.headers_mut().insert("x-archived-as", value);
                }
            }
            response
        }
        Err(err) => run_error_response(err),
    }
}

async fn get_batting(
    state: State<Arc<ServerState>>,
    request: Json<ReportRequest>,
) -> Response {
    single_category(state, request, Category::Player(PlayerCategory::BattingStats)).await
}

async fn get_bowling(
    state: State<Arc<ServerState>>,
    request: Json<ReportRequest>,
) -> Response {
    single_category(state, request, Category::Player(PlayerCategory::BowlingStats)).await
}

/// Resolve-then-fetch for one category, returning the raw provider payload.
async fn single_category(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ReportRequest>,
    category: Category,
) -> Response {
    let Ok(_permit) = state.limiter.acquire().await else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let query = Query::new(request.input);
    match state.desk.fetch_single(&query, category).await {
        Ok(record) => Json(record.payload().clone()).into_response(),
        Err(err) => run_error_response(err),
    }
}

/// Streams back a previously archived report.
async fn download_report(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    match state.archivist.open(&name) {
        Ok(bytes) => {
            let content_type = if name.ends_with(".html") {
                "text/html; charset=utf-8"
            } else {
                "text/markdown; charset=utf-8"
            };
            (
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename={name}"),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(err @ ArchiveError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, "archiving", err),
        Err(err) => error_response(StatusCode::BAD_REQUEST, "archiving", err),
    }
}

async fn narrate(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<NarrationRequest>,
) -> Response {
    match state.narrator.narrate(&request.content).await {
        Ok(artifact) => Json(NarrationResponse {
            audio_url: format!("/audio/{}", artifact.file_name),
            filename: artifact.file_name,
        })
        .into_response(),
        Err(err @ NarrationError::EmptyDocument) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, "narration", err)
        }
        Err(err) => error_response(StatusCode::BAD_GATEWAY, "narration", err),
    }
}

async fn serve_audio(State(state): State<Arc<ServerState>>, Path(file): Path<String>) -> Response {
    match state.narrator.open(&file) {
        Ok(bytes) => ([(header::CONTENT_TYPE, "audio/mpeg")], bytes).into_response(),
        Err(err @ NarrationError::NotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, "narration", err)
        }
        Err(err) => error_response(StatusCode::BAD_REQUEST, "narration", err),
    }
}

fn run_error_response(err: RunError) -> Response {
    let status = match err.stage() {
        Stage::Classifying | Stage::Drafting => StatusCode::UNPROCESSABLE_ENTITY,
        Stage::Resolving => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    let body = ErrorBody {
        stage: err.stage().to_string(),
        error: err.to_string(),
    };
    (status, Json(body)).into_response()
}

fn error_response(status: StatusCode, stage: &str, err: impl std::fmt::Display) -> Response {
    (
        status,
        Json(ErrorBody {
            stage: stage.to_string(),
            error: err.to_string(),
        }),
    )
        .into_response()
}
