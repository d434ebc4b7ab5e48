//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use gramatica_core::{Difficulty, SnapshotRepository, GRAMMAR_TOPICS, SESSION_LENGTH};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_topics_handler,
        device_progress_handler,
    ),
    components(
        schemas(TopicsResponse, ProgressResponse)
    ),
    tags(
        (name = "Gramática Mágica API", description = "Catalogue and saved progress of the grammar quiz.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

/// Everything a client needs to draw the start screen.
#[derive(Debug, Serialize, ToSchema)]
pub struct TopicsResponse {
    topics: Vec<String>,
    difficulties: Vec<String>,
    session_length: u32,
}

/// Summary of the session a device could resume.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressResponse {
    device_id: String,
    resumable: bool,
    status: Option<String>,
    difficulty: Option<String>,
    score: u32,
    questions_answered: u32,
    total_questions: u32,
    hint_used: bool,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the grammar topics and difficulty levels.
#[utoipa::path(
    get,
    path = "/topics",
    responses(
        (status = 200, description = "Topics and difficulty labels", body = TopicsResponse)
    )
)]
pub async fn list_topics_handler() -> Json<TopicsResponse> {
    Json(TopicsResponse {
        topics: GRAMMAR_TOPICS.iter().map(|t| t.to_string()).collect(),
        difficulties: Difficulty::ALL
            .iter()
            .map(|d| d.label().to_string())
            .collect(),
        session_length: SESSION_LENGTH,
    })
}

/// Show the saved session of a device, if it can be resumed.
#[utoipa::path(
    get,
    path = "/devices/{device_id}/progress",
    params(
        ("device_id" = String, Path, description = "The device's identifier ([A-Za-z0-9_-], up to 64 characters).")
    ),
    responses(
        (status = 200, description = "Saved progress of the device", body = ProgressResponse),
        (status = 400, description = "Invalid device id")
    )
)]
pub async fn device_progress_handler(
    State(app_state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<ProgressResponse>, (StatusCode, String)> {
    let store = app_state.device_store(&device_id).map_err(|e| {
        warn!("Rejected progress lookup: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid device id".to_string())
    })?;

    let saved = SnapshotRepository::new(Arc::new(store)).load_resumable();
    let response = match saved {
        Some(state) => ProgressResponse {
            device_id,
            resumable: true,
            status: Some(state.status().name().to_string()),
            difficulty: Some(state.selected_difficulty().label().to_string()),
            score: state.score(),
            questions_answered: state.questions_answered(),
            total_questions: SESSION_LENGTH,
            hint_used: state.hint_used(),
        },
        None => ProgressResponse {
            device_id,
            resumable: false,
            status: None,
            difficulty: None,
            score: 0,
            questions_answered: 0,
            total_questions: SESSION_LENGTH,
            hint_used: false,
        },
    };
    Ok(Json(response))
}
