//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for the
//! dialogue control surface. It uses `utoipa` doc comments to generate
//! OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use colloquy_core::{EngineError, Orchestrator, RunMode, RunStatus, Topic};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::{
    models::{
        AdvanceResponse, CreateTopicPayload, ErrorResponse, MessageDto, RunStateDto, StopResponse,
        TopicDto, outcome_label,
    },
    sessions::{SessionHandle, spawn_auto_drive},
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    UpstreamFailure(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { message })).into_response()
            }
            ApiError::UpstreamFailure(message) => {
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidArgument(message) => ApiError::BadRequest(message),
            EngineError::NotFound(id) => {
                ApiError::NotFound(format!("Topic with id '{id}' not found"))
            }
            EngineError::InvalidState(message) => ApiError::Conflict(message),
            // A failed completion call changed no state; the session stays
            // resumable, so this is a non-fatal upstream report.
            err @ EngineError::CompletionFailed { .. } => {
                ApiError::UpstreamFailure(err.to_string())
            }
            err @ EngineError::Storage { .. } => ApiError::InternalServerError(err.into()),
        }
    }
}

/// The live session for a topic, rebuilt from the persisted transcript when
/// no session is registered (e.g. after a process restart). Rebuilt
/// sessions come back in manual mode; auto is chosen at start.
async fn session_for(state: &Arc<AppState>, topic_id: Uuid) -> Result<SessionHandle, ApiError> {
    if let Some(session) = state.sessions.get(topic_id) {
        return Ok(session);
    }
    let mut orchestrator = Orchestrator::new(
        state.store.clone(),
        state.llm_client.clone(),
        state.prompts.clone(),
    );
    orchestrator.attach(topic_id, RunMode::Manual).await?;
    let session = SessionHandle::new(orchestrator);
    state.sessions.insert(topic_id, session.clone());
    Ok(session)
}

/// The run state to report for a topic: the live session's if one exists,
/// otherwise derived from the persisted transcript alone.
fn run_state_of(state: &Arc<AppState>, topic: &Topic) -> RunStateDto {
    if let Some(session) = state.sessions.get(topic.id) {
        // A held lock means a turn is in flight right now.
        if let Ok(orchestrator) = session.orchestrator.try_lock() {
            return RunStateDto {
                status: orchestrator.status(),
                turn_count: orchestrator.turn_count(),
                turn_limit: orchestrator.turn_limit(),
                mode: Some(orchestrator.mode()),
            };
        }
        return RunStateDto {
            status: RunStatus::Running,
            turn_count: topic.messages.len() as u32,
            turn_limit: topic.turn_limit,
            mode: None,
        };
    }
    let status = if topic.is_full() {
        RunStatus::Complete
    } else {
        RunStatus::Stopped
    };
    RunStateDto {
        status,
        turn_count: topic.messages.len() as u32,
        turn_limit: topic.turn_limit,
        mode: None,
    }
}

/// Start a new dialogue: create the topic and seed the first student turn.
#[utoipa::path(
    post,
    path = "/topics",
    request_body = CreateTopicPayload,
    responses(
        (status = 201, description = "Topic created and seeded", body = TopicDto),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 502, description = "Completion provider failure", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_topic(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTopicPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut orchestrator = Orchestrator::new(
        state.store.clone(),
        state.llm_client.clone(),
        state.prompts.clone(),
    );
    let topic_id = orchestrator
        .start(&payload.subject, payload.turn_limit, payload.mode)
        .await?;

    let dto = TopicDto {
        id: topic_id,
        subject: payload.subject,
        turn_limit: payload.turn_limit,
        turn_count: orchestrator.turn_count(),
        status: orchestrator.status(),
        mode: Some(payload.mode),
    };

    let session = SessionHandle::new(orchestrator);
    state.sessions.insert(topic_id, session.clone());
    if payload.mode == RunMode::Auto {
        spawn_auto_drive(session, topic_id);
    }

    Ok((StatusCode::CREATED, Json(dto)))
}

/// List all topics in creation order.
#[utoipa::path(
    get,
    path = "/topics",
    responses(
        (status = 200, description = "List of topics", body = [TopicDto]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_topics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TopicDto>>, ApiError> {
    let topics = state.store.list_topics().await;
    let dtos = topics
        .iter()
        .map(|topic| TopicDto::from_parts(topic, &run_state_of(&state, topic)))
        .collect();
    Ok(Json(dtos))
}

/// Get a specific topic and its run state.
#[utoipa::path(
    get,
    path = "/topics/{id}",
    responses(
        (status = 200, description = "Topic details", body = TopicDto),
        (status = 404, description = "Topic not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Topic ID")
    )
)]
pub async fn get_topic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let topic = state.store.get_topic(id).await?;
    let dto = TopicDto::from_parts(&topic, &run_state_of(&state, &topic));
    Ok((StatusCode::OK, Json(dto)))
}

/// Get the live message list for a topic.
#[utoipa::path(
    get,
    path = "/topics/{id}/messages",
    responses(
        (status = 200, description = "Messages in order", body = [MessageDto]),
        (status = 404, description = "Topic not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Topic ID")
    )
)]
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let topic = state.store.get_topic(id).await?;
    Ok(Json(topic.messages.into_iter().map(MessageDto::from).collect()))
}

/// Advance the dialogue by one turn (manual step).
#[utoipa::path(
    post,
    path = "/topics/{id}/advance",
    responses(
        (status = 200, description = "Step result", body = AdvanceResponse),
        (status = 404, description = "Topic not found", body = ErrorResponse),
        (status = 409, description = "Session does not accept manual steps", body = ErrorResponse),
        (status = 502, description = "Completion provider failure", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Topic ID")
    )
)]
pub async fn advance_topic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdvanceResponse>, ApiError> {
    let session = session_for(&state, id).await?;
    let mut orchestrator = session.orchestrator.lock().await;

    // A running auto session is already being pumped by its drive task;
    // two pumps must never interleave turns on one session.
    if orchestrator.mode() == RunMode::Auto && orchestrator.status() == RunStatus::Running {
        return Err(ApiError::Conflict(
            "session is running in auto mode; stop it before stepping manually".to_string(),
        ));
    }

    let outcome = orchestrator.advance_turn().await?;
    let message = match &outcome {
        colloquy_core::TurnOutcome::Advanced(message) => Some(MessageDto::from(message.clone())),
        _ => None,
    };
    Ok(Json(AdvanceResponse {
        outcome: outcome_label(&outcome),
        message,
        status: orchestrator.status(),
        turn_count: orchestrator.turn_count(),
    }))
}

/// Request a cooperative stop, honored at the next turn boundary.
#[utoipa::path(
    post,
    path = "/topics/{id}/stop",
    responses(
        (status = 200, description = "Stop requested", body = StopResponse),
        (status = 404, description = "Topic not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Topic ID")
    )
)]
pub async fn stop_topic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StopResponse>, ApiError> {
    match state.sessions.get(id) {
        // Deliberately does not take the session lock: an in-flight turn
        // finishes and the stop lands at the boundary after it.
        Some(session) => session.stop.request_stop(),
        None => {
            // No live session means nothing is running; stopping is a no-op
            // as long as the topic exists.
            state.store.get_topic(id).await?;
        }
    }
    Ok(Json(StopResponse {
        stop_requested: true,
    }))
}

/// Resume a stopped dialogue.
#[utoipa::path(
    post,
    path = "/topics/{id}/resume",
    responses(
        (status = 200, description = "Session resumed", body = RunStateDto),
        (status = 404, description = "Topic not found", body = ErrorResponse),
        (status = 409, description = "Session is not stopped", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Topic ID")
    )
)]
pub async fn resume_topic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunStateDto>, ApiError> {
    let session = session_for(&state, id).await?;
    let mut orchestrator = session.orchestrator.lock().await;
    orchestrator.resume()?;

    let dto = RunStateDto {
        status: orchestrator.status(),
        turn_count: orchestrator.turn_count(),
        turn_limit: orchestrator.turn_limit(),
        mode: Some(orchestrator.mode()),
    };
    let mode = orchestrator.mode();
    drop(orchestrator);

    if mode == RunMode::Auto {
        spawn_auto_drive(session, id);
    }
    Ok(Json(dto))
}

/// Delete a topic and all its messages. Idempotent.
#[utoipa::path(
    delete,
    path = "/topics/{id}",
    responses(
        (status = 204, description = "Topic deleted (or already absent)"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Topic ID")
    )
)]
pub async fn delete_topic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(session) = state.sessions.remove(id) {
        // Any drive task parks at the next turn boundary.
        session.stop.request_stop();
    }
    state.store.delete_topic(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
