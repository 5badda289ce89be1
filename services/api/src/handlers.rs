//! Axum Handlers for the REST API
//!
//! Each handler maps one learning-session command onto an HTTP endpoint and
//! answers with the session snapshot. It uses `utoipa` doc comments to
//! generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use sikho_core::{LearningSession, SessionError};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    models::{
        AskDoubtPayload, CompleteTopicPayload, DoubtResponse, ErrorResponse, QuizResponse,
        SelectTopicPayload, SelectTopicResponse, SessionResponse, StartLearningPayload,
        SubmitQuizPayload,
    },
    state::AppState,
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    InternalServerError(anyhow::Error),
}

impl ApiError {
    /// Maps a rejected session command onto the matching HTTP status.
    pub fn from_session(err: SessionError) -> Self {
        let message = err.to_string();
        match err {
            SessionError::UnknownTopic(_) => ApiError::NotFound(message),
            SessionError::InvalidPhase { .. }
            | SessionError::ContentLoading
            | SessionError::ChatBusy => ApiError::Conflict(message),
            SessionError::NoActiveTopic | SessionError::Quiz(_) | SessionError::EmptyQuestion => {
                ApiError::BadRequest(message)
            }
            SessionError::Interrupted(_) => ApiError::InternalServerError(anyhow::anyhow!(message)),
        }
    }
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

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

async fn find_session(state: &AppState, id: Uuid) -> Result<LearningSession, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session with id '{}' not found", id)))
}

async fn session_response(id: Uuid, session: &LearningSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        session_id: id,
        session: session.snapshot().await,
    })
}

/// Create a new learning session awaiting materials.
#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session created successfully", body = SessionResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = LearningSession::new(state.generator.clone());
    let id = state.sessions.insert(session.clone()).await;
    info!(session_id = %id, "Session created");
    Ok((StatusCode::CREATED, session_response(id, &session).await))
}

/// Get the current snapshot of a session.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session snapshot", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(("id" = Uuid, Path, description = "Session ID"))
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    Ok(session_response(id, &session).await)
}

/// Delete a session and everything it holds.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(("id" = Uuid, Path, description = "Session ID"))
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .remove(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session with id '{}' not found", id)))?;
    info!(session_id = %id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Generate the roadmap for the supplied materials.
///
/// A generation failure is reported in the snapshot's `error` phase, not as
/// an HTTP error.
#[utoipa::path(
    post,
    path = "/sessions/{id}/start",
    request_body = StartLearningPayload,
    responses(
        (status = 200, description = "Roadmap generated, or generation failed", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session already started", body = ErrorResponse)
    ),
    params(("id" = Uuid, Path, description = "Session ID"))
)]
pub async fn start_learning(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartLearningPayload>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    session
        .start_learning(payload.materials, payload.knowledge_level)
        .await
        .map_err(ApiError::from_session)?;
    Ok(session_response(id, &session).await)
}

/// Select a topic, loading its content and quiz.
#[utoipa::path(
    post,
    path = "/sessions/{id}/topics/select",
    request_body = SelectTopicPayload,
    responses(
        (status = 200, description = "Topic selected", body = SelectTopicResponse),
        (status = 404, description = "Session or topic not found", body = ErrorResponse),
        (status = 409, description = "Session is not learning", body = ErrorResponse)
    ),
    params(("id" = Uuid, Path, description = "Session ID"))
)]
pub async fn select_topic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectTopicPayload>,
) -> Result<Json<SelectTopicResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    let load = session
        .select_topic(&payload.title)
        .await
        .map_err(ApiError::from_session)?;
    Ok(Json(SelectTopicResponse {
        load,
        session: session.snapshot().await,
    }))
}

/// Mark a topic (by default the active one) as completed.
#[utoipa::path(
    post,
    path = "/sessions/{id}/topics/complete",
    request_body = CompleteTopicPayload,
    responses(
        (status = 200, description = "Topic completed", body = SessionResponse),
        (status = 400, description = "No topic given and none active", body = ErrorResponse),
        (status = 404, description = "Session or topic not found", body = ErrorResponse)
    ),
    params(("id" = Uuid, Path, description = "Session ID"))
)]
pub async fn complete_topic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteTopicPayload>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    match payload.title {
        Some(title) => {
            if !session.mark_topic_complete(&title).await {
                return Err(ApiError::from_session(SessionError::UnknownTopic(title)));
            }
        }
        None => session
            .complete_active_topic()
            .await
            .map_err(ApiError::from_session)?,
    }
    Ok(session_response(id, &session).await)
}

/// Submit answers for the active topic's quiz.
#[utoipa::path(
    post,
    path = "/sessions/{id}/quiz",
    request_body = SubmitQuizPayload,
    responses(
        (status = 200, description = "Quiz scored", body = QuizResponse),
        (status = 400, description = "Answers do not match the quiz", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(("id" = Uuid, Path, description = "Session ID"))
)]
pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitQuizPayload>,
) -> Result<Json<QuizResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    let result = session
        .submit_quiz(&payload.answers)
        .await
        .map_err(ApiError::from_session)?;
    Ok(Json(QuizResponse {
        result,
        session: session.snapshot().await,
    }))
}

/// Ask the assistant a follow-up question.
#[utoipa::path(
    post,
    path = "/sessions/{id}/doubts",
    request_body = AskDoubtPayload,
    responses(
        (status = 200, description = "Question answered", body = DoubtResponse),
        (status = 400, description = "Empty question", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Previous question still pending", body = ErrorResponse)
    ),
    params(("id" = Uuid, Path, description = "Session ID"))
)]
pub async fn ask_doubt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AskDoubtPayload>,
) -> Result<Json<DoubtResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    let reply = session
        .ask_doubt(&payload.question)
        .await
        .map_err(ApiError::from_session)?;
    Ok(Json(DoubtResponse {
        reply,
        session: session.snapshot().await,
    }))
}

/// Wait until the in-flight prefetch, if any, has finished.
#[utoipa::path(
    post,
    path = "/sessions/{id}/prefetch/wait",
    responses(
        (status = 200, description = "No prefetch in flight", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(("id" = Uuid, Path, description = "Session ID"))
)]
pub async fn wait_for_prefetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    session.wait_for_prefetch().await;
    Ok(session_response(id, &session).await)
}

/// Clear the session and return it to the input phase.
#[utoipa::path(
    post,
    path = "/sessions/{id}/reset",
    responses(
        (status = 200, description = "Session reset", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(("id" = Uuid, Path, description = "Session ID"))
)]
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    session.reset().await;
    Ok(session_response(id, &session).await)
}
