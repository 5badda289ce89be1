//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the session command endpoints and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        AskDoubtPayload, CompleteTopicPayload, DoubtResponse, ErrorResponse, QuizResponse,
        SelectTopicPayload, SelectTopicResponse, SessionResponse, StartLearningPayload,
        SubmitQuizPayload,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session,
        handlers::get_session,
        handlers::delete_session,
        handlers::start_learning,
        handlers::select_topic,
        handlers::complete_topic,
        handlers::submit_quiz,
        handlers::ask_doubt,
        handlers::wait_for_prefetch,
        handlers::reset_session,
    ),
    components(
        schemas(
            StartLearningPayload, SelectTopicPayload, CompleteTopicPayload, SubmitQuizPayload,
            AskDoubtPayload, SessionResponse, SelectTopicResponse, QuizResponse, DoubtResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "Sikho API", description = "Learning sessions for the Sikho AI tutor")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{id}/start", post(handlers::start_learning))
        .route("/sessions/{id}/topics/select", post(handlers::select_topic))
        .route(
            "/sessions/{id}/topics/complete",
            post(handlers::complete_topic),
        )
        .route("/sessions/{id}/quiz", post(handlers::submit_quiz))
        .route("/sessions/{id}/doubts", post(handlers::ask_doubt))
        .route(
            "/sessions/{id}/prefetch/wait",
            post(handlers::wait_for_prefetch),
        )
        .route("/sessions/{id}/reset", post(handlers::reset_session))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Merge the stateful routes with the stateless Swagger UI.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_session_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/sessions",
            "/sessions/{id}",
            "/sessions/{id}/start",
            "/sessions/{id}/topics/select",
            "/sessions/{id}/topics/complete",
            "/sessions/{id}/quiz",
            "/sessions/{id}/doubts",
            "/sessions/{id}/prefetch/wait",
            "/sessions/{id}/reset",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing path {expected}"
            );
        }
    }
}
