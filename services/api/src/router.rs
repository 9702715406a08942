//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST control surface and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        AdvanceResponse, CreateTopicPayload, ErrorResponse, MessageDto, RunStateDto, StopResponse,
        TopicDto,
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
        handlers::create_topic,
        handlers::list_topics,
        handlers::get_topic,
        handlers::get_messages,
        handlers::advance_topic,
        handlers::stop_topic,
        handlers::resume_topic,
        handlers::delete_topic,
    ),
    components(
        schemas(TopicDto, MessageDto, RunStateDto, CreateTopicPayload, AdvanceResponse, StopResponse, ErrorResponse)
    ),
    tags(
        (name = "Colloquy API", description = "Control surface for student/teacher synthetic dialogues")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route(
            "/topics",
            get(handlers::list_topics).post(handlers::create_topic),
        )
        .route(
            "/topics/{id}",
            get(handlers::get_topic).delete(handlers::delete_topic),
        )
        .route("/topics/{id}/messages", get(handlers::get_messages))
        .route("/topics/{id}/advance", post(handlers::advance_topic))
        .route("/topics/{id}/stop", post(handlers::stop_topic))
        .route("/topics/{id}/resume", post(handlers::resume_topic))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Create the final router that merges the stateful routes
    // with the stateless routes (like Swagger UI).
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
