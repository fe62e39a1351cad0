use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::health::{HealthResponse, WelcomeResponse},
    services::health_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses((status = 200, description = "Greeting", body = WelcomeResponse))
)]
pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse::default())
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "`ok`, or `degraded` without storage", body = HealthResponse))
)]
/// Report whether a storage backend is reachable.
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(health_service::health_status(&state).await)
}

/// Configure the health routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/", get(welcome))
        .route("/health", get(health))
}
