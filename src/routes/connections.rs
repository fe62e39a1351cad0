use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        generate::{ConnectionsGenerateRequest, ConnectionsGenerateResponse},
        session::{
            ConnectionsSessionView, CreateConnectionsSessionRequest, SubmissionResponse,
            ToggleResponse, ToggleTileRequest,
        },
    },
    error::AppError,
    routes::auth::{AuthUser, MaybeUser},
    services::{game_service, session_service},
    state::SharedState,
};

/// Puzzle generation and server-side Connections sessions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/connections/generate", post(generate))
        .route("/connections/sessions", post(create_session))
        .route("/connections/sessions/{id}", get(get_session))
        .route("/connections/sessions/{id}/toggle", post(toggle))
        .route("/connections/sessions/{id}/deselect", post(deselect))
        .route("/connections/sessions/{id}/shuffle", post(shuffle))
        .route("/connections/sessions/{id}/submit", post(submit))
}

#[utoipa::path(
    post,
    path = "/api/v1/connections/generate",
    tag = "connections",
    request_body = ConnectionsGenerateRequest,
    responses((status = 200, description = "Generated puzzle", body = ConnectionsGenerateResponse))
)]
/// Generate groups of connected items for a theme.
pub async fn generate(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Valid(Json(payload)): Valid<Json<ConnectionsGenerateRequest>>,
) -> Result<Json<ConnectionsGenerateResponse>, AppError> {
    let caller = user.map(|user| user.id);
    Ok(Json(
        game_service::generate_connections(&state, payload, caller).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/connections/sessions",
    tag = "connections",
    security(("bearer" = [])),
    request_body = CreateConnectionsSessionRequest,
    responses(
        (status = 201, description = "Session started", body = ConnectionsSessionView),
        (status = 400, description = "Invalid puzzles or content source")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Valid(Json(payload)): Valid<Json<CreateConnectionsSessionRequest>>,
) -> Result<(StatusCode, Json<ConnectionsSessionView>), AppError> {
    let view = session_service::create_connections(&state, user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/v1/connections/sessions/{id}",
    tag = "connections",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Grid as the player sees it", body = ConnectionsSessionView),
        (status = 404, description = "No such session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionsSessionView>, AppError> {
    Ok(Json(session_service::connections_state(&state, user.id, id)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/connections/sessions/{id}/toggle",
    tag = "connections",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = ToggleTileRequest,
    responses(
        (status = 200, description = "Tile toggled", body = ToggleResponse),
        (status = 404, description = "Unknown tile"),
        (status = 409, description = "Tile solved or selection full")
    )
)]
/// Select or deselect a tile.
pub async fn toggle(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ToggleTileRequest>>,
) -> Result<Json<ToggleResponse>, AppError> {
    Ok(Json(
        session_service::toggle_tile(&state, user.id, id, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/connections/sessions/{id}/deselect",
    tag = "connections",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Selection cleared", body = ConnectionsSessionView))
)]
pub async fn deselect(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionsSessionView>, AppError> {
    Ok(Json(
        session_service::deselect_tiles(&state, user.id, id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/connections/sessions/{id}/shuffle",
    tag = "connections",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Remaining tiles reshuffled", body = ConnectionsSessionView))
)]
pub async fn shuffle(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionsSessionView>, AppError> {
    Ok(Json(session_service::shuffle_tiles(&state, user.id, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/connections/sessions/{id}/submit",
    tag = "connections",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Selection checked", body = SubmissionResponse),
        (status = 409, description = "Selection incomplete or game over")
    )
)]
/// Check the selected tiles against the hidden groups.
pub async fn submit(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionResponse>, AppError> {
    Ok(Json(
        session_service::submit_selection(&state, user.id, id).await?,
    ))
}
