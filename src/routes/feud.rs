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
        generate::{FeudGenerateRequest, FeudGenerateResponse},
        session::{
            AnswerRequest, CreateFeudSessionRequest, FeudGuessResponse, FeudSessionView,
            FeudSkipResponse,
        },
    },
    error::AppError,
    routes::auth::{AuthUser, MaybeUser},
    services::{game_service, session_service},
    state::SharedState,
};

/// Survey generation and server-side Feud sessions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/feud/generate", post(generate))
        .route("/feud/sessions", post(create_session))
        .route("/feud/sessions/{id}", get(get_session))
        .route("/feud/sessions/{id}/answer", post(answer))
        .route("/feud/sessions/{id}/skip", post(skip))
}

#[utoipa::path(
    post,
    path = "/api/v1/feud/generate",
    tag = "feud",
    request_body = FeudGenerateRequest,
    responses(
        (status = 200, description = "Generated survey", body = FeudGenerateResponse),
        (status = 503, description = "No language model configured")
    )
)]
/// Run a simulated survey for a theme.
pub async fn generate(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Valid(Json(payload)): Valid<Json<FeudGenerateRequest>>,
) -> Result<Json<FeudGenerateResponse>, AppError> {
    let caller = user.map(|user| user.id);
    Ok(Json(game_service::generate_feud(&state, payload, caller).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/feud/sessions",
    tag = "feud",
    security(("bearer" = [])),
    request_body = CreateFeudSessionRequest,
    responses(
        (status = 201, description = "Session started", body = FeudSessionView),
        (status = 400, description = "Invalid rounds or content source")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Valid(Json(payload)): Valid<Json<CreateFeudSessionRequest>>,
) -> Result<(StatusCode, Json<FeudSessionView>), AppError> {
    let view = session_service::create_feud(&state, user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/v1/feud/sessions/{id}",
    tag = "feud",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Survey board as the player sees it", body = FeudSessionView),
        (status = 404, description = "No such session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FeudSessionView>, AppError> {
    Ok(Json(session_service::feud_state(&state, user.id, id)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/feud/sessions/{id}/answer",
    tag = "feud",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Guess scored", body = FeudGuessResponse),
        (status = 400, description = "Blank answer"),
        (status = 409, description = "Game is over")
    )
)]
/// Guess one of the survey answers.
pub async fn answer(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<AnswerRequest>>,
) -> Result<Json<FeudGuessResponse>, AppError> {
    Ok(Json(
        session_service::feud_answer(&state, user.id, id, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/feud/sessions/{id}/skip",
    tag = "feud",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Round revealed and skipped", body = FeudSkipResponse),
        (status = 409, description = "Game is over")
    )
)]
/// Reveal the rest of the round and move on.
pub async fn skip(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FeudSkipResponse>, AppError> {
    Ok(Json(session_service::feud_skip(&state, user.id, id).await?))
}
