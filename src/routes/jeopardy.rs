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
        generate::{JeopardyGenerateRequest, JeopardyGenerateResponse},
        session::{
            AnswerRequest, CreateJeopardySessionRequest, JeopardySessionView, JudgeRequest,
            SelectClueRequest, SelectionResponse, SettlementResponse, WagerRequest, WagerResponse,
        },
    },
    error::AppError,
    routes::auth::{AuthUser, MaybeUser},
    services::{game_service, session_service},
    state::SharedState,
};

/// Board generation and server-side Jeopardy sessions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/jeopardy/generate", post(generate))
        .route("/jeopardy/sessions", post(create_session))
        .route("/jeopardy/sessions/{id}", get(get_session))
        .route("/jeopardy/sessions/{id}/select", post(select))
        .route("/jeopardy/sessions/{id}/wager", post(wager))
        .route("/jeopardy/sessions/{id}/answer", post(answer))
        .route("/jeopardy/sessions/{id}/judge", post(judge))
        .route("/jeopardy/sessions/{id}/pass", post(pass))
}

#[utoipa::path(
    post,
    path = "/api/v1/jeopardy/generate",
    tag = "jeopardy",
    request_body = JeopardyGenerateRequest,
    responses((status = 200, description = "Generated board", body = JeopardyGenerateResponse))
)]
/// Generate a themed board of five categories.
pub async fn generate(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Valid(Json(payload)): Valid<Json<JeopardyGenerateRequest>>,
) -> Result<Json<JeopardyGenerateResponse>, AppError> {
    let caller = user.map(|user| user.id);
    Ok(Json(
        game_service::generate_jeopardy(&state, payload, caller).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/jeopardy/sessions",
    tag = "jeopardy",
    security(("bearer" = [])),
    request_body = CreateJeopardySessionRequest,
    responses(
        (status = 201, description = "Session started", body = JeopardySessionView),
        (status = 400, description = "Invalid board or content source")
    )
)]
/// Start a session from an inline board, a saved game or a theme.
pub async fn create_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Valid(Json(payload)): Valid<Json<CreateJeopardySessionRequest>>,
) -> Result<(StatusCode, Json<JeopardySessionView>), AppError> {
    let view = session_service::create_jeopardy(&state, user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/v1/jeopardy/sessions/{id}",
    tag = "jeopardy",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Board as the player sees it", body = JeopardySessionView),
        (status = 404, description = "No such session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JeopardySessionView>, AppError> {
    Ok(Json(session_service::jeopardy_state(&state, user.id, id)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/jeopardy/sessions/{id}/select",
    tag = "jeopardy",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = SelectClueRequest,
    responses(
        (status = 200, description = "Clue opened", body = SelectionResponse),
        (status = 404, description = "No such session or clue"),
        (status = 409, description = "Clue already answered or another clue is open")
    )
)]
/// Open a clue from the board.
pub async fn select(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SelectClueRequest>>,
) -> Result<Json<SelectionResponse>, AppError> {
    Ok(Json(
        session_service::select_clue(&state, user.id, id, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/jeopardy/sessions/{id}/wager",
    tag = "jeopardy",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = WagerRequest,
    responses(
        (status = 200, description = "Wager accepted", body = WagerResponse),
        (status = 409, description = "No daily double is waiting for a wager")
    )
)]
/// Place the stake for an open daily double.
pub async fn wager(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<WagerRequest>>,
) -> Result<Json<WagerResponse>, AppError> {
    Ok(Json(
        session_service::place_wager(&state, user.id, id, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/jeopardy/sessions/{id}/answer",
    tag = "jeopardy",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer settled", body = SettlementResponse),
        (status = 400, description = "Blank answer"),
        (status = 409, description = "No clue is open")
    )
)]
/// Answer the open clue.
pub async fn answer(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<AnswerRequest>>,
) -> Result<Json<SettlementResponse>, AppError> {
    Ok(Json(
        session_service::answer_clue(&state, user.id, id, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/jeopardy/sessions/{id}/judge",
    tag = "jeopardy",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = JudgeRequest,
    responses(
        (status = 200, description = "Clue settled by the host", body = SettlementResponse),
        (status = 409, description = "No clue is open")
    )
)]
/// Settle the open clue with a host decision.
pub async fn judge(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<JudgeRequest>>,
) -> Result<Json<SettlementResponse>, AppError> {
    Ok(Json(
        session_service::judge_clue(&state, user.id, id, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/jeopardy/sessions/{id}/pass",
    tag = "jeopardy",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Clue closed without scoring", body = SettlementResponse),
        (status = 409, description = "No clue is open")
    )
)]
pub async fn pass(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SettlementResponse>, AppError> {
    Ok(Json(session_service::pass_clue(&state, user.id, id).await?))
}
