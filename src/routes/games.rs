use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::games::{GameDetailResponse, GameSummaryResponse, GamesQuery, ScoreResponse},
    error::AppError,
    routes::auth::{AuthUser, MaybeUser},
    services::game_service,
    state::SharedState,
};

/// Saved games and recorded scores.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", get(list_games))
        .route("/games/{id}", get(get_game))
        .route("/scores/me", get(my_scores))
}

#[utoipa::path(
    get,
    path = "/api/v1/games",
    tag = "games",
    params(GamesQuery),
    responses(
        (status = 200, description = "Public saved games, newest first", body = [GameSummaryResponse]),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn list_games(
    State(state): State<SharedState>,
    Query(query): Query<GamesQuery>,
) -> Result<Json<Vec<GameSummaryResponse>>, AppError> {
    Ok(Json(game_service::list_games(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/games/{id}",
    tag = "games",
    params(("id" = Uuid, Path, description = "Saved game identifier")),
    responses(
        (status = 200, description = "Saved game with its content", body = GameDetailResponse),
        (status = 404, description = "No such game, or a private game of another user"),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Fetch a saved game. Private games are only returned to their author.
pub async fn get_game(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<GameDetailResponse>, AppError> {
    let caller = user.map(|user| user.id);
    Ok(Json(game_service::get_game(&state, id, caller).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/scores/me",
    tag = "games",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Scores of the caller, newest first", body = [ScoreResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn my_scores(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ScoreResponse>>, AppError> {
    Ok(Json(game_service::list_scores(&state, user.id).await?))
}
