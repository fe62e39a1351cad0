use std::time::SystemTime;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, GameType},
    dto::{
        content::{ConnectionsData, FeudRoundData, JeopardyBoardData},
        games::{GameDetailResponse, GameSummaryResponse, GamesQuery, ScoreResponse},
        generate::{
            ConnectionsGenerateRequest, ConnectionsGenerateResponse, FeudGenerateRequest,
            FeudGenerateResponse, JeopardyGenerateRequest, JeopardyGenerateResponse,
        },
    },
    error::ServiceError,
    state::SharedState,
};

/// Generate a board for `request.theme` and keep a public copy.
pub async fn generate_jeopardy(
    state: &SharedState,
    request: JeopardyGenerateRequest,
    caller: Option<Uuid>,
) -> Result<JeopardyGenerateResponse, ServiceError> {
    let theme = request.theme.trim().to_owned();
    let board = state.generator().jeopardy(theme.clone()).await?;
    let board = JeopardyBoardData::from(&board);

    let game_id = save_generated(state, GameType::Jeopardy, &theme, &board, caller).await;
    Ok(JeopardyGenerateResponse { board, game_id })
}

/// Generate a survey for `request.theme` and keep a public copy.
pub async fn generate_feud(
    state: &SharedState,
    request: FeudGenerateRequest,
    caller: Option<Uuid>,
) -> Result<FeudGenerateResponse, ServiceError> {
    let theme = request.theme.trim().to_owned();
    let rounds = state
        .generator()
        .feud(theme.clone(), request.num_questions)
        .await?;

    let mut response = FeudGenerateResponse {
        theme: theme.clone(),
        questions: rounds.iter().map(FeudRoundData::from).collect(),
        game_id: None,
    };
    response.game_id = save_generated(state, GameType::Feud, &theme, &response, caller).await;
    Ok(response)
}

/// Generate a grouping puzzle for `request.theme` and keep a public copy.
pub async fn generate_connections(
    state: &SharedState,
    request: ConnectionsGenerateRequest,
    caller: Option<Uuid>,
) -> Result<ConnectionsGenerateResponse, ServiceError> {
    let theme = request.theme.trim().to_owned();
    let puzzle = state
        .generator()
        .connections(theme.clone(), request.num_groups, request.items_per_group)
        .await?;
    let data = ConnectionsData::from(&puzzle);

    let game_id = save_generated(state, GameType::Connections, &theme, &data, caller).await;
    Ok(ConnectionsGenerateResponse::success(data, game_id))
}

/// Persist generated content as a public game. Failures are logged and swallowed.
pub(crate) async fn save_generated<T: Serialize>(
    state: &SharedState,
    game_type: GameType,
    title: &str,
    content: &T,
    created_by: Option<Uuid>,
) -> Option<Uuid> {
    let store = match state.require_store().await {
        Ok(store) => store,
        Err(_) => {
            debug!(game_type = game_type.as_str(), "not saving generated game in degraded mode");
            return None;
        }
    };

    let data = match serde_json::to_value(content) {
        Ok(data) => data,
        Err(err) => {
            warn!(error = %err, "failed to serialize generated game");
            return None;
        }
    };

    let game = GameEntity {
        id: Uuid::new_v4(),
        game_type,
        title: title.to_owned(),
        description: None,
        data,
        is_public: true,
        created_by,
        created_at: SystemTime::now(),
    };
    let id = game.id;

    match store.save_game(game).await {
        Ok(()) => {
            info!(game_id = %id, game_type = game_type.as_str(), title, "saved generated game");
            Some(id)
        }
        Err(err) => {
            warn!(error = %err, game_type = game_type.as_str(), "failed to save generated game");
            None
        }
    }
}

/// Public saved games, newest first.
pub async fn list_games(
    state: &SharedState,
    query: GamesQuery,
) -> Result<Vec<GameSummaryResponse>, ServiceError> {
    let store = state.require_store().await?;
    let games = store.list_public_games(query.game_type).await?;
    Ok(games.into_iter().map(GameSummaryResponse::from).collect())
}

/// Load a saved game visible to `caller`. Private games are hidden from everybody but their author.
pub async fn find_visible_game(
    state: &SharedState,
    id: Uuid,
    caller: Option<Uuid>,
) -> Result<GameEntity, ServiceError> {
    let store = state.require_store().await?;
    store
        .find_game(id)
        .await?
        .filter(|game| game.is_public || (game.created_by.is_some() && game.created_by == caller))
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))
}

pub async fn get_game(
    state: &SharedState,
    id: Uuid,
    caller: Option<Uuid>,
) -> Result<GameDetailResponse, ServiceError> {
    Ok(find_visible_game(state, id, caller).await?.into())
}

/// Scores of `user_id`, newest first.
pub async fn list_scores(
    state: &SharedState,
    user_id: Uuid,
) -> Result<Vec<ScoreResponse>, ServiceError> {
    let store = state.require_store().await?;
    let scores = store.list_scores(user_id).await?;
    Ok(scores.into_iter().map(ScoreResponse::from).collect())
}
