use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, GameSummaryEntity, GameType, ScoreEntity},
    dto::format_system_time,
};

/// Query string of `GET /api/v1/games`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GamesQuery {
    /// Restrict the listing to one game.
    pub game_type: Option<GameType>,
}

/// Saved game without its content.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GameSummaryResponse {
    pub id: Uuid,
    pub game_type: GameType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    pub created_at: String,
}

impl From<GameSummaryEntity> for GameSummaryResponse {
    fn from(game: GameSummaryEntity) -> Self {
        Self {
            id: game.id,
            game_type: game.game_type,
            title: game.title,
            description: game.description,
            is_public: game.is_public,
            created_by: game.created_by,
            created_at: format_system_time(game.created_at),
        }
    }
}

/// Saved game with its published content.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GameDetailResponse {
    #[serde(flatten)]
    pub summary: GameSummaryResponse,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

impl From<GameEntity> for GameDetailResponse {
    fn from(game: GameEntity) -> Self {
        let data = game.data.clone();
        Self {
            summary: GameSummaryEntity::from(game).into(),
            data,
        }
    }
}

/// One recorded score.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScoreResponse {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<Uuid>,
    pub game_type: GameType,
    pub score: i64,
    pub created_at: String,
}

impl From<ScoreEntity> for ScoreResponse {
    fn from(score: ScoreEntity) -> Self {
        Self {
            id: score.id,
            game_id: score.game_id,
            game_type: score.game_type,
            score: score.score,
            created_at: format_system_time(score.created_at),
        }
    }
}
