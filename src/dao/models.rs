use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Registered account, created either by password sign-up or Google sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Stable identifier for the user.
    pub id: Uuid,
    /// Lower-cased login address; unique.
    pub email: String,
    /// Public display handle; unique.
    pub username: String,
    /// Argon2 PHC string. Absent for Google-only accounts.
    pub hashed_password: Option<String>,
    /// Google `sub` claim once the account is linked.
    pub google_id: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

/// The three games of the suite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Jeopardy,
    Feud,
    Connections,
}

impl GameType {
    /// Wire name used in storage filters.
    pub fn as_str(self) -> &'static str {
        match self {
            GameType::Jeopardy => "jeopardy",
            GameType::Feud => "feud",
            GameType::Connections => "connections",
        }
    }
}

/// Saved game content, either generated or uploaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    pub game_type: GameType,
    /// Usually the theme the content was generated for.
    pub title: String,
    pub description: Option<String>,
    /// Game content in its published JSON form.
    pub data: serde_json::Value,
    pub is_public: bool,
    /// Author, when the game was saved by an authenticated caller.
    pub created_by: Option<Uuid>,
    pub created_at: SystemTime,
}

/// Listing view of a saved game without its content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSummaryEntity {
    pub id: Uuid,
    pub game_type: GameType,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_by: Option<Uuid>,
    pub created_at: SystemTime,
}

impl From<GameEntity> for GameSummaryEntity {
    fn from(entity: GameEntity) -> Self {
        Self {
            id: entity.id,
            game_type: entity.game_type,
            title: entity.title,
            description: entity.description,
            is_public: entity.is_public,
            created_by: entity.created_by,
            created_at: entity.created_at,
        }
    }
}

/// Final score of a finished play session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Saved game the session was started from, if any.
    pub game_id: Option<Uuid>,
    pub game_type: GameType,
    pub score: i64,
    pub created_at: SystemTime,
}
