use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{GameEntity, GameType, ScoreEntity, UserEntity};

// Ids are stored as their hyphenated string form.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: String,
    email: String,
    username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hashed_password: Option<String>,
    /// Omitted when unset so the sparse unique index ignores the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    google_id: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    is_active: bool,
    is_verified: bool,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id.to_string(),
            email: value.email,
            username: value.username,
            hashed_password: value.hashed_password,
            google_id: value.google_id,
            full_name: value.full_name,
            avatar_url: value.avatar_url,
            is_active: value.is_active,
            is_verified: value.is_verified,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoUserDocument> for UserEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoUserDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(&value.id)?,
            email: value.email,
            username: value.username,
            hashed_password: value.hashed_password,
            google_id: value.google_id,
            full_name: value.full_name,
            avatar_url: value.avatar_url,
            is_active: value.is_active,
            is_verified: value.is_verified,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: String,
    game_type: GameType,
    title: String,
    #[serde(default)]
    description: Option<String>,
    data: serde_json::Value,
    is_public: bool,
    #[serde(default)]
    created_by: Option<String>,
    created_at: DateTime,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_type: value.game_type,
            title: value.title,
            description: value.description,
            data: value.data,
            is_public: value.is_public,
            created_by: value.created_by.map(|id| id.to_string()),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoGameDocument> for GameEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoGameDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(&value.id)?,
            game_type: value.game_type,
            title: value.title,
            description: value.description,
            data: value.data,
            is_public: value.is_public,
            created_by: value.created_by.as_deref().map(parse_id).transpose()?,
            created_at: value.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScoreDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    #[serde(default)]
    game_id: Option<String>,
    game_type: GameType,
    score: i64,
    created_at: DateTime,
}

impl From<ScoreEntity> for MongoScoreDocument {
    fn from(value: ScoreEntity) -> Self {
        Self {
            id: value.id.to_string(),
            user_id: value.user_id.to_string(),
            game_id: value.game_id.map(|id| id.to_string()),
            game_type: value.game_type,
            score: value.score,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoScoreDocument> for ScoreEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoScoreDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(&value.id)?,
            user_id: parse_id(&value.user_id)?,
            game_id: value.game_id.as_deref().map(parse_id).transpose()?,
            game_type: value.game_type,
            score: value.score,
            created_at: value.created_at.to_system_time(),
        })
    }
}

fn parse_id(raw: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(raw).map_err(|source| MongoDaoError::MalformedId {
        id: raw.to_owned(),
        source,
    })
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}
