use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dto::{
    content::{ConnectionsData, FeudRoundData, JeopardyBoardData},
    validation::validate_not_blank,
};

pub const DEFAULT_FEUD_QUESTIONS: usize = 4;
pub const DEFAULT_CONNECTIONS_GROUPS: usize = 4;
pub const DEFAULT_ITEMS_PER_GROUP: usize = 4;

fn one() -> usize {
    1
}

fn default_feud_questions() -> usize {
    DEFAULT_FEUD_QUESTIONS
}

fn default_groups() -> usize {
    DEFAULT_CONNECTIONS_GROUPS
}

fn default_items() -> usize {
    DEFAULT_ITEMS_PER_GROUP
}

/// Request body for `POST /api/v1/jeopardy/generate`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JeopardyGenerateRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 200))]
    pub theme: String,
    /// Accepted for compatibility; one board is generated per request.
    #[serde(default = "one")]
    #[validate(range(min = 1, max = 5))]
    pub num_boards: usize,
}

/// Generated board, with the id it was saved under.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JeopardyGenerateResponse {
    #[serde(flatten)]
    pub board: JeopardyBoardData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<Uuid>,
}

/// Request body for `POST /api/v1/feud/generate`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct FeudGenerateRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 200))]
    pub theme: String,
    #[serde(default = "default_feud_questions")]
    #[validate(range(min = 1, max = 10))]
    pub num_questions: usize,
}

/// Generated survey.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeudGenerateResponse {
    pub theme: String,
    pub questions: Vec<FeudRoundData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<Uuid>,
}

/// Request body for `POST /api/v1/connections/generate`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ConnectionsGenerateRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 200))]
    pub theme: String,
    #[serde(default = "default_groups")]
    #[validate(range(min = 1, max = 6))]
    pub num_groups: usize,
    #[serde(default = "default_items")]
    #[validate(range(min = 3, max = 5))]
    pub items_per_group: usize,
}

/// Generated puzzle wrapped in the `{status, data}` envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectionsGenerateResponse {
    /// Always `success`.
    pub status: String,
    pub data: ConnectionsData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<Uuid>,
}

impl ConnectionsGenerateResponse {
    pub fn success(data: ConnectionsData, game_id: Option<Uuid>) -> Self {
        Self {
            status: "success".into(),
            data,
            game_id,
        }
    }
}
