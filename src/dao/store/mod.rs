pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{GameEntity, GameSummaryEntity, GameType, ScoreEntity, UserEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use memory::MemoryStore;

/// Abstraction over the persistence layer for accounts, saved games and scores.
///
/// Uniqueness violations on users surface as [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict).
pub trait TrivaiStore: Send + Sync {
    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn update_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn find_user_by_google_id(
        &self,
        google_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Public games, newest first, optionally restricted to one game type.
    fn list_public_games(
        &self,
        game_type: Option<GameType>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameSummaryEntity>>>;
    fn save_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Scores of one user, newest first.
    fn list_scores(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
