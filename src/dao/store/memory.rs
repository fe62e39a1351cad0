use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{GameEntity, GameSummaryEntity, GameType, ScoreEntity, UserEntity},
    storage::{StorageError, StorageResult},
    store::TrivaiStore,
};

/// Process-local store used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    users: DashMap<Uuid, UserEntity>,
    games: DashMap<Uuid, GameEntity>,
    scores: DashMap<Uuid, ScoreEntity>,
    /// Serializes user writes so uniqueness checks and inserts are atomic.
    user_writes: Mutex<()>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn find_user_by(&self, predicate: impl Fn(&UserEntity) -> bool) -> Option<UserEntity> {
        self.inner
            .users
            .iter()
            .find(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
    }

    fn check_unique(&self, user: &UserEntity) -> StorageResult<()> {
        for entry in self.inner.users.iter() {
            let other = entry.value();
            if other.id == user.id {
                continue;
            }
            if other.email == user.email {
                return Err(StorageError::conflict("Email already registered"));
            }
            if other.username == user.username {
                return Err(StorageError::conflict("Username already taken"));
            }
            if user.google_id.is_some() && other.google_id == user.google_id {
                return Err(StorageError::conflict("Google account already linked"));
            }
        }
        Ok(())
    }

    fn write_user(&self, user: UserEntity) -> StorageResult<()> {
        let _guard = self
            .inner
            .user_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.check_unique(&user)?;
        self.inner.users.insert(user.id, user);
        Ok(())
    }
}

impl TrivaiStore for MemoryStore {
    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.write_user(user) })
    }

    fn update_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.write_user(user) })
    }

    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_user_by(|user| user.email == email)) })
    }

    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_user_by(|user| user.username == username)) })
    }

    fn find_user_by_google_id(
        &self,
        google_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store.find_user_by(|user| user.google_id.as_deref() == Some(google_id.as_str())))
        })
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.games.get(&id).map(|entry| entry.clone())) })
    }

    fn list_public_games(
        &self,
        game_type: Option<GameType>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameSummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut games: Vec<GameSummaryEntity> = store
                .inner
                .games
                .iter()
                .filter(|entry| entry.is_public)
                .filter(|entry| game_type.is_none_or(|kind| entry.game_type == kind))
                .map(|entry| entry.value().clone().into())
                .collect();
            games.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(games)
        })
    }

    fn save_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.scores.insert(score.id, score);
            Ok(())
        })
    }

    fn list_scores(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut scores: Vec<ScoreEntity> = store
                .inner
                .scores
                .iter()
                .filter(|entry| entry.user_id == user_id)
                .map(|entry| entry.value().clone())
                .collect();
            scores.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(scores)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
