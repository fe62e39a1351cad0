use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::{sync::RwLock, time::sleep};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    config::{MongoConfig, PingRetry},
    error::{MongoDaoError, MongoResult},
    models::{MongoGameDocument, MongoScoreDocument, MongoUserDocument, doc_id},
};
use crate::dao::{
    models::{GameEntity, GameSummaryEntity, GameType, ScoreEntity, UserEntity},
    storage::StorageResult,
    store::TrivaiStore,
};

const USER_COLLECTION_NAME: &str = "users";
const GAME_COLLECTION_NAME: &str = "games";
const SCORE_COLLECTION_NAME: &str = "scores";
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Unique user indexes: (index name, key, field reported on duplicates, sparse).
const USER_UNIQUE_INDEXES: [(&str, &str, &str, bool); 3] = [
    ("users_email_idx", "email", "email", false),
    ("users_username_idx", "username", "username", false),
    ("users_google_id_idx", "google_id", "google_id", true),
];

#[derive(Clone)]
pub struct MongoStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Kept alive alongside the database handle it produced.
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoState {
    /// Build a client and wait until the server answers a ping.
    async fn open(config: &MongoConfig, retry: PingRetry) -> MongoResult<Self> {
        let client = Client::with_options(config.options.clone())
            .map_err(|source| MongoDaoError::ClientConstruction { source })?;
        let database = client.database(&config.database_name);

        let mut attempts = 0;
        let mut delay = retry.initial_delay;
        loop {
            match database.run_command(doc! { "ping": 1 }).await {
                Ok(_) => return Ok(Self { client, database }),
                Err(err) => {
                    attempts += 1;
                    if attempts >= retry.max_attempts {
                        return Err(MongoDaoError::InitialPing {
                            attempts,
                            source: err,
                        });
                    }
                    debug!(attempts, error = %err, "MongoDB not reachable yet; retrying");
                    sleep(delay).await;
                    delay = retry.next_delay(delay);
                }
            }
        }
    }
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let fresh = MongoState::open(&self.config, PingRetry::ONCE).await?;
        *self.state.write().await = fresh;
        info!("MongoDB connection re-established");
        Ok(())
    }
}

impl MongoStore {
    /// Connect with the startup ping policy, then create the unique user indexes.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let state = MongoState::open(&config, config.startup_retry).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(state),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let users = database.collection::<Document>(USER_COLLECTION_NAME);
        for (name, key, _, sparse) in USER_UNIQUE_INDEXES {
            let mut keys = Document::new();
            keys.insert(key, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(name.to_owned()))
                        .unique(Some(true))
                        .sparse(Some(sparse))
                        .build(),
                )
                .build();
            users
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: USER_COLLECTION_NAME,
                    index: key,
                    source,
                })?;
        }

        let games = database.collection::<Document>(GAME_COLLECTION_NAME);
        let index = IndexModel::builder()
            .keys(doc! { "is_public": 1, "game_type": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name(Some("games_listing_idx".to_owned()))
                    .build(),
            )
            .build();
        games
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GAME_COLLECTION_NAME,
                index: "is_public,game_type,created_at",
                source,
            })?;

        let scores = database.collection::<Document>(SCORE_COLLECTION_NAME);
        let index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name(Some("scores_user_idx".to_owned()))
                    .build(),
            )
            .build();
        scores
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SCORE_COLLECTION_NAME,
                index: "user_id,created_at",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn users(&self) -> Collection<MongoUserDocument> {
        self.database().await.collection(USER_COLLECTION_NAME)
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        self.database().await.collection(GAME_COLLECTION_NAME)
    }

    async fn scores(&self) -> Collection<MongoScoreDocument> {
        self.database().await.collection(SCORE_COLLECTION_NAME)
    }

    async fn create_user(&self, user: UserEntity) -> MongoResult<()> {
        let id = user.id;
        let document: MongoUserDocument = user.into();
        self.users()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| user_write_error(id, source))?;
        Ok(())
    }

    async fn update_user(&self, user: UserEntity) -> MongoResult<()> {
        let id = user.id;
        let document: MongoUserDocument = user.into();
        self.users()
            .await
            .replace_one(doc_id(id), &document)
            .await
            .map_err(|source| user_write_error(id, source))?;
        Ok(())
    }

    async fn find_user_where(
        &self,
        key: &'static str,
        filter: Document,
    ) -> MongoResult<Option<UserEntity>> {
        self.users()
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::LoadUser { key, source })?
            .map(UserEntity::try_from)
            .transpose()
    }

    async fn save_game(&self, game: GameEntity) -> MongoResult<()> {
        let id = game.id;
        let document: MongoGameDocument = game.into();
        self.games()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame { id, source })?;
        Ok(())
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        self.games()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?
            .map(GameEntity::try_from)
            .transpose()
    }

    async fn list_public_games(
        &self,
        game_type: Option<GameType>,
    ) -> MongoResult<Vec<GameSummaryEntity>> {
        let mut filter = doc! { "is_public": true };
        if let Some(kind) = game_type {
            filter.insert("game_type", kind.as_str());
        }

        let documents: Vec<MongoGameDocument> = self
            .games()
            .await
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        documents
            .into_iter()
            .map(|document| GameEntity::try_from(document).map(Into::into))
            .collect()
    }

    async fn save_score(&self, score: ScoreEntity) -> MongoResult<()> {
        let id = score.id;
        let document: MongoScoreDocument = score.into();
        self.scores()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveScore { id, source })?;
        Ok(())
    }

    async fn list_scores(&self, user_id: Uuid) -> MongoResult<Vec<ScoreEntity>> {
        let documents: Vec<MongoScoreDocument> = self
            .scores()
            .await
            .find(doc! { "user_id": user_id.to_string() })
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|source| MongoDaoError::ListScores { user_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListScores { user_id, source })?;

        documents.into_iter().map(ScoreEntity::try_from).collect()
    }
}

/// Map duplicate-key failures to the unique field that was violated.
fn user_write_error(id: Uuid, source: MongoError) -> MongoDaoError {
    if let ErrorKind::Write(WriteFailure::WriteError(write)) = source.kind.as_ref() {
        if write.code == DUPLICATE_KEY_CODE {
            let field = USER_UNIQUE_INDEXES
                .iter()
                .find(|(name, ..)| write.message.contains(name))
                .map(|(_, _, field, _)| *field)
                .unwrap_or("email");
            return MongoDaoError::DuplicateKey { field };
        }
    }
    MongoDaoError::SaveUser { id, source }
}

impl TrivaiStore for MongoStore {
    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_user(user).await.map_err(Into::into) })
    }

    fn update_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update_user(user).await.map_err(Into::into) })
    }

    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_user_where("email", doc! { "email": email })
                .await
                .map_err(Into::into)
        })
    }

    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_user_where("username", doc! { "username": username })
                .await
                .map_err(Into::into)
        })
    }

    fn find_user_by_google_id(
        &self,
        google_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_user_where("google_id", doc! { "google_id": google_id })
                .await
                .map_err(Into::into)
        })
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn list_public_games(
        &self,
        game_type: Option<GameType>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameSummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_public_games(game_type).await.map_err(Into::into) })
    }

    fn save_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_score(score).await.map_err(Into::into) })
    }

    fn list_scores(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_scores(user_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
