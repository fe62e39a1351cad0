/// Lenient answer normalization and matching.
pub mod answer;
/// Group-matching puzzle.
pub mod connections;
/// Survey-answer game.
pub mod feud;
/// Board and clue state machine.
pub mod jeopardy;
/// Phase machine shared by every game.
pub mod phase;
/// Live play sessions.
pub mod sessions;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::store::TrivaiStore,
    error::ServiceError,
    services::{generator::QuestionGenerator, google::GoogleClient},
};

use self::sessions::SessionRegistry;

pub type SharedState = Arc<AppState>;

/// Central application state: configuration, integrations, storage handle and live sessions.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn TrivaiStore>>>,
    degraded: watch::Sender<bool>,
    sessions: SessionRegistry,
    generator: Arc<dyn QuestionGenerator>,
    google: Arc<dyn GoogleClient>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        config: AppConfig,
        generator: Arc<dyn QuestionGenerator>,
        google: Arc<dyn GoogleClient>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            store: RwLock::new(None),
            degraded: degraded_tx,
            sessions: SessionRegistry::new(),
            generator,
            google,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn generator(&self) -> &Arc<dyn QuestionGenerator> {
        &self.generator
    }

    pub fn google(&self) -> &Arc<dyn GoogleClient> {
        &self.google
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn TrivaiStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Store handle for an operation that cannot run in degraded mode.
    pub async fn require_store(&self) -> Result<Arc<dyn TrivaiStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn TrivaiStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}
