use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::{
    dao::models::GameType,
    error::ServiceError,
    state::{
        connections::ConnectionsGame, feud::FeudGame, jeopardy::JeopardyGame,
        phase::SessionPhase,
    },
};

/// The game a session is playing.
#[derive(Debug)]
pub enum SessionGame {
    /// Board game with clues and wagers.
    Jeopardy(JeopardyGame),
    /// Survey rounds with strikes.
    Feud(FeudGame),
    /// Group-matching grid.
    Connections(ConnectionsGame),
}

impl SessionGame {
    /// Stored game type matching this session.
    pub fn game_type(&self) -> GameType {
        match self {
            SessionGame::Jeopardy(_) => GameType::Jeopardy,
            SessionGame::Feud(_) => GameType::Feud,
            SessionGame::Connections(_) => GameType::Connections,
        }
    }

    /// Current phase of the underlying game.
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionGame::Jeopardy(game) => game.phase(),
            SessionGame::Feud(game) => game.phase(),
            SessionGame::Connections(game) => game.phase(),
        }
    }

    /// Current score of the underlying game.
    pub fn score(&self) -> i64 {
        match self {
            SessionGame::Jeopardy(game) => game.score(),
            SessionGame::Feud(game) => game.score(),
            SessionGame::Connections(game) => game.score(),
        }
    }
}

/// A live play session owned by one user.
#[derive(Debug)]
pub struct SessionEntry {
    /// Session identifier handed to the client.
    pub id: Uuid,
    /// User allowed to play the session.
    pub owner: Uuid,
    /// Saved game the session was started from.
    pub game_id: Option<Uuid>,
    /// Game state.
    pub game: SessionGame,
    last_active: Instant,
    score_recorded: bool,
}

impl SessionEntry {
    /// Final score to persist, returned once after the game is over.
    pub fn take_final_score(&mut self) -> Option<i64> {
        if self.score_recorded || self.game.phase() != SessionPhase::GameOver {
            return None;
        }
        self.score_recorded = true;
        Some(self.game.score())
    }
}

/// In-memory registry of live sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and return its id.
    pub fn insert(&self, owner: Uuid, game_id: Option<Uuid>, game: SessionGame) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            SessionEntry {
                id,
                owner,
                game_id,
                game,
                last_active: Instant::now(),
                score_recorded: false,
            },
        );
        id
    }

    /// Run `f` on a session of `owner`. Missing and foreign sessions look the same.
    pub fn with_session<T>(
        &self,
        id: Uuid,
        owner: Uuid,
        f: impl FnOnce(&mut SessionEntry) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut entry = self
            .sessions
            .get_mut(&id)
            .filter(|entry| entry.owner == owner)
            .ok_or_else(|| ServiceError::NotFound(format!("session `{id}` not found")))?;
        entry.last_active = Instant::now();
        f(entry.value_mut())
    }

    /// Drop a session of `owner`; returns whether one was removed.
    pub fn remove(&self, id: Uuid, owner: Uuid) -> bool {
        self.sessions
            .remove_if(&id, |_, entry| entry.owner == owner)
            .is_some()
    }

    /// Evict sessions untouched for longer than `max_idle`; returns how many were dropped.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| entry.last_active.elapsed() <= max_idle);
        before.saturating_sub(self.sessions.len())
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
