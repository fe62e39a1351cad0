//! Server-side play sessions: creation from inline, saved or generated content, the per-game
//! actions, score recording and idle eviction.

use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{GameType, ScoreEntity},
    dto::{
        content::{ConnectionsData, FeudGameData, FeudRoundData, GroupData, JeopardyBoardData},
        generate::{DEFAULT_CONNECTIONS_GROUPS, DEFAULT_FEUD_QUESTIONS, DEFAULT_ITEMS_PER_GROUP},
        session::{
            AnswerRequest, ConnectionsSessionView, CreateConnectionsSessionRequest,
            CreateFeudSessionRequest, CreateJeopardySessionRequest, FeudGuessResponse,
            FeudSessionView, FeudSkipResponse, JeopardySessionView, JudgeRequest,
            SelectClueRequest, SelectionResponse, SettlementResponse, SubmissionResponse,
            ToggleResponse, ToggleTileRequest, WagerRequest, WagerResponse,
        },
    },
    error::ServiceError,
    services::game_service,
    state::{
        SharedState,
        connections::{ConnectionsGame, Puzzle},
        feud::{FeudGame, FeudRound},
        jeopardy::{Board, JeopardyGame},
        sessions::{SessionEntry, SessionGame},
    },
};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Access to one concrete game inside a [`SessionGame`].
trait SessionKind: Sized {
    const GAME_TYPE: GameType;

    fn get(game: &SessionGame) -> Option<&Self>;
    fn get_mut(game: &mut SessionGame) -> Option<&mut Self>;
}

impl SessionKind for JeopardyGame {
    const GAME_TYPE: GameType = GameType::Jeopardy;

    fn get(game: &SessionGame) -> Option<&Self> {
        match game {
            SessionGame::Jeopardy(game) => Some(game),
            _ => None,
        }
    }

    fn get_mut(game: &mut SessionGame) -> Option<&mut Self> {
        match game {
            SessionGame::Jeopardy(game) => Some(game),
            _ => None,
        }
    }
}

impl SessionKind for FeudGame {
    const GAME_TYPE: GameType = GameType::Feud;

    fn get(game: &SessionGame) -> Option<&Self> {
        match game {
            SessionGame::Feud(game) => Some(game),
            _ => None,
        }
    }

    fn get_mut(game: &mut SessionGame) -> Option<&mut Self> {
        match game {
            SessionGame::Feud(game) => Some(game),
            _ => None,
        }
    }
}

impl SessionKind for ConnectionsGame {
    const GAME_TYPE: GameType = GameType::Connections;

    fn get(game: &SessionGame) -> Option<&Self> {
        match game {
            SessionGame::Connections(game) => Some(game),
            _ => None,
        }
    }

    fn get_mut(game: &mut SessionGame) -> Option<&mut Self> {
        match game {
            SessionGame::Connections(game) => Some(game),
            _ => None,
        }
    }
}

fn wrong_kind(id: Uuid, expected: GameType) -> ServiceError {
    ServiceError::NotFound(format!(
        "session `{id}` is not a {} session",
        expected.as_str()
    ))
}

/// Score to persist once a session is over.
#[derive(Debug)]
struct FinalScore {
    game_type: GameType,
    game_id: Option<Uuid>,
    score: i64,
}

fn view<G, T>(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
    render: impl FnOnce(&SessionEntry, &G) -> T,
) -> Result<T, ServiceError>
where
    G: SessionKind,
{
    state.sessions().with_session(id, owner, |entry| {
        let entry: &SessionEntry = entry;
        let game = G::get(&entry.game).ok_or_else(|| wrong_kind(id, G::GAME_TYPE))?;
        Ok(render(entry, game))
    })
}

/// Run an action on a session and record the final score if it ended the game.
async fn play<G, T>(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
    action: impl FnOnce(&mut G) -> Result<T, ServiceError>,
) -> Result<T, ServiceError>
where
    G: SessionKind,
{
    let (value, final_score) = state.sessions().with_session(id, owner, |entry| {
        let game = G::get_mut(&mut entry.game).ok_or_else(|| wrong_kind(id, G::GAME_TYPE))?;
        let value = action(game)?;
        let final_score = entry.take_final_score().map(|score| FinalScore {
            game_type: G::GAME_TYPE,
            game_id: entry.game_id,
            score,
        });
        Ok((value, final_score))
    })?;

    if let Some(final_score) = final_score {
        record_score(state, owner, final_score).await;
    }
    Ok(value)
}

async fn record_score(state: &SharedState, owner: Uuid, final_score: FinalScore) {
    let store = match state.require_store().await {
        Ok(store) => store,
        Err(_) => {
            warn!(user_id = %owner, score = final_score.score, "storage degraded; score not recorded");
            return;
        }
    };

    let entity = ScoreEntity {
        id: Uuid::new_v4(),
        user_id: owner,
        game_id: final_score.game_id,
        game_type: final_score.game_type,
        score: final_score.score,
        created_at: SystemTime::now(),
    };
    match store.save_score(entity).await {
        Ok(()) => info!(
            user_id = %owner,
            game_type = final_score.game_type.as_str(),
            score = final_score.score,
            "recorded final score"
        ),
        Err(err) => warn!(error = %err, user_id = %owner, "failed to record final score"),
    }
}

fn exactly_one_source(sources: [bool; 3], names: &str) -> Result<(), ServiceError> {
    if sources.iter().filter(|present| **present).count() != 1 {
        return Err(ServiceError::InvalidInput(format!(
            "provide exactly one of {names}"
        )));
    }
    Ok(())
}

/// Saved content of `id`, checked to belong to `expected`.
async fn saved_content<T: DeserializeOwned>(
    state: &SharedState,
    id: Uuid,
    owner: Uuid,
    expected: GameType,
) -> Result<T, ServiceError> {
    let game = game_service::find_visible_game(state, id, Some(owner)).await?;
    if game.game_type != expected {
        return Err(ServiceError::InvalidInput(format!(
            "game `{id}` is not a {} game",
            expected.as_str()
        )));
    }
    serde_json::from_value(game.data).map_err(|err| {
        warn!(game_id = %id, error = %err, "saved game content is unreadable");
        ServiceError::InvalidInput(format!("game `{id}` has unreadable content"))
    })
}

fn start<G: SessionKind, T>(
    state: &SharedState,
    owner: Uuid,
    game_id: Option<Uuid>,
    game: SessionGame,
    render: impl FnOnce(&SessionEntry, &G) -> T,
) -> Result<T, ServiceError> {
    let id = state.sessions().insert(owner, game_id, game);
    info!(session_id = %id, user_id = %owner, game_type = G::GAME_TYPE.as_str(), "session started");
    view(state, owner, id, render)
}

pub async fn create_jeopardy(
    state: &SharedState,
    owner: Uuid,
    request: CreateJeopardySessionRequest,
) -> Result<JeopardySessionView, ServiceError> {
    exactly_one_source(
        [
            request.board.is_some(),
            request.game_id.is_some(),
            request.theme.is_some(),
        ],
        "`board`, `game_id` or `theme`",
    )?;

    let (mut board, game_id, reroll) = if let Some(data) = request.board {
        (Board::from(data), None, true)
    } else if let Some(id) = request.game_id {
        let data: JeopardyBoardData = saved_content(state, id, owner, GameType::Jeopardy).await?;
        (Board::from(data), Some(id), true)
    } else {
        let theme = request.theme.unwrap_or_default().trim().to_owned();
        let board = state.generator().jeopardy(theme.clone()).await?;
        let data = JeopardyBoardData::from(&board);
        let saved =
            game_service::save_generated(state, GameType::Jeopardy, &theme, &data, Some(owner))
                .await;
        (board, saved, false)
    };

    if let (true, Some(count)) = (reroll, request.daily_doubles) {
        board.assign_daily_doubles(count, &mut rand::rng());
    }

    let game = JeopardyGame::new(board)?;
    start(
        state,
        owner,
        game_id,
        SessionGame::Jeopardy(game),
        JeopardySessionView::new,
    )
}

pub fn jeopardy_state(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
) -> Result<JeopardySessionView, ServiceError> {
    view(state, owner, id, JeopardySessionView::new)
}

pub async fn select_clue(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
    request: SelectClueRequest,
) -> Result<SelectionResponse, ServiceError> {
    play(state, owner, id, |game: &mut JeopardyGame| {
        Ok(game.select(request.category, request.clue)?.into())
    })
    .await
}

pub async fn place_wager(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
    request: WagerRequest,
) -> Result<WagerResponse, ServiceError> {
    play(state, owner, id, |game: &mut JeopardyGame| {
        let wager = game.wager(request.amount)?;
        let clue = game
            .current()
            .and_then(|open| game.board().column(open.category)?.get(open.clue))
            .ok_or_else(|| ServiceError::Internal("wager placed without an open clue".into()))?;
        Ok(WagerResponse {
            wager,
            question: clue.question.clone(),
            image: clue.image.clone(),
        })
    })
    .await
}

pub async fn answer_clue(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
    request: AnswerRequest,
) -> Result<SettlementResponse, ServiceError> {
    play(state, owner, id, |game: &mut JeopardyGame| {
        Ok(game.answer(&request.answer)?.into())
    })
    .await
}

pub async fn judge_clue(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
    request: JudgeRequest,
) -> Result<SettlementResponse, ServiceError> {
    play(state, owner, id, |game: &mut JeopardyGame| {
        Ok(game.judge(request.correct)?.into())
    })
    .await
}

pub async fn pass_clue(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
) -> Result<SettlementResponse, ServiceError> {
    play(state, owner, id, |game: &mut JeopardyGame| {
        Ok(game.pass()?.into())
    })
    .await
}

pub async fn create_feud(
    state: &SharedState,
    owner: Uuid,
    request: CreateFeudSessionRequest,
) -> Result<FeudSessionView, ServiceError> {
    exactly_one_source(
        [
            request.rounds.is_some(),
            request.game_id.is_some(),
            request.theme.is_some(),
        ],
        "`rounds`, `game_id` or `theme`",
    )?;

    let (rounds, game_id): (Vec<FeudRound>, _) = if let Some(rounds) = request.rounds {
        (rounds.into_iter().map(FeudRound::from).collect(), None)
    } else if let Some(id) = request.game_id {
        let data: FeudGameData = saved_content(state, id, owner, GameType::Feud).await?;
        (
            data.questions.into_iter().map(FeudRound::from).collect(),
            Some(id),
        )
    } else {
        let theme = request.theme.unwrap_or_default().trim().to_owned();
        let count = request.num_questions.unwrap_or(DEFAULT_FEUD_QUESTIONS);
        let rounds = state.generator().feud(theme.clone(), count).await?;
        let data = FeudGameData {
            theme: theme.clone(),
            questions: rounds.iter().map(FeudRoundData::from).collect(),
        };
        let saved =
            game_service::save_generated(state, GameType::Feud, &theme, &data, Some(owner)).await;
        (rounds, saved)
    };

    let game = FeudGame::new(rounds)?;
    start(
        state,
        owner,
        game_id,
        SessionGame::Feud(game),
        FeudSessionView::new,
    )
}

pub fn feud_state(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
) -> Result<FeudSessionView, ServiceError> {
    view(state, owner, id, FeudSessionView::new)
}

pub async fn feud_answer(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
    request: AnswerRequest,
) -> Result<FeudGuessResponse, ServiceError> {
    play(state, owner, id, |game: &mut FeudGame| {
        Ok(game.answer(&request.answer)?.into())
    })
    .await
}

pub async fn feud_skip(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
) -> Result<FeudSkipResponse, ServiceError> {
    play(state, owner, id, |game: &mut FeudGame| {
        let (answers, finished) = game.skip()?;
        Ok(FeudSkipResponse {
            answers,
            score: game.score(),
            finished,
        })
    })
    .await
}

pub async fn create_connections(
    state: &SharedState,
    owner: Uuid,
    request: CreateConnectionsSessionRequest,
) -> Result<ConnectionsSessionView, ServiceError> {
    exactly_one_source(
        [
            request.puzzles.is_some(),
            request.game_id.is_some(),
            request.theme.is_some(),
        ],
        "`puzzles`, `game_id` or `theme`",
    )?;

    let (puzzles, game_id): (Vec<Puzzle>, _) = if let Some(puzzles) = request.puzzles {
        (puzzles.into_iter().map(Puzzle::from).collect(), None)
    } else if let Some(id) = request.game_id {
        let data: ConnectionsData =
            saved_content(state, id, owner, GameType::Connections).await?;
        (vec![data.into()], Some(id))
    } else {
        let theme = request.theme.unwrap_or_default().trim().to_owned();
        let puzzle = state
            .generator()
            .connections(
                theme.clone(),
                request.num_groups.unwrap_or(DEFAULT_CONNECTIONS_GROUPS),
                request.items_per_group.unwrap_or(DEFAULT_ITEMS_PER_GROUP),
            )
            .await?;
        let data = ConnectionsData::from(&puzzle);
        let saved =
            game_service::save_generated(state, GameType::Connections, &theme, &data, Some(owner))
                .await;
        (vec![puzzle], saved)
    };

    let game = ConnectionsGame::new(puzzles)?;
    start(
        state,
        owner,
        game_id,
        SessionGame::Connections(game),
        ConnectionsSessionView::new,
    )
}

pub fn connections_state(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
) -> Result<ConnectionsSessionView, ServiceError> {
    view(state, owner, id, ConnectionsSessionView::new)
}

pub async fn toggle_tile(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
    request: ToggleTileRequest,
) -> Result<ToggleResponse, ServiceError> {
    play(state, owner, id, |game: &mut ConnectionsGame| {
        let selected = game.toggle(request.tile)?;
        Ok(ToggleResponse {
            tile: request.tile,
            selected,
            selection: game.selected().iter().copied().collect(),
        })
    })
    .await
}

pub async fn deselect_tiles(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
) -> Result<ConnectionsSessionView, ServiceError> {
    play(state, owner, id, |game: &mut ConnectionsGame| {
        Ok(game.deselect_all()?)
    })
    .await?;
    connections_state(state, owner, id)
}

pub async fn shuffle_tiles(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
) -> Result<ConnectionsSessionView, ServiceError> {
    play(state, owner, id, |game: &mut ConnectionsGame| Ok(game.shuffle()?)).await?;
    connections_state(state, owner, id)
}

pub async fn submit_selection(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
) -> Result<SubmissionResponse, ServiceError> {
    play(state, owner, id, |game: &mut ConnectionsGame| {
        let groups: Vec<GroupData> = game.puzzle().groups.iter().map(GroupData::from).collect();
        let submission = game.submit()?;
        Ok(SubmissionResponse::new(submission, &groups))
    })
    .await
}

/// Drop a session without recording anything.
pub fn abandon(state: &SharedState, owner: Uuid, id: Uuid) -> Result<(), ServiceError> {
    if !state.sessions().remove(id, owner) {
        return Err(ServiceError::NotFound(format!("session `{id}` not found")));
    }
    debug!(session_id = %id, user_id = %owner, "session abandoned");
    Ok(())
}

/// Periodically evict sessions idle for longer than the configured window.
pub fn spawn_sweeper(state: SharedState) -> JoinHandle<()> {
    let max_idle = state.config().session_idle;
    tokio::spawn(async move {
        let mut ticker = interval(SWEEP_INTERVAL.min(max_idle.max(Duration::from_secs(1))));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = state.sessions().sweep_idle(max_idle);
            if evicted > 0 {
                info!(evicted, remaining = state.sessions().len(), "evicted idle sessions");
            }
        }
    })
}
