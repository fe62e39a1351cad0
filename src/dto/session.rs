//! Requests and player-facing views of live sessions.
//!
//! Views only carry what the player is allowed to see: a Jeopardy answer appears once its clue
//! is settled, Feud answers once revealed, Connections groupings once solved.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        content::{ConnectionsData, FeudRoundData, GroupData, JeopardyBoardData},
        validation::validate_not_blank,
    },
    state::{
        connections::{ConnectionsGame, MAX_MISTAKES, Submission},
        feud::{FeudGame, FeudGuess, MAX_STRIKES},
        jeopardy::{JeopardyGame, Selection, Settlement},
        phase::SessionPhase,
        sessions::SessionEntry,
    },
};

/// Phase as exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PhaseView {
    Board,
    Wagering,
    Answering,
    GameOver,
}

impl From<SessionPhase> for PhaseView {
    fn from(phase: SessionPhase) -> Self {
        match phase {
            SessionPhase::Board => PhaseView::Board,
            SessionPhase::Wagering => PhaseView::Wagering,
            SessionPhase::Answering => PhaseView::Answering,
            SessionPhase::GameOver => PhaseView::GameOver,
        }
    }
}

/// Start a Jeopardy session from exactly one of `board`, `game_id` or `theme`.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct CreateJeopardySessionRequest {
    #[validate(nested)]
    pub board: Option<JeopardyBoardData>,
    pub game_id: Option<Uuid>,
    #[validate(custom(function = "validate_not_blank"), length(max = 200))]
    pub theme: Option<String>,
    /// Re-roll this many daily doubles on an inline or saved board.
    #[validate(range(max = 30))]
    pub daily_doubles: Option<usize>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SelectClueRequest {
    /// Column index.
    pub category: usize,
    /// Row index within the column, lowest value first.
    pub clue: usize,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct WagerRequest {
    /// Clamped to the accepted range.
    pub amount: i64,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AnswerRequest {
    #[validate(length(max = 500))]
    pub answer: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JudgeRequest {
    pub correct: bool,
}

/// A clue cell as the player sees it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClueView {
    pub value: u32,
    pub is_answered: bool,
    /// Known once the clue has been opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_double: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryView {
    pub name: String,
    pub clues: Vec<ClueView>,
}

/// The clue currently open.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OpenClueView {
    pub category: usize,
    pub clue: usize,
    pub value: u32,
    pub daily_double: bool,
    /// Hidden until the daily-double wager is placed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wager: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JeopardySessionView {
    pub session_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<Uuid>,
    pub phase: PhaseView,
    pub score: i64,
    pub answered: usize,
    pub total: usize,
    pub max_wager: i64,
    pub categories: Vec<CategoryView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<OpenClueView>,
}

impl JeopardySessionView {
    pub fn new(entry: &SessionEntry, game: &JeopardyGame) -> Self {
        let board = game.board();
        let current = game.current();

        let categories = board
            .categories
            .iter()
            .enumerate()
            .map(|(column, name)| {
                let clues = board
                    .column(column)
                    .unwrap_or_default()
                    .iter()
                    .enumerate()
                    .map(|(row, clue)| {
                        let answered = game.is_answered(column, row);
                        let open = current.is_some_and(|open| open.category == column && open.clue == row);
                        ClueView {
                            value: clue.value,
                            is_answered: answered,
                            daily_double: (answered || open).then_some(clue.daily_double),
                            question: answered.then(|| clue.question.clone()),
                            answer: answered.then(|| clue.answer.clone()),
                        }
                    })
                    .collect();
                CategoryView {
                    name: name.clone(),
                    clues,
                }
            })
            .collect();

        let current = current.and_then(|open| {
            let clue = board.column(open.category)?.get(open.clue)?;
            let visible = game.phase() == SessionPhase::Answering;
            Some(OpenClueView {
                category: open.category,
                clue: open.clue,
                value: clue.value,
                daily_double: clue.daily_double,
                question: visible.then(|| clue.question.clone()),
                image: visible.then(|| clue.image.clone()).flatten(),
                wager: open.wager,
            })
        });

        Self {
            session_id: entry.id,
            game_id: entry.game_id,
            phase: game.phase().into(),
            score: game.score(),
            answered: game.answered_count(),
            total: game.total_clues(),
            max_wager: game.max_wager(),
            categories,
            current,
        }
    }
}

/// Result of opening a clue.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SelectionResponse {
    pub value: u32,
    pub daily_double: bool,
    /// Withheld for a daily double until the wager is placed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wager: Option<i64>,
}

impl From<Selection> for SelectionResponse {
    fn from(selection: Selection) -> Self {
        let visible = !selection.daily_double;
        Self {
            value: selection.value,
            daily_double: selection.daily_double,
            question: visible.then_some(selection.question),
            image: if visible { selection.image } else { None },
            max_wager: selection.max_wager,
        }
    }
}

/// Accepted wager and the clue it unlocked.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WagerResponse {
    pub wager: i64,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Outcome of answering, judging or passing a clue.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettlementResponse {
    pub correct: bool,
    pub expected_answer: String,
    pub delta: i64,
    pub score: i64,
    pub finished: bool,
}

impl From<Settlement> for SettlementResponse {
    fn from(settlement: Settlement) -> Self {
        Self {
            correct: settlement.correct,
            expected_answer: settlement.expected_answer,
            delta: settlement.delta,
            score: settlement.score,
            finished: settlement.finished,
        }
    }
}

/// Start a Feud session from exactly one of `rounds`, `game_id` or `theme`.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct CreateFeudSessionRequest {
    #[validate(length(min = 1, max = 20), nested)]
    pub rounds: Option<Vec<FeudRoundData>>,
    pub game_id: Option<Uuid>,
    #[validate(custom(function = "validate_not_blank"), length(max = 200))]
    pub theme: Option<String>,
    #[validate(range(min = 1, max = 10))]
    pub num_questions: Option<usize>,
}

/// An answer slot on the survey board.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnswerSlotView {
    pub rank: usize,
    pub revealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeudRoundView {
    pub id: u32,
    pub question: String,
    pub answers: Vec<AnswerSlotView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeudSessionView {
    pub session_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<Uuid>,
    pub phase: PhaseView,
    pub score: i64,
    pub strikes: u8,
    pub max_strikes: u8,
    /// Zero-based index of the current round.
    pub round: usize,
    pub round_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<FeudRoundView>,
}

impl FeudSessionView {
    pub fn new(entry: &SessionEntry, game: &FeudGame) -> Self {
        let current = game.current_round().map(|round| FeudRoundView {
            id: round.id,
            question: round.question.clone(),
            answers: round
                .answers
                .iter()
                .enumerate()
                .map(|(rank, answer)| {
                    let revealed = game.is_revealed(rank);
                    AnswerSlotView {
                        rank: rank + 1,
                        revealed,
                        answer: revealed.then(|| answer.clone()),
                        points: revealed.then(|| round.points_for(rank)),
                    }
                })
                .collect(),
        });

        Self {
            session_id: entry.id,
            game_id: entry.game_id,
            phase: game.phase().into(),
            score: game.score(),
            strikes: game.strikes(),
            max_strikes: MAX_STRIKES,
            round: game.round_index(),
            round_count: game.round_count(),
            current,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeudGuessResponse {
    pub matched: bool,
    /// One-based rank of the uncovered answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub points: u32,
    pub strikes: u8,
    pub score: i64,
    pub round_complete: bool,
    pub finished: bool,
}

impl From<FeudGuess> for FeudGuessResponse {
    fn from(guess: FeudGuess) -> Self {
        Self {
            matched: guess.matched.is_some(),
            rank: guess.matched.map(|index| index + 1),
            answer: guess.answer,
            points: guess.points,
            strikes: guess.strikes,
            score: guess.score,
            round_complete: guess.round_complete,
            finished: guess.finished,
        }
    }
}

/// Answers of the skipped round.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeudSkipResponse {
    pub answers: Vec<String>,
    pub score: i64,
    pub finished: bool,
}

/// Start a Connections session from exactly one of `puzzles`, `game_id` or `theme`.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct CreateConnectionsSessionRequest {
    #[validate(length(min = 1, max = 10), nested)]
    pub puzzles: Option<Vec<ConnectionsData>>,
    pub game_id: Option<Uuid>,
    #[validate(custom(function = "validate_not_blank"), length(max = 200))]
    pub theme: Option<String>,
    #[validate(range(min = 1, max = 6))]
    pub num_groups: Option<usize>,
    #[validate(range(min = 3, max = 5))]
    pub items_per_group: Option<usize>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ToggleTileRequest {
    pub tile: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TileView {
    pub id: usize,
    pub item: String,
    pub selected: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectionsSessionView {
    pub session_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<Uuid>,
    pub phase: PhaseView,
    pub score: i64,
    pub mistakes: u8,
    pub max_mistakes: u8,
    /// Zero-based index of the current puzzle.
    pub puzzle: usize,
    pub puzzle_count: usize,
    pub group_size: usize,
    /// Unsolved tiles in display order.
    pub tiles: Vec<TileView>,
    /// Groups solved in the current puzzle, in solve order.
    pub solved: Vec<GroupData>,
}

impl ConnectionsSessionView {
    pub fn new(entry: &SessionEntry, game: &ConnectionsGame) -> Self {
        let selected = game.selected();
        let groups = &game.puzzle().groups;

        Self {
            session_id: entry.id,
            game_id: entry.game_id,
            phase: game.phase().into(),
            score: game.score(),
            mistakes: game.mistakes(),
            max_mistakes: MAX_MISTAKES,
            puzzle: game.puzzle_index(),
            puzzle_count: game.puzzle_count(),
            group_size: game.group_size(),
            tiles: game
                .tiles()
                .iter()
                .map(|tile| TileView {
                    id: tile.id,
                    item: tile.item.clone(),
                    selected: selected.contains(&tile.id),
                })
                .collect(),
            solved: game
                .solved()
                .iter()
                .filter_map(|index| groups.get(*index))
                .map(GroupData::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ToggleResponse {
    pub tile: usize,
    pub selected: bool,
    /// Every selected tile id after the toggle.
    pub selection: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResponse {
    pub correct: bool,
    /// The group just solved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupData>,
    /// Wrong, but all but one tile shared a group.
    pub one_away: bool,
    pub mistakes: u8,
    pub score: i64,
    pub puzzle_advanced: bool,
    pub finished: bool,
}

impl SubmissionResponse {
    /// `groups` are the groups of the puzzle the submission was made against.
    pub fn new(submission: Submission, groups: &[GroupData]) -> Self {
        Self {
            correct: submission.correct,
            group: submission
                .group
                .and_then(|index| groups.get(index))
                .cloned(),
            one_away: submission.one_away,
            mistakes: submission.mistakes,
            score: submission.score,
            puzzle_advanced: submission.puzzle_advanced,
            finished: submission.finished,
        }
    }
}
