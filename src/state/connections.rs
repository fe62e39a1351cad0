use std::collections::BTreeSet;

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use thiserror::Error;

use super::phase::{InvalidTransition, PhaseEvent, PhaseMachine, SessionPhase};

/// Wrong submissions allowed before the game ends.
pub const MAX_MISTAKES: u8 = 4;
/// Points for every solved group.
pub const POINTS_PER_GROUP: i64 = 100;

/// How hard a group is meant to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    /// Straightforward link.
    #[default]
    Common,
    /// Needs a second look.
    Tricky,
    /// Built to mislead.
    Confusing,
    /// Niche knowledge.
    Obscure,
}

impl Difficulty {
    /// Case-insensitive parse; anything unknown is [`Difficulty::Common`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tricky" => Difficulty::Tricky,
            "confusing" => Difficulty::Confusing,
            "obscure" => Difficulty::Obscure,
            _ => Difficulty::Common,
        }
    }

    /// Lower-case name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Common => "common",
            Difficulty::Tricky => "tricky",
            Difficulty::Confusing => "confusing",
            Difficulty::Obscure => "obscure",
        }
    }
}

/// Items sharing a hidden connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Hidden connection, revealed once solved.
    pub category: String,
    /// Members of the group.
    pub items: Vec<String>,
    /// Intended difficulty.
    pub difficulty: Difficulty,
}

/// One grid worth of groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    /// Every group has the same number of items.
    pub groups: Vec<Group>,
}

/// A playable item on the grid. `id` is stable for the whole puzzle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Stable identifier within the puzzle.
    pub id: usize,
    /// Text shown on the tile.
    pub item: String,
    /// Index of the owning group.
    pub group: usize,
}

/// Why a Connections action was refused.
#[derive(Debug, Error)]
pub enum ConnectionsError {
    /// No tile has that id.
    #[error("unknown tile {0}")]
    UnknownTile(usize),
    /// The puzzles cannot make a game.
    #[error("invalid puzzle: {0}")]
    InvalidPuzzle(String),
    /// The tile was already solved.
    #[error("tile {0} belongs to a solved group")]
    TileSolved(usize),
    /// As many tiles as a group holds are already selected.
    #[error("selection is full ({limit} tiles)")]
    SelectionFull { limit: usize },
    /// A submission needs a full group.
    #[error("select exactly {required} tiles before submitting ({selected} selected)")]
    IncompleteSelection { selected: usize, required: usize },
    /// The game is over.
    #[error(transparent)]
    Phase(#[from] InvalidTransition),
}

/// Result of submitting a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// The selection formed a group.
    pub correct: bool,
    /// Index of the solved group in the current puzzle.
    pub group: Option<usize>,
    /// All but one selected tile shared a group.
    pub one_away: bool,
    /// Wrong submissions so far.
    pub mistakes: u8,
    /// Running score.
    pub score: i64,
    /// The last group of a puzzle was solved and the next one started.
    pub puzzle_advanced: bool,
    /// The game ended with this submission.
    pub finished: bool,
}

/// Group-matching game over one or more puzzles.
#[derive(Debug, Clone)]
pub struct ConnectionsGame {
    puzzles: Vec<Puzzle>,
    current: usize,
    tiles: Vec<Tile>,
    selected: BTreeSet<usize>,
    solved: Vec<usize>,
    mistakes: u8,
    score: i64,
    phase: PhaseMachine,
    rng: StdRng,
}

impl ConnectionsGame {
    /// Validate `puzzles` and deal the first one.
    pub fn new(puzzles: Vec<Puzzle>) -> Result<Self, ConnectionsError> {
        Self::with_rng(puzzles, StdRng::from_rng(&mut rand::rng()))
    }

    /// Like [`ConnectionsGame::new`] with a caller-provided shuffle source.
    pub fn with_rng(puzzles: Vec<Puzzle>, rng: StdRng) -> Result<Self, ConnectionsError> {
        if puzzles.is_empty() {
            return Err(ConnectionsError::InvalidPuzzle(
                "at least one puzzle is required".into(),
            ));
        }
        for (index, puzzle) in puzzles.iter().enumerate() {
            let Some(first) = puzzle.groups.first() else {
                return Err(ConnectionsError::InvalidPuzzle(format!(
                    "puzzle {index} has no groups"
                )));
            };
            let size = first.items.len();
            if size == 0 || puzzle.groups.iter().any(|group| group.items.len() != size) {
                return Err(ConnectionsError::InvalidPuzzle(format!(
                    "groups of puzzle {index} must all have the same non-zero size"
                )));
            }
        }

        let mut game = Self {
            puzzles,
            current: 0,
            tiles: Vec::new(),
            selected: BTreeSet::new(),
            solved: Vec::new(),
            mistakes: 0,
            score: 0,
            phase: PhaseMachine::new(),
            rng,
        };
        game.deal();
        Ok(game)
    }

    /// Current phase of the session.
    pub fn phase(&self) -> SessionPhase {
        self.phase.phase()
    }

    /// Points won so far.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// Wrong submissions across every puzzle.
    pub fn mistakes(&self) -> u8 {
        self.mistakes
    }

    /// Zero-based index of the puzzle being played.
    pub fn puzzle_index(&self) -> usize {
        self.current
    }

    /// Number of puzzles in the game.
    pub fn puzzle_count(&self) -> usize {
        self.puzzles.len()
    }

    /// Puzzle being played.
    pub fn puzzle(&self) -> &Puzzle {
        &self.puzzles[self.current]
    }

    /// Unsolved tiles in display order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Ids of the selected tiles.
    pub fn selected(&self) -> &BTreeSet<usize> {
        &self.selected
    }

    /// Solved group indexes in solve order.
    pub fn solved(&self) -> &[usize] {
        &self.solved
    }

    /// Number of tiles a submission needs.
    pub fn group_size(&self) -> usize {
        self.puzzle().groups.first().map_or(0, |group| group.items.len())
    }

    /// Select or deselect a tile. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, tile: usize) -> Result<bool, ConnectionsError> {
        self.phase.ensure(PhaseEvent::Resolve { finished: false })?;

        let group = self
            .group_of(tile)
            .ok_or(ConnectionsError::UnknownTile(tile))?;
        if self.solved.contains(&group) {
            return Err(ConnectionsError::TileSolved(tile));
        }

        if self.selected.remove(&tile) {
            return Ok(false);
        }
        let limit = self.group_size();
        if self.selected.len() >= limit {
            return Err(ConnectionsError::SelectionFull { limit });
        }
        self.selected.insert(tile);
        Ok(true)
    }

    /// Clear the selection.
    pub fn deselect_all(&mut self) -> Result<(), ConnectionsError> {
        self.phase.ensure(PhaseEvent::Resolve { finished: false })?;
        self.selected.clear();
        Ok(())
    }

    /// Reorder the remaining tiles.
    pub fn shuffle(&mut self) -> Result<(), ConnectionsError> {
        self.phase.ensure(PhaseEvent::Resolve { finished: false })?;
        self.tiles.shuffle(&mut self.rng);
        Ok(())
    }

    /// Check the current selection against the hidden groups.
    pub fn submit(&mut self) -> Result<Submission, ConnectionsError> {
        self.phase.ensure(PhaseEvent::Resolve { finished: false })?;
        let required = self.group_size();
        if self.selected.len() != required {
            return Err(ConnectionsError::IncompleteSelection {
                selected: self.selected.len(),
                required,
            });
        }

        let groups: Vec<usize> = self
            .selected
            .iter()
            .filter_map(|tile| self.group_of(*tile))
            .collect();
        let first = groups.first().copied();
        let correct = first.is_some_and(|g| groups.iter().all(|other| *other == g));
        let largest_share = groups
            .iter()
            .map(|g| groups.iter().filter(|other| *other == g).count())
            .max()
            .unwrap_or(0);

        let selected = std::mem::take(&mut self.selected);

        if let (true, Some(group)) = (correct, first) {
            let puzzle_done = self.solved.len() + 1 == self.puzzle().groups.len();
            let finished = puzzle_done && self.current + 1 >= self.puzzles.len();
            self.phase.apply(PhaseEvent::Resolve { finished })?;

            self.solved.push(group);
            self.tiles.retain(|tile| !selected.contains(&tile.id));
            self.score += POINTS_PER_GROUP;

            let puzzle_advanced = puzzle_done && !finished;
            if puzzle_advanced {
                self.current += 1;
                self.solved.clear();
                self.deal();
            }

            return Ok(Submission {
                correct: true,
                group: Some(group),
                one_away: false,
                mistakes: self.mistakes,
                score: self.score,
                puzzle_advanced,
                finished,
            });
        }

        let mistakes = self.mistakes + 1;
        let finished = mistakes >= MAX_MISTAKES;
        self.phase.apply(PhaseEvent::Resolve { finished })?;
        self.mistakes = mistakes;

        Ok(Submission {
            correct: false,
            group: None,
            one_away: required > 1 && largest_share + 1 == required,
            mistakes,
            score: self.score,
            puzzle_advanced: false,
            finished,
        })
    }

    fn group_of(&self, tile: usize) -> Option<usize> {
        let size = self.group_size();
        let groups = self.puzzle().groups.len();
        (size > 0 && tile < size * groups).then(|| tile / size)
    }

    fn deal(&mut self) {
        let puzzle = &self.puzzles[self.current];
        let size = puzzle.groups.first().map_or(0, |group| group.items.len());
        let mut tiles: Vec<Tile> = puzzle
            .groups
            .iter()
            .enumerate()
            .flat_map(|(group, g)| {
                g.items.iter().enumerate().map(move |(offset, item)| Tile {
                    id: group * size + offset,
                    item: item.clone(),
                    group,
                })
            })
            .collect();
        tiles.shuffle(&mut self.rng);
        self.tiles = tiles;
        self.selected.clear();
    }
}
