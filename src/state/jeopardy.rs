use std::collections::HashSet;

use indexmap::IndexMap;
use rand::{Rng, seq::index::sample};
use thiserror::Error;

use super::{
    answer,
    phase::{InvalidTransition, PhaseEvent, PhaseMachine, SessionPhase},
};

/// Smallest stake accepted for a daily double.
pub const MIN_WAGER: i64 = 5;
/// Stake ceiling while the score is below it.
pub const BASE_MAX_WAGER: i64 = 1000;

/// A single board square.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clue {
    /// Clue text read to the player.
    pub question: String,
    /// Expected response.
    pub answer: String,
    /// Points won or lost.
    pub value: u32,
    /// Requires a wager before the clue is shown.
    pub daily_double: bool,
    /// Optional picture URL shown with the clue.
    pub image: Option<String>,
}

/// Category columns and their clues.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    /// Column order as displayed.
    pub categories: Vec<String>,
    /// Clues keyed by category name.
    pub questions: IndexMap<String, Vec<Clue>>,
}

impl Board {
    /// Total number of clues across every category column.
    pub fn clue_count(&self) -> usize {
        self.categories
            .iter()
            .filter_map(|category| self.questions.get(category))
            .map(Vec::len)
            .sum()
    }

    /// Clues of the category at `index`.
    pub fn column(&self, index: usize) -> Option<&[Clue]> {
        let category = self.categories.get(index)?;
        self.questions.get(category).map(Vec::as_slice)
    }

    /// Clear every daily-double flag and mark `count` distinct random clues instead.
    pub fn assign_daily_doubles<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) {
        let total = self.clue_count();
        let picked: HashSet<usize> = sample(rng, total, count.min(total)).into_iter().collect();

        let mut position = 0;
        for category in &self.categories {
            if let Some(clues) = self.questions.get_mut(category) {
                for clue in clues.iter_mut() {
                    clue.daily_double = picked.contains(&position);
                    position += 1;
                }
            }
        }
    }
}

/// Errors raised by the board state machine.
#[derive(Debug, Error)]
pub enum JeopardyError {
    /// No clue at that position.
    #[error("no clue at category {category}, position {clue}")]
    UnknownClue { category: usize, clue: usize },
    /// The answer was blank.
    #[error("answer must not be blank")]
    EmptyAnswer,
    /// The board cannot make a game.
    #[error("invalid board: {0}")]
    InvalidBoard(String),
    /// The clue was already played.
    #[error("clue at category {category}, position {clue} was already played")]
    AlreadyAnswered { category: usize, clue: usize },
    /// Nothing to settle.
    #[error("no clue is open")]
    NoOpenClue,
    /// The action does not fit the current phase.
    #[error(transparent)]
    Phase(#[from] InvalidTransition),
}

/// The clue currently being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenClue {
    /// Column of the open clue.
    pub category: usize,
    /// Position of the open clue in its column.
    pub clue: usize,
    /// Effective stake once a daily-double wager was placed.
    pub wager: Option<i64>,
}

/// What the player learns when opening a clue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Clue text; views hide it until a daily-double wager is placed.
    pub question: String,
    /// Face value of the clue.
    pub value: u32,
    /// A wager is required before answering.
    pub daily_double: bool,
    /// Optional picture URL shown with the clue.
    pub image: Option<String>,
    /// Highest wager currently accepted, for daily doubles.
    pub max_wager: Option<i64>,
}

/// Outcome of settling a clue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// Whether the clue was won.
    pub correct: bool,
    /// Expected response, revealed after settling.
    pub expected_answer: String,
    /// Score change from this clue.
    pub delta: i64,
    /// Score after settling.
    pub score: i64,
    /// Every clue has been played.
    pub finished: bool,
}

/// Single-player board: clue selection, wagering, answering and scoring.
#[derive(Debug, Clone)]
pub struct JeopardyGame {
    board: Board,
    score: i64,
    answered: HashSet<(usize, usize)>,
    total: usize,
    phase: PhaseMachine,
    current: Option<OpenClue>,
}

impl JeopardyGame {
    /// Validate `board` and start a game on it. Clues are ordered by value.
    pub fn new(mut board: Board) -> Result<Self, JeopardyError> {
        if board.categories.is_empty() {
            return Err(JeopardyError::InvalidBoard(
                "board needs at least one category".into(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(repeated) = board
            .categories
            .iter()
            .find(|category| !seen.insert(category.as_str()))
        {
            return Err(JeopardyError::InvalidBoard(format!(
                "category `{repeated}` appears more than once"
            )));
        }
        for category in &board.categories {
            let clues = board
                .questions
                .get_mut(category)
                .filter(|clues| !clues.is_empty())
                .ok_or_else(|| {
                    JeopardyError::InvalidBoard(format!("category `{category}` has no clues"))
                })?;
            if clues.iter().any(|clue| clue.value == 0) {
                return Err(JeopardyError::InvalidBoard(format!(
                    "category `{category}` has a clue without value"
                )));
            }
            clues.sort_by_key(|clue| clue.value);
        }

        let total = board.clue_count();
        Ok(Self {
            board,
            score: 0,
            answered: HashSet::new(),
            total,
            phase: PhaseMachine::new(),
            current: None,
        })
    }

    /// Board being played, clues ordered by value.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Points won so far; may be negative.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// Current phase of the session.
    pub fn phase(&self) -> SessionPhase {
        self.phase.phase()
    }

    /// Clue currently open, if any.
    pub fn current(&self) -> Option<OpenClue> {
        self.current
    }

    /// Whether the clue at this position was played.
    pub fn is_answered(&self, category: usize, clue: usize) -> bool {
        self.answered.contains(&(category, clue))
    }

    /// Clues played so far.
    pub fn answered_count(&self) -> usize {
        self.answered.len()
    }

    /// Clues on the board.
    pub fn total_clues(&self) -> usize {
        self.total
    }

    /// Highest stake accepted given the current score.
    pub fn max_wager(&self) -> i64 {
        self.score.max(BASE_MAX_WAGER)
    }

    /// Open a clue from the board.
    pub fn select(&mut self, category: usize, clue: usize) -> Result<Selection, JeopardyError> {
        self.phase.ensure(PhaseEvent::Select {
            daily_double: false,
        })?;

        let picked = self
            .board
            .column(category)
            .and_then(|clues| clues.get(clue))
            .ok_or(JeopardyError::UnknownClue { category, clue })?
            .clone();
        if self.is_answered(category, clue) {
            return Err(JeopardyError::AlreadyAnswered { category, clue });
        }

        self.phase.apply(PhaseEvent::Select {
            daily_double: picked.daily_double,
        })?;
        self.current = Some(OpenClue {
            category,
            clue,
            wager: None,
        });

        Ok(Selection {
            question: picked.question,
            value: picked.value,
            daily_double: picked.daily_double,
            image: picked.image,
            max_wager: picked.daily_double.then(|| self.max_wager()),
        })
    }

    /// Place the daily-double stake, clamped to the accepted range.
    pub fn wager(&mut self, amount: i64) -> Result<i64, JeopardyError> {
        let max = self.max_wager();
        self.phase.apply(PhaseEvent::Wager)?;
        let wager = amount.clamp(MIN_WAGER, max);
        if let Some(open) = self.current.as_mut() {
            open.wager = Some(wager);
        }
        Ok(wager)
    }

    /// Answer the open clue with free text.
    pub fn answer(&mut self, given: &str) -> Result<Settlement, JeopardyError> {
        let (_, clue) = self.open_clue()?;
        if given.trim().is_empty() {
            return Err(JeopardyError::EmptyAnswer);
        }
        let correct = answer::matches(&clue.answer, given);
        self.settle(Some(correct))
    }

    /// Settle the open clue with a host decision instead of text matching.
    pub fn judge(&mut self, correct: bool) -> Result<Settlement, JeopardyError> {
        self.open_clue()?;
        self.settle(Some(correct))
    }

    /// Close the open clue without changing the score.
    pub fn pass(&mut self) -> Result<Settlement, JeopardyError> {
        self.open_clue()?;
        self.settle(None)
    }

    fn open_clue(&self) -> Result<(OpenClue, Clue), JeopardyError> {
        let open = self.current.ok_or(JeopardyError::NoOpenClue)?;
        self.phase.ensure(PhaseEvent::Resolve { finished: false })?;
        let clue = self
            .board
            .column(open.category)
            .and_then(|clues| clues.get(open.clue))
            .cloned()
            .ok_or(JeopardyError::UnknownClue {
                category: open.category,
                clue: open.clue,
            })?;
        Ok((open, clue))
    }

    fn settle(&mut self, correct: Option<bool>) -> Result<Settlement, JeopardyError> {
        let (open, clue) = self.open_clue()?;
        let stake = open.wager.unwrap_or(i64::from(clue.value));
        let delta = match correct {
            Some(true) => stake,
            Some(false) => -stake,
            None => 0,
        };

        let finished = self.answered.len() + 1 >= self.total;
        self.phase.apply(PhaseEvent::Resolve { finished })?;
        self.score += delta;
        self.answered.insert((open.category, open.clue));
        self.current = None;

        Ok(Settlement {
            correct: correct.unwrap_or(false),
            expected_answer: clue.answer,
            delta,
            score: self.score,
            finished,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn clue(value: u32, answer: &str) -> Clue {
        Clue {
            question: format!("Question worth {value}?"),
            answer: answer.into(),
            value,
            daily_double: false,
            image: None,
        }
    }

    fn board() -> Board {
        let mut questions = IndexMap::new();
        questions.insert(
            "CAPITALS".to_owned(),
            vec![clue(400, "What is Rome?"), clue(200, "What is Paris?")],
        );
        questions.insert("RIVERS".to_owned(), vec![clue(200, "What is the Nile?")]);
        Board {
            categories: vec!["CAPITALS".into(), "RIVERS".into()],
            questions,
        }
    }

    #[test]
    fn new_sorts_clues_by_value() {
        let game = JeopardyGame::new(board()).unwrap();
        let values: Vec<u32> = game
            .board()
            .column(0)
            .unwrap()
            .iter()
            .map(|c| c.value)
            .collect();
        assert_eq!(values, vec![200, 400]);
        assert_eq!(game.total_clues(), 3);
    }

    #[test]
    fn new_rejects_category_without_clues() {
        let mut bad = board();
        bad.categories.push("EMPTY".into());
        assert!(matches!(
            JeopardyGame::new(bad),
            Err(JeopardyError::InvalidBoard(_))
        ));
        assert!(matches!(
            JeopardyGame::new(Board::default()),
            Err(JeopardyError::InvalidBoard(_))
        ));
    }

    #[test]
    fn new_rejects_repeated_category() {
        let mut repeated = board();
        repeated.categories.push("RIVERS".into());
        let err = JeopardyGame::new(repeated).unwrap_err();
        assert!(err.to_string().contains("RIVERS"));
    }

    #[test]
    fn correct_answer_adds_clue_value() {
        let mut game = JeopardyGame::new(board()).unwrap();
        let selection = game.select(0, 0).unwrap();
        assert_eq!(selection.value, 200);
        assert_eq!(game.phase(), SessionPhase::Answering);

        let settlement = game.answer("paris").unwrap();
        assert!(settlement.correct);
        assert_eq!(settlement.delta, 200);
        assert_eq!(game.score(), 200);
        assert!(game.is_answered(0, 0));
        assert_eq!(game.phase(), SessionPhase::Board);
    }

    #[test]
    fn wrong_answer_subtracts_and_reports_expected() {
        let mut game = JeopardyGame::new(board()).unwrap();
        game.select(1, 0).unwrap();
        let settlement = game.answer("the amazon").unwrap();
        assert!(!settlement.correct);
        assert_eq!(settlement.delta, -200);
        assert_eq!(settlement.expected_answer, "What is the Nile?");
        assert_eq!(game.score(), -200);
    }

    #[test]
    fn select_errors() {
        let mut game = JeopardyGame::new(board()).unwrap();
        assert!(matches!(
            game.select(5, 0),
            Err(JeopardyError::UnknownClue { .. })
        ));
        assert!(matches!(
            game.select(0, 9),
            Err(JeopardyError::UnknownClue { .. })
        ));

        game.select(0, 0).unwrap();
        assert!(matches!(game.select(0, 1), Err(JeopardyError::Phase(_))));
        game.pass().unwrap();
        assert!(matches!(
            game.select(0, 0),
            Err(JeopardyError::AlreadyAnswered { .. })
        ));
    }

    #[test]
    fn blank_answer_is_rejected_and_clue_stays_open() {
        let mut game = JeopardyGame::new(board()).unwrap();
        game.select(0, 0).unwrap();
        assert!(matches!(game.answer("   "), Err(JeopardyError::EmptyAnswer)));
        assert_eq!(game.phase(), SessionPhase::Answering);
        assert!(game.current().is_some());
    }

    #[test]
    fn daily_double_wager_is_clamped_and_scored() {
        let mut b = board();
        b.questions.get_mut("CAPITALS").unwrap()[0].daily_double = true;
        let mut game = JeopardyGame::new(b).unwrap();

        // After sorting, the 400 clue (flagged) sits at position 1.
        let selection = game.select(0, 1).unwrap();
        assert!(selection.daily_double);
        assert_eq!(selection.max_wager, Some(1000));
        assert!(matches!(game.answer("rome"), Err(JeopardyError::Phase(_))));

        assert_eq!(game.wager(5_000).unwrap(), 1000);
        let settlement = game.answer("Rome").unwrap();
        assert_eq!(settlement.delta, 1000);
        assert_eq!(game.score(), 1000);
    }

    #[test]
    fn tiny_wager_is_raised_to_minimum() {
        let mut b = board();
        b.questions.get_mut("RIVERS").unwrap()[0].daily_double = true;
        let mut game = JeopardyGame::new(b).unwrap();
        game.select(1, 0).unwrap();
        assert_eq!(game.wager(-50).unwrap(), MIN_WAGER);
        let settlement = game.judge(false).unwrap();
        assert_eq!(settlement.delta, -MIN_WAGER);
    }

    #[test]
    fn game_ends_when_every_clue_is_played() {
        let mut game = JeopardyGame::new(board()).unwrap();
        for (category, clue) in [(0, 0), (0, 1)] {
            game.select(category, clue).unwrap();
            assert!(!game.pass().unwrap().finished);
        }
        game.select(1, 0).unwrap();
        let last = game.judge(true).unwrap();
        assert!(last.finished);
        assert_eq!(game.phase(), SessionPhase::GameOver);
        assert!(matches!(game.select(0, 0), Err(JeopardyError::Phase(_))));
    }

    #[test]
    fn answering_without_open_clue_fails() {
        let mut game = JeopardyGame::new(board()).unwrap();
        assert!(matches!(game.answer("x"), Err(JeopardyError::NoOpenClue)));
        assert!(matches!(game.pass(), Err(JeopardyError::NoOpenClue)));
    }

    #[test]
    fn assign_daily_doubles_marks_distinct_clues() {
        let mut b = board();
        b.questions.get_mut("RIVERS").unwrap()[0].daily_double = true;
        let mut rng = StdRng::seed_from_u64(7);

        b.assign_daily_doubles(2, &mut rng);
        let flagged = b
            .questions
            .values()
            .flatten()
            .filter(|clue| clue.daily_double)
            .count();
        assert_eq!(flagged, 2);

        b.assign_daily_doubles(10, &mut rng);
        assert!(b.questions.values().flatten().all(|clue| clue.daily_double));

        b.assign_daily_doubles(0, &mut rng);
        assert!(b.questions.values().flatten().all(|clue| !clue.daily_double));
    }
}
