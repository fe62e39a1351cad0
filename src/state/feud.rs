use std::collections::BTreeSet;

use thiserror::Error;

use super::{
    answer::normalize,
    phase::{InvalidTransition, PhaseEvent, PhaseMachine, SessionPhase},
};

/// Wrong guesses allowed before the game ends.
pub const MAX_STRIKES: u8 = 3;

/// One survey question with its ranked answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeudRound {
    /// Position of the round in its survey, starting at 1.
    pub id: u32,
    /// Survey prompt shown to the player.
    pub question: String,
    /// Answers ordered from most to least popular.
    pub answers: Vec<String>,
    /// Points per answer, parallel to `answers`; may be shorter.
    pub points: Vec<u32>,
}

impl FeudRound {
    /// Points for the answer ranked at `index`.
    pub fn points_for(&self, index: usize) -> u32 {
        self.points.get(index).copied().unwrap_or_else(|| {
            let rank = u32::try_from(index).unwrap_or(u32::MAX);
            100u32.saturating_sub(rank.saturating_mul(10))
        })
    }
}

/// Why a Feud action was refused.
#[derive(Debug, Error)]
pub enum FeudError {
    /// The guess was blank.
    #[error("answer must not be blank")]
    EmptyAnswer,
    /// The rounds cannot make a game.
    #[error("invalid rounds: {0}")]
    InvalidRounds(String),
    /// The game is over.
    #[error(transparent)]
    Phase(#[from] InvalidTransition),
}

/// Result of one guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeudGuess {
    /// Rank of the revealed answer, when the guess matched.
    pub matched: Option<usize>,
    /// Text of the revealed answer.
    pub answer: Option<String>,
    /// Points won by this guess.
    pub points: u32,
    /// Strikes in the current round after this guess.
    pub strikes: u8,
    /// Running score.
    pub score: i64,
    /// Every answer of the round has been uncovered.
    pub round_complete: bool,
    /// The game ended with this guess.
    pub finished: bool,
}

/// Survey game: guess the most popular answers, three strikes end it.
#[derive(Debug, Clone)]
pub struct FeudGame {
    rounds: Vec<FeudRound>,
    current: usize,
    revealed: BTreeSet<usize>,
    strikes: u8,
    score: i64,
    phase: PhaseMachine,
}

impl FeudGame {
    /// Start a game; every round needs at least one answer.
    pub fn new(rounds: Vec<FeudRound>) -> Result<Self, FeudError> {
        if rounds.is_empty() {
            return Err(FeudError::InvalidRounds(
                "at least one round is required".into(),
            ));
        }
        if let Some(round) = rounds.iter().find(|round| round.answers.is_empty()) {
            return Err(FeudError::InvalidRounds(format!(
                "round `{}` has no answers",
                round.question
            )));
        }

        Ok(Self {
            rounds,
            current: 0,
            revealed: BTreeSet::new(),
            strikes: 0,
            score: 0,
            phase: PhaseMachine::new(),
        })
    }

    /// Current phase of the session.
    pub fn phase(&self) -> SessionPhase {
        self.phase.phase()
    }

    /// Points won so far.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// Wrong guesses in the current round.
    pub fn strikes(&self) -> u8 {
        self.strikes
    }

    /// Zero-based index of the current round.
    pub fn round_index(&self) -> usize {
        self.current
    }

    /// Number of rounds in the game.
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Round being played; `None` once the game is over past the last round.
    pub fn current_round(&self) -> Option<&FeudRound> {
        if self.phase.is_over() {
            return None;
        }
        self.rounds.get(self.current)
    }

    /// Whether the answer ranked at `index` has been uncovered this round.
    pub fn is_revealed(&self, index: usize) -> bool {
        self.revealed.contains(&index)
    }

    /// Guess an answer of the current round.
    pub fn answer(&mut self, given: &str) -> Result<FeudGuess, FeudError> {
        self.phase.ensure(PhaseEvent::Resolve { finished: false })?;
        let guess = normalize(given);
        if given.trim().is_empty() {
            return Err(FeudError::EmptyAnswer);
        }

        let round = &self.rounds[self.current];
        let hit = round
            .answers
            .iter()
            .enumerate()
            .find(|(index, candidate)| {
                !guess.is_empty() && !self.revealed.contains(index) && normalize(candidate) == guess
            })
            .map(|(index, candidate)| (index, candidate.clone(), round.points_for(index)));

        match hit {
            Some((index, text, points)) => {
                self.revealed.insert(index);
                self.score += i64::from(points);
                let round_complete = self.revealed.len() == self.rounds[self.current].answers.len();
                let finished = if round_complete {
                    self.advance()?
                } else {
                    self.phase.apply(PhaseEvent::Resolve { finished: false })?;
                    false
                };
                Ok(FeudGuess {
                    matched: Some(index),
                    answer: Some(text),
                    points,
                    strikes: self.strikes,
                    score: self.score,
                    round_complete,
                    finished,
                })
            }
            None => {
                let strikes = self.strikes + 1;
                let finished = strikes >= MAX_STRIKES;
                self.phase.apply(PhaseEvent::Resolve { finished })?;
                self.strikes = strikes;
                Ok(FeudGuess {
                    matched: None,
                    answer: None,
                    points: 0,
                    strikes,
                    score: self.score,
                    round_complete: false,
                    finished,
                })
            }
        }
    }

    /// Reveal the rest of the current round and move on. Returns the round's answers.
    pub fn skip(&mut self) -> Result<(Vec<String>, bool), FeudError> {
        self.phase.ensure(PhaseEvent::Resolve { finished: false })?;
        let answers = self.rounds[self.current].answers.clone();
        let finished = self.advance()?;
        Ok((answers, finished))
    }

    fn advance(&mut self) -> Result<bool, FeudError> {
        let finished = self.current + 1 >= self.rounds.len();
        self.phase.apply(PhaseEvent::Resolve { finished })?;
        if !finished {
            self.current += 1;
            self.revealed.clear();
            self.strikes = 0;
        }
        Ok(finished)
    }
}
