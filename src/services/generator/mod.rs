mod fallback;
mod openai;
pub mod parse;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::state::{connections::Puzzle, feud::FeudRound, jeopardy::Board};

pub use fallback::FallbackGenerator;
pub use openai::OpenAiGenerator;

/// Errors raised while producing game content.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generator returned no content")]
    EmptyResponse,
    #[error("could not parse generator output: {0}")]
    Parse(String),
    /// The configured backend cannot produce this kind of content.
    #[error("{0}")]
    Unsupported(String),
}

/// Source of themed trivia content.
pub trait QuestionGenerator: Send + Sync {
    /// A board of five categories with clues worth 200 to 1000 and one daily double.
    fn jeopardy(&self, theme: String) -> BoxFuture<'static, Result<Board, GeneratorError>>;
    /// Survey rounds with ranked answers.
    fn feud(
        &self,
        theme: String,
        num_questions: usize,
    ) -> BoxFuture<'static, Result<Vec<FeudRound>, GeneratorError>>;
    /// A grouping puzzle.
    fn connections(
        &self,
        theme: String,
        num_groups: usize,
        items_per_group: usize,
    ) -> BoxFuture<'static, Result<Puzzle, GeneratorError>>;
}
