use futures::future::BoxFuture;

use super::{GeneratorError, QuestionGenerator, parse};
use crate::state::{connections::Puzzle, feud::FeudRound, jeopardy::Board};

/// Offline generator producing placeholder boards and default groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    /// Placeholder board for `theme` with a single weighted daily double.
    pub fn board(theme: &str) -> Board {
        let mut board = parse::assemble_board(parse::fallback_categories(theme), Default::default());
        parse::place_daily_double(&mut board, &mut rand::rng());
        board
    }
}

impl QuestionGenerator for FallbackGenerator {
    fn jeopardy(&self, theme: String) -> BoxFuture<'static, Result<Board, GeneratorError>> {
        Box::pin(async move { Ok(Self::board(&theme)) })
    }

    fn feud(
        &self,
        _theme: String,
        _num_questions: usize,
    ) -> BoxFuture<'static, Result<Vec<FeudRound>, GeneratorError>> {
        Box::pin(async {
            Err(GeneratorError::Unsupported(
                "Feud generation needs a language model; set OPENAI_API_KEY".into(),
            ))
        })
    }

    fn connections(
        &self,
        theme: String,
        num_groups: usize,
        items_per_group: usize,
    ) -> BoxFuture<'static, Result<Puzzle, GeneratorError>> {
        Box::pin(async move {
            Ok(Puzzle {
                groups: parse::fallback_groups(&theme, num_groups, items_per_group),
            })
        })
    }
}
