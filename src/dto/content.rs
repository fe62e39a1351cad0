//! Published JSON forms of game content, shared by generation, saved games and inline sessions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::state::{
    connections::{Difficulty, Group, Puzzle},
    feud::FeudRound,
    jeopardy::{Board, Clue},
};

/// One clue of a Jeopardy board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JeopardyClueData {
    pub question: String,
    pub answer: String,
    pub value: u32,
    #[serde(default)]
    pub daily_double: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub is_revealed: bool,
    #[serde(default)]
    pub is_answered: bool,
}

/// Category columns and their clues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct JeopardyBoardData {
    #[validate(length(min = 1, max = 12))]
    pub categories: Vec<String>,
    /// Clues keyed by category name.
    #[schema(value_type = std::collections::HashMap<String, Vec<JeopardyClueData>>)]
    pub questions: IndexMap<String, Vec<JeopardyClueData>>,
}

impl From<&Board> for JeopardyBoardData {
    fn from(board: &Board) -> Self {
        let questions = board
            .questions
            .iter()
            .map(|(category, clues)| {
                let clues = clues
                    .iter()
                    .map(|clue| JeopardyClueData {
                        question: clue.question.clone(),
                        answer: clue.answer.clone(),
                        value: clue.value,
                        daily_double: clue.daily_double,
                        image: clue.image.clone(),
                        is_revealed: false,
                        is_answered: false,
                    })
                    .collect();
                (category.clone(), clues)
            })
            .collect();

        Self {
            categories: board.categories.clone(),
            questions,
        }
    }
}

impl From<JeopardyBoardData> for Board {
    fn from(data: JeopardyBoardData) -> Self {
        let questions = data
            .questions
            .into_iter()
            .map(|(category, clues)| {
                let clues = clues
                    .into_iter()
                    .map(|clue| Clue {
                        question: clue.question,
                        answer: clue.answer,
                        value: clue.value,
                        daily_double: clue.daily_double,
                        image: clue.image.filter(|url| !url.is_empty()),
                    })
                    .collect();
                (category, clues)
            })
            .collect();

        Board {
            categories: data.categories,
            questions,
        }
    }
}

/// One survey question with ranked answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct FeudRoundData {
    pub id: u32,
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(min = 1, max = 20))]
    pub answers: Vec<String>,
    /// Points parallel to `answers`; missing entries score by rank.
    #[serde(default)]
    pub points: Vec<u32>,
}

impl From<&FeudRound> for FeudRoundData {
    fn from(round: &FeudRound) -> Self {
        Self {
            id: round.id,
            question: round.question.clone(),
            answers: round.answers.clone(),
            points: round.points.clone(),
        }
    }
}

impl From<FeudRoundData> for FeudRound {
    fn from(data: FeudRoundData) -> Self {
        Self {
            id: data.id,
            question: data.question,
            answers: data.answers,
            points: data.points,
        }
    }
}

/// Saved form of a Feud game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FeudGameData {
    pub theme: String,
    pub questions: Vec<FeudRoundData>,
}

/// Items sharing a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct GroupData {
    pub category: String,
    #[validate(length(min = 1, max = 8))]
    pub items: Vec<String>,
    /// `common`, `tricky`, `confusing` or `obscure`.
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

fn default_difficulty() -> String {
    Difficulty::Common.as_str().to_owned()
}

impl From<&Group> for GroupData {
    fn from(group: &Group) -> Self {
        Self {
            category: group.category.clone(),
            items: group.items.clone(),
            difficulty: group.difficulty.as_str().to_owned(),
        }
    }
}

impl From<GroupData> for Group {
    fn from(data: GroupData) -> Self {
        Self {
            category: data.category,
            items: data.items,
            difficulty: Difficulty::parse(&data.difficulty),
        }
    }
}

/// One Connections puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct ConnectionsData {
    #[validate(length(min = 1, max = 8), nested)]
    pub groups: Vec<GroupData>,
}

impl From<&Puzzle> for ConnectionsData {
    fn from(puzzle: &Puzzle) -> Self {
        Self {
            groups: puzzle.groups.iter().map(GroupData::from).collect(),
        }
    }
}

impl From<ConnectionsData> for Puzzle {
    fn from(data: ConnectionsData) -> Self {
        Self {
            groups: data.groups.into_iter().map(Group::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_json_uses_camel_case_flags() {
        let json = serde_json::json!({
            "categories": ["SPACE"],
            "questions": {
                "SPACE": [{
                    "question": "Closest star?",
                    "answer": "What is the Sun?",
                    "value": 200,
                    "dailyDouble": true,
                    "isRevealed": false,
                    "isAnswered": false
                }]
            }
        });

        let data: JeopardyBoardData = serde_json::from_value(json.clone()).unwrap();
        let board = Board::from(data);
        assert!(board.questions["SPACE"][0].daily_double);
        assert_eq!(board.questions["SPACE"][0].image, None);

        assert_eq!(serde_json::to_value(JeopardyBoardData::from(&board)).unwrap(), json);
    }

    #[test]
    fn unknown_difficulty_reads_as_common() {
        let data: GroupData = serde_json::from_value(serde_json::json!({
            "category": "Planets",
            "items": ["Mars", "Venus"],
            "difficulty": "Impossible"
        }))
        .unwrap();
        assert_eq!(Group::from(data).difficulty, Difficulty::Common);
    }
}
