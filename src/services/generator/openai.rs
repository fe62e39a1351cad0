use std::{collections::HashMap, sync::Arc};

use futures::future::{BoxFuture, join_all};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{GeneratorError, QuestionGenerator, parse};
use crate::{
    config::GeneratorSettings,
    state::{
        connections::Puzzle,
        feud::FeudRound,
        jeopardy::{Board, Clue},
    },
};

/// Simulated survey respondents per Feud game.
const RESPONDENTS: usize = 10;
const TEMPERATURE: f32 = 0.8;

/// Chat-completions backed generator.
#[derive(Clone)]
pub struct OpenAiGenerator {
    inner: Arc<OpenAiInner>,
}

struct OpenAiInner {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiGenerator {
    /// Build a generator talking to `settings.base_url` with `api_key`.
    pub fn new(settings: &GeneratorSettings, api_key: String) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(OpenAiInner {
                client,
                endpoint: format!(
                    "{}/chat/completions",
                    settings.base_url.trim_end_matches('/')
                ),
                api_key,
                model: settings.model.clone(),
            }),
        })
    }

    async fn complete(&self, system: &str, user: String) -> Result<String, GeneratorError> {
        let request = ChatRequest {
            model: &self.inner.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_owned(),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .bearer_auth(&self.inner.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .ok_or(GeneratorError::EmptyResponse)
    }

    async fn complete_json(&self, system: &str, user: String) -> Result<Value, GeneratorError> {
        let text = self.complete(system, user).await?;
        parse::parse_json(&text).map_err(|err| {
            debug!(raw = %text, "unparseable generator reply");
            GeneratorError::Parse(err.to_string())
        })
    }

    async fn categories(&self, theme: &str) -> Vec<String> {
        let prompt = format!(
            "Create exactly 5 distinct Jeopardy categories for the theme '{theme}'. \
             Each category is 1-3 words in ALL CAPS, ordered from most general to most specific. \
             Respond with ONLY a JSON object: {{\"categories\": [\"...\", \"...\"]}}"
        );
        match self.complete_json(SYSTEM_PROMPT, prompt).await {
            Ok(value) => parse::clean_categories(&value).unwrap_or_else(|| {
                warn!(theme, "generator categories unusable; using fallback categories");
                parse::fallback_categories(theme)
            }),
            Err(err) => {
                warn!(theme, error = %err, "category generation failed; using fallback categories");
                parse::fallback_categories(theme)
            }
        }
    }

    async fn clues(&self, theme: &str, category: &str) -> Vec<Clue> {
        let prompt = format!(
            "Create 5 Jeopardy clues for the category '{category}' within the theme '{theme}', \
             with increasing difficulty worth 200, 400, 600, 800 and 1000 points. \
             Each entry has `clue` (ends with a question mark), `response` (starts with \
             'What is' or 'What are'), `value` and `image` (a URL or null). \
             Respond with ONLY a JSON object: {{\"questions\": [{{\"clue\": \"...\", \
             \"response\": \"...\", \"value\": 200, \"image\": null}}]}}"
        );
        match self.complete_json(SYSTEM_PROMPT, prompt).await {
            Ok(value) => parse::clean_clues(&value, category),
            Err(err) => {
                warn!(category, error = %err, "clue generation failed; using fallback clues");
                Vec::new()
            }
        }
    }

    async fn generate_board(self, theme: String) -> Result<Board, GeneratorError> {
        let categories = self.categories(&theme).await;
        let columns = join_all(
            categories
                .iter()
                .map(|category| self.clues(&theme, category)),
        )
        .await;

        let clues: HashMap<String, Vec<Clue>> =
            categories.iter().cloned().zip(columns).collect();
        let mut board = parse::assemble_board(categories, clues);
        parse::place_daily_double(&mut board, &mut rand::rng());
        info!(theme, clues = board.clue_count(), "generated jeopardy board");
        Ok(board)
    }

    async fn generate_feud(
        self,
        theme: String,
        num_questions: usize,
    ) -> Result<Vec<FeudRound>, GeneratorError> {
        let prompt = format!(
            "Generate exactly {num_questions} unique, opinion-based survey questions about {theme}. \
             Questions have many valid answers of 1-3 words, are fun for a game show audience \
             and end with a question mark. Return one question per line with no numbering."
        );
        let text = self.complete(SYSTEM_PROMPT, prompt).await?;
        let questions: Vec<String> = parse::parse_question_lines(&text)
            .into_iter()
            .take(num_questions)
            .collect();
        if questions.is_empty() {
            return Err(GeneratorError::Parse("no survey questions in reply".into()));
        }

        let listing = questions
            .iter()
            .enumerate()
            .map(|(i, question)| format!("{}. {question}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Simulate {RESPONDENTS} diverse survey respondents (different ages, jobs and \
             backgrounds) answering every question below with 1-3 words.\n\n{listing}\n\n\
             Respond with ONLY a JSON array holding one object per respondent: \
             [{{\"answers\": [\"answer to question 1\", \"answer to question 2\"]}}]"
        );
        let survey = self.complete_json(SYSTEM_PROMPT, prompt).await?;
        let respondents = survey
            .as_array()
            .ok_or_else(|| GeneratorError::Parse("survey reply is not an array".into()))?;

        let mut collected: Vec<Vec<String>> = vec![Vec::new(); questions.len()];
        for respondent in respondents {
            let answers = respondent
                .get("answers")
                .and_then(Value::as_array)
                .or_else(|| respondent.as_array());
            for (slot, answer) in collected.iter_mut().zip(answers.into_iter().flatten()) {
                if let Some(answer) = answer.as_str() {
                    slot.push(answer.to_owned());
                }
            }
        }

        let tallies = join_all(questions.iter().zip(&collected).map(|(question, answers)| {
            let generator = self.clone();
            async move {
                let mut tally = parse::tally_answers(answers.iter().map(String::as_str));
                if tally.len() < parse::FEUD_ANSWER_LIMIT {
                    let needed = parse::FEUD_ANSWER_LIMIT - tally.len();
                    match generator.extra_answers(question, &tally, needed * 2).await {
                        Ok(extra) => parse::top_up_answers(&mut tally, &extra),
                        Err(err) => {
                            warn!(question = %question, error = %err, "could not top up survey answers")
                        }
                    }
                }
                tally
            }
        }))
        .await;

        let rounds: Vec<FeudRound> = questions
            .into_iter()
            .zip(tallies)
            .enumerate()
            .filter(|(_, (_, tally))| !tally.is_empty())
            .map(|(i, (question, tally))| {
                parse::publish_round(u32::try_from(i + 1).unwrap_or(u32::MAX), question, &tally)
            })
            .collect();
        if rounds.is_empty() {
            return Err(GeneratorError::Parse("survey produced no answers".into()));
        }

        info!(theme, rounds = rounds.len(), "generated feud survey");
        Ok(rounds)
    }

    async fn extra_answers(
        &self,
        question: &str,
        tally: &[(String, u32)],
        count: usize,
    ) -> Result<Vec<String>, GeneratorError> {
        let existing = tally
            .iter()
            .map(|(answer, _)| format!("- {answer}"))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Generate {count} additional unique answers of 1-3 words to this survey question:\n\
             {question}\n\nExisting answers (do not repeat these):\n{existing}\n\n\
             Return only the answers, one per line."
        );
        let text = self.complete(SYSTEM_PROMPT, prompt).await?;
        Ok(parse::parse_answer_lines(&text)
            .into_iter()
            .take(count)
            .collect())
    }

    async fn generate_connections(
        self,
        theme: String,
        num_groups: usize,
        items_per_group: usize,
    ) -> Result<Puzzle, GeneratorError> {
        let prompt = format!(
            "Create {num_groups} unique categories for a Connections word game about {theme}. \
             Each category has exactly {items_per_group} items, a clear concise name and a \
             difficulty of common, tricky, confusing or obscure; vary the difficulties. \
             Respond with ONLY a JSON array: [{{\"category\": \"...\", \"difficulty\": \
             \"common\", \"items\": [\"...\"]}}]"
        );
        let groups = match self.complete_json(SYSTEM_PROMPT, prompt).await {
            Ok(value) => parse::clean_groups(&value, num_groups, items_per_group),
            Err(err) => {
                warn!(theme, error = %err, "group generation failed");
                None
            }
        };

        let groups = groups.unwrap_or_else(|| {
            warn!(theme, "using default connections groups");
            parse::fallback_groups(&theme, num_groups, items_per_group)
        });
        Ok(Puzzle { groups })
    }
}

const SYSTEM_PROMPT: &str = "You are a professional game show writer producing trivia content. \
    Follow the requested output format exactly.";

impl QuestionGenerator for OpenAiGenerator {
    fn jeopardy(&self, theme: String) -> BoxFuture<'static, Result<Board, GeneratorError>> {
        let generator = self.clone();
        Box::pin(generator.generate_board(theme))
    }

    fn feud(
        &self,
        theme: String,
        num_questions: usize,
    ) -> BoxFuture<'static, Result<Vec<FeudRound>, GeneratorError>> {
        let generator = self.clone();
        Box::pin(generator.generate_feud(theme, num_questions))
    }

    fn connections(
        &self,
        theme: String,
        num_groups: usize,
        items_per_group: usize,
    ) -> BoxFuture<'static, Result<Puzzle, GeneratorError>> {
        let generator = self.clone();
        Box::pin(generator.generate_connections(theme, num_groups, items_per_group))
    }
}
