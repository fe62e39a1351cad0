//! Clean-up of raw model output into playable content, with deterministic fallbacks.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use rand::{Rng, seq::IndexedRandom};
use serde_json::Value;
use tracing::warn;

use crate::state::{
    connections::{Difficulty, Group},
    feud::FeudRound,
    jeopardy::{Board, Clue},
};

/// Point values of a board column.
pub const CLUE_VALUES: [u32; 5] = [200, 400, 600, 800, 1000];
/// Categories on a generated board.
pub const CATEGORY_COUNT: usize = 5;
/// Distinct answers kept per survey question.
pub const FEUD_ANSWER_LIMIT: usize = 10;

/// Extract the payload of a reply that may be wrapped in markdown code fences.
pub fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some((_, rest)) = text.split_once("```json") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    if let Some((_, rest)) = text.split_once("```") {
        let body = rest.split("```").next().unwrap_or(rest).trim();
        return body.strip_prefix("json").map(str::trim).unwrap_or(body);
    }
    text
}

/// Parse a (possibly fenced) JSON reply.
pub fn parse_json(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(strip_fences(text))
}

/// List found under `key` in an object, or the value itself when it is an array.
fn list_field<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get(key).and_then(Value::as_array),
        _ => None,
    }
}

/// `"{THEME} 1"` .. `"{THEME} 5"`.
pub fn fallback_categories(theme: &str) -> Vec<String> {
    let theme = theme.trim().to_uppercase();
    (1..=CATEGORY_COUNT).map(|i| format!("{theme} {i}")).collect()
}

/// Exactly five distinct, non-empty, upper-cased category names, or `None`.
pub fn clean_categories(value: &Value) -> Option<Vec<String>> {
    let raw = list_field(value, "categories")?;
    if raw.len() != CATEGORY_COUNT {
        return None;
    }
    let names: Vec<String> = raw
        .iter()
        .map(|entry| {
            let name = match entry {
                Value::String(s) => s.trim().to_uppercase(),
                other => other.to_string().trim().to_uppercase(),
            };
            (!name.is_empty()).then_some(name)
        })
        .collect::<Option<_>>()?;

    let distinct: HashSet<&str> = names.iter().map(String::as_str).collect();
    (distinct.len() == names.len()).then_some(names)
}

/// Valid clues of one category, ordered by value. Empty when nothing usable was found.
pub fn clean_clues(value: &Value, category: &str) -> Vec<Clue> {
    let Some(raw) = list_field(value, "questions") else {
        return Vec::new();
    };

    let mut seen = Vec::new();
    let mut clues = Vec::new();
    for entry in raw {
        let (Some(clue), Some(response), Some(points)) = (
            entry.get("clue").and_then(Value::as_str),
            entry.get("response").and_then(Value::as_str),
            entry.get("value").and_then(Value::as_u64),
        ) else {
            warn!(category, "skipping incomplete clue");
            continue;
        };
        let Some(points) = u32::try_from(points)
            .ok()
            .filter(|points| CLUE_VALUES.contains(points))
        else {
            warn!(category, points, "skipping clue with invalid value");
            continue;
        };
        if seen.contains(&points) {
            warn!(category, points, "skipping clue with duplicate value");
            continue;
        }
        seen.push(points);

        let mut question = clue.trim().to_owned();
        if !question.ends_with('?') {
            question.push('?');
        }

        clues.push(Clue {
            question,
            answer: phrase_response(response),
            value: points,
            daily_double: false,
            image: entry
                .get("image")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_owned),
        });
    }

    clues.sort_by_key(|clue| clue.value);
    clues
}

/// Make sure a response reads "What is ...?".
pub fn phrase_response(response: &str) -> String {
    let response = response.trim();
    let lowered = response.to_lowercase();
    if lowered.starts_with("what is ") || lowered.starts_with("what are ") {
        return response.to_owned();
    }
    format!("What is {}?", response.trim_matches([' ', '.', '?']))
}

/// Placeholder clues used when a category could not be generated.
pub fn fallback_clues(category: &str) -> Vec<Clue> {
    CLUE_VALUES
        .iter()
        .map(|value| Clue {
            question: format!("This is a sample question for {category} (${value})?"),
            answer: format!("What is the sample answer for the ${value} question in {category}?"),
            value: *value,
            daily_double: false,
            image: None,
        })
        .collect()
}

/// Assemble a board from categories and per-category clue lists.
pub fn assemble_board(categories: Vec<String>, mut clues: HashMap<String, Vec<Clue>>) -> Board {
    let mut questions = IndexMap::new();
    for category in &categories {
        let column = clues
            .remove(category)
            .filter(|column| !column.is_empty())
            .unwrap_or_else(|| fallback_clues(category));
        questions.insert(category.clone(), column);
    }
    Board {
        categories,
        questions,
    }
}

/// Flag exactly one clue as daily double, weighted by clue value.
pub fn place_daily_double<R: Rng + ?Sized>(board: &mut Board, rng: &mut R) {
    let positions: Vec<(String, usize, u32)> = board
        .questions
        .iter()
        .flat_map(|(category, clues)| {
            clues
                .iter()
                .enumerate()
                .map(move |(index, clue)| (category.clone(), index, clue.value))
        })
        .collect();

    for clue in board.questions.values_mut().flatten() {
        clue.daily_double = false;
    }

    match positions.choose_weighted(rng, |(_, _, value)| *value) {
        Ok((category, index, _)) => {
            if let Some(clue) = board
                .questions
                .get_mut(category)
                .and_then(|clues| clues.get_mut(*index))
            {
                clue.daily_double = true;
            }
        }
        Err(err) => warn!(error = %err, "could not place a daily double"),
    }
}

/// Survey questions from a line-per-question reply; only lines ending with `?` count.
pub fn parse_question_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_list_marker)
        .filter(|line| line.ends_with('?'))
        .map(str::to_owned)
        .collect()
}

/// Plain answers from a line-per-answer reply.
pub fn parse_answer_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Drop a leading `1.`, `2)`, `-` or `*` list marker.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = &line[digits..];
    if digits > 0 {
        if let Some(stripped) = rest.strip_prefix(['.', ')']) {
            return stripped.trim();
        }
        return line;
    }
    rest.strip_prefix(['-', '*']).map_or(line, str::trim)
}

/// Count respondent answers (lower-cased, trimmed) ordered by count desc, then answer.
pub fn tally_answers<'a>(answers: impl IntoIterator<Item = &'a str>) -> Vec<(String, u32)> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for answer in answers {
        let answer = answer.trim().to_lowercase();
        if !answer.is_empty() {
            *counts.entry(answer).or_default() += 1;
        }
    }
    let mut tally: Vec<(String, u32)> = counts.into_iter().collect();
    tally.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    tally
}

/// Add suggestions with count 1 until the limit is reached, skipping case-insensitive repeats.
pub fn top_up_answers(tally: &mut Vec<(String, u32)>, suggestions: &[String]) {
    for suggestion in suggestions {
        if tally.len() >= FEUD_ANSWER_LIMIT {
            break;
        }
        let suggestion = suggestion.trim();
        if suggestion.is_empty() {
            continue;
        }
        let lowered = suggestion.to_lowercase();
        if tally.iter().any(|(existing, _)| existing.to_lowercase() == lowered) {
            continue;
        }
        tally.push((suggestion.to_owned(), 1));
    }
    tally.truncate(FEUD_ANSWER_LIMIT);
}

/// Published round: title-cased answers worth ten points per respondent.
pub fn publish_round(id: u32, question: String, tally: &[(String, u32)]) -> FeudRound {
    FeudRound {
        id,
        question,
        answers: tally.iter().map(|(answer, _)| title_case(answer)).collect(),
        points: tally.iter().map(|(_, count)| count * 10).collect(),
    }
}

/// Upper-case the first letter of every word and lower-case the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_whitespace() || c == '-' {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Groups with at least `items_per_group` items, truncated to that size.
pub fn clean_groups(value: &Value, num_groups: usize, items_per_group: usize) -> Option<Vec<Group>> {
    let raw = list_field(value, "groups")?;
    let groups: Vec<Group> = raw
        .iter()
        .filter_map(|entry| {
            let category = entry.get("category")?.as_str()?.trim();
            let items: Vec<String> = entry
                .get("items")?
                .as_array()?
                .iter()
                .filter_map(Value::as_str)
                .map(|item| item.trim().to_owned())
                .filter(|item| !item.is_empty())
                .take(items_per_group)
                .collect();
            if category.is_empty() || items.len() < items_per_group {
                return None;
            }
            Some(Group {
                category: category.to_owned(),
                items,
                difficulty: entry
                    .get("difficulty")
                    .and_then(Value::as_str)
                    .map(Difficulty::parse)
                    .unwrap_or_default(),
            })
        })
        .take(num_groups)
        .collect();

    (!groups.is_empty()).then_some(groups)
}

/// Built-in groups: colors, animals, sports and professions of the theme.
pub fn fallback_groups(theme: &str, num_groups: usize, items_per_group: usize) -> Vec<Group> {
    let defaults: [(&str, [&str; 5], Difficulty); 4] = [
        (
            "Colors",
            ["Red", "Blue", "Green", "Yellow", "Purple"],
            Difficulty::Common,
        ),
        (
            "Animals",
            ["Lion", "Tiger", "Bear", "Wolf", "Eagle"],
            Difficulty::Tricky,
        ),
        (
            "Sports",
            ["Soccer", "Basketball", "Tennis", "Golf", "Hockey"],
            Difficulty::Confusing,
        ),
        (
            "Professions",
            ["Doctor", "Teacher", "Engineer", "Artist", "Pilot"],
            Difficulty::Obscure,
        ),
    ];

    defaults
        .iter()
        .take(num_groups)
        .map(|(name, items, difficulty)| Group {
            category: format!("{theme} {name}"),
            items: items
                .iter()
                .take(items_per_group)
                .map(|item| item.to_string())
                .collect(),
            difficulty: *difficulty,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use serde_json::json;

    use super::*;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_fences("```\njson\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("  [2] "), "[2]");
        assert_eq!(parse_json("Sure!\n```json\n{\"x\": 3}\n```").unwrap(), json!({"x": 3}));
    }

    #[test]
    fn categories_need_exactly_five_entries() {
        let ok = json!({"categories": [" space ", "stars", "planets", "moons", "comets"]});
        assert_eq!(
            clean_categories(&ok).unwrap(),
            vec!["SPACE", "STARS", "PLANETS", "MOONS", "COMETS"]
        );
        assert!(clean_categories(&json!({"categories": ["a", "b"]})).is_none());
        assert!(clean_categories(&json!(["a", "b", " ", "d", "e"])).is_none());
        assert!(clean_categories(&json!(["Stars", "a", "STARS ", "d", "e"])).is_none());
        assert_eq!(fallback_categories("space")[4], "SPACE 5");
    }

    #[test]
    fn clues_are_filtered_and_rephrased() {
        let raw = json!({"questions": [
            {"clue": "Largest planet", "response": "Jupiter.", "value": 400},
            {"clue": "Closest star?", "response": "What is the Sun?", "value": 200},
            {"clue": "Duplicate", "response": "x", "value": 400},
            {"clue": "Bad value", "response": "x", "value": 300},
            {"clue": "Missing response", "value": 600},
            {"clue": "Red planet", "response": "what are mars rovers", "value": 1000, "image": "https://img/x.png"}
        ]});

        let clues = clean_clues(&raw, "SPACE");
        let values: Vec<u32> = clues.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![200, 400, 1000]);
        assert_eq!(clues[1].question, "Largest planet?");
        assert_eq!(clues[1].answer, "What is Jupiter?");
        assert_eq!(clues[0].answer, "What is the Sun?");
        assert_eq!(clues[2].answer, "what are mars rovers");
        assert_eq!(clues[2].image.as_deref(), Some("https://img/x.png"));
    }

    #[test]
    fn board_assembly_fills_missing_categories() {
        let categories = fallback_categories("ocean");
        let mut clues = HashMap::new();
        clues.insert(
            "OCEAN 1".to_owned(),
            clean_clues(
                &json!([{"clue": "Deep", "response": "Trench", "value": 200}]),
                "OCEAN 1",
            ),
        );

        let mut board = assemble_board(categories, clues);
        assert_eq!(board.questions["OCEAN 1"].len(), 1);
        assert_eq!(
            board.questions["OCEAN 2"][0].question,
            "This is a sample question for OCEAN 2 ($200)?"
        );

        let mut rng = StdRng::seed_from_u64(3);
        place_daily_double(&mut board, &mut rng);
        place_daily_double(&mut board, &mut rng);
        let flagged = board
            .questions
            .values()
            .flatten()
            .filter(|clue| clue.daily_double)
            .count();
        assert_eq!(flagged, 1);
    }

    #[test]
    fn survey_tally_orders_by_count_then_answer() {
        let tally = tally_answers(["Pizza", " pizza", "tacos", "", "burgers", "Tacos", "PIZZA"]);
        assert_eq!(
            tally,
            vec![
                ("pizza".to_owned(), 3),
                ("tacos".to_owned(), 2),
                ("burgers".to_owned(), 1)
            ]
        );
    }

    #[test]
    fn top_up_skips_repeats_and_caps_at_ten() {
        let mut tally = vec![("pizza".to_owned(), 3)];
        let suggestions: Vec<String> = ["Pizza", "Sushi", "sushi"]
            .into_iter()
            .map(String::from)
            .chain((0..20).map(|i| format!("dish {i}")))
            .collect();
        top_up_answers(&mut tally, &suggestions);
        assert_eq!(tally.len(), FEUD_ANSWER_LIMIT);
        assert_eq!(tally[1], ("Sushi".to_owned(), 1));
        assert_eq!(tally[2].0, "dish 0");
    }

    #[test]
    fn published_rounds_are_title_cased_with_points() {
        let round = publish_round(
            2,
            "Best pizza topping?".into(),
            &[("extra cheese".into(), 4), ("pepperoni".into(), 1)],
        );
        assert_eq!(round.answers, vec!["Extra Cheese", "Pepperoni"]);
        assert_eq!(round.points, vec![40, 10]);
        assert_eq!(title_case("hot-DOG stand"), "Hot-Dog Stand");
    }

    #[test]
    fn question_lines_must_end_with_question_mark() {
        let parsed = parse_question_lines(
            "1. Best snack?\nNot a question\n- Worst chore?\n1990s hit song?\n",
        );
        assert_eq!(parsed, vec!["Best snack?", "Worst chore?", "1990s hit song?"]);
        assert_eq!(parse_answer_lines("2) Pizza\n\n* Tacos"), vec!["Pizza", "Tacos"]);
    }

    #[test]
    fn groups_are_truncated_and_short_ones_dropped() {
        let raw = json!([
            {"category": "Birds", "difficulty": "TRICKY", "items": ["a", "b", "c", "d", "e"]},
            {"category": "Short", "items": ["a", "b"]},
            {"category": "Fish", "items": ["f", "g", "h", "i"]}
        ]);
        let groups = clean_groups(&raw, 4, 4).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].items.len(), 4);
        assert_eq!(groups[0].difficulty, Difficulty::Tricky);
        assert_eq!(groups[1].difficulty, Difficulty::Common);
        assert!(clean_groups(&json!({"groups": []}), 4, 4).is_none());
    }

    #[test]
    fn fallback_groups_follow_requested_shape() {
        let groups = fallback_groups("Retro", 2, 3);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, "Retro Colors");
        assert_eq!(groups[1].items, vec!["Lion", "Tiger", "Bear"]);
        assert_eq!(fallback_groups("Retro", 6, 5).len(), 4);
    }
}
