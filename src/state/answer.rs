//! Lenient comparison of typed answers against expected responses.

const QUESTION_PREFIXES: [&str; 3] = ["what is ", "who is ", "where is "];

/// Lower-case, keep only ASCII word characters and whitespace, collapse runs of whitespace.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `given` is an acceptable answer for `expected`.
///
/// Accepted when the expected answer contains the given one, or when the given answer
/// contains the expected one stripped of its leading "what is" style phrasing.
pub fn matches(expected: &str, given: &str) -> bool {
    let given = normalize(given);
    if given.is_empty() {
        return false;
    }

    let expected = normalize(expected);
    if expected.contains(&given) {
        return true;
    }

    let core = strip_question_prefix(&expected);
    !core.is_empty() && given.contains(core.as_str())
}

/// Remove the earliest "what is " / "who is " / "where is " occurrence.
fn strip_question_prefix(expected: &str) -> String {
    let earliest = QUESTION_PREFIXES
        .iter()
        .filter_map(|prefix| expected.find(prefix).map(|at| (at, prefix.len())))
        .min_by_key(|(at, _)| *at);

    match earliest {
        Some((at, len)) => format!("{}{}", &expected[..at], &expected[at + len..]),
        None => expected.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_whitespace() {
        assert_eq!(normalize("  What IS   the Eiffel-Tower?! "), "what is the eiffeltower");
        assert_eq!(normalize("snake_case\tand\nlines"), "snake_case and lines");
        assert_eq!(normalize("?!."), "");
    }

    #[test]
    fn given_answer_inside_expected_is_accepted() {
        assert!(matches("What is Paris?", "paris"));
        assert!(matches("What is Paris?", "What is Paris"));
    }

    #[test]
    fn expected_core_inside_given_is_accepted() {
        assert!(matches("What is Paris?", "i think it's paris france"));
        assert!(matches("Who is Ada Lovelace?", "Ada Lovelace, the mathematician"));
    }

    #[test]
    fn unrelated_answers_are_rejected() {
        assert!(!matches("What is Paris?", "London"));
        assert!(!matches("What is Paris?", "par is"));
    }

    #[test]
    fn empty_answers_never_match() {
        assert!(!matches("What is Paris?", ""));
        assert!(!matches("What is Paris?", " ?? "));
    }
}
