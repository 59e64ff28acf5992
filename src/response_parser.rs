use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::models::{FlashcardContent, QuizItem};

/// Coerces free-form model output into structured study records.
///
/// The model is asked for a bare JSON array but routinely wraps it in prose or
/// markdown fences, truncates it, or emits loose key/value text. Extraction is
/// therefore best-effort: locate an array literal, parse it, and keep only the
/// entries that carry the required fields. Flashcards additionally get a
/// regex fallback that pairs up `"question"`/`"answer"` fragments when the
/// array parse fails. Both entry points return an empty collection on total
/// failure, never an error.
static OBJECT_ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)\[\s*\{.*?\}\s*\]"#).unwrap());

static BARE_ARRAY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

static QA_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"question"\s*:\s*"([^"]+)"[^}]*"answer"\s*:\s*"([^"]+)""#).unwrap()
});

pub fn parse_flashcards(raw: &str, requested: usize) -> Vec<FlashcardContent> {
    if let Some(found) = OBJECT_ARRAY_RE.find(raw) {
        match serde_json::from_str::<Vec<Value>>(found.as_str()) {
            Ok(entries) => {
                let cards: Vec<FlashcardContent> = entries
                    .iter()
                    .filter_map(flashcard_from_value)
                    .take(requested)
                    .collect();
                debug!(
                    raw_entries = entries.len(),
                    valid_cards = cards.len(),
                    "Parsed flashcard array from model response"
                );
                return cards;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    matched_length = found.as_str().len(),
                    "Flashcard array matched but failed to parse, trying pair extraction"
                );
            }
        }
    } else {
        warn!(
            response_length = raw.len(),
            "No JSON array found in flashcard response, trying pair extraction"
        );
    }

    fallback_pairs(raw, requested)
}

/// Loose extraction for responses where the array structure is broken but the
/// question/answer text survived.
fn fallback_pairs(raw: &str, requested: usize) -> Vec<FlashcardContent> {
    let cards: Vec<FlashcardContent> = QA_PAIR_RE
        .captures_iter(raw)
        .take(requested)
        .map(|cap| FlashcardContent {
            question: cap[1].to_string(),
            answer: cap[2].to_string(),
        })
        .collect();

    if !cards.is_empty() {
        debug!(count = cards.len(), "Recovered flashcards via pair extraction");
    }
    cards
}

fn flashcard_from_value(value: &Value) -> Option<FlashcardContent> {
    let question = value.get("question")?.as_str()?;
    let answer = value.get("answer")?.as_str()?;
    if question.trim().is_empty() || answer.trim().is_empty() {
        return None;
    }
    Some(FlashcardContent {
        question: question.to_string(),
        answer: answer.to_string(),
    })
}

pub fn parse_quiz(raw: &str, requested: usize) -> Vec<QuizItem> {
    let Some(found) = BARE_ARRAY_RE.find(raw) else {
        warn!(
            response_length = raw.len(),
            "No JSON array found in quiz response"
        );
        return Vec::new();
    };

    match serde_json::from_str::<Vec<Value>>(found.as_str()) {
        Ok(entries) => {
            let items: Vec<QuizItem> = entries
                .iter()
                .filter_map(quiz_item_from_value)
                .take(requested)
                .collect();
            debug!(
                raw_entries = entries.len(),
                valid_items = items.len(),
                "Parsed quiz array from model response"
            );
            items
        }
        Err(e) => {
            warn!(error = %e, "Quiz array matched but failed to parse");
            Vec::new()
        }
    }
}

fn quiz_item_from_value(value: &Value) -> Option<QuizItem> {
    let question = value.get("question")?.as_str()?;
    if question.trim().is_empty() {
        return None;
    }

    let options: Vec<String> = value
        .get("options")?
        .as_array()?
        .iter()
        .filter_map(|o| o.as_str().map(|s| s.to_string()))
        .collect();
    if options.len() != 4 {
        return None;
    }

    let correct = value.get("correct")?.as_i64()?;
    if !(0..=3).contains(&correct) {
        return None;
    }

    Some(QuizItem {
        question: question.to_string(),
        options,
        correct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_flashcard_array() {
        let raw = r#"[
            {"question": "What is supervised learning?", "answer": "Learning from labeled data"},
            {"question": "Define overfitting", "answer": "Memorizing training data"}
        ]"#;

        let cards = parse_flashcards(raw, 5);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].question, "What is supervised learning?");
        assert_eq!(cards[1].answer, "Memorizing training data");
    }

    #[test]
    fn truncates_flashcards_to_requested_count() {
        let raw = r#"[
            {"question": "Q1", "answer": "A1"},
            {"question": "Q2", "answer": "A2"},
            {"question": "Q3", "answer": "A3"}
        ]"#;

        let cards = parse_flashcards(raw, 2);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].question, "Q2");
    }

    #[test]
    fn extracts_array_wrapped_in_markdown() {
        let raw = "Here are your flashcards:\n```json\n[{\"question\": \"Q\", \"answer\": \"A\"}]\n```\nEnjoy!";
        let cards = parse_flashcards(raw, 5);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].question, "Q");
    }

    #[test]
    fn filters_incomplete_and_blank_entries() {
        let raw = r#"[
            {"question": "Valid", "answer": "Yes"},
            {"question": "Missing answer"},
            {"question": "   ", "answer": "blank question"},
            {"question": "Also valid", "answer": "  ", "note": "blank answer"}
        ]"#;

        let cards = parse_flashcards(raw, 10);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].question, "Valid");
    }

    #[test]
    fn falls_back_to_pair_extraction_on_broken_json() {
        // Trailing comma breaks the array parse, but the pairs are intact.
        let raw = r#"[
            {"question": "What is gradient descent?", "answer": "Optimization algorithm",},
            {"question": "Main types of ML?", "answer": "Supervised, unsupervised, reinforcement",}
        ]"#;

        let cards = parse_flashcards(raw, 5);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].question, "What is gradient descent?");
        assert_eq!(cards[1].answer, "Supervised, unsupervised, reinforcement");
    }

    #[test]
    fn pair_extraction_works_without_any_array() {
        let raw = r#"Sure! "question": "What is RAM?" ... "answer": "Working memory""#;
        let cards = parse_flashcards(raw, 5);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].answer, "Working memory");
    }

    #[test]
    fn unusable_flashcard_text_yields_empty() {
        assert!(parse_flashcards("I cannot help with that.", 5).is_empty());
        assert!(parse_flashcards("", 5).is_empty());
    }

    #[test]
    fn parses_clean_quiz_array() {
        let raw = r#"[
            {"question": "2+2?", "options": ["3", "4", "5", "6"], "correct": 1},
            {"question": "Capital of France?", "options": ["Lyon", "Nice", "Paris", "Lille"], "correct": 2}
        ]"#;

        let items = parse_quiz(raw, 5);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].correct, 1);
        assert_eq!(items[1].options[2], "Paris");
    }

    #[test]
    fn truncates_quiz_to_requested_count() {
        let raw = r#"[
            {"question": "Q1", "options": ["a", "b", "c", "d"], "correct": 0},
            {"question": "Q2", "options": ["a", "b", "c", "d"], "correct": 1},
            {"question": "Q3", "options": ["a", "b", "c", "d"], "correct": 2}
        ]"#;

        assert_eq!(parse_quiz(raw, 1).len(), 1);
    }

    #[test]
    fn rejects_quiz_entries_with_bad_shape() {
        let raw = r#"[
            {"question": "Ok", "options": ["a", "b", "c", "d"], "correct": 3},
            {"question": "Three options", "options": ["a", "b", "c"], "correct": 0},
            {"question": "Index out of range", "options": ["a", "b", "c", "d"], "correct": 4},
            {"question": "", "options": ["a", "b", "c", "d"], "correct": 0},
            {"options": ["a", "b", "c", "d"], "correct": 0}
        ]"#;

        let items = parse_quiz(raw, 10);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].question, "Ok");
    }

    #[test]
    fn unusable_quiz_text_yields_empty() {
        assert!(parse_quiz("no json here", 5).is_empty());
        assert!(parse_quiz("[not even close", 5).is_empty());
    }
}
