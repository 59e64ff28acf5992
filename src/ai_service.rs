use anyhow::Result;
use tracing::{error, info, warn};

use crate::ai_provider::{create_provider, AiProvider};
use crate::config::AiConfig;
use crate::models::{FlashcardContent, QuizItem};
use crate::response_parser;

/// Prompt text is capped so a large extracted document does not blow the
/// completion context. Limits match what the upstream models handle well.
const SUMMARY_INPUT_CHARS: usize = 8000;
const SUBJECT_INPUT_CHARS: usize = 2000;
const CHAT_CONTEXT_CHARS: usize = 4000;

pub const SUMMARY_UNAVAILABLE: &str =
    "AI service not available. Please configure an API key in the environment.";
const SUMMARY_FAILED: &str = "Error generating summary. Please try again.";
const DEFAULT_SUBJECT: &str = "General";

#[derive(Clone)]
pub struct AiService {
    provider: Option<AiProvider>,
}

impl AiService {
    pub fn new(config: &AiConfig) -> Self {
        if !config.is_usable() {
            warn!("AI API key missing or placeholder, generation features disabled");
            return Self { provider: None };
        }

        let provider = create_provider(
            config.provider,
            config.api_key.clone(),
            config.base_url.clone(),
            config.model.clone(),
        );
        info!(
            provider = provider.provider_name(),
            model = provider.model_name(),
            "Initialized AI service"
        );
        Self {
            provider: Some(provider),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Summarize `text` at one of the supported difficulty levels. Degrades
    /// to a user-facing placeholder instead of failing.
    pub async fn generate_summary(&self, text: &str, difficulty: &str) -> String {
        let Some(provider) = &self.provider else {
            return SUMMARY_UNAVAILABLE.to_string();
        };

        let style = match difficulty {
            "beginner" => "in very simple terms suitable for beginners",
            "intermediate" => "with detailed explanations for intermediate learners",
            "advanced" => "with technical depth for advanced learners",
            "exam-prep" => "focusing on key concepts for exam preparation",
            _ => "in a balanced way suitable for most learners",
        };

        let prompt = format!(
            "Summarize the following text {}.\n\
             Provide a clear, concise summary that captures the main ideas and key concepts.\n\n\
             Text: {}",
            style,
            truncate_chars(text, SUMMARY_INPUT_CHARS)
        );

        match provider.make_request(None, &prompt).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, difficulty = difficulty, "Summary generation failed");
                SUMMARY_FAILED.to_string()
            }
        }
    }

    /// Generate up to `requested` question/answer flashcards. Returns an
    /// empty vec on any failure so upload processing keeps going.
    pub async fn generate_flashcards(&self, text: &str, requested: usize) -> Vec<FlashcardContent> {
        let Some(provider) = &self.provider else {
            return Vec::new();
        };

        info!(
            text_length = text.len(),
            requested = requested,
            "Generating flashcards"
        );

        let prompt = format!(
            r#"Create {} ULTRA-CONCISE revision flashcards for quick memorization.

STRICT RULES:
- Questions: SHORT and DIRECT (5-10 words max)
- Answers: EXTREMELY BRIEF
  * Definitions: 1-5 words
  * Facts: 1-3 words
  * Explanations: MAXIMUM 1 sentence (15 words max)
- Focus ONLY on the most important, testable facts
- Perfect for rapid revision before exams

Format as JSON array with 'question' and 'answer' fields.

GOOD Examples:
[
  {{"question": "What is supervised learning?", "answer": "Learning from labeled data"}},
  {{"question": "Define overfitting", "answer": "Memorizing training data"}},
  {{"question": "What is gradient descent?", "answer": "Optimization algorithm"}},
  {{"question": "Main types of ML?", "answer": "Supervised, unsupervised, reinforcement"}}
]

BAD Examples (TOO LONG):
[
  {{"question": "Can you explain what supervised learning means?", "answer": "Supervised learning is a type of machine learning where the algorithm learns from labeled data, meaning each training example is paired with an output label."}}
]

Text: {}

Return ONLY the JSON array."#,
            requested,
            truncate_chars(text, SUMMARY_INPUT_CHARS)
        );

        match provider.make_request(None, &prompt).await {
            Ok(response) => {
                let cards = response_parser::parse_flashcards(&response, requested);
                info!(card_count = cards.len(), "Flashcard generation finished");
                cards
            }
            Err(e) => {
                error!(error = %e, "Flashcard generation request failed");
                Vec::new()
            }
        }
    }

    /// Generate up to `requested` multiple-choice questions. Empty vec on
    /// any failure.
    pub async fn generate_quiz(&self, text: &str, requested: usize) -> Vec<QuizItem> {
        let Some(provider) = &self.provider else {
            return Vec::new();
        };

        info!(
            text_length = text.len(),
            requested = requested,
            "Generating quiz questions"
        );

        let prompt = format!(
            "Based on the following text, create {} multiple choice quiz questions.\n\
             For each question, provide:\n\
             - A clear question\n\
             - 4 answer options\n\
             - The index (0-3) of the correct answer\n\n\
             Format your response as a JSON array with objects containing 'question', \
             'options' (array of 4 strings), and 'correct' (integer 0-3) fields.\n\n\
             Text: {}\n\n\
             Return ONLY the JSON array, no additional text.",
            requested,
            truncate_chars(text, SUMMARY_INPUT_CHARS)
        );

        match provider.make_request(None, &prompt).await {
            Ok(response) => {
                let items = response_parser::parse_quiz(&response, requested);
                info!(question_count = items.len(), "Quiz generation finished");
                items
            }
            Err(e) => {
                error!(error = %e, "Quiz generation request failed");
                Vec::new()
            }
        }
    }

    /// Label the document's subject in 1-3 words, falling back to "General".
    pub async fn detect_subject(&self, text: &str) -> String {
        let Some(provider) = &self.provider else {
            return DEFAULT_SUBJECT.to_string();
        };

        let prompt = format!(
            "Based on the following text excerpt, identify the main subject or topic in 1-3 words.\n\
             Examples: \"Machine Learning\", \"Physics\", \"Mathematics\", \"History\", etc.\n\n\
             Text: {}\n\n\
             Return ONLY the subject name, nothing else.",
            truncate_chars(text, SUBJECT_INPUT_CHARS)
        );

        match provider.make_request(None, &prompt).await {
            Ok(subject) => {
                let subject = subject.trim().to_string();
                if subject.is_empty() || subject.len() >= 50 {
                    DEFAULT_SUBJECT.to_string()
                } else {
                    subject
                }
            }
            Err(e) => {
                warn!(error = %e, "Subject detection failed, using default");
                DEFAULT_SUBJECT.to_string()
            }
        }
    }

    /// Answer a student question, optionally grounded in material text.
    /// Unlike the generation paths this propagates failure; the handler maps
    /// it to an error status.
    pub async fn chat(&self, message: &str, context: Option<&str>) -> Result<String> {
        let Some(provider) = &self.provider else {
            return Err(anyhow::anyhow!("AI service not available"));
        };

        let prompt = match context {
            Some(context) if !context.is_empty() => format!(
                "Based on the following study material, answer the student's question:\n\n\
                 Material: {}\n\n\
                 Question: {}\n\n\
                 Provide a clear, helpful answer.",
                truncate_chars(context, CHAT_CONTEXT_CHARS),
                message
            ),
            _ => format!("Answer this student's question: {}", message),
        };

        provider.make_request(None, &prompt).await
    }
}

/// Truncate on a char boundary; byte slicing would panic mid-codepoint.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_provider::AiProviderKind;

    fn unconfigured_service() -> AiService {
        AiService::new(&AiConfig {
            api_key: String::new(),
            base_url: None,
            provider: AiProviderKind::Gemini,
            model: None,
        })
    }

    #[test]
    fn truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte chars must not be split.
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[tokio::test]
    async fn unconfigured_service_degrades() {
        let service = unconfigured_service();
        assert!(!service.is_configured());

        assert_eq!(
            service.generate_summary("text", "standard").await,
            SUMMARY_UNAVAILABLE
        );
        assert!(service.generate_flashcards("text", 5).await.is_empty());
        assert!(service.generate_quiz("text", 5).await.is_empty());
        assert_eq!(service.detect_subject("text").await, "General");
        assert!(service.chat("question", None).await.is_err());
    }
}
