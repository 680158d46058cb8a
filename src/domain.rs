//! Domain models: the validated request, the prompt parameters derived from it,
//! and the flashcard handed back to the frontend.

use serde::{Deserialize, Serialize};

/// Cards requested from the model per call.
pub const CARD_COUNT: usize = 3;
/// Upper bound (in characters) asked for each answer.
pub const MAX_CHARS_PER_ANSWER: usize = 65;
/// At most this many topics make it into a single prompt.
pub const MAX_SELECTED_TOPICS: usize = 3;
/// Separator used when joining the selected topics ("or" in Portuguese).
pub const TOPIC_SEPARATOR: &str = " ou ";

/// Input that passed the presence checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlashcardRequest {
  pub topics: Vec<String>,
  pub title: String,
}

/// Everything the prompt template needs for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptSpec {
  pub title: String,
  pub selected_topics: Vec<String>,
  pub card_count: usize,
  pub max_chars_per_answer: usize,
}

impl PromptSpec {
  pub fn joined_topics(&self) -> String {
    self.selected_topics.join(TOPIC_SEPARATOR)
  }

  /// Token budget for the completion. A heuristic ceiling, not an exact count.
  pub fn max_tokens(&self) -> u32 {
    (self.card_count * self.max_chars_per_answer) as u32
  }
}

/// JSON layout the prompt asks for and the parser accepts.
/// Exactly one is active per deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
  /// `{"flashcards": [{"question": ..., "answer": ...}]}`
  #[default]
  Wrapped,
  /// `[{"question": ..., "answer": ...}]`
  BareArray,
}

impl ResponseShape {
  /// Example appended to the prompt so the model mirrors the expected layout.
  pub fn prompt_example(self) -> &'static str {
    match self {
      ResponseShape::Wrapped => r#"{ flashcards: [{ question: "pergunta", answer: "resposta"}, ...] }"#,
      ResponseShape::BareArray => r#"[{ question: "pergunta", answer: "resposta"}, ...]"#,
    }
  }

  /// The provider's JSON mode only produces objects, so it is limited to `Wrapped`.
  pub fn wants_json_object(self) -> bool {
    matches!(self, ResponseShape::Wrapped)
  }
}

/// Card returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
  pub question: String,
  /// Single answer; the plural name is what the frontend expects.
  pub valid_answers: String,
  pub is_ai_powered: bool,
}
