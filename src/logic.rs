//! Core flashcard generation, independent of HTTP.
//!
//! validate → sample topics → render prompt → one completion call → parse → normalize.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::config::Prompts;
use crate::domain::{
  Flashcard, FlashcardRequest, PromptSpec, ResponseShape, CARD_COUNT, MAX_CHARS_PER_ANSWER,
  MAX_SELECTED_TOPICS,
};
use crate::error::FlashcardError;
use crate::openai::{CompletionRequest, CompletionService};
use crate::protocol::FlashcardQuery;
use crate::util::{fill_template, trim_and_remove_double_quotes, trunc_for_log};

/// Favors variety over determinism.
pub const TEMPERATURE: f32 = 0.8;
pub const SAMPLE_COUNT: u8 = 1;

/// Presence checks only: at least one topic and a non-empty title.
/// Topics are taken as given.
pub fn validate(q: FlashcardQuery) -> Result<FlashcardRequest, FlashcardError> {
  match q.title.filter(|t| !t.is_empty()) {
    Some(title) if !q.topics.is_empty() => Ok(FlashcardRequest { topics: q.topics, title }),
    _ => Err(FlashcardError::Validation),
  }
}

/// Shuffle and keep 1..=3 topics. Lists shorter than three are kept whole.
pub fn sample_topics<R: Rng + ?Sized>(topics: &[String], rng: &mut R) -> Vec<String> {
  let mut shuffled = topics.to_vec();
  shuffled.shuffle(rng);
  if shuffled.len() >= MAX_SELECTED_TOPICS {
    let count = rng.gen_range(1..=MAX_SELECTED_TOPICS);
    shuffled.truncate(count);
  }
  shuffled
}

pub fn prompt_spec<R: Rng + ?Sized>(req: &FlashcardRequest, rng: &mut R) -> PromptSpec {
  PromptSpec {
    title: req.title.clone(),
    selected_topics: sample_topics(&req.topics, rng),
    card_count: CARD_COUNT,
    max_chars_per_answer: MAX_CHARS_PER_ANSWER,
  }
}

pub fn build_prompt(prompts: &Prompts, spec: &PromptSpec, shape: ResponseShape) -> String {
  let card_count = spec.card_count.to_string();
  let max_chars = spec.max_chars_per_answer.to_string();
  let topics = spec.joined_topics();
  fill_template(
    &prompts.flashcards_user_template,
    &[
      ("title", spec.title.as_str()),
      ("card_count", card_count.as_str()),
      ("max_chars", max_chars.as_str()),
      ("topics", topics.as_str()),
      ("shape", shape.prompt_example()),
    ],
  )
}

#[derive(Deserialize)]
struct RawCard {
  question: String,
  answer: String,
}

#[derive(Deserialize)]
struct Wrapped {
  flashcards: Vec<RawCard>,
}

/// Strict parse of the model output for the deployment's shape.
/// Any mismatch fails the whole batch.
pub fn parse_completion(text: &str, shape: ResponseShape) -> Result<Vec<Flashcard>, FlashcardError> {
  let malformed = |e: serde_json::Error| FlashcardError::MalformedResponse(e.to_string());
  let raw = match shape {
    ResponseShape::Wrapped => serde_json::from_str::<Wrapped>(text).map_err(malformed)?.flashcards,
    ResponseShape::BareArray => serde_json::from_str::<Vec<RawCard>>(text).map_err(malformed)?,
  };
  Ok(raw.into_iter().map(normalize).collect())
}

fn normalize(raw: RawCard) -> Flashcard {
  Flashcard {
    question: trim_and_remove_double_quotes(&raw.question),
    valid_answers: trim_and_remove_double_quotes(&raw.answer),
    is_ai_powered: true,
  }
}

/// One completion call for an already-built prompt spec, then parse.
#[instrument(level = "info", skip_all, fields(topics = spec.selected_topics.len(), ?shape))]
pub async fn generate_flashcards(
  completion: &dyn CompletionService,
  prompts: &Prompts,
  shape: ResponseShape,
  spec: &PromptSpec,
) -> Result<Vec<Flashcard>, FlashcardError> {
  let prompt = build_prompt(prompts, spec, shape);
  debug!(target: "flashcards", prompt = %trunc_for_log(&prompt, 200), "Prompt rendered");

  let req = CompletionRequest {
    prompt,
    n: SAMPLE_COUNT,
    temperature: TEMPERATURE,
    max_tokens: spec.max_tokens(),
    json_object: shape.wants_json_object(),
  };

  let text = completion
    .complete(&req)
    .await?
    .filter(|t| !t.trim().is_empty())
    .ok_or(FlashcardError::EmptyCompletion)?;

  let cards = parse_completion(&text, shape).map_err(|e| {
    debug!(target: "flashcards", raw = %trunc_for_log(&text, 300), "Unparseable completion");
    e
  })?;
  info!(target: "flashcards", cards = cards.len(), "Flashcards generated");
  Ok(cards)
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use std::sync::Mutex;

  use async_trait::async_trait;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  /// Fake completion service: replays a canned result and records requests.
  pub(crate) struct FakeCompletion {
    pub reply: Result<Option<String>, String>,
    pub calls: Mutex<Vec<CompletionRequest>>,
  }

  impl FakeCompletion {
    pub fn replying(text: Option<&str>) -> Self {
      Self { reply: Ok(text.map(str::to_string)), calls: Mutex::new(Vec::new()) }
    }

    pub fn failing(detail: &str) -> Self {
      Self { reply: Err(detail.to_string()), calls: Mutex::new(Vec::new()) }
    }

    pub fn call_count(&self) -> usize {
      self.calls.lock().unwrap().len()
    }
  }

  #[async_trait]
  impl CompletionService for FakeCompletion {
    async fn complete(&self, req: &CompletionRequest) -> Result<Option<String>, FlashcardError> {
      self.calls.lock().unwrap().push(req.clone());
      self.reply.clone().map_err(FlashcardError::Remote)
    }
  }

  fn topics(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("t{i}")).collect()
  }

  fn spec(selected: &[&str]) -> PromptSpec {
    PromptSpec {
      title: "Programação".into(),
      selected_topics: selected.iter().map(|s| s.to_string()).collect(),
      card_count: CARD_COUNT,
      max_chars_per_answer: MAX_CHARS_PER_ANSWER,
    }
  }

  #[test]
  fn validate_requires_topics_and_title() {
    let ok = validate(FlashcardQuery { topics: vec!["Rust".into()], title: Some("Linguagens".into()) });
    assert_eq!(ok.unwrap(), FlashcardRequest { topics: vec!["Rust".into()], title: "Linguagens".into() });

    let cases = [
      FlashcardQuery { topics: vec![], title: Some("t".into()) },
      FlashcardQuery { topics: vec!["Rust".into()], title: None },
      FlashcardQuery { topics: vec!["Rust".into()], title: Some("".into()) },
    ];
    for q in cases {
      assert!(matches!(validate(q), Err(FlashcardError::Validation)));
    }
  }

  #[test]
  fn validate_checks_presence_only() {
    let req = validate(FlashcardQuery { topics: vec!["Rust".into()], title: Some(" ".into()) }).unwrap();
    assert_eq!(req.title, " ");

    let req = validate(FlashcardQuery {
      topics: vec!["".into(), "Go".into()],
      title: Some("t".into()),
    })
    .unwrap();
    assert_eq!(req.topics, vec!["".to_string(), "Go".to_string()]);
  }

  #[test]
  fn sample_size_is_one_to_three_for_long_lists() {
    let all = topics(6);
    let mut seen = [false; 4];
    for seed in 0..200 {
      let mut rng = StdRng::seed_from_u64(seed);
      let picked = sample_topics(&all, &mut rng);
      assert!((1..=3).contains(&picked.len()), "got {}", picked.len());
      seen[picked.len()] = true;

      let mut dedup = picked.clone();
      dedup.sort();
      dedup.dedup();
      assert_eq!(dedup.len(), picked.len(), "drawn without replacement");
      assert!(picked.iter().all(|t| all.contains(t)));
    }
    assert!(seen[1] && seen[2] && seen[3], "every size should show up");
  }

  #[test]
  fn short_lists_are_kept_whole() {
    for n in 1..3 {
      let all = topics(n);
      for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut picked = sample_topics(&all, &mut rng);
        picked.sort();
        assert_eq!(picked, all);
      }
    }
  }

  #[test]
  fn sampling_is_deterministic_for_a_seed() {
    let all = topics(10);
    let a = sample_topics(&all, &mut StdRng::seed_from_u64(7));
    let b = sample_topics(&all, &mut StdRng::seed_from_u64(7));
    assert_eq!(a, b);
  }

  #[test]
  fn prompt_mentions_title_topics_and_limits() {
    let prompt = build_prompt(&Prompts::default(), &spec(&["Rust", "Go"]), ResponseShape::Wrapped);
    assert!(prompt.contains("contexto Programação"));
    assert!(prompt.contains("sobre Rust ou Go."));
    assert!(prompt.contains("tamanho 3"));
    assert!(prompt.contains("máximo 65 caracteres"));
    assert!(prompt.ends_with(r#"{ flashcards: [{ question: "pergunta", answer: "resposta"}, ...] }"#));
  }

  #[test]
  fn prompt_example_follows_shape() {
    let prompt = build_prompt(&Prompts::default(), &spec(&["Rust"]), ResponseShape::BareArray);
    assert!(prompt.ends_with(r#"[{ question: "pergunta", answer: "resposta"}, ...]"#));
    assert!(!prompt.contains("flashcards:"));
  }

  #[test]
  fn parses_wrapped_payload() {
    let cards = parse_completion(r#"{"flashcards":[{"question":"Q1","answer":"A1"}]}"#, ResponseShape::Wrapped).unwrap();
    assert_eq!(
      cards,
      vec![Flashcard { question: "Q1".into(), valid_answers: "A1".into(), is_ai_powered: true }]
    );
  }

  #[test]
  fn normalizes_quotes_and_whitespace() {
    let text = r#"{"flashcards":[{"question":"  O que é \"Rust\"? ","answer":" \"fast\" "}]}"#;
    let cards = parse_completion(text, ResponseShape::Wrapped).unwrap();
    assert_eq!(cards[0].question, "O que é Rust?");
    assert_eq!(cards[0].valid_answers, "fast");

    // whitespace inside the quotes goes too
    let text = r#"{"flashcards":[{"question":"\" O que é Rust? \"","answer":"\" fast \""}]}"#;
    let cards = parse_completion(text, ResponseShape::Wrapped).unwrap();
    assert_eq!(cards[0].question, "O que é Rust?");
    assert_eq!(cards[0].valid_answers, "fast");
  }

  #[test]
  fn keeps_however_many_cards_the_model_returned() {
    let text = r#"[{"question":"a","answer":"1"},{"question":"b","answer":"2"},{"question":"c","answer":"3"},{"question":"d","answer":"4"}]"#;
    assert_eq!(parse_completion(text, ResponseShape::BareArray).unwrap().len(), 4);
  }

  #[test]
  fn rejects_other_shape_and_missing_fields() {
    let bare = r#"[{"question":"Q","answer":"A"}]"#;
    let wrapped = r#"{"flashcards":[{"question":"Q","answer":"A"}]}"#;
    assert!(matches!(parse_completion(bare, ResponseShape::Wrapped), Err(FlashcardError::MalformedResponse(_))));
    assert!(matches!(parse_completion(wrapped, ResponseShape::BareArray), Err(FlashcardError::MalformedResponse(_))));

    // one bad element fails the batch
    let partial = r#"{"flashcards":[{"question":"Q","answer":"A"},{"question":"Q2"}]}"#;
    assert!(matches!(parse_completion(partial, ResponseShape::Wrapped), Err(FlashcardError::MalformedResponse(_))));

    let wrong_type = r#"{"flashcards":[{"question":"Q","answer":42}]}"#;
    assert!(parse_completion(wrong_type, ResponseShape::Wrapped).is_err());

    assert!(parse_completion("not json", ResponseShape::Wrapped).is_err());
  }

  #[tokio::test]
  async fn issues_one_call_with_fixed_parameters() {
    let fake = FakeCompletion::replying(Some(r#"{"flashcards":[{"question":"Q1","answer":"A1"}]}"#));
    let cards = generate_flashcards(&fake, &Prompts::default(), ResponseShape::Wrapped, &spec(&["Rust", "Go"]))
      .await
      .unwrap();
    assert_eq!(cards.len(), 1);

    let calls = fake.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let req = &calls[0];
    assert_eq!(req.n, 1);
    assert!((req.temperature - 0.8).abs() < f32::EPSILON);
    assert_eq!(req.max_tokens, 195);
    assert!(req.json_object);
    assert!(req.prompt.contains("Programação"));
    assert!(req.prompt.contains("Rust ou Go"));
  }

  #[tokio::test]
  async fn empty_or_blank_completion_is_an_error() {
    for reply in [None, Some(""), Some("  \n")] {
      let fake = FakeCompletion::replying(reply);
      let err = generate_flashcards(&fake, &Prompts::default(), ResponseShape::Wrapped, &spec(&["Rust"]))
        .await
        .unwrap_err();
      assert!(matches!(err, FlashcardError::EmptyCompletion));
    }
  }

  #[tokio::test]
  async fn remote_failure_propagates() {
    let fake = FakeCompletion::failing("quota exceeded");
    let err = generate_flashcards(&fake, &Prompts::default(), ResponseShape::Wrapped, &spec(&["Rust"]))
      .await
      .unwrap_err();
    assert!(matches!(err, FlashcardError::Remote(ref d) if d == "quota exceeded"));
  }
}
