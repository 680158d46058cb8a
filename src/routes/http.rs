//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Query, State}, Json, response::{IntoResponse, Response}};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::error::FlashcardError;
use crate::logic::{generate_flashcards, prompt_spec, validate};
use crate::protocol::{FlashcardQuery, MessageOut};
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_healthcheck() -> impl IntoResponse {
  Json(MessageOut { message: "OK".into() })
}

#[instrument(level = "info", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn http_get_flashcards(
  State(state): State<Arc<AppState>>,
  Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
  let req = match validate(FlashcardQuery::from_pairs(pairs)) {
    Ok(req) => req,
    Err(e) => {
      info!(target: "flashcards", "Rejected request without topics or title");
      return e.into_response();
    }
  };

  // thread_rng is !Send; keep it out of the await below.
  let spec = {
    let mut rng = rand::thread_rng();
    prompt_spec(&req, &mut rng)
  };
  info!(target: "flashcards", title = %spec.title, topics = %spec.joined_topics(), available = req.topics.len(), "Generating flashcards");

  let result = match &state.completion {
    Some(completion) => {
      generate_flashcards(completion.as_ref(), &state.prompts, state.response_shape, &spec).await
    }
    None => Err(FlashcardError::NotConfigured),
  };

  match result {
    Ok(cards) => Json(cards).into_response(),
    Err(e) => {
      error!(target: "flashcards", error = %e, "Flashcard generation failed");
      e.into_response()
    }
  }
}
