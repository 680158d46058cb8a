//! Request-level error taxonomy and its HTTP rendering.
//!
//! `Validation` is the only client error; everything else happens after
//! validation and collapses into the same generic 500 body.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use std::time::Duration;

use thiserror::Error;

use crate::protocol::{ErrorOut, MessageOut};

pub const VALIDATION_MESSAGE: &str = "É necessário informar os tópicos e o título.";
pub const GENERATION_FAILED_MESSAGE: &str = "Erro inesperado ao gerar os cards";

#[derive(Debug, Error)]
pub enum FlashcardError {
  #[error("missing topics or title")]
  Validation,
  #[error("completion service is not configured (OPENAI_API_KEY unset)")]
  NotConfigured,
  #[error("completion request failed: {0}")]
  Remote(String),
  #[error("completion request timed out after {0:?}")]
  Timeout(Duration),
  #[error("completion returned no content")]
  EmptyCompletion,
  #[error("malformed completion: {0}")]
  MalformedResponse(String),
}

impl FlashcardError {
  pub fn status(&self) -> StatusCode {
    match self {
      FlashcardError::Validation => StatusCode::BAD_REQUEST,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for FlashcardError {
  fn into_response(self) -> Response {
    let status = self.status();
    match self {
      FlashcardError::Validation => {
        (status, Json(MessageOut { message: VALIDATION_MESSAGE.into() })).into_response()
      }
      other => (
        status,
        Json(ErrorOut { message: GENERATION_FAILED_MESSAGE.into(), error: other.to_string() }),
      )
        .into_response(),
    }
  }
}
