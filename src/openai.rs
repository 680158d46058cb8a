//! Chat-completion client.
//!
//! `CompletionService` is the seam the handler depends on; `OpenAI` is the
//! production implementation over an OpenAI-compatible `/chat/completions`.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to avoid PII leaks.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::FlashcardError;

/// Hard ceiling on a single completion call.
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// One completion call, provider-agnostic.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
  pub prompt: String,
  pub n: u8,
  pub temperature: f32,
  pub max_tokens: u32,
  /// Ask the provider for a JSON object response.
  pub json_object: bool,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
  /// Text of the first choice, `None` if the provider produced none.
  async fn complete(&self, req: &CompletionRequest) -> Result<Option<String>, FlashcardError>;
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
}

impl std::fmt::Debug for OpenAI {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OpenAI")
      .field("base_url", &self.base_url)
      .field("model", &self.model)
      .field("timeout", &self.timeout)
      .finish_non_exhaustive()
  }
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model =
      std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".into());

    match Self::new(api_key, base_url, model) {
      Ok(oa) => Some(oa),
      Err(e) => {
        error!(target: "flashcards", error = %e, "Failed to build HTTP client for OpenAI");
        None
      }
    }
  }

  pub fn new(api_key: String, base_url: String, model: String) -> Result<Self, reqwest::Error> {
    Self::with_timeout(api_key, base_url, model, COMPLETION_TIMEOUT)
  }

  pub(crate) fn with_timeout(
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
  ) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()?;
    let base_url = base_url.trim_end_matches('/').to_string();
    Ok(Self { client, api_key, base_url, model, timeout })
  }

  fn transport_error(&self, e: reqwest::Error) -> FlashcardError {
    if e.is_timeout() {
      FlashcardError::Timeout(self.timeout)
    } else {
      FlashcardError::Remote(e.to_string())
    }
  }
}

#[async_trait]
impl CompletionService for OpenAI {
  #[instrument(level = "info", skip(self, req), fields(model = %self.model, prompt_len = req.prompt.len(), max_tokens = req.max_tokens))]
  async fn complete(&self, req: &CompletionRequest) -> Result<Option<String>, FlashcardError> {
    let url = format!("{}/chat/completions", self.base_url);
    let body = ChatCompletionRequest {
      model: self.model.clone(),
      n: req.n,
      temperature: req.temperature,
      messages: vec![ChatMessageReq { role: "user".into(), content: req.prompt.clone() }],
      max_tokens: Some(req.max_tokens),
      response_format: req.json_object.then(|| ResponseFormat { r#type: "json_object".into() }),
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "briskly-flashcards-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&body).send().await.map_err(|e| self.transport_error(e))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      error!(%status, elapsed = ?start.elapsed(), "OpenAI rejected completion request");
      return Err(FlashcardError::Remote(format!("OpenAI HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| self.transport_error(e))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.into_iter().next().and_then(|c| c.message.content);
    info!(elapsed = ?start.elapsed(), content_len = text.as_ref().map(|t| t.len()).unwrap_or(0), "Model response received");
    Ok(text)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  n: u8,
  temperature: f32,
  messages: Vec<ChatMessageReq>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { #[serde(default)] content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
