//! Application state: the completion client, prompts, response shape and origin allow-list.
//!
//! Built once at startup and shared read-only across requests.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::{Prompts, ServiceConfig};
use crate::domain::ResponseShape;
use crate::openai::{CompletionService, OpenAI};

#[derive(Clone)]
pub struct AppState {
    pub completion: Option<Arc<dyn CompletionService>>,
    pub prompts: Prompts,
    pub response_shape: ResponseShape,
    pub allowed_hosts: Vec<String>,
}

impl AppState {
    /// Build state from config and env: init the OpenAI client if a key is present.
    #[instrument(level = "info", skip_all)]
    pub fn new(cfg: &ServiceConfig) -> Self {
        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "flashcards", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            warn!(target: "flashcards", "OpenAI disabled (no OPENAI_API_KEY). Flashcard generation will fail.");
        }
        info!(target: "flashcards", shape = ?cfg.response_shape, allowed_hosts = ?cfg.allowed_hosts, "Service configured");

        Self::with_completion(cfg, openai.map(|oa| Arc::new(oa) as Arc<dyn CompletionService>))
    }

    /// Same as `new` but with an injected completion service.
    pub fn with_completion(cfg: &ServiceConfig, completion: Option<Arc<dyn CompletionService>>) -> Self {
        Self {
            completion,
            prompts: cfg.prompts.clone(),
            response_shape: cfg.response_shape,
            allowed_hosts: cfg.allowed_hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
        }
    }

    /// Whether an `Origin` header value belongs to an allow-listed hostname.
    pub fn origin_allowed(&self, origin: &str) -> bool {
        match origin_hostname(origin) {
            Some(host) => self.allowed_hosts.iter().any(|h| *h == host),
            None => false,
        }
    }
}

/// Hostname of an origin like `https://briskly.vercel.app` or `http://localhost:5173`.
fn origin_hostname(origin: &str) -> Option<String> {
    let uri: axum::http::Uri = origin.parse().ok()?;
    uri.scheme()?;
    uri.host().map(|h| h.to_ascii_lowercase())
}
