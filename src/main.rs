//! Briskly · AI-powered flashcards backend
//!
//! - Axum HTTP API: `/healthcheck` and `/ai-powered-flashcards`
//! - OpenAI chat completions turn a title + topics into short Q/A cards
//! - Origin allow-list in front of every route
//!
//! Important env variables:
//!   PORT                    : u16 (default 3333), bound on 0.0.0.0
//!   OPENAI_API_KEY          : required for generation; without it requests fail with 500
//!   OPENAI_BASE_URL         : default "https://api.openai.com/v1"
//!   OPENAI_MODEL            : default "gpt-3.5-turbo"
//!   ALLOWED_ORIGIN_HOSTS    : comma-separated hostnames (default "localhost,briskly.vercel.app")
//!   FLASHCARDS_CONFIG_PATH  : optional TOML (allow-list, response shape, prompt template)
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod state;
mod protocol;
mod logic;
mod openai;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServiceConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = ServiceConfig::from_env();

  // Completion client is built once here and shared read-only.
  let state = Arc::new(AppState::new(&cfg));

  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "flashcards", %addr, "HTTP server running");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "flashcards", "HTTP server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "flashcards", error = %e, "Failed to listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
}
