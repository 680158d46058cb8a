//! Service configuration: env variables first, optional TOML file underneath.
//!
//! TOML schema (all keys optional):
//!
//! ```toml
//! allowed_hosts = ["localhost", "briskly.vercel.app"]
//! response_shape = "wrapped"        # or "bare_array"
//!
//! [prompts]
//! flashcards_user_template = "..."  # placeholders: {title} {card_count} {max_chars} {topics} {shape}
//! ```

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::ResponseShape;

pub const DEFAULT_PORT: u16 = 3333;
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &["localhost", "briskly.vercel.app"];

/// Raw file contents. Anything missing falls back to defaults.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct FileConfig {
  #[serde(default)] pub allowed_hosts: Option<Vec<String>>,
  #[serde(default)] pub response_shape: Option<ResponseShape>,
  #[serde(default)] pub prompts: Prompts,
}

/// Prompt templates sent to the completion service.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub flashcards_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      flashcards_user_template: "Levando em conta o contexto {title}, gere um Array JSON válido de tamanho {card_count} com perguntas e respostas curtas e diretas, de no máximo {max_chars} caracteres, sobre {topics}. {shape}".into(),
    }
  }
}

/// Resolved configuration the server runs with.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
  pub port: u16,
  pub allowed_hosts: Vec<String>,
  pub response_shape: ResponseShape,
  pub prompts: Prompts,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      port: DEFAULT_PORT,
      allowed_hosts: DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect(),
      response_shape: ResponseShape::default(),
      prompts: Prompts::default(),
    }
  }
}

impl ServiceConfig {
  /// Read `FLASHCARDS_CONFIG_PATH` (if set), then apply `PORT` and
  /// `ALLOWED_ORIGIN_HOSTS` on top.
  pub fn from_env() -> Self {
    let file = load_file_config_from_env();
    Self::resolve(
      file,
      std::env::var("PORT").ok().as_deref(),
      std::env::var("ALLOWED_ORIGIN_HOSTS").ok().as_deref(),
    )
  }

  fn resolve(file: Option<FileConfig>, port: Option<&str>, hosts: Option<&str>) -> Self {
    let mut cfg = ServiceConfig::default();
    if let Some(file) = file {
      if let Some(h) = file.allowed_hosts { cfg.allowed_hosts = h; }
      if let Some(s) = file.response_shape { cfg.response_shape = s; }
      cfg.prompts = file.prompts;
    }
    if let Some(p) = port {
      match p.parse::<u16>() {
        Ok(p) => cfg.port = p,
        Err(e) => error!(target: "flashcards", port = %p, error = %e, "Ignoring invalid PORT"),
      }
    }
    if let Some(h) = hosts {
      cfg.allowed_hosts = parse_host_list(h);
    }
    cfg
  }
}

/// Comma-separated hostnames; blanks are skipped and case is folded.
pub fn parse_host_list(raw: &str) -> Vec<String> {
  raw.split(',')
    .map(|h| h.trim().to_ascii_lowercase())
    .filter(|h| !h.is_empty())
    .collect()
}

/// Attempt to load `FileConfig` from FLASHCARDS_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_file_config_from_env() -> Option<FileConfig> {
  let path = std::env::var("FLASHCARDS_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<FileConfig>(&s) {
      Ok(cfg) => {
        info!(target: "flashcards", %path, "Loaded service config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "flashcards", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "flashcards", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
