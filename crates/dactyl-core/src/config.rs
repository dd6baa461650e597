//! Configuration management for Dactyl
//!
//! Two layers: provider credentials come from the environment and are
//! validated up front, before any gateway call; loop defaults and output
//! paths come from an optional `.dactyl/config.toml` in the working
//! directory.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::{DactylError, Result};

/// Environment variable holding the OpenRouter API key
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
/// Environment variable holding the provider base URL
pub const BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";
/// Environment variable holding the model identifier
pub const MODEL_ENV: &str = "MODEL";

/// Provider connection settings, passed explicitly into the gateway client
///
/// There is no process-global client; whoever constructs the gateway owns
/// the configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the OpenAI-compatible endpoint
    pub base_url: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// Model identifier, e.g. `anthropic/claude-3.5-sonnet`
    pub model: String,
}

impl GatewayConfig {
    /// Read provider settings from the environment
    ///
    /// Every missing variable is reported in one error so the user can fix
    /// them all at once. This runs before the first gateway call; a missing
    /// credential is a configuration error, never a mid-loop failure.
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();

        let api_key = read_env(API_KEY_ENV, &mut missing);
        let base_url = read_env(BASE_URL_ENV, &mut missing);
        let model = read_env(MODEL_ENV, &mut missing);

        match (api_key, base_url, model) {
            (Some(api_key), Some(base_url), Some(model)) => Ok(Self {
                base_url,
                api_key,
                model,
            }),
            _ => Err(DactylError::Config(format!(
                "Missing required environment variables: {}. Set them in your environment or .env file.",
                missing.join(", ")
            ))),
        }
    }

    /// Override the model identifier (e.g. from a CLI flag)
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

fn read_env(name: &'static str, missing: &mut Vec<&'static str>) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => {
            missing.push(name);
            None
        }
    }
}

/// Repository-level Dactyl configuration
///
/// Loaded from `.dactyl/config.toml` in the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DactylConfig {
    /// Loop execution defaults
    #[serde(default)]
    pub loop_defaults: LoopDefaults,

    /// Output file locations
    #[serde(default)]
    pub output: OutputConfig,
}

/// Default loop execution parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopDefaults {
    /// Maximum rejected rounds before giving up
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Maximum tokens per agent response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Per-call timeout for gateway requests, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Output file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Append-only NDJSON round log
    #[serde(default = "default_round_log")]
    pub round_log: String,

    /// Final approved poem, written only on approval
    #[serde(default = "default_final_poem")]
    pub final_poem: String,
}

// Default value providers
fn default_max_rounds() -> usize {
    8
}

fn default_max_tokens() -> usize {
    2000
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_round_log() -> String {
    "poem_log.ndjson".to_string()
}

fn default_final_poem() -> String {
    "final_poem.txt".to_string()
}

impl DactylConfig {
    /// Load configuration from `.dactyl/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(".dactyl/config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| DactylError::Config(format!("Failed to parse config file: {}", e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Write default configuration to `.dactyl/config.toml`
    pub fn write_default(root: &Path) -> Result<()> {
        let config_dir = root.join(".dactyl");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let config = Self::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| DactylError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

impl Default for DactylConfig {
    fn default() -> Self {
        Self {
            loop_defaults: LoopDefaults::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for LoopDefaults {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            round_log: default_round_log(),
            final_poem: default_final_poem(),
        }
    }
}
