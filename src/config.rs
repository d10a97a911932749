//! Runtime configuration for codegen-relay.
//!
//! Connection settings (bearer token, upstream URL, listen address, timeout)
//! come from the command line or the environment, optionally seeded from a
//! `.env` file. Generation settings (model, limits, system prompt) live in an
//! optional JSON file and fall back to built-in defaults.
//!
//! Everything here is read once at startup and handed to the server as an
//! immutable [`RelayConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upstream used when `AIPIPE_BASE_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "https://aipipe.org/openai/v1";

/// Connect/read timeout for the outbound client.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Command-line arguments. Every connection flag can also be set from the
/// environment.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "codegen-relay",
    version,
    about = "Streaming SSE relay for an OpenAI-compatible chat-completions API"
)]
pub struct Cli {
    /// Path to the generation settings file (JSON).
    #[arg(short, long, env = "RELAY_CONFIG", default_value = "relay.json")]
    pub config: PathBuf,

    /// HTTP listen address.
    #[arg(long, env = "RELAY_LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: String,

    /// Bearer token sent to the upstream API.
    #[arg(long, env = "AIPIPE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Base URL of the upstream chat-completions API.
    #[arg(long, env = "AIPIPE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Connect and read timeout for upstream calls, in seconds.
    #[arg(long, env = "RELAY_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "RELAY_LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    /// Load `.env` (if present) into the process environment, then parse
    /// arguments so that env-backed flags see its values.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Cli::parse()
    }
}

/// Process-wide relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub upstream: UpstreamConfig,
    pub generation: GenerationConfig,
}

impl RelayConfig {
    /// Assemble the configuration from parsed arguments plus the settings file.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let file = FileConfig::load(&cli.config)?;
        let upstream = UpstreamConfig::new(&cli.base_url, cli.token.clone())
            .with_timeout(Duration::from_secs(cli.timeout_secs));

        Ok(Self {
            upstream,
            generation: file.generation,
        })
    }
}

/// Where and how to reach the upstream API.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,

    /// Bearer token. `None` when unset or empty.
    token: Option<String>,

    /// Connect and read timeout.
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Full URL of the streaming chat-completions endpoint.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Fixed parameters of every upstream chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Upstream model identifier.
    pub model: String,

    /// Completion token limit.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f64,

    /// System message sent ahead of the wrapped prompt.
    pub system_prompt: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 1800,
            temperature: 0.6,
            system_prompt: "You are a senior Java developer.".to_string(),
        }
    }
}

/// On-disk settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub generation: GenerationConfig,
}

impl FileConfig {
    /// Load settings from a JSON file, falling back to defaults when the file
    /// does not exist. Missing fields take their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
