//! `anglish.toml` configuration.
//!
//! Precedence, lowest first: the config file, then `OPENAI_*` environment
//! variables (a `.env` in the working directory is loaded into the
//! environment first), then command-line flags (applied by the caller).

use std::path::{Path, PathBuf};

use anglish_core::{OrderOptions, ParseOptions};
use serde::{Deserialize, Serialize};

/// File picked up from the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "anglish.toml";

pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "OPENAI_MODEL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub parse: ParseOptions,
    #[serde(default)]
    pub order: OrderOptions,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

/// `[prompts]`: where system prompt files live. Built-in texts otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptsConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// `[endpoint]`: the OpenAI-compatible completion server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Environment only; never read from or written to the file.
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub initial_backoff_ms: Option<u64>,
}

impl EndpointConfig {
    /// Overlay non-empty `OPENAI_*` variables from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_BASE_URL) {
            self.base_url = Some(v);
        }
        if let Some(v) = get(ENV_MODEL) {
            self.model = Some(v);
        }
        if let Some(v) = get(ENV_API_KEY) {
            self.api_key = Some(v);
        }
    }
}

impl Settings {
    /// Load from `explicit`, or from `./anglish.toml` if present, then
    /// overlay the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match explicit {
            Some(path) => Settings::from_file(path)?,
            None => {
                let path = Path::new(CONFIG_FILE_NAME);
                if path.is_file() {
                    Settings::from_file(path)?
                } else {
                    Settings::default()
                }
            }
        };
        settings.endpoint.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading config");
        Settings::from_toml(&src).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(src: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(src)
    }
}
