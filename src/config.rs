use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Ask Ollama to constrain the completion to valid JSON.
    #[serde(default = "default_json_format")]
    pub json_format: bool,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            json_format: default_json_format(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "mistral".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_json_format() -> bool {
    true
}

/// What to do when the model call or reply parsing fails.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnModelError {
    /// Surface the failure to the caller; nothing is stored.
    #[default]
    Error,
    /// Store a placeholder analysis instead.
    Fallback,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub on_model_error: OnModelError,
    #[serde(default = "default_history_limit")]
    pub history_limit: i64,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            on_model_error: OnModelError::default(),
            history_limit: default_history_limit(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

fn default_history_limit() -> i64 {
    10
}
fn default_max_input_chars() -> usize {
    100_000
}

impl Config {
    /// Defaults for every table, with the database at `db_path`.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            server: ServerConfig {
                bind: "127.0.0.1:5000".to_string(),
            },
            ollama: OllamaConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate ollama
    if config.ollama.model.trim().is_empty() {
        anyhow::bail!("ollama.model must not be empty");
    }
    if config.ollama.timeout_secs == 0 {
        anyhow::bail!("ollama.timeout_secs must be > 0");
    }
    if !(config.ollama.url.starts_with("http://") || config.ollama.url.starts_with("https://")) {
        anyhow::bail!(
            "ollama.url must start with http:// or https://, got '{}'",
            config.ollama.url
        );
    }

    // Validate analysis
    if config.analysis.history_limit < 1 {
        anyhow::bail!("analysis.history_limit must be >= 1");
    }
    if config.analysis.max_input_chars == 0 {
        anyhow::bail!("analysis.max_input_chars must be > 0");
    }

    Ok(())
}
