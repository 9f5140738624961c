use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub intent: IntentConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub links: LinksConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Language-model settings for intent parsing.
#[derive(Debug, Deserialize, Clone)]
pub struct IntentConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Chat-completions endpoint; defaults to OpenAI's.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_intent_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_intent_timeout_secs(),
        }
    }
}

impl IntentConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_intent_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_per_source_limit")]
    pub per_source_limit: usize,
    #[serde(default = "default_final_limit")]
    pub final_limit: usize,
    #[serde(default = "default_adapter_timeout_ms")]
    pub adapter_timeout_ms: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    #[serde(default = "default_true")]
    pub normalize_cache_key: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            per_source_limit: default_per_source_limit(),
            final_limit: default_final_limit(),
            adapter_timeout_ms: default_adapter_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            history_cap: default_history_cap(),
            normalize_cache_key: true,
        }
    }
}

impl SearchConfig {
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_per_source_limit() -> usize {
    10
}
fn default_final_limit() -> usize {
    20
}
fn default_adapter_timeout_ms() -> u64 {
    3000
}
fn default_cache_ttl_secs() -> u64 {
    900
}
fn default_history_cap() -> usize {
    100
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LinksConfig {
    /// Prefix for every result link, e.g. `https://example.org`.
    #[serde(default)]
    pub base_url: String,
}

impl Config {
    /// Default configuration rooted at a database path. Intent parsing is
    /// disabled, so every query uses the fallback intent.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            intent: IntentConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
            links: LinksConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.search;
        if !(1..=10).contains(&s.per_source_limit) {
            bail!("search.per_source_limit must be in 1..=10");
        }
        if !(1..=20).contains(&s.final_limit) {
            bail!("search.final_limit must be in 1..=20");
        }
        if s.adapter_timeout_ms == 0 {
            bail!("search.adapter_timeout_ms must be > 0");
        }
        if s.cache_ttl_secs == 0 {
            bail!("search.cache_ttl_secs must be > 0");
        }
        if s.history_cap == 0 {
            bail!("search.history_cap must be > 0");
        }

        match self.intent.provider.as_str() {
            "disabled" => {}
            "openai" => {
                if self.intent.model.is_none() {
                    bail!("intent.model must be specified when provider is 'openai'");
                }
            }
            other => bail!(
                "Unknown intent provider: '{}'. Must be disabled or openai.",
                other
            ),
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}
