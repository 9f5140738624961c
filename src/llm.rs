//! Language-model client used for intent parsing.
//!
//! Defines the [`LanguageModel`] trait and two implementations:
//! - **[`DisabledModel`]**: always errors; the intent parser then falls back.
//! - **[`OpenAiChatModel`]**: one call to an OpenAI-compatible
//!   chat-completions endpoint in JSON mode.
//!
//! Each request is sent once with no retry; on any error the caller uses its
//! deterministic fallback.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::IntentConfig;

pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// A model that answers a system + user prompt with raw text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier for logs.
    fn name(&self) -> &str;

    /// Send one request and return the reply text.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Used when `intent.provider = "disabled"`.
pub struct DisabledModel;

#[async_trait]
impl LanguageModel for DisabledModel {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        bail!("Intent model is disabled")
    }
}

/// Chat-completions client.
///
/// Sends `response_format: {"type": "json_object"}` and `temperature: 0`,
/// and returns `choices[0].message.content`.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiChatModel {
    pub fn new(config: &IntentConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("intent.model required for OpenAI provider"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_URL.to_string()),
            model,
            api_key: std::env::var(&config.api_key_env).ok(),
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Chat API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

/// Extract the first choice's message content.
pub fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Invalid chat response: missing choices[0].message.content"))
}

/// Build the configured model.
///
/// An `openai` provider without an API key still gets a client; endpoints
/// that need a key will reject the call and the parser falls back.
pub fn create_model(config: &IntentConfig) -> Result<Arc<dyn LanguageModel>> {
    if !config.is_enabled() {
        return Ok(Arc::new(DisabledModel));
    }
    match config.provider.as_str() {
        "openai" => {
            let model = OpenAiChatModel::new(config)?;
            if model.api_key.is_none() {
                tracing::warn!(
                    env = %config.api_key_env,
                    "API key not set; intent requests will be sent unauthenticated"
                );
            }
            Ok(Arc::new(model))
        }
        other => bail!("Unknown intent provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_chat_response() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"keywords\":[]}" } }]
        });
        assert_eq!(parse_chat_response(&body).unwrap(), "{\"keywords\":[]}");
        assert!(parse_chat_response(&json!({ "choices": [] })).is_err());
        assert!(parse_chat_response(&json!({ "error": "nope" })).is_err());
    }

    #[tokio::test]
    async fn test_disabled_model_errors() {
        let model = DisabledModel;
        assert_eq!(model.name(), "disabled");
        assert!(model.complete("s", "u").await.is_err());
    }

    #[test]
    fn test_create_model_by_provider() {
        let disabled = create_model(&IntentConfig::default()).unwrap();
        assert_eq!(disabled.name(), "disabled");

        let openai = IntentConfig {
            provider: "openai".into(),
            model: Some("gpt-4o-mini".into()),
            ..IntentConfig::default()
        };
        assert_eq!(create_model(&openai).unwrap().name(), "gpt-4o-mini");

        let bogus = IntentConfig {
            provider: "bogus".into(),
            ..IntentConfig::default()
        };
        assert!(create_model(&bogus).is_err());
    }

    #[test]
    fn test_disabled_provider_ignores_other_settings() {
        let config = IntentConfig {
            provider: "disabled".into(),
            model: Some("gpt-4o-mini".into()),
            url: Some("http://127.0.0.1:9/v1/chat/completions".into()),
            ..IntentConfig::default()
        };
        assert!(!config.is_enabled());
        assert_eq!(create_model(&config).unwrap().name(), "disabled");
    }
}
