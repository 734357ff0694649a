use std::time::Duration;

use async_trait::async_trait;
use opsdeck_core::AgentError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One completion from the provider. Token counts are absent when the
/// provider reports no usage metadata; callers emit no usage event then.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

impl Completion {
    /// Usage counts when the provider reported any, missing halves as zero.
    pub fn usage(&self) -> Option<(u32, u32)> {
        if self.input_tokens.is_none() && self.output_tokens.is_none() {
            return None;
        }
        Some((self.input_tokens.unwrap_or(0), self.output_tokens.unwrap_or(0)))
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<Completion, AgentError>;
}

/// Live client for the Anthropic messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: SecretString,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|error| AgentError::Provider(error.to_string()))?;

        Ok(Self { http, api_key, model: model.into() })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<Completion, AgentError> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "system": system,
            "messages": [{ "role": "user", "content": user }],
        });

        let response = self
            .http
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|error| AgentError::Provider(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider(format!("{status}: {detail}")));
        }

        let message: MessagesResponse = response
            .json()
            .await
            .map_err(|error| AgentError::Provider(error.to_string()))?;

        let text = message
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(Completion {
            text,
            input_tokens: message.usage.as_ref().map(|usage| usage.input_tokens),
            output_tokens: message.usage.as_ref().map(|usage| usage.output_tokens),
        })
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::Completion;

    #[test]
    fn usage_absent_when_provider_reported_none() {
        let completion =
            Completion { text: "ok".to_string(), input_tokens: None, output_tokens: None };
        assert_eq!(completion.usage(), None);
    }

    #[test]
    fn usage_fills_missing_half_with_zero() {
        let completion =
            Completion { text: "ok".to_string(), input_tokens: Some(12), output_tokens: None };
        assert_eq!(completion.usage(), Some((12, 0)));
    }
}
