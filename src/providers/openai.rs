use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::base::{Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::types::{message::Message, tool::Tool};
use super::utils::{
    check_openai_context_length_error, get_usage, messages_to_openai_spec,
    openai_response_to_message, tools_to_openai_spec,
};

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.host.trim_end_matches('/'))
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = self.endpoint();
        tracing::debug!(%url, model = %self.config.model, "sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status => {
                let body = response.text().await.unwrap_or_default();
                // Error bodies usually carry an `error` object worth surfacing
                if let Ok(parsed) = serde_json::from_str::<Value>(&body) {
                    if let Some(error) = parsed.get("error") {
                        if let Some(err) = check_openai_context_length_error(error) {
                            return Err(err.into());
                        }
                        return Err(anyhow!("Request failed: {}\n{}", status, error));
                    }
                }
                Err(anyhow!("Request failed: {}\n{}", status, body))
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let system_message = json!({
            "role": "system",
            "content": system
        });

        let mut messages_array = vec![system_message];
        messages_array.extend(messages_to_openai_spec(messages));

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_array
        });

        if !tools.is_empty() {
            payload["tools"] = json!(tools_to_openai_spec(tools)?);
        }
        if let Some(temp) = self.config.temperature {
            payload["temperature"] = json!(temp);
        }
        if let Some(tokens) = self.config.max_tokens {
            payload["max_tokens"] = json!(tokens);
        }

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            if let Some(err) = check_openai_context_length_error(error) {
                return Err(err.into());
            }
            return Err(anyhow!("API error: {}", error));
        }

        let message = openai_response_to_message(&response)?;
        let usage = get_usage(&response);

        Ok((message, usage))
    }
}
