use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::AnalyzerConfig;
use crate::error::{ProviderError, SetupError};
use crate::providers::{InvokeParams, ModelProvider, ModelResponse};

/// OpenAI-compatible chat-completions provider.
///
/// The base URL is configurable so tests and proxy deployments can point it
/// anywhere that speaks the same protocol.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    /// Create a provider from configuration, falling back to the
    /// OPENAI_API_KEY environment variable for the key.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, SetupError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or(SetupError::MissingApiKey)?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());

        Ok(OpenAiProvider {
            client: Client::new(),
            api_key,
            base_url,
            model: config.model.clone(),
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        OpenAiProvider {
            client: Client::new(),
            api_key,
            base_url,
            model,
        }
    }
}

#[async_trait::async_trait]
impl ModelProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        prompt: &str,
        params: &InvokeParams,
    ) -> Result<ModelResponse, ProviderError> {
        let mut messages = Vec::new();
        if let Some(system) = &params.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "temperature": params.temperature,
                "max_tokens": params.max_tokens
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::Unavailable(e.to_string())
                } else {
                    ProviderError::Model(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::Throttled);
        }
        if status.is_server_error() {
            return Err(ProviderError::Unavailable(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Model(format!("HTTP {}: {}", status, body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Model(e.to_string()))?;
        debug!("provider response: {:?}", body);

        let text = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProviderError::Model("no content in response".to_string()))?
            .to_string();

        let usage = &body["usage"];
        Ok(ModelResponse {
            text,
            input_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0),
            output_tokens: usage["completion_tokens"].as_u64().unwrap_or(0),
        })
    }
}
