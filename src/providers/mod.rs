mod open_ai;
mod prompt;

pub use open_ai::OpenAiProvider;
pub use prompt::{
    CLASSIFICATION_PROMPT, EXTRACTION_PROMPT, REFORMAT_INSTRUCTION, SYNTHESIS_PROMPT,
};

use async_trait::async_trait;

use crate::error::ProviderError;

/// Per-call generation parameters passed through the gateway.
#[derive(Debug, Clone)]
pub struct InvokeParams {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Optional system instruction prepended to the conversation
    pub system: Option<String>,
}

/// Raw text plus token usage as reported by the provider.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Seam between the gateway and a concrete model provider. The provider owns
/// all request/response shaping; it reports throttling and outages as typed
/// errors so the gateway can apply its retry policy.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name for logging (e.g. "openai")
    fn provider_name(&self) -> &str;

    /// Model identifier used for pricing lookups
    fn model_name(&self) -> &str;

    async fn complete(
        &self,
        prompt: &str,
        params: &InvokeParams,
    ) -> Result<ModelResponse, ProviderError>;
}
