use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::config::AnalyzerConfig;
use crate::error::{GatewayError, ProviderError};
use crate::model::TokenUsage;
use crate::providers::{InvokeParams, ModelProvider, ModelResponse};
use crate::telemetry::Telemetry;

/// Approximate USD prices per 1K tokens, looked up by model-id prefix.
const PRICING: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini", 0.00015, 0.0006),
    ("gpt-4o", 0.0025, 0.01),
    ("gpt-4", 0.03, 0.06),
    ("gpt-3.5", 0.0005, 0.0015),
];

// Fallback for models missing from the table
const DEFAULT_PRICING: (f64, f64) = (0.003, 0.015);

/// Estimate the monetary cost of a call from the static pricing table.
pub fn estimate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let (input_price, output_price) = PRICING
        .iter()
        .find(|(prefix, _, _)| model.starts_with(prefix))
        .map(|(_, i, o)| (*i, *o))
        .unwrap_or(DEFAULT_PRICING);

    (input_tokens as f64 / 1000.0) * input_price + (output_tokens as f64 / 1000.0) * output_price
}

/// Gateway for all outbound model calls.
///
/// Enforces a process-wide minimum inter-request interval (callers block
/// until eligible rather than failing), retries throttled attempts with
/// exponential backoff up to a fixed ceiling, and records token usage and
/// estimated cost for every attempt, success or failure.
pub struct ModelGateway {
    provider: Arc<dyn ModelProvider>,
    telemetry: Arc<Telemetry>,
    min_interval: Duration,
    retry_attempts: u32,
    retry_base_delay: Duration,
    // Shared gate: its purpose is bounding the aggregate request rate, so
    // it must be one mutex for the whole gateway, not per caller.
    last_request: Mutex<Option<Instant>>,
}

impl ModelGateway {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        telemetry: Arc<Telemetry>,
        config: &AnalyzerConfig,
    ) -> Self {
        ModelGateway {
            provider,
            telemetry,
            min_interval: Duration::from_millis(config.min_request_interval_ms),
            retry_attempts: config.retry_attempts.max(1),
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            last_request: Mutex::new(None),
        }
    }

    /// Block until the inter-request interval has elapsed. The lock is held
    /// across the sleep so concurrent callers are released one interval
    /// apart instead of in a burst.
    async fn interval_gate(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let since = previous.elapsed();
            if since < self.min_interval {
                let wait = self.min_interval - since;
                debug!("rate limiting: sleeping for {:?}", wait);
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Rough token estimate for attempts where the provider reported no
    /// usage (throttled and failed calls still consumed input tokens).
    fn estimated_input_tokens(prompt: &str) -> u64 {
        (prompt.len() as u64) / 4
    }

    fn record_usage(&self, input_tokens: u64, output_tokens: u64) -> TokenUsage {
        let cost = estimate_cost(self.provider.model_name(), input_tokens, output_tokens);
        self.telemetry
            .record_model_usage(input_tokens, output_tokens, cost);
        TokenUsage {
            input_tokens,
            output_tokens,
            cost_usd: cost,
        }
    }

    /// Invoke the model, returning the response plus this call's accounted
    /// usage (summed over throttled attempts).
    pub async fn invoke(
        &self,
        prompt: &str,
        params: &InvokeParams,
    ) -> Result<(ModelResponse, TokenUsage), GatewayError> {
        let mut usage = TokenUsage::default();

        for attempt in 1..=self.retry_attempts {
            self.interval_gate().await;
            debug!(
                "invoking {} (attempt {}/{}, prompt {} chars)",
                self.provider.provider_name(),
                attempt,
                self.retry_attempts,
                prompt.len()
            );

            match self.provider.complete(prompt, params).await {
                Ok(response) => {
                    usage.add(self.record_usage(response.input_tokens, response.output_tokens));
                    info!(
                        "model call succeeded: {} input / {} output tokens",
                        response.input_tokens, response.output_tokens
                    );
                    return Ok((response, usage));
                }
                Err(ProviderError::Throttled) => {
                    usage.add(self.record_usage(Self::estimated_input_tokens(prompt), 0));
                    warn!(
                        "provider throttled request (attempt {}/{})",
                        attempt, self.retry_attempts
                    );
                    if attempt < self.retry_attempts {
                        // Exponential backoff: base delay doubles per attempt
                        let delay = self.retry_base_delay * 2u32.pow(attempt - 1);
                        debug!("waiting {:?} before retry", delay);
                        sleep(delay).await;
                    }
                }
                Err(ProviderError::Unavailable(msg)) => {
                    usage.add(self.record_usage(Self::estimated_input_tokens(prompt), 0));
                    warn!("provider unavailable: {}", msg);
                    return Err(GatewayError::Unavailable(msg));
                }
                Err(ProviderError::Model(msg)) => {
                    usage.add(self.record_usage(Self::estimated_input_tokens(prompt), 0));
                    warn!("provider error: {}", msg);
                    return Err(GatewayError::Model(msg));
                }
            }
        }

        Err(GatewayError::ThrottleExceeded)
    }
}
