mod dish;
mod url;

pub use dish::{DishAnalyzer, NO_MATCH_ANSWER};
pub use url::UrlAnalyzer;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{info, warn};
use serde::de::DeserializeOwned;

use crate::cache::ResultCache;
use crate::config::AnalyzerConfig;
use crate::error::AnalyzeError;
use crate::fetcher::ContentFetcher;
use crate::gateway::ModelGateway;
use crate::model::{AnalysisResult, InputKind};
use crate::providers::ModelProvider;
use crate::retriever::KnowledgeRetriever;
use crate::telemetry::Telemetry;

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque per-request identifier threaded through every downstream log line.
fn next_correlation_id() -> String {
    let seq = REQUEST_SEQ.fetch_add(1, Ordering::Relaxed);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("req-{:x}-{:x}", millis, seq)
}

/// Pull the first JSON object out of a model reply and deserialize it
/// against the expected schema. Models wrap JSON in prose or code fences
/// often enough that speculative full-text parsing is not worth attempting.
pub(crate) fn parse_model_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Decide the input kind once and normalize the input into its cache-key
/// form: URLs get a lower-cased scheme and host (the `url` parser does this
/// canonicalization), dish names get trimmed and their whitespace collapsed.
fn classify_input(trimmed: &str) -> (InputKind, String) {
    if let Ok(url) = reqwest::Url::parse(trimmed) {
        if (url.scheme() == "http" || url.scheme() == "https") && url.host_str().is_some() {
            return (InputKind::Url, url.to_string());
        }
    }

    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    (InputKind::DishName, collapsed)
}

fn cache_key(kind: InputKind, normalized: &str) -> String {
    match kind {
        InputKind::Url => format!("url:{}", normalized),
        InputKind::DishName => format!("dish:{}", normalized),
    }
}

/// Top-level analysis pipeline.
///
/// Classifies raw input as URL or dish name, dispatches to the matching
/// branch, memoizes results in the shared cache, and returns a uniform
/// result envelope. `analyze` never fails at the call boundary; every fault
/// is encoded in `AnalysisResult.error`.
pub struct AnalysisPipeline {
    config: Arc<AnalyzerConfig>,
    cache: Arc<ResultCache>,
    telemetry: Arc<Telemetry>,
    url_branch: UrlAnalyzer,
    dish_branch: DishAnalyzer,
}

impl AnalysisPipeline {
    pub fn new(
        config: Arc<AnalyzerConfig>,
        provider: Arc<dyn ModelProvider>,
        retriever: Arc<dyn KnowledgeRetriever>,
        cache: Arc<ResultCache>,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        let fetcher = Arc::new(ContentFetcher::from_config(&config));
        let gateway = Arc::new(ModelGateway::new(provider, telemetry.clone(), &config));

        AnalysisPipeline {
            url_branch: UrlAnalyzer::new(config.clone(), fetcher, gateway.clone()),
            dish_branch: DishAnalyzer::new(config.clone(), retriever, gateway),
            config,
            cache,
            telemetry,
        }
    }

    pub async fn analyze(&self, raw_input: &str) -> AnalysisResult {
        self.telemetry.record_request();
        let corr_id = next_correlation_id();
        let start = Instant::now();

        let trimmed = raw_input.trim();
        if trimmed.is_empty() {
            warn!("[{}] empty input", corr_id);
            self.telemetry.record_error("UnanalyzableContent");
            let mut result = AnalysisResult::failure(
                InputKind::DishName,
                AnalyzeError::UnanalyzableContent("empty input".to_string()),
            );
            result.elapsed_ms = start.elapsed().as_millis() as u64;
            return result;
        }

        let (kind, normalized) = classify_input(trimmed);
        let key = cache_key(kind, &normalized);
        info!("[{}] analyzing {:?} input: {}", corr_id, kind, normalized);

        if let Some(mut hit) = self.cache.get(&key) {
            self.telemetry.record_cache_hit();
            info!("[{}] returning cached result", corr_id);
            hit.cache_hit = true;
            return hit;
        }
        self.telemetry.record_cache_miss();

        let mut result = match kind {
            InputKind::Url => {
                self.telemetry.record_url_branch();
                self.url_branch.analyze(&normalized, &corr_id).await
            }
            InputKind::DishName => {
                self.telemetry.record_dish_branch();
                self.dish_branch.analyze(&normalized, &corr_id).await
            }
        };

        if let Some(error) = &result.error {
            self.telemetry.record_error(error.kind());
            warn!("[{}] analysis failed: {}", corr_id, error);
        }

        result.elapsed_ms = start.elapsed().as_millis() as u64;
        result.cache_hit = false;

        if result.success {
            self.cache.put(
                &key,
                result.clone(),
                Duration::from_secs(self.config.cache_ttl_secs),
            );
        } else if self.config.cache_failures {
            // Short TTL keeps a consistently failing URL from being
            // re-fetched on every message while still allowing recovery
            self.cache.put(
                &key,
                result.clone(),
                Duration::from_secs(self.config.failure_ttl_secs),
            );
        }

        info!(
            "[{}] finished in {} ms (success: {})",
            corr_id, result.elapsed_ms, result.success
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_urls_route_to_url_branch() {
        let (kind, _) = classify_input("https://example.com/pasta");
        assert_eq!(kind, InputKind::Url);

        let (kind, _) = classify_input("http://example.com");
        assert_eq!(kind, InputKind::Url);
    }

    #[test]
    fn test_everything_else_routes_to_dish_branch() {
        for input in [
            "Tiramisu",
            "chicken teriyaki",
            "example.com/pasta",
            "ftp://example.com/pasta",
            "how do I make ramen",
        ] {
            let (kind, _) = classify_input(input);
            assert_eq!(kind, InputKind::DishName, "input: {}", input);
        }
    }

    #[test]
    fn test_url_normalization_lowercases_scheme_and_host() {
        let (kind, normalized) = classify_input("HTTPS://Example.COM/Pasta");
        assert_eq!(kind, InputKind::Url);
        assert_eq!(normalized, "https://example.com/Pasta");
    }

    #[test]
    fn test_dish_normalization_collapses_whitespace() {
        let (_, normalized) = classify_input("chicken   \t teriyaki");
        assert_eq!(normalized, "chicken teriyaki");
    }

    #[test]
    fn test_cache_keys_are_kind_prefixed() {
        assert_eq!(
            cache_key(InputKind::Url, "https://example.com/"),
            "url:https://example.com/"
        );
        assert_eq!(cache_key(InputKind::DishName, "tiramisu"), "dish:tiramisu");
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let a = next_correlation_id();
        let b = next_correlation_id();
        assert_ne!(a, b);
        assert!(a.starts_with("req-"));
    }

    #[test]
    fn test_parse_model_json_strips_surrounding_prose() {
        #[derive(serde::Deserialize)]
        struct Probe {
            value: u32,
        }

        let probe: Probe =
            parse_model_json("Sure! Here you go:\n```json\n{\"value\": 7}\n```").unwrap();
        assert_eq!(probe.value, 7);

        assert!(parse_model_json::<Probe>("no json here").is_none());
        assert!(parse_model_json::<Probe>("{\"value\": \"not a number\"}").is_none());
    }
}
