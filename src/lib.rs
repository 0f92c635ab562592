pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod fetcher;
pub mod gateway;
pub mod model;
pub mod pipelines;
pub mod providers;
pub mod retriever;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResultCache;
use crate::config::AnalyzerConfig;
use crate::error::SetupError;
use crate::model::AnalysisResult;
use crate::pipelines::AnalysisPipeline;
use crate::providers::{ModelProvider, OpenAiProvider};
use crate::retriever::{HttpRetriever, KnowledgeRetriever};
use crate::telemetry::{Telemetry, TelemetrySnapshot};

/// Facade over the analysis pipeline with its shared cache and telemetry,
/// wired up once at startup.
pub struct Analyzer {
    pipeline: AnalysisPipeline,
    telemetry: Arc<Telemetry>,
    cache: Arc<ResultCache>,
}

impl Analyzer {
    /// Wire up the default collaborators (OpenAI-compatible provider, HTTP
    /// knowledge index) from configuration.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self, SetupError> {
        let provider = Arc::new(OpenAiProvider::from_config(&config)?);
        let index_url = config
            .index_url
            .clone()
            .ok_or(SetupError::MissingIndexUrl)?;
        let retriever = Arc::new(HttpRetriever::new(
            index_url,
            Duration::from_secs(config.fetch_timeout_secs),
        ));

        Ok(Self::with_components(config, provider, retriever))
    }

    /// Wire up with injected collaborators; tests substitute fakes here.
    pub fn with_components(
        config: AnalyzerConfig,
        provider: Arc<dyn ModelProvider>,
        retriever: Arc<dyn KnowledgeRetriever>,
    ) -> Self {
        Self::with_cache(config, provider, retriever, Arc::new(ResultCache::new()))
    }

    /// Like `with_components` but with an injected cache, so TTL expiry can
    /// be driven by a manual clock.
    pub fn with_cache(
        config: AnalyzerConfig,
        provider: Arc<dyn ModelProvider>,
        retriever: Arc<dyn KnowledgeRetriever>,
        cache: Arc<ResultCache>,
    ) -> Self {
        let telemetry = Arc::new(Telemetry::new());
        let pipeline = AnalysisPipeline::new(
            Arc::new(config),
            provider,
            retriever,
            cache.clone(),
            telemetry.clone(),
        );

        Analyzer {
            pipeline,
            telemetry,
            cache,
        }
    }

    /// Analyze a recipe URL or dish name. Never fails: all failure modes
    /// are encoded in the returned result's `error` field.
    pub async fn analyze(&self, raw_input: &str) -> AnalysisResult {
        self.pipeline.analyze(raw_input).await
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }
}
