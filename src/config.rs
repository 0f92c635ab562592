use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Analyzer configuration, resolved once at startup and read-only afterwards.
///
/// Every numeric constant the pipeline consumes lives here: cache TTLs,
/// fetch politeness delay, model parameters, thresholds, and retry ceilings.
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzerConfig {
    /// Seconds a successful result stays cached
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Whether failed results are cached at all (under `failure_ttl_secs`)
    #[serde(default)]
    pub cache_failures: bool,
    /// Shorter TTL applied to cached failures when `cache_failures` is on
    #[serde(default = "default_failure_ttl_secs")]
    pub failure_ttl_secs: u64,

    /// Politeness delay between consecutive page fetches, in milliseconds
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,
    /// Page fetch timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Extra fetch attempts on 429/5xx or connection errors
    #[serde(default = "default_fetch_retry_attempts")]
    pub fetch_retry_attempts: u32,
    /// Permit fetching localhost URLs; off in production, needed when the
    /// pages under analysis are served by a local fixture
    #[serde(default)]
    pub allow_local_urls: bool,

    /// Minimum cleaned-text length worth sending to the model
    #[serde(default = "default_min_content_len")]
    pub min_content_len: usize,
    /// Character budget for page content embedded in a prompt
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    /// Classification confidence below this is treated as "not a recipe"
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Passages scoring below this trigger the fixed "no match" fallback
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,
    /// Result-count limit passed to the knowledge index
    #[serde(default = "default_retrieval_limit")]
    pub retrieval_limit: usize,
    /// Character budget for the concatenated grounding context
    #[serde(default = "default_context_char_budget")]
    pub context_char_budget: usize,

    /// Model identifier sent to the provider
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens to generate per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature; low for consistent classification
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Minimum interval between outbound model calls, in milliseconds
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
    /// Total model attempts under sustained throttling
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Initial backoff delay between throttled attempts (doubles per attempt)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Provider API key (can also come from the OPENAI_API_KEY env var)
    pub api_key: Option<String>,
    /// Provider base URL override, mainly for tests and proxies
    pub base_url: Option<String>,
    /// Knowledge index search endpoint
    pub index_url: Option<String>,
}

// Default value functions
fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_failure_ttl_secs() -> u64 {
    300
}

fn default_fetch_delay_ms() -> u64 {
    1000
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_fetch_retry_attempts() -> u32 {
    2
}

fn default_min_content_len() -> usize {
    100
}

fn default_max_prompt_chars() -> usize {
    6000
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_relevance_threshold() -> f64 {
    0.4
}

fn default_retrieval_limit() -> usize {
    5
}

fn default_context_char_budget() -> usize {
    8000
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.1
}

fn default_min_request_interval_ms() -> u64 {
    100
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_failures: false,
            failure_ttl_secs: default_failure_ttl_secs(),
            fetch_delay_ms: default_fetch_delay_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            fetch_retry_attempts: default_fetch_retry_attempts(),
            allow_local_urls: false,
            min_content_len: default_min_content_len(),
            max_prompt_chars: default_max_prompt_chars(),
            confidence_threshold: default_confidence_threshold(),
            relevance_threshold: default_relevance_threshold(),
            retrieval_limit: default_retrieval_limit(),
            context_char_budget: default_context_char_budget(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            min_request_interval_ms: default_min_request_interval_ms(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            api_key: None,
            base_url: None,
            index_url: None,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with ANALYZER__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: ANALYZER__CACHE_TTL_SECS
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            // Optional config file (can be missing)
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("ANALYZER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
