use serde::Serialize;
use thiserror::Error;

/// Failure kinds surfaced to callers through `AnalysisResult.error`.
///
/// These never escape `AnalysisPipeline::analyze` as a raised error; every
/// collaborator fault is mapped into one of these kinds and carried in the
/// result envelope.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum AnalyzeError {
    /// Network failure, timeout, or non-success status while fetching a URL
    #[error("failed to fetch page: {0}")]
    FetchFailed(String),

    /// Fetched or retrieved content insufficient to classify or answer
    #[error("content could not be analyzed: {0}")]
    UnanalyzableContent(String),

    /// Classification succeeded but structured ingredient parsing failed after retry
    #[error("ingredient extraction failed: {0}")]
    ExtractionFailed(String),

    /// Model gateway retry budget exhausted under rate limiting
    #[error("model rate limit exceeded after retries")]
    ThrottleExceeded,

    /// Provider-side outage, not retried automatically
    #[error("model provider unavailable: {0}")]
    ModelUnavailable(String),

    /// Any other provider-side fault
    #[error("model provider error: {0}")]
    ModelError(String),

    /// Knowledge index unreachable or errored (distinct from an empty result)
    #[error("knowledge retrieval failed: {0}")]
    RetrievalFailed(String),
}

impl AnalyzeError {
    /// Stable kind name used for telemetry counters and test assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyzeError::FetchFailed(_) => "FetchFailed",
            AnalyzeError::UnanalyzableContent(_) => "UnanalyzableContent",
            AnalyzeError::ExtractionFailed(_) => "ExtractionFailed",
            AnalyzeError::ThrottleExceeded => "ThrottleExceeded",
            AnalyzeError::ModelUnavailable(_) => "ModelUnavailable",
            AnalyzeError::ModelError(_) => "ModelError",
            AnalyzeError::RetrievalFailed(_) => "RetrievalFailed",
        }
    }

    /// Short message suitable for direct display in a chat interface.
    pub fn user_message(&self) -> &'static str {
        match self {
            AnalyzeError::FetchFailed(_) => "The page could not be fetched.",
            AnalyzeError::UnanalyzableContent(_) => "The content could not be analyzed.",
            AnalyzeError::ExtractionFailed(_) => {
                "Ingredients could not be extracted from the recipe."
            }
            AnalyzeError::ThrottleExceeded => {
                "The analysis service is busy. Please try again shortly."
            }
            AnalyzeError::ModelUnavailable(_) => "The analysis service is temporarily unavailable.",
            AnalyzeError::ModelError(_) => "The analysis service returned an unexpected error.",
            AnalyzeError::RetrievalFailed(_) => "The recipe knowledge base could not be reached.",
        }
    }
}

/// Errors raised by the content fetcher before they are mapped to `FetchFailed`.
#[derive(Error, Debug)]
pub enum FetchError {
    /// URL failed validation (scheme, host, or local address)
    #[error("invalid or unsafe URL: {0}")]
    InvalidUrl(String),

    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure (DNS, refused, reset)
    #[error("connection error: {0}")]
    Connection(String),

    /// Non-success HTTP status after internal retries
    #[error("HTTP status {0}")]
    Status(u16),
}

/// Errors raised by a model provider for a single attempt.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider signalled rate limiting (HTTP 429); the gateway may retry
    #[error("provider throttled the request")]
    Throttled,

    /// Provider-side outage (HTTP 5xx or network failure)
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Any other provider fault, including malformed response envelopes
    #[error("provider error: {0}")]
    Model(String),
}

/// Errors surfaced by the model gateway after its retry policy has run.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("throttle retry budget exhausted")]
    ThrottleExceeded,

    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("model error: {0}")]
    Model(String),
}

impl From<GatewayError> for AnalyzeError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::ThrottleExceeded => AnalyzeError::ThrottleExceeded,
            GatewayError::Unavailable(msg) => AnalyzeError::ModelUnavailable(msg),
            GatewayError::Model(msg) => AnalyzeError::ModelError(msg),
        }
    }
}

/// Errors raised by the knowledge retriever before mapping to `RetrievalFailed`.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("index request failed: {0}")]
    Http(String),

    #[error("index returned HTTP status {0}")]
    Status(u16),

    #[error("index response malformed: {0}")]
    Malformed(String),
}

impl From<FetchError> for AnalyzeError {
    fn from(err: FetchError) -> Self {
        AnalyzeError::FetchFailed(err.to_string())
    }
}

impl From<RetrievalError> for AnalyzeError {
    fn from(err: RetrievalError) -> Self {
        AnalyzeError::RetrievalFailed(err.to_string())
    }
}

/// Errors that can occur while wiring the analyzer up at startup.
#[derive(Error, Debug)]
pub enum SetupError {
    /// API key missing from both configuration and environment
    #[error("OPENAI_API_KEY not found in config or environment")]
    MissingApiKey,

    /// Knowledge index endpoint not configured
    #[error("index_url not configured")]
    MissingIndexUrl,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
