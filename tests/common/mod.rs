#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use recipe_analyzer::config::AnalyzerConfig;
use recipe_analyzer::error::{ProviderError, RetrievalError};
use recipe_analyzer::model::RetrievedPassage;
use recipe_analyzer::providers::{InvokeParams, ModelProvider, ModelResponse};
use recipe_analyzer::retriever::KnowledgeRetriever;

/// Config with all delays shrunk so tests run fast.
pub fn test_config() -> AnalyzerConfig {
    let mut config = AnalyzerConfig::default();
    config.fetch_delay_ms = 1;
    config.fetch_retry_attempts = 0;
    config.allow_local_urls = true;
    config.min_request_interval_ms = 1;
    config.retry_base_delay_ms = 1;
    config
}

/// Scripted model provider: pops one queued reply per call and panics when
/// invoked unexpectedly, which doubles as a "no model call was made" check.
pub struct FakeProvider {
    pub calls: AtomicU64,
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        FakeProvider {
            calls: AtomicU64::new(0),
            replies: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_ok(&self, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
    }

    pub fn push_err(&self, error: ProviderError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ModelProvider for FakeProvider {
    fn provider_name(&self) -> &str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "gpt-4o-mini"
    }

    async fn complete(
        &self,
        _prompt: &str,
        _params: &InvokeParams,
    ) -> Result<ModelResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected model invocation");
        reply.map(|text| ModelResponse {
            text,
            input_tokens: 10,
            output_tokens: 5,
        })
    }
}

/// Fixed-response retriever with a call counter.
pub struct FakeRetriever {
    pub calls: AtomicU64,
    passages: Vec<RetrievedPassage>,
    fail: bool,
}

impl FakeRetriever {
    pub fn with_passages(passages: Vec<RetrievedPassage>) -> Self {
        FakeRetriever {
            calls: AtomicU64::new(0),
            passages,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        FakeRetriever {
            calls: AtomicU64::new(0),
            passages: Vec::new(),
            fail: true,
        }
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl KnowledgeRetriever for FakeRetriever {
    async fn search(
        &self,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(RetrievalError::Http("index unreachable".to_string()))
        } else {
            Ok(self.passages.clone())
        }
    }
}

pub fn passage(id: &str, text: &str, score: f64, rank: usize) -> RetrievedPassage {
    RetrievedPassage {
        source_id: id.to_string(),
        text: text.to_string(),
        score,
        rank,
    }
}

/// A recipe-looking page long enough to clear the content-length threshold.
pub fn recipe_page_html() -> String {
    let body = "Bring a large pot of salted water to a boil. Add the pasta and cook until al dente. \
                Meanwhile, warm the tomato sauce with fresh basil. "
        .repeat(3);
    format!(
        r#"<html>
        <head><title>Pasta al Pomodoro</title></head>
        <body><article>Ingredients: 2 tomatoes, a handful of basil. {}</article></body>
        </html>"#,
        body
    )
}

/// A page long enough to analyze but clearly not a recipe.
pub fn blog_page_html() -> String {
    let body = "Thoughts on travel, photography, and the quiet joy of slow mornings. "
        .repeat(5);
    format!(
        r#"<html>
        <head><title>My Travel Blog</title></head>
        <body><article>{}</article></body>
        </html>"#,
        body
    )
}
