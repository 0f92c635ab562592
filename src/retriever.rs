use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;
use crate::model::RetrievedPassage;

/// Similarity search over the recipe knowledge index.
///
/// Implementations return passages most relevant first; score ties keep the
/// index's own ordering and are never re-sorted.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError>;
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: String,
    text: String,
    score: f64,
}

/// HTTP client for an external similarity-search service.
pub struct HttpRetriever {
    client: Client,
    index_url: String,
}

impl HttpRetriever {
    pub fn new(index_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        HttpRetriever { client, index_url }
    }
}

#[async_trait]
impl KnowledgeRetriever for HttpRetriever {
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        debug!("querying index for: {}", query);

        let response = self
            .client
            .post(&self.index_url)
            .json(&SearchRequest { query, limit })
            .send()
            .await
            .map_err(|e| RetrievalError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status(status.as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Malformed(e.to_string()))?;

        // Rank follows response order; the index already sorted by relevance
        let passages: Vec<RetrievedPassage> = body
            .results
            .into_iter()
            .enumerate()
            .map(|(rank, hit)| RetrievedPassage {
                source_id: hit.id,
                text: hit.text,
                score: hit.score,
                rank,
            })
            .collect();

        info!("index returned {} passages for query", passages.len());
        Ok(passages)
    }
}
