use std::sync::Arc;

use log::{debug, info};
use serde::Deserialize;

use crate::config::AnalyzerConfig;
use crate::gateway::ModelGateway;
use crate::model::{AnalysisResult, Ingredient, InputKind, RetrievedPassage};
use crate::pipelines::parse_model_json;
use crate::providers::{InvokeParams, SYNTHESIS_PROMPT};
use crate::retriever::KnowledgeRetriever;

/// Fixed answer for the defined no-match fallback; shown as a normal
/// answer, never as an error.
pub const NO_MATCH_ANSWER: &str = "no matching recipe found";

#[derive(Deserialize)]
struct AnswerIngredients {
    ingredients: Vec<Ingredient>,
}

/// Dish-name branch: retrieve passages from the knowledge index and
/// synthesize an answer grounded in them.
pub struct DishAnalyzer {
    config: Arc<AnalyzerConfig>,
    retriever: Arc<dyn KnowledgeRetriever>,
    gateway: Arc<ModelGateway>,
}

impl DishAnalyzer {
    pub fn new(
        config: Arc<AnalyzerConfig>,
        retriever: Arc<dyn KnowledgeRetriever>,
        gateway: Arc<ModelGateway>,
    ) -> Self {
        DishAnalyzer {
            config,
            retriever,
            gateway,
        }
    }

    /// Concatenate top passages into a grounding context, bounded by the
    /// character budget. At least one passage is always included.
    fn build_context(&self, passages: &[RetrievedPassage]) -> String {
        let mut context = String::new();
        for passage in passages {
            if !context.is_empty()
                && context.len() + passage.text.len() > self.config.context_char_budget
            {
                break;
            }
            context.push_str(&format!(
                "[source: {}]\n{}\n\n",
                passage.source_id, passage.text
            ));
        }
        context
    }

    pub async fn analyze(&self, dish_name: &str, corr_id: &str) -> AnalysisResult {
        let mut result = AnalysisResult::success(InputKind::DishName);

        // 1. Retrieve ranked passages.
        let passages = match self
            .retriever
            .search(dish_name, self.config.retrieval_limit)
            .await
        {
            Ok(passages) => passages,
            Err(e) => {
                return AnalysisResult::failure(InputKind::DishName, e.into());
            }
        };

        // 2. Defined fallback: nothing relevant enough. No model call.
        let relevant = passages
            .first()
            .map(|top| top.score >= self.config.relevance_threshold)
            .unwrap_or(false);
        if !relevant {
            info!(
                "[{}] no passage above relevance threshold for '{}'",
                corr_id, dish_name
            );
            result.answer = Some(NO_MATCH_ANSWER.to_string());
            return result;
        }

        // 3. Synthesize an answer from the grounding context.
        let context = self.build_context(&passages);
        debug!(
            "[{}] grounding context built from {} passages ({} chars)",
            corr_id,
            passages.len(),
            context.len()
        );

        let user_content = format!(
            "Context:\n{}Question: What are the ingredients of {}? Describe the recipe.",
            context, dish_name
        );
        let params = InvokeParams {
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system: Some(SYNTHESIS_PROMPT.to_string()),
        };

        let (response, usage) = match self.gateway.invoke(&user_content, &params).await {
            Ok(ok) => ok,
            Err(e) => {
                return AnalysisResult::failure(InputKind::DishName, e.into());
            }
        };
        result.usage.add(usage);

        // 4. Opportunistic structured parse; the free-form answer stands
        // on its own either way.
        if let Some(parsed) = parse_model_json::<AnswerIngredients>(&response.text) {
            result.ingredients = parsed.ingredients;
        }
        info!(
            "[{}] synthesized answer for '{}' ({} ingredients parsed)",
            corr_id,
            dish_name,
            result.ingredients.len()
        );
        result.answer = Some(response.text);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RetrievedPassage;

    fn passage(id: &str, text: &str, score: f64, rank: usize) -> RetrievedPassage {
        RetrievedPassage {
            source_id: id.to_string(),
            text: text.to_string(),
            score,
            rank,
        }
    }

    fn analyzer_config(budget: usize) -> Arc<AnalyzerConfig> {
        let mut config = AnalyzerConfig::default();
        config.context_char_budget = budget;
        Arc::new(config)
    }

    struct NeverRetriever;

    #[async_trait::async_trait]
    impl KnowledgeRetriever for NeverRetriever {
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<RetrievedPassage>, crate::error::RetrievalError> {
            unreachable!("retriever must not be called in these tests")
        }
    }

    fn analyzer(budget: usize) -> DishAnalyzer {
        let config = analyzer_config(budget);
        let telemetry = Arc::new(crate::telemetry::Telemetry::new());
        let provider = Arc::new(crate::providers::OpenAiProvider::with_base_url(
            "unused".to_string(),
            "http://unused.invalid".to_string(),
            "gpt-4o-mini".to_string(),
        ));
        let gateway = Arc::new(ModelGateway::new(provider, telemetry, &config));
        DishAnalyzer::new(config, Arc::new(NeverRetriever), gateway)
    }

    #[test]
    fn test_context_keeps_rank_order() {
        let analyzer = analyzer(10_000);
        let passages = vec![
            passage("a", "first passage", 0.9, 0),
            passage("b", "second passage", 0.8, 1),
        ];

        let context = analyzer.build_context(&passages);
        let first = context.find("first passage").unwrap();
        let second = context.find("second passage").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_context_budget_bounds_passages() {
        let analyzer = analyzer(60);
        let passages = vec![
            passage("a", "x".repeat(50).as_str(), 0.9, 0),
            passage("b", "y".repeat(50).as_str(), 0.8, 1),
        ];

        let context = analyzer.build_context(&passages);
        assert!(context.contains('x'));
        assert!(!context.contains('y'));
    }

    #[test]
    fn test_first_passage_always_included() {
        let analyzer = analyzer(10);
        let passages = vec![passage("a", "a very long passage text", 0.9, 0)];

        let context = analyzer.build_context(&passages);
        assert!(context.contains("a very long passage text"));
    }
}
