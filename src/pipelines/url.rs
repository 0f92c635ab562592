use std::sync::Arc;

use log::{debug, info};
use serde::Deserialize;

use crate::config::AnalyzerConfig;
use crate::content::{self, PageContent};
use crate::error::AnalyzeError;
use crate::fetcher::ContentFetcher;
use crate::gateway::ModelGateway;
use crate::model::{AnalysisResult, ClassificationResult, Ingredient, InputKind};
use crate::pipelines::parse_model_json;
use crate::providers::{
    InvokeParams, CLASSIFICATION_PROMPT, EXTRACTION_PROMPT, REFORMAT_INSTRUCTION,
};

#[derive(Deserialize)]
struct ExtractedIngredients {
    ingredients: Vec<Ingredient>,
}

/// URL branch: fetch the page, decide whether it is a recipe, and if so
/// extract a structured ingredient list.
pub struct UrlAnalyzer {
    config: Arc<AnalyzerConfig>,
    fetcher: Arc<ContentFetcher>,
    gateway: Arc<ModelGateway>,
}

impl UrlAnalyzer {
    pub fn new(
        config: Arc<AnalyzerConfig>,
        fetcher: Arc<ContentFetcher>,
        gateway: Arc<ModelGateway>,
    ) -> Self {
        UrlAnalyzer {
            config,
            fetcher,
            gateway,
        }
    }

    /// Truncate on a character boundary; prompts budget characters, not bytes.
    fn truncate_chars(text: &str, max_chars: usize) -> &str {
        match text.char_indices().nth(max_chars) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }

    /// Assemble the page into prompt content, title and description first so
    /// they survive truncation, then as much body text as the budget allows.
    fn build_page_summary(&self, page: &PageContent) -> String {
        let mut parts = Vec::new();
        if let Some(title) = &page.title {
            parts.push(format!("Title: {}", title));
        }
        if let Some(description) = &page.description {
            parts.push(format!("Description: {}", description));
        }
        if !page.structured_data.is_empty() {
            // Structured recipe markup is the strongest signal a page can
            // carry; surface the first fragment verbatim
            let fragment = page.structured_data[0].to_string();
            parts.push(format!(
                "Embedded structured data: {}",
                Self::truncate_chars(&fragment, 1500)
            ));
        }

        let header = parts.join("\n");
        let remaining = self.config.max_prompt_chars.saturating_sub(header.len());
        format!(
            "{}\nContent: {}",
            header,
            Self::truncate_chars(&page.text, remaining)
        )
    }

    /// Invoke the model and parse its reply against `T`, retrying once with
    /// a stricter reformatting instruction when the reply fails validation.
    async fn invoke_structured<T: serde::de::DeserializeOwned>(
        &self,
        user_content: &str,
        params: &InvokeParams,
        corr_id: &str,
        result: &mut AnalysisResult,
    ) -> Result<Option<T>, AnalyzeError> {
        let (response, usage) = self
            .gateway
            .invoke(user_content, params)
            .await
            .map_err(AnalyzeError::from)?;
        result.usage.add(usage);

        if let Some(parsed) = parse_model_json::<T>(&response.text) {
            return Ok(Some(parsed));
        }

        debug!("[{}] model reply failed schema validation, retrying", corr_id);
        let stricter = format!("{}{}", user_content, REFORMAT_INSTRUCTION);
        let (response, usage) = self
            .gateway
            .invoke(&stricter, params)
            .await
            .map_err(AnalyzeError::from)?;
        result.usage.add(usage);

        Ok(parse_model_json::<T>(&response.text))
    }

    pub async fn analyze(&self, url: &str, corr_id: &str) -> AnalysisResult {
        let mut result = AnalysisResult::success(InputKind::Url);

        // 1. Fetch. Any failure short-circuits; no model call is made.
        let document = match self.fetcher.fetch(url).await {
            Ok(document) => document,
            Err(e) => {
                return AnalysisResult::failure(InputKind::Url, e.into());
            }
        };

        // 2. Reduce to cleaned text and metadata.
        let page = content::extract(&document.html);
        if page.text.len() < self.config.min_content_len {
            return AnalysisResult::failure(
                InputKind::Url,
                AnalyzeError::UnanalyzableContent(format!(
                    "cleaned text too short ({} chars)",
                    page.text.len()
                )),
            );
        }

        let summary = self.build_page_summary(&page);

        // 3. Classify.
        let classify_params = InvokeParams {
            max_tokens: 1000,
            temperature: self.config.temperature,
            system: Some(CLASSIFICATION_PROMPT.to_string()),
        };
        let classification = match self
            .invoke_structured::<ClassificationResult>(
                &summary,
                &classify_params,
                corr_id,
                &mut result,
            )
            .await
        {
            Ok(Some(classification)) => classification.clamped(),
            Ok(None) => {
                result.success = false;
                result.error = Some(AnalyzeError::UnanalyzableContent(
                    "classification response did not match the expected format".to_string(),
                ));
                return result;
            }
            Err(e) => {
                result.success = false;
                result.error = Some(e);
                return result;
            }
        };

        info!(
            "[{}] classified {}: is_recipe={} confidence={:.2}",
            corr_id, url, classification.is_recipe, classification.confidence
        );

        // 4. Not a recipe, or not confident enough: a valid empty answer.
        if !classification.is_recipe
            || classification.confidence < self.config.confidence_threshold
        {
            result.answer = classification.rationale.clone();
            result.classification = Some(classification);
            return result;
        }

        // 5. Extract ingredients, preserving recipe-authoring order.
        let extract_params = InvokeParams {
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system: Some(EXTRACTION_PROMPT.to_string()),
        };
        match self
            .invoke_structured::<ExtractedIngredients>(
                &summary,
                &extract_params,
                corr_id,
                &mut result,
            )
            .await
        {
            Ok(Some(extracted)) => {
                info!(
                    "[{}] extracted {} ingredients from {}",
                    corr_id,
                    extracted.ingredients.len(),
                    url
                );
                result.ingredients = extracted.ingredients;
                result.classification = Some(classification);
            }
            Ok(None) => {
                // Partial success is not claimed as full success: the
                // classification survives but the result is marked failed.
                result.success = false;
                result.error = Some(AnalyzeError::ExtractionFailed(
                    "ingredient list did not match the expected format after retry".to_string(),
                ));
                result.classification = Some(classification);
            }
            Err(e) => {
                result.success = false;
                result.error = Some(e);
                result.classification = Some(classification);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(UrlAnalyzer::truncate_chars("hello", 10), "hello");
        assert_eq!(UrlAnalyzer::truncate_chars("hello", 3), "hel");
        // Multi-byte characters must not be split
        assert_eq!(UrlAnalyzer::truncate_chars("材料リスト", 2), "材料");
    }

    #[test]
    fn test_extracted_ingredients_schema() {
        let parsed: ExtractedIngredients = serde_json::from_str(
            r#"{"ingredients": [
                {"name": "tomato", "quantity": 2, "unit": "pcs"},
                {"name": "basil", "quantity": null, "unit": null}
            ]}"#,
        )
        .unwrap();

        assert_eq!(parsed.ingredients.len(), 2);
        assert_eq!(parsed.ingredients[0].name, "tomato");
        assert_eq!(parsed.ingredients[0].quantity, Some(2.0));
        assert_eq!(parsed.ingredients[1].quantity, None);
    }
}
