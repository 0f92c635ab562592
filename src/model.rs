use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::AnalyzeError;

/// How the raw user input was classified, decided once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Url,
    DishName,
}

/// A single ingredient in recipe-authoring order. Duplicates are not merged
/// and names keep the source language of the page or passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    /// Models frequently report quantities as strings ("2", "1.5"); both
    /// forms are accepted and anything non-numeric becomes `None`.
    #[serde(default, deserialize_with = "quantity_from_value")]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

fn quantity_from_value<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Outcome of the "is this a recipe" model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_recipe: bool,
    /// Always present; clamped to [0, 1] after parsing.
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl ClassificationResult {
    /// Clamp the model-reported confidence into [0, 1].
    pub fn clamped(mut self) -> Self {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}

/// One passage returned by the knowledge index, rank ascending = most
/// relevant first. Score ties keep the index's own ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    pub source_id: String,
    pub text: String,
    pub score: f64,
    pub rank: usize,
}

/// Token counts and estimated cost accumulated over one request's model calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cost_usd += other.cost_usd;
    }
}

/// The single externally observable output of the analysis pipeline.
///
/// Both branches populate it: the URL branch fills `ingredients` and
/// `classification`, the dish branch fills `answer` (and `ingredients` when
/// they can be parsed from it). A "not a recipe" or "no matching recipe"
/// outcome is a success with empty ingredients, never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub kind: InputKind,
    pub success: bool,
    pub ingredients: Vec<Ingredient>,
    pub answer: Option<String>,
    pub classification: Option<ClassificationResult>,
    pub error: Option<AnalyzeError>,
    pub usage: TokenUsage,
    pub elapsed_ms: u64,
    pub cache_hit: bool,
}

impl AnalysisResult {
    /// A successful result with no ingredients yet; branches fill it in.
    pub fn success(kind: InputKind) -> Self {
        AnalysisResult {
            kind,
            success: true,
            ingredients: Vec::new(),
            answer: None,
            classification: None,
            error: None,
            usage: TokenUsage::default(),
            elapsed_ms: 0,
            cache_hit: false,
        }
    }

    /// A failed result carrying the mapped error kind.
    pub fn failure(kind: InputKind, error: AnalyzeError) -> Self {
        AnalysisResult {
            kind,
            success: false,
            ingredients: Vec::new(),
            answer: None,
            classification: None,
            error: Some(error),
            usage: TokenUsage::default(),
            elapsed_ms: 0,
            cache_hit: false,
        }
    }
}
