/// System prompt for the "is this a recipe" classification call.
///
/// Language-neutral: the model judges pages in any language and writes its
/// rationale in the page's own language.
pub const CLASSIFICATION_PROMPT: &str = r#"You are a culinary expert. Analyze the web page content provided by the user and decide whether it is a cooking recipe page.

Evaluate based on these criteria:
1. Contains an ingredient list
2. Contains cooking instructions or a method
3. Has a dish name or description
4. Includes cooking time or serving information

Respond with ONLY this JSON object and nothing else:
{
  "is_recipe": true or false,
  "confidence": 0.0 to 1.0,
  "rationale": "short reasoning, written in the language of the page"
}"#;

/// System prompt for the structured ingredient extraction call.
///
/// Ingredient names must stay in the source language of the page; the
/// pipeline never translates or transliterates them.
pub const EXTRACTION_PROMPT: &str = r#"You are a culinary expert. Extract the ingredient list from the recipe content provided by the user, in the order the recipe presents it.

For each ingredient provide:
- "name": the ingredient name, kept in the source language of the page (do not translate)
- "quantity": a numeric amount, or null if none is given
- "unit": the unit as written (g, ml, pieces, cups, ...), or null
- "note": any preparation note, or null

Respond with ONLY this JSON object and nothing else:
{
  "ingredients": [
    {"name": "...", "quantity": 2, "unit": "...", "note": "..."}
  ]
}"#;

/// System prompt for synthesizing a dish-name answer from retrieved passages.
pub const SYNTHESIS_PROMPT: &str = r#"You are a culinary expert. Answer the user's question using ONLY the recipe passages provided in the context. Do not use outside knowledge; if the context does not cover something, say so.

Describe the recipe in the language the passages are written in. If the context contains an ingredient list, also append this JSON object on its own line at the end of your answer, keeping ingredient names in their source language:
{
  "ingredients": [
    {"name": "...", "quantity": 2, "unit": "...", "note": "..."}
  ]
}"#;

/// Appended to the user content when the model's previous reply failed
/// schema validation; one retry is made with this stricter instruction.
pub const REFORMAT_INSTRUCTION: &str = "\n\nIMPORTANT: your previous reply was not valid JSON. Respond with ONLY the JSON object described above. No prose, no markdown, no code fences.";
