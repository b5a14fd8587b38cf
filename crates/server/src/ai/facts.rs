//! Fact extraction from a de-identified clinical summary

use serde_json::Value as JsonValue;

use super::client::{GeminiClient, GenerationOptions};
use super::json::{parse_reply, record_decode};
use trialmatch_core::{ExtractedFacts, IntakeError, Upstream, deidentify, facts};

const TEMPERATURE: f32 = 0.1;

const SYSTEM_PROMPT: &str = r#"You extract the facts needed to match a patient to clinical trials from a de-identified clinical summary.

Extract:
- age: integer years, or null
- gender: "male", "female" or another recorded value, or null
- conditions: diagnosed conditions as {term, code}; code is an ICD-10 or SNOMED code when present in the data, otherwise null
- medications: current medication names
- zipCode: 5-digit postal code, or null
- immunizations: {name, date, status} for each recorded immunization

Only use information present in the input. Use null or an empty array when a value is missing."#;

/// Build the user prompt around an already de-identified summary
pub fn build_prompt(deidentified: &JsonValue) -> Result<String, IntakeError> {
    let summary = serde_json::to_string_pretty(deidentified)
        .map_err(|e| IntakeError::BadRequest(format!("Summary is not serializable: {}", e)))?;
    Ok(format!("Clinical summary:\n{}", summary))
}

/// De-identify `summary`, send it to the LLM and decode the facts
pub async fn extract_facts(
    client: &GeminiClient,
    summary: &JsonValue,
) -> Result<ExtractedFacts, IntakeError> {
    let scrubbed = deidentify(summary);
    let prompt = build_prompt(&scrubbed)?;

    let reply = client
        .generate(
            Some(SYSTEM_PROMPT),
            &prompt,
            GenerationOptions {
                temperature: Some(TEMPERATURE),
                response_schema: Some(facts::response_schema()),
            },
        )
        .await?;

    let facts = parse_reply(&reply).and_then(|raw| {
        serde_json::from_value::<ExtractedFacts>(raw).map_err(|e| {
            tracing::error!(error = %e, raw = %reply, "LLM facts have an unexpected shape");
            IntakeError::malformed(
                Upstream::Llm,
                format!("facts do not match the expected shape: {}", e),
            )
        })
    });
    record_decode(&facts);
    facts
}
