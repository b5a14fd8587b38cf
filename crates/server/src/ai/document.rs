//! Care-record summarization using the LLM

use super::client::{GeminiClient, GenerationOptions};
use super::json::{parse_reply, record_decode};
use trialmatch_core::summary::SUMMARY_TEMPLATE;
use trialmatch_core::{ClinicalSummary, IntakeError, normalize_summary};

/// Low sampling temperature keeps extraction deterministic
const TEMPERATURE: f32 = 0.1;

const SYSTEM_PROMPT: &str = r#"You are a clinical document abstraction engine. You read care-record documents (usually HL7 CCD/C-CDA XML, sometimes JSON exports or plain text) and extract facts exactly as recorded.

Rules:
- Return exactly ONE JSON object and nothing else: no markdown, no commentary.
- Use null for any value that is not present in the document. Never invent data.
- Never copy the type names from the template (such as "string" or "number|null") into your answer.
- List fields are arrays of plain strings; use an empty array when nothing is recorded.
- Conditions are active or historical problems/diagnoses; medications include dose when available.
- Vital signs are the most recent recorded values, including units."#;

/// Build the user prompt for one document
pub fn build_prompt(document: &str) -> String {
    format!(
        "Extract a clinical summary from the document below. Respond with a single JSON object with exactly this shape:\n\n{}\n\nDocument:\n{}",
        SUMMARY_TEMPLATE, document
    )
}

/// Summarize a care-record document into a validated [`ClinicalSummary`]
pub async fn summarize_document(
    client: &GeminiClient,
    document: &str,
    current_year: i32,
) -> Result<ClinicalSummary, IntakeError> {
    let prompt = build_prompt(document);
    let reply = client
        .generate(
            Some(SYSTEM_PROMPT),
            &prompt,
            GenerationOptions {
                temperature: Some(TEMPERATURE),
                response_schema: None,
            },
        )
        .await?;

    let summary = parse_reply(&reply).and_then(|raw| {
        normalize_summary(raw, current_year).inspect_err(|e| {
            tracing::error!(error = %e, raw = %reply, "LLM summary has an unexpected shape");
        })
    });
    record_decode(&summary);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_template_and_document() {
        let prompt = build_prompt("<ClinicalDocument/>");
        assert!(prompt.contains("\"vitalSigns\""));
        assert!(prompt.ends_with("<ClinicalDocument/>"));
    }
}
