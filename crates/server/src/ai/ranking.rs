//! Trial ranking using the LLM

use serde_json::Value as JsonValue;

use super::client::{GeminiClient, GenerationOptions};
use super::json::{parse_reply, record_decode};
use trialmatch_core::{
    ClinicalTrial, ExtractedFacts, IntakeError, RankedTrial, TrialDigest, Upstream, ranking,
    reconcile,
};

const TEMPERATURE: f32 = 0.2;

const SYSTEM_PROMPT: &str = r#"You are a clinical research coordinator screening a patient for clinical trials.

For every trial you are given, estimate how well the patient matches it and return one entry per trial:
- nctId: the trial's identifier, copied exactly
- matchPercentage: integer from 0 (clearly ineligible) to 100 (strong match)
- summaryNote: one or two plain-language sentences explaining the score, mentioning the deciding eligibility factors

Base the score on conditions, age, sex and stated eligibility criteria. Missing patient data lowers confidence but is not by itself disqualifying.
Return exactly one entry for each input trial, in the same order."#;

/// Build the user prompt from the patient facts and trial digests
pub fn build_prompt(facts: &ExtractedFacts, digests: &[TrialDigest]) -> Result<String, IntakeError> {
    let facts = serde_json::to_string_pretty(facts)
        .map_err(|e| IntakeError::BadRequest(format!("Facts are not serializable: {}", e)))?;
    let trials = serde_json::to_string_pretty(digests)
        .map_err(|e| IntakeError::BadRequest(format!("Trials are not serializable: {}", e)))?;

    Ok(format!(
        "Patient facts:\n{}\n\nTrials ({} total):\n{}",
        facts,
        digests.len(),
        trials
    ))
}

/// Accept a bare array, or an object wrapping exactly one array
fn ranked_entries(raw: JsonValue) -> JsonValue {
    match raw {
        JsonValue::Object(map) if map.len() == 1 && map.values().all(JsonValue::is_array) => {
            map.into_iter()
                .next()
                .map(|(_, v)| v)
                .unwrap_or(JsonValue::Null)
        }
        other => other,
    }
}

/// Rank `trials` for the patient. An empty list returns without calling the LLM.
pub async fn rank_trials(
    client: &GeminiClient,
    facts: &ExtractedFacts,
    trials: &[ClinicalTrial],
) -> Result<Vec<RankedTrial>, IntakeError> {
    if trials.is_empty() {
        return Ok(Vec::new());
    }

    let digests: Vec<TrialDigest> = trials.iter().map(ClinicalTrial::digest).collect();
    let prompt = build_prompt(facts, &digests)?;

    let reply = client
        .generate(
            Some(SYSTEM_PROMPT),
            &prompt,
            GenerationOptions {
                temperature: Some(TEMPERATURE),
                response_schema: Some(ranking::response_schema()),
            },
        )
        .await?;

    let ranked = parse_reply(&reply).map(ranked_entries).and_then(|raw| {
        serde_json::from_value::<Vec<RankedTrial>>(raw).map_err(|e| {
            tracing::error!(error = %e, raw = %reply, "LLM ranking has an unexpected shape");
            IntakeError::malformed(
                Upstream::Llm,
                format!("ranking does not match the expected shape: {}", e),
            )
        })
    });
    record_decode(&ranked);
    let ranked = ranked?;

    let reconciled = reconcile(trials, ranked);
    if !reconciled.missing.is_empty() {
        tracing::warn!(
            missing = ?reconciled.missing,
            "LLM did not rank every trial"
        );
    }
    if reconciled.unidentified > 0 {
        tracing::warn!(
            count = reconciled.unidentified,
            "Trials without an NCT id were left unranked"
        );
    }
    if !reconciled.unknown.is_empty() {
        tracing::warn!(
            unknown = ?reconciled.unknown,
            "LLM ranked trials that were not requested"
        );
    }

    Ok(reconciled.ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ranked_entries_unwraps_single_array() {
        let raw = json!({"rankings": [{"nctId": "NCT1"}]});
        assert_eq!(ranked_entries(raw), json!([{"nctId": "NCT1"}]));

        let raw = json!([{"nctId": "NCT1"}]);
        assert_eq!(ranked_entries(raw.clone()), raw);

        let raw = json!({"nctId": "NCT1", "matchPercentage": 10});
        assert_eq!(ranked_entries(raw.clone()), raw);
    }

    #[test]
    fn test_prompt_lists_trial_count() {
        let digests = vec![TrialDigest {
            nct_id: "NCT01234567".to_string(),
            ..Default::default()
        }];
        let prompt = build_prompt(&ExtractedFacts::default(), &digests).unwrap();
        assert!(prompt.contains("Trials (1 total)"));
        assert!(prompt.contains("NCT01234567"));
    }
}
