//! Ranked trial output and reconciliation against the searched trials

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::trial::ClinicalTrial;

/// LLM verdict for one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedTrial {
    pub nct_id: String,
    pub match_percentage: f64,
    pub summary_note: String,
}

/// Result of lining ranked entries up with the input trials
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// Ranked entries in input-trial order
    pub ranked: Vec<RankedTrial>,
    /// Input trials the model did not rank
    pub missing: Vec<String>,
    /// Ranked ids that matched no input trial
    pub unknown: Vec<String>,
    /// Input trials without an NCT id; these can never be ranked
    pub unidentified: usize,
}

/// Align ranked entries with the input trials by NCT id.
///
/// Entries for unknown ids are dropped, duplicates keep their first
/// occurrence, percentages are clamped to 0–100, and the output follows the
/// order of `trials`.
pub fn reconcile(trials: &[ClinicalTrial], ranked: Vec<RankedTrial>) -> Reconciled {
    let expected: Vec<String> = trials.iter().filter_map(ClinicalTrial::nct_id).collect();
    let unidentified = trials.len() - expected.len();
    let expected_set: HashSet<&str> = expected.iter().map(String::as_str).collect();

    let mut by_id: HashMap<String, RankedTrial> = HashMap::new();
    let mut unknown = Vec::new();
    for mut entry in ranked {
        entry.nct_id = entry.nct_id.trim().to_string();
        if !expected_set.contains(entry.nct_id.as_str()) {
            unknown.push(entry.nct_id);
            continue;
        }
        entry.match_percentage = clamp_percentage(entry.match_percentage);
        by_id.entry(entry.nct_id.clone()).or_insert(entry);
    }

    let mut ranked = Vec::with_capacity(expected.len());
    let mut missing = Vec::new();
    for id in expected {
        match by_id.remove(&id) {
            Some(entry) => ranked.push(entry),
            // an id listed twice in the input is satisfied by the first slot
            None if ranked.iter().any(|r: &RankedTrial| r.nct_id == id) => {}
            None => missing.push(id),
        }
    }

    Reconciled {
        ranked,
        missing,
        unknown,
        unidentified,
    }
}

fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0).round()
    }
}

/// Response schema the LLM must satisfy when ranking trials
pub fn response_schema() -> JsonValue {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "nctId": {"type": "STRING"},
                "matchPercentage": {"type": "INTEGER"},
                "summaryNote": {"type": "STRING"}
            },
            "required": ["nctId", "matchPercentage", "summaryNote"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(id: &str) -> ClinicalTrial {
        ClinicalTrial(json!({"protocolSection": {"identificationModule": {"nctId": id}}}))
    }

    fn ranked(id: &str, pct: f64) -> RankedTrial {
        RankedTrial {
            nct_id: id.to_string(),
            match_percentage: pct,
            summary_note: format!("note for {id}"),
        }
    }

    #[test]
    fn test_reorders_to_input_order() {
        let trials = vec![trial("NCT1"), trial("NCT2"), trial("NCT3")];
        let out = reconcile(
            &trials,
            vec![ranked("NCT3", 10.0), ranked("NCT1", 90.0), ranked("NCT2", 50.0)],
        );

        let ids: Vec<&str> = out.ranked.iter().map(|r| r.nct_id.as_str()).collect();
        assert_eq!(ids, vec!["NCT1", "NCT2", "NCT3"]);
        assert!(out.missing.is_empty());
        assert!(out.unknown.is_empty());
    }

    #[test]
    fn test_unknown_and_duplicate_entries_dropped() {
        let trials = vec![trial("NCT1"), trial("NCT2")];
        let out = reconcile(
            &trials,
            vec![
                ranked("NCT1", 80.0),
                ranked("NCT9", 99.0),
                ranked("NCT1", 20.0),
                ranked(" NCT2 ", 40.0),
            ],
        );

        assert_eq!(out.ranked.len(), 2);
        assert_eq!(out.ranked[0].match_percentage, 80.0);
        assert_eq!(out.ranked[1].nct_id, "NCT2");
        assert_eq!(out.unknown, vec!["NCT9"]);
    }

    #[test]
    fn test_missing_trials_reported() {
        let trials = vec![trial("NCT1"), trial("NCT2")];
        let out = reconcile(&trials, vec![ranked("NCT2", 70.0)]);

        assert_eq!(out.ranked.len(), 1);
        assert_eq!(out.missing, vec!["NCT1"]);
    }

    #[test]
    fn test_trials_without_id_counted() {
        let trials = vec![
            trial("NCT1"),
            ClinicalTrial(json!({"protocolSection": {}})),
            ClinicalTrial(json!({})),
        ];
        let out = reconcile(&trials, vec![ranked("NCT1", 50.0)]);

        assert_eq!(out.ranked.len(), 1);
        assert!(out.missing.is_empty());
        assert_eq!(out.unidentified, 2);
    }

    #[test]
    fn test_percentages_clamped() {
        let trials = vec![trial("NCT1"), trial("NCT2"), trial("NCT3")];
        let out = reconcile(
            &trials,
            vec![ranked("NCT1", 140.0), ranked("NCT2", -5.0), ranked("NCT3", 66.6)],
        );

        let pcts: Vec<f64> = out.ranked.iter().map(|r| r.match_percentage).collect();
        assert_eq!(pcts, vec![100.0, 0.0, 67.0]);
    }

    #[test]
    fn test_ranked_serializes_camel_case() {
        let value = serde_json::to_value(ranked("NCT1", 75.0)).unwrap();
        assert_eq!(value["nctId"], "NCT1");
        assert_eq!(value["matchPercentage"], 75.0);
        assert_eq!(value["summaryNote"], "note for NCT1");
    }
}
