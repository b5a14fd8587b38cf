//! Registry study records and their prompt-friendly digests

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Eligibility text beyond this many characters is cut before prompting
pub const ELIGIBILITY_CHAR_BUDGET: usize = 1500;

/// A study record as returned by the registry, passed through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClinicalTrial(pub JsonValue);

impl ClinicalTrial {
    fn module(&self, name: &str) -> Option<&JsonValue> {
        self.0.get("protocolSection")?.get(name)
    }

    fn module_str(&self, module: &str, field: &str) -> Option<String> {
        self.module(module)?
            .get(field)?
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn module_list(&self, module: &str, field: &str) -> Vec<String> {
        self.module(module)
            .and_then(|m| m.get(field))
            .and_then(JsonValue::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `protocolSection.identificationModule.nctId`
    pub fn nct_id(&self) -> Option<String> {
        self.module_str("identificationModule", "nctId")
    }

    /// Reduce the record to the handful of fields the ranking prompt needs
    pub fn digest(&self) -> TrialDigest {
        let phases = self.module_list("designModule", "phases");

        TrialDigest {
            nct_id: self.nct_id().unwrap_or_default(),
            title: self
                .module_str("identificationModule", "briefTitle")
                .or_else(|| self.module_str("identificationModule", "officialTitle")),
            status: self.module_str("statusModule", "overallStatus"),
            phase: (!phases.is_empty()).then(|| phases.join("/")),
            conditions: self.module_list("conditionsModule", "conditions"),
            eligibility: self
                .module_str("eligibilityModule", "eligibilityCriteria")
                .map(|text| crate::error::truncate_chars(&text, ELIGIBILITY_CHAR_BUDGET)),
            sex: self.module_str("eligibilityModule", "sex"),
            minimum_age: self.module_str("eligibilityModule", "minimumAge"),
            maximum_age: self.module_str("eligibilityModule", "maximumAge"),
        }
    }
}

/// Flat projection of a [`ClinicalTrial`] embedded in the ranking prompt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialDigest {
    pub nct_id: String,
    pub title: Option<String>,
    pub status: Option<String>,
    pub phase: Option<String>,
    pub conditions: Vec<String>,
    pub eligibility: Option<String>,
    pub sex: Option<String>,
    pub minimum_age: Option<String>,
    pub maximum_age: Option<String>,
}
