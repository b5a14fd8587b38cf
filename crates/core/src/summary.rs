//! Clinical summary model and post-validation of LLM-produced summaries

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{IntakeError, Upstream};

/// Plausible reported age range; anything outside is recomputed from the birth year
pub const PLAUSIBLE_AGE: std::ops::RangeInclusive<i64> = 2..=120;

const MAX_DERIVED_AGE: i32 = 120;
const EARLIEST_BIRTH_YEAR: i32 = 1900;

/// Tokens an LLM echoes back from the schema template instead of real values
const PLACEHOLDER_TOKENS: &[&str] = &[
    "string",
    "number",
    "integer",
    "boolean",
    "object",
    "array",
    "null",
    "undefined",
    "n/a",
    "na",
    "yyyy-mm-dd",
    "yyyymmdd",
];

/// Extra list-only sentinels that mean "no entry"
const LIST_SENTINELS: &[&str] = &["none", "-", ""];

/// Patient demographics block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Demographics {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub age: Option<u32>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
}

/// Most recent vital signs, kept as display strings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VitalSigns {
    pub height: Option<String>,
    pub weight: Option<String>,
    pub bmi: Option<String>,
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<String>,
    pub temperature: Option<String>,
    pub respiratory_rate: Option<String>,
    pub oxygen_saturation: Option<String>,
}

/// Structured summary of a care-record document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClinicalSummary {
    pub demographics: Demographics,
    pub conditions: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
    pub procedures: Vec<String>,
    pub vital_signs: VitalSigns,
}

/// Schema template embedded in the parse prompt
pub const SUMMARY_TEMPLATE: &str = r#"{
  "demographics": {
    "name": "string|null",
    "gender": "string|null",
    "birthDate": "YYYY-MM-DD|null",
    "age": "number|null",
    "address": "string|null",
    "postalCode": "string|null",
    "phone": "string|null"
  },
  "conditions": ["string"],
  "medications": ["string"],
  "allergies": ["string"],
  "procedures": ["string"],
  "vitalSigns": {
    "height": "string|null",
    "weight": "string|null",
    "bmi": "string|null",
    "bloodPressure": "string|null",
    "heartRate": "string|null",
    "temperature": "string|null",
    "respiratoryRate": "string|null",
    "oxygenSaturation": "string|null"
  }
}"#;

/// Coerce raw LLM output into a well-formed [`ClinicalSummary`].
///
/// Placeholder tokens become null at any depth, list fields are always
/// arrays without sentinel entries, missing vital signs become the all-null
/// record, and an implausible age is recomputed from the birth year
/// relative to `current_year`.
pub fn normalize_summary(raw: JsonValue, current_year: i32) -> Result<ClinicalSummary, IntakeError> {
    let JsonValue::Object(root) = scrub_placeholders(raw) else {
        return Err(IntakeError::malformed(
            Upstream::Llm,
            "expected a JSON object for the clinical summary",
        ));
    };

    Ok(ClinicalSummary {
        demographics: normalize_demographics(root.get("demographics"), current_year),
        conditions: normalize_list(root.get("conditions")),
        medications: normalize_list(root.get("medications")),
        allergies: normalize_list(root.get("allergies")),
        procedures: normalize_list(root.get("procedures")),
        vital_signs: normalize_vitals(root.get("vitalSigns")),
    })
}

fn is_placeholder(text: &str) -> bool {
    let lowered = text.trim().to_ascii_lowercase();
    // "string|null" and "YYYY-MM-DD | null" come straight from the template
    let base = lowered
        .strip_suffix("null")
        .and_then(|rest| rest.trim_end().strip_suffix('|'))
        .map(str::trim_end)
        .unwrap_or(lowered.as_str());
    PLACEHOLDER_TOKENS.contains(&base)
}

/// Replace placeholder strings with null throughout the tree
fn scrub_placeholders(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) if is_placeholder(&s) => JsonValue::Null,
        JsonValue::Array(items) => {
            JsonValue::Array(items.into_iter().map(scrub_placeholders).collect())
        }
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(k, v)| (k, scrub_placeholders(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Read a scalar as trimmed, non-empty text
fn text_field(map: &Map<String, JsonValue>, key: &str) -> Option<String> {
    match map.get(key)? {
        JsonValue::String(s) => Some(s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn normalize_demographics(value: Option<&JsonValue>, current_year: i32) -> Demographics {
    let Some(JsonValue::Object(map)) = value else {
        return Demographics::default();
    };

    let birth_date = text_field(map, "birthDate");
    let reported_age = map.get("age").and_then(parse_age);

    Demographics {
        name: text_field(map, "name"),
        gender: text_field(map, "gender"),
        age: resolve_age(reported_age, birth_date.as_deref(), current_year),
        birth_date,
        address: text_field(map, "address"),
        postal_code: text_field(map, "postalCode"),
        phone: text_field(map, "phone"),
    }
}

/// Accept numeric ages and strings with a leading number ("55", "55 years")
fn parse_age(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64)),
        JsonValue::String(s) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// First four-digit run in a date string that is a plausible birth year.
/// Digit runs whose leading four digits are out of range are skipped whole.
pub fn birth_year(birth_date: &str, current_year: i32) -> Option<i32> {
    let mut run_start = None;
    let mut skipping = false;
    for (i, c) in birth_date.char_indices() {
        if !c.is_ascii_digit() {
            run_start = None;
            skipping = false;
            continue;
        }
        if skipping {
            continue;
        }
        let start = *run_start.get_or_insert(i);
        // compact dates such as 19700315 also start with the year
        if i + 1 - start == 4 {
            let year = birth_date[start..=i]
                .parse()
                .ok()
                .filter(|y| (EARLIEST_BIRTH_YEAR..=current_year).contains(y));
            if year.is_some() {
                return year;
            }
            skipping = true;
        }
    }
    None
}

/// Keep a plausible reported age, otherwise derive one from the birth year
pub fn resolve_age(reported: Option<i64>, birth_date: Option<&str>, current_year: i32) -> Option<u32> {
    if let Some(age) = reported.filter(|a| PLAUSIBLE_AGE.contains(a)) {
        return u32::try_from(age).ok();
    }

    birth_date
        .and_then(|d| birth_year(d, current_year))
        .map(|year| current_year - year)
        .filter(|age| (0..=MAX_DERIVED_AGE).contains(age))
        .and_then(|age| u32::try_from(age).ok())
}

fn entry_text(entry: &JsonValue) -> Option<String> {
    let text = match entry {
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Object(map) => ["name", "term", "display", "description", "text"]
            .iter()
            .find_map(|key| text_field(map, key))?,
        _ => return None,
    };

    let lowered = text.to_ascii_lowercase();
    if LIST_SENTINELS.contains(&lowered.as_str()) || is_placeholder(&text) {
        return None;
    }
    Some(text)
}

fn normalize_list(value: Option<&JsonValue>) -> Vec<String> {
    match value {
        Some(JsonValue::Array(items)) => items.iter().filter_map(entry_text).collect(),
        _ => Vec::new(),
    }
}

fn normalize_vitals(value: Option<&JsonValue>) -> VitalSigns {
    let Some(JsonValue::Object(map)) = value else {
        return VitalSigns::default();
    };

    VitalSigns {
        height: text_field(map, "height"),
        weight: text_field(map, "weight"),
        bmi: text_field(map, "bmi"),
        blood_pressure: text_field(map, "bloodPressure"),
        heart_rate: text_field(map, "heartRate"),
        temperature: text_field(map, "temperature"),
        respiratory_rate: text_field(map, "respiratoryRate"),
        oxygen_saturation: text_field(map, "oxygenSaturation"),
    }
}
