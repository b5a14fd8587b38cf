//! Compact patient facts used for trial search and ranking

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value as JsonValue, json};

/// A diagnosed condition with an optional coded value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionFact {
    pub term: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// A recorded immunization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Immunization {
    pub name: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Facts extracted from a de-identified clinical summary.
///
/// Every key is always serialized; absent values become `null` or `[]` so
/// downstream stages can rely on their presence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedFacts {
    #[serde(deserialize_with = "lenient_age")]
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub conditions: Vec<ConditionFact>,
    pub medications: Vec<String>,
    pub zip_code: Option<String>,
    pub immunizations: Vec<Immunization>,
}

impl ExtractedFacts {
    /// Non-blank condition terms, in order
    pub fn condition_terms(&self) -> impl Iterator<Item = &str> {
        self.conditions
            .iter()
            .map(|c| c.term.trim())
            .filter(|t| !t.is_empty())
    }

    /// Trimmed postal code, if any
    pub fn postal_code(&self) -> Option<&str> {
        self.zip_code
            .as_deref()
            .map(str::trim)
            .filter(|z| !z.is_empty())
    }
}

/// Models sometimes answer `55.0` or `"55"` despite the integer schema
fn lenient_age<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.round() as u64)
            })
            .and_then(|age| u32::try_from(age).ok()),
        Some(JsonValue::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Response schema the LLM must satisfy when extracting facts
pub fn response_schema() -> JsonValue {
    json!({
        "type": "OBJECT",
        "properties": {
            "age": {"type": "INTEGER", "nullable": true},
            "gender": {"type": "STRING", "nullable": true},
            "conditions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "term": {"type": "STRING"},
                        "code": {"type": "STRING", "nullable": true}
                    },
                    "required": ["term"]
                }
            },
            "medications": {"type": "ARRAY", "items": {"type": "STRING"}},
            "zipCode": {"type": "STRING", "nullable": true},
            "immunizations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": {"type": "STRING"},
                        "date": {"type": "STRING", "nullable": true},
                        "status": {"type": "STRING", "nullable": true}
                    },
                    "required": ["name"]
                }
            }
        },
        "required": ["age", "gender", "conditions", "zipCode"]
    })
}
