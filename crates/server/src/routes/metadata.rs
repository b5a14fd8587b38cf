//! Metadata endpoint handler

use axum::Json;
use serde::Serialize;

/// Description of one pipeline stage
#[derive(Serialize)]
pub struct StageInfo {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

/// Service description
#[derive(Serialize)]
pub struct ServiceMetadata {
    name: &'static str,
    version: &'static str,
    stages: Vec<StageInfo>,
}

const STAGES: [(&str, &str, &str); 4] = [
    ("parse", "/api/parse", "Summarize a care-record document"),
    ("extract", "/api/extract", "De-identify a summary and extract matching facts"),
    ("search", "/api/search", "Search the clinical-trial registry"),
    ("rank", "/api/rank", "Rank trials against the patient"),
];

/// GET /metadata - Return the service description
pub async fn get() -> Json<ServiceMetadata> {
    Json(ServiceMetadata {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        stages: STAGES
            .iter()
            .map(|&(name, path, description)| StageInfo {
                name,
                method: "POST",
                path,
                description,
            })
            .collect(),
    })
}
