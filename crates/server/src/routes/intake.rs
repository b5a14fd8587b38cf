//! Pipeline stage handlers: parse, extract, search, rank

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use chrono::Datelike;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use trialmatch_core::{
    ClinicalTrial, ExtractedFacts, IntakeError, RankedTrial, SearchFilters, TrialQuery,
    document_text,
};

use crate::AppState;
use crate::ai;
use crate::error::AppError;

/// Request body for trial search
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    extracted_facts: Option<ExtractedFacts>,
    #[serde(default)]
    filters: Option<SearchFilters>,
}

/// Request body for trial ranking
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankRequest {
    #[serde(default)]
    extracted_facts: Option<ExtractedFacts>,
    #[serde(default)]
    trials: Option<Vec<ClinicalTrial>>,
}

fn body_str(body: &Bytes) -> Result<&str, AppError> {
    std::str::from_utf8(body)
        .map_err(|_| AppError::BadRequest("Request body is not valid UTF-8".to_string()))
}

/// Decode a JSON request body, rejecting empty bodies and `null`
fn read_json(body: &Bytes) -> Result<JsonValue, AppError> {
    let text = body_str(body)?;
    if text.trim().is_empty() {
        return Err(AppError::BadRequest("Request body is empty".to_string()));
    }

    let value: JsonValue = serde_json::from_str(text)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    if value.is_null() {
        return Err(AppError::BadRequest("Request body is empty".to_string()));
    }

    Ok(value)
}

fn read_request<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_value(read_json(body)?)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
}

fn required_facts(facts: Option<ExtractedFacts>) -> Result<ExtractedFacts, AppError> {
    facts.ok_or_else(|| AppError::BadRequest("Missing required field: extractedFacts".to_string()))
}

/// POST /api/parse - Summarize a care-record document
///
/// Accepts raw CCD XML, a `{"xml": "..."}` envelope, or any other JSON
/// export, and returns a normalized clinical summary.
pub async fn parse(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let document = document_text(content_type, body_str(&body)?)?;
    let client = state.llm()?;

    tracing::info!(stage = "parse", document_chars = document.chars().count(), "Parsing document");

    let current_year = chrono::Utc::now().year();
    let summary = ai::document::summarize_document(client, &document, current_year).await?;

    Ok(Json(summary))
}

/// POST /api/extract - De-identify a summary and extract matching facts
pub async fn extract(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let summary = read_json(&body)?;
    let client = state.llm()?;

    tracing::info!(stage = "extract", "Extracting facts");

    let facts = ai::facts::extract_facts(client, &summary)
        .await
        .map_err(IntakeError::without_snippet)?;

    Ok(Json(facts))
}

/// POST /api/search - Query the trial registry for a patient
pub async fn search(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: SearchRequest = read_request(&body)?;
    let facts = required_facts(request.extracted_facts)?;
    let filters = request.filters.unwrap_or_default();

    let query = TrialQuery::build(&facts, &filters, state.query_options);
    let trials = state.registry.search(&query).await?;

    tracing::info!(stage = "search", count = trials.len(), "Trial search complete");

    Ok(Json(trials))
}

/// POST /api/rank - Score each trial against the patient
pub async fn rank(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: RankRequest = read_request(&body)?;
    let facts = required_facts(request.extracted_facts)?;
    let trials = request.trials.unwrap_or_default();

    if trials.is_empty() {
        return Ok(Json(Vec::<RankedTrial>::new()));
    }

    let client = state.llm()?;

    tracing::info!(stage = "rank", count = trials.len(), "Ranking trials");

    let ranked = ai::ranking::rank_trials(client, &facts, &trials)
        .await
        .map_err(IntakeError::without_snippet)?;

    Ok(Json(ranked))
}
