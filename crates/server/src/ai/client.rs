//! Gemini API client for the generateContent endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use trialmatch_core::{IntakeError, Upstream, truncate_chars};

use crate::middleware::metrics::record_upstream;

/// Upstream error bodies are cut to this many characters
const ERROR_BODY_LIMIT: usize = 500;

/// Client for the Gemini generateContent API
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

/// Per-call generation settings
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    /// OpenAPI-style schema constraining the JSON output
    pub response_schema: Option<JsonValue>,
}

/// Request body for generateContent
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<RequestContent<'a>>,
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<JsonValue>,
}

/// Response from generateContent
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Error detail from the API
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GeminiClient {
    /// Create a new client for `model` under `base_url` (e.g. `.../v1beta`)
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send one prompt and return the concatenated text of the first candidate
    pub async fn generate(
        &self,
        system: Option<&str>,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String, IntakeError> {
        let request = build_request(system, prompt, options);
        let response = self.send(&request).await?;
        // success is recorded once the caller has decoded the reply
        extract_text(&response).inspect_err(|_| record_upstream(Upstream::Llm, "empty"))
    }

    async fn send(&self, request: &ApiRequest<'_>) -> Result<ApiResponse, IntakeError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        tracing::debug!(model = %self.model, "Calling generateContent");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                record_upstream(Upstream::Llm, "error");
                IntakeError::UpstreamRequest {
                    service: Upstream::Llm,
                    status: None,
                    body: format!("HTTP request failed: {}", e),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            record_upstream(Upstream::Llm, "error");
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "LLM API error");
            let body = match serde_json::from_str::<ApiError>(&body) {
                Ok(api_err) => api_err.error.message,
                Err(_) => body,
            };
            return Err(IntakeError::UpstreamRequest {
                service: Upstream::Llm,
                status: Some(status.as_u16()),
                body: truncate_chars(&body, ERROR_BODY_LIMIT),
            });
        }

        response.json::<ApiResponse>().await.map_err(|e| {
            record_upstream(Upstream::Llm, "malformed");
            IntakeError::malformed(Upstream::Llm, format!("Failed to parse response: {}", e))
        })
    }
}

fn build_request<'a>(
    system: Option<&'a str>,
    prompt: &'a str,
    options: GenerationOptions,
) -> ApiRequest<'a> {
    ApiRequest {
        system_instruction: system.map(|text| RequestContent {
            role: None,
            parts: vec![RequestPart { text }],
        }),
        contents: vec![RequestContent {
            role: Some("user"),
            parts: vec![RequestPart { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature: options.temperature,
            response_mime_type: "application/json",
            response_schema: options.response_schema,
        },
    }
}

/// Extract text content from an API response
pub fn extract_text(response: &ApiResponse) -> Result<String, IntakeError> {
    let Some(candidate) = response.candidates.first() else {
        let reason = match response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            Some(block) => format!("prompt blocked ({})", block),
            None => "response contained no candidates".to_string(),
        };
        return Err(IntakeError::UpstreamEmpty {
            service: Upstream::Llm,
            reason,
        });
    };

    let text: String = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(IntakeError::UpstreamEmpty {
            service: Upstream::Llm,
            reason: format!(
                "candidate had no text parts (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        });
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: JsonValue) -> ApiResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_build_request_body() {
        let request = build_request(
            Some("be precise"),
            "summarize this",
            GenerationOptions {
                temperature: Some(0.1),
                response_schema: Some(json!({"type": "OBJECT"})),
            },
        );
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "summarize this");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be precise");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_request_omits_unset_options() {
        let request = build_request(None, "hi", GenerationOptions::default());
        let body = serde_json::to_value(&request).unwrap();

        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("temperature").is_none());
        assert!(body["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response = parse(json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(extract_text(&response).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        let response = parse(json!({"candidates": []}));
        assert!(matches!(
            extract_text(&response),
            Err(IntakeError::UpstreamEmpty { .. })
        ));

        let response = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        match extract_text(&response) {
            Err(IntakeError::UpstreamEmpty { reason, .. }) => assert!(reason.contains("SAFETY")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_extract_text_empty_parts() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]
        }));
        match extract_text(&response) {
            Err(IntakeError::UpstreamEmpty { reason, .. }) => {
                assert!(reason.contains("MAX_TOKENS"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
