//! Decoding of JSON payloads out of model replies

use serde_json::Value as JsonValue;
use trialmatch_core::{IntakeError, Upstream, truncate_chars};

use crate::middleware::metrics::record_upstream;

/// Length of the raw-output excerpt attached to decode errors
const SNIPPET_CHARS: usize = 200;

/// Parse the JSON value in a model reply.
///
/// On failure the raw reply is logged and a truncated excerpt is attached to
/// the error; callers that must not echo it strip it with
/// [`IntakeError::without_snippet`].
pub fn parse_reply(text: &str) -> Result<JsonValue, IntakeError> {
    let candidate = extract_json(text);

    serde_json::from_str(candidate).map_err(|e| {
        tracing::error!(error = %e, raw = %text, "LLM output is not valid JSON");
        IntakeError::UpstreamMalformed {
            service: Upstream::Llm,
            message: format!("output is not valid JSON: {}", e),
            snippet: Some(truncate_chars(text.trim(), SNIPPET_CHARS)),
        }
    })
}

/// Count a finished LLM call by whether its reply decoded
pub fn record_decode<T>(result: &Result<T, IntakeError>) {
    record_upstream(
        Upstream::Llm,
        if result.is_ok() { "ok" } else { "malformed" },
    );
}

/// Locate the JSON document in text that might contain markdown code blocks
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    // Direct JSON object or array
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }

    // Wrapped in ```json ... ```
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }

    // Wrapped in ``` ... ```
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }

    // Prose around a bare document
    let open = trimmed.find(['{', '[']);
    let close = trimmed.rfind(['}', ']']);
    match (open, close) {
        (Some(open), Some(close)) if close > open => &trimmed[open..=close],
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        assert_eq!(parse_reply(r#" {"age": 55} "#).unwrap(), json!({"age": 55}));
        assert_eq!(parse_reply("[1, 2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_fenced_json() {
        let reply = "Here you go:\n```json\n{\"conditions\": []}\n```";
        assert_eq!(parse_reply(reply).unwrap(), json!({"conditions": []}));

        let reply = "```\n[{\"nctId\": \"NCT1\"}]\n```";
        assert_eq!(parse_reply(reply).unwrap(), json!([{"nctId": "NCT1"}]));
    }

    #[test]
    fn test_prose_wrapped_json() {
        let reply = "The summary is {\"a\": {\"b\": 1}} as requested.";
        assert_eq!(parse_reply(reply).unwrap(), json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_record_decode_outcomes() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_decode(&parse_reply("not json"));
            record_decode(&parse_reply("{}"));
        });

        let rendered = handle.render();
        let lines: Vec<&str> = rendered
            .lines()
            .filter(|l| l.starts_with("upstream_requests_total"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().any(|l| l.contains("outcome=\"malformed\"") && l.ends_with(" 1")));
        assert!(lines.iter().any(|l| l.contains("outcome=\"ok\"") && l.ends_with(" 1")));
    }

    #[test]
    fn test_invalid_json_carries_snippet() {
        let reply = format!("{{\"broken\": {}", "x".repeat(500));
        match parse_reply(&reply) {
            Err(IntakeError::UpstreamMalformed { snippet, .. }) => {
                let snippet = snippet.unwrap();
                assert!(snippet.starts_with("{\"broken\""));
                assert_eq!(snippet.chars().count(), SNIPPET_CHARS + 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
