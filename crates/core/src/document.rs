//! Care-record request bodies: shape detection and document extraction

use serde_json::Value as JsonValue;

use crate::error::IntakeError;

/// How a request body should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    Json,
    Xml,
    Text,
}

impl BodyShape {
    /// Decide from the content type first, then by sniffing the leading character
    pub fn detect(content_type: Option<&str>, body: &str) -> Self {
        let content_type = content_type.map(|ct| ct.to_ascii_lowercase());
        match content_type.as_deref() {
            Some(ct) if ct.contains("json") => return BodyShape::Json,
            Some(ct) if ct.contains("xml") => return BodyShape::Xml,
            Some(ct) if ct.starts_with("text/plain") => return BodyShape::Text,
            _ => {}
        }

        match body.trim_start().chars().next() {
            Some('{' | '[') => BodyShape::Json,
            Some('<') => BodyShape::Xml,
            _ => BodyShape::Text,
        }
    }
}

/// Pull the document text out of a parse request body.
///
/// `{"xml": "..."}` envelopes yield the wrapped string; any other JSON is
/// re-serialized as the document; XML and text bodies are used as-is.
pub fn document_text(content_type: Option<&str>, body: &str) -> Result<String, IntakeError> {
    if body.trim().is_empty() {
        return Err(IntakeError::BadRequest("Request body is empty".to_string()));
    }

    match BodyShape::detect(content_type, body) {
        BodyShape::Json => {
            let value: JsonValue = serde_json::from_str(body)
                .map_err(|e| IntakeError::BadRequest(format!("Invalid JSON body: {}", e)))?;
            from_json(value)
        }
        BodyShape::Xml | BodyShape::Text => Ok(body.trim().to_string()),
    }
}

fn from_json(value: JsonValue) -> Result<String, IntakeError> {
    if let Some(xml) = value.get("xml") {
        return match xml.as_str().map(str::trim) {
            Some(xml) if !xml.is_empty() => Ok(xml.to_string()),
            _ => Err(IntakeError::BadRequest(
                "Field 'xml' must be a non-empty string".to_string(),
            )),
        };
    }

    match &value {
        JsonValue::Null => Err(IntakeError::BadRequest("Request body is empty".to_string())),
        JsonValue::Object(map) if map.is_empty() => {
            Err(IntakeError::BadRequest("Request body is empty".to_string()))
        }
        _ => serde_json::to_string_pretty(&value)
            .map_err(|e| IntakeError::BadRequest(format!("Invalid JSON body: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CCD: &str = "<ClinicalDocument><title>CCD</title></ClinicalDocument>";

    #[test]
    fn test_detect_by_content_type() {
        assert_eq!(BodyShape::detect(Some("application/json"), CCD), BodyShape::Json);
        assert_eq!(BodyShape::detect(Some("application/xml"), "{}"), BodyShape::Xml);
        assert_eq!(BodyShape::detect(Some("text/xml; charset=utf-8"), "x"), BodyShape::Xml);
        assert_eq!(BodyShape::detect(Some("text/plain"), "<a/>"), BodyShape::Text);
    }

    #[test]
    fn test_detect_by_sniffing() {
        assert_eq!(BodyShape::detect(None, "  {\"xml\": \"\"}"), BodyShape::Json);
        assert_eq!(BodyShape::detect(Some("application/octet-stream"), CCD), BodyShape::Xml);
        assert_eq!(BodyShape::detect(None, "Patient: 55 y/o"), BodyShape::Text);
    }

    #[test]
    fn test_xml_envelope() {
        let body = serde_json::json!({"xml": CCD}).to_string();
        assert_eq!(document_text(Some("application/json"), &body).unwrap(), CCD);
    }

    #[test]
    fn test_raw_xml() {
        assert_eq!(document_text(None, &format!("\n{CCD}\n")).unwrap(), CCD);
    }

    #[test]
    fn test_free_form_json() {
        let doc = document_text(None, r#"{"patient": {"age": 55}}"#).unwrap();
        assert!(doc.contains("\"age\": 55"));
    }

    #[test]
    fn test_rejections() {
        for (ct, body) in [
            (None, ""),
            (None, "   \n"),
            (Some("application/json"), "<xml/>"),
            (None, "{not json"),
            (None, r#"{"xml": ""}"#),
            (None, r#"{"xml": 42}"#),
            (Some("application/json"), "null"),
            (None, "{}"),
        ] {
            assert!(
                matches!(document_text(ct, body), Err(IntakeError::BadRequest(_))),
                "expected rejection for {body:?}"
            );
        }
    }
}
