//! Application error handling

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use trialmatch_core::{IntakeError, MISSING_API_KEY_MESSAGE};

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    TooManyRequests(String),
    Internal {
        message: String,
        details: Option<String>,
    },
}

/// JSON body returned for every failure
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal {
            message: message.into(),
            details: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg, None),
            AppError::Internal { message, details } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, details)
            }
        };

        (status, Json(ErrorBody { error, details })).into_response()
    }
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::BadRequest(msg) => AppError::BadRequest(msg),
            IntakeError::Configuration => AppError::internal(MISSING_API_KEY_MESSAGE),
            IntakeError::UpstreamRequest {
                service,
                status,
                body,
            } => AppError::Internal {
                message: format!("Upstream {} request failed", service),
                details: Some(match status {
                    Some(status) => format!("status {}: {}", status, body),
                    None => body,
                }),
            },
            IntakeError::UpstreamEmpty { service, reason } => AppError::Internal {
                message: format!("Upstream {} returned no content", service),
                details: Some(reason),
            },
            IntakeError::UpstreamMalformed {
                service,
                message,
                snippet,
            } => AppError::Internal {
                message: format!("Upstream {} returned a malformed response: {}", service, message),
                details: snippet,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialmatch_core::Upstream;

    fn status_of(err: IntakeError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(IntakeError::BadRequest("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(IntakeError::Configuration),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(IntakeError::UpstreamEmpty {
                service: Upstream::Llm,
                reason: "no candidates".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_configuration_message_is_fixed() {
        match AppError::from(IntakeError::Configuration) {
            AppError::Internal { message, details } => {
                assert_eq!(message, MISSING_API_KEY_MESSAGE);
                assert!(details.is_none());
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn test_upstream_status_in_details() {
        let err = IntakeError::UpstreamRequest {
            service: Upstream::Registry,
            status: Some(502),
            body: "bad gateway".into(),
        };
        match AppError::from(err) {
            AppError::Internal { details, .. } => {
                assert_eq!(details.as_deref(), Some("status 502: bad gateway"))
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
