use axum::{
    Extension,
    body::Body,
    extract::Request,
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// Header carrying the shared API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// API Key authentication state
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: Option<String>,
}

impl ApiKeyAuth {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    /// Whether the request headers satisfy the configured key
    pub fn is_authorized(&self, headers: &HeaderMap) -> bool {
        match &self.api_key {
            None => true,
            Some(expected) => headers
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|provided| provided == expected),
        }
    }
}

/// Reject requests without a valid `X-API-Key` when a key is configured.
/// Preflight requests pass through untouched.
pub async fn auth_middleware(
    Extension(auth): Extension<ApiKeyAuth>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || auth.is_authorized(request.headers()) {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Rejected request with missing or invalid API key");
    AppError::Unauthorized("Missing or invalid API key".to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_key_configured_allows_all() {
        assert!(ApiKeyAuth::new(None).is_authorized(&HeaderMap::new()));
    }

    #[test]
    fn test_key_must_match() {
        let auth = ApiKeyAuth::new(Some("secret".to_string()));
        let mut headers = HeaderMap::new();
        assert!(!auth.is_authorized(&headers));

        headers.insert(API_KEY_HEADER, "wrong".parse().unwrap());
        assert!(!auth.is_authorized(&headers));

        headers.insert(API_KEY_HEADER, "secret".parse().unwrap());
        assert!(auth.is_authorized(&headers));
    }
}
