use thiserror::Error;

/// Fixed message for a missing LLM credential
pub const MISSING_API_KEY_MESSAGE: &str = "LLM API key is not configured on the server";

/// Which external service an upstream error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Llm,
    Registry,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::Llm => "llm",
            Upstream::Registry => "registry",
        }
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intake pipeline error types
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("{}", MISSING_API_KEY_MESSAGE)]
    Configuration,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{service} request failed{}: {body}", status_suffix(.status))]
    UpstreamRequest {
        service: Upstream,
        status: Option<u16>,
        body: String,
    },

    #[error("{service} returned no usable content: {reason}")]
    UpstreamEmpty { service: Upstream, reason: String },

    #[error("{service} returned a malformed payload: {message}")]
    UpstreamMalformed {
        service: Upstream,
        message: String,
        /// Truncated excerpt of the offending payload, only surfaced by stages that opt in
        snippet: Option<String>,
    },
}

impl IntakeError {
    pub fn malformed(service: Upstream, message: impl Into<String>) -> Self {
        IntakeError::UpstreamMalformed {
            service,
            message: message.into(),
            snippet: None,
        }
    }

    /// Drop any payload excerpt before the error leaves the service
    pub fn without_snippet(self) -> Self {
        match self {
            IntakeError::UpstreamMalformed {
                service, message, ..
            } => IntakeError::UpstreamMalformed {
                service,
                message,
                snippet: None,
            },
            other => other,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" with status {}", s))
        .unwrap_or_default()
}

/// Truncate to at most `max_chars` characters, appending an ellipsis when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}
