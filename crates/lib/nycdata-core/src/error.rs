//! Error taxonomy shared by every layer of the core.

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// A single rejected parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidInput {
    pub parameter: String,
    pub message: String,
    pub guidance: String,
}

impl InvalidInput {
    pub fn new(
        parameter: impl Into<String>,
        message: impl Into<String>,
        guidance: impl Into<String>,
    ) -> Self {
        Self {
            parameter: parameter.into(),
            message: message.into(),
            guidance: guidance.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// One or more parameters failed validation. Never retried.
    #[error("{}", join_messages(.0))]
    InvalidInput(Vec<InvalidInput>),

    /// Non-2xx response from the open-data API.
    #[error("NYC Open Data returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    /// A proposed query exceeds a configured hard cap.
    #[error("{parameter} of {requested} exceeds the maximum of {max}")]
    RateLimitExceeded {
        parameter: String,
        requested: i64,
        max: i64,
    },

    /// Network-level failure with no status code.
    #[error("network failure talking to NYC Open Data: {0}")]
    Transient(String),
}

fn join_messages(items: &[InvalidInput]) -> String {
    items
        .iter()
        .map(|item| item.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<InvalidInput> for CoreError {
    fn from(err: InvalidInput) -> Self {
        Self::InvalidInput(vec![err])
    }
}

impl CoreError {
    /// Taxonomy label reported as the envelope error `type`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::Transient(_) => "TRANSIENT_FAILURE",
        }
    }

    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Only 429, 5xx, and network-level failures are worth another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status, .. } => matches!(*status, 429 | 500..=599),
            Self::Transient(_) => true,
            Self::InvalidInput(_) | Self::RateLimitExceeded { .. } => false,
        }
    }

    /// Concrete remediation suggested to the caller.
    #[must_use]
    pub fn guidance(&self) -> String {
        match self {
            Self::InvalidInput(items) => items
                .first()
                .map_or_else(|| "Check the tool parameters.".to_string(), |item| {
                    item.guidance.clone()
                }),
            Self::Upstream { status: 429, .. } => "NYC Open Data is rate limiting requests. \
                Set NYC_OPEN_DATA_APP_TOKEN to a Socrata app token for a higher limit, \
                or retry in a minute."
                .to_string(),
            Self::Upstream { status, .. } if *status >= 500 => {
                "NYC Open Data is having trouble right now. Retry later.".to_string()
            }
            Self::Upstream { .. } => {
                "The query was rejected by NYC Open Data. Narrow or simplify the filters."
                    .to_string()
            }
            Self::RateLimitExceeded { parameter, max, .. } => {
                format!("Narrow the query: use a {parameter} of at most {max}.")
            }
            Self::Transient(_) => {
                "Could not reach NYC Open Data. Check connectivity and retry later.".to_string()
            }
        }
    }

    /// Structured details for the error envelope.
    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Self::InvalidInput(items) => json!({ "parameters": items }),
            Self::Upstream { status, .. } => json!({
                "status": status,
                "retryable": self.is_retryable(),
            }),
            Self::RateLimitExceeded {
                parameter,
                requested,
                max,
            } => json!({
                "parameter": parameter,
                "requested": requested,
                "max": max,
            }),
            Self::Transient(_) => json!({ "retryable": true }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        let upstream = |status| CoreError::Upstream {
            status,
            message: String::new(),
        };
        assert!(upstream(429).is_retryable());
        assert!(upstream(503).is_retryable());
        assert!(!upstream(404).is_retryable());
        assert!(!upstream(400).is_retryable());
        assert!(CoreError::Transient("reset".to_string()).is_retryable());
        assert!(!CoreError::from(InvalidInput::new("days", "bad", "fix")).is_retryable());
    }

    #[test]
    fn invalid_input_joins_messages() {
        let err = CoreError::InvalidInput(vec![
            InvalidInput::new("borough", "bad borough", "use a borough"),
            InvalidInput::new("days", "bad days", "use fewer days"),
        ]);
        assert_eq!(err.to_string(), "bad borough; bad days");
        assert_eq!(err.guidance(), "use a borough");
        assert_eq!(err.kind(), "INVALID_INPUT");
    }
}
