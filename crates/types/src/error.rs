//! Error taxonomy for the agent.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Failure of one decision-channel round trip.
///
/// The loop classifies these into "retry with backoff" (transient) and
/// "give up now" (permanent); [`DecisionError::user_message`] is what ends
/// up in the terminal `Failed` result.
#[derive(Debug, Clone, Error)]
pub enum DecisionError {
    /// 401/403: the credential is wrong or revoked.
    #[error("authentication rejected (HTTP {status})")]
    Auth { status: u16 },
    /// 404: the configured model does not exist at the endpoint.
    #[error("model not found")]
    ModelNotFound,
    /// 429: the endpoint asked us to slow down.
    #[error("rate limited")]
    RateLimited,
    /// Any other non-success HTTP status.
    #[error("HTTP error {status}")]
    Http { status: u16 },
    /// The request timed out while reading the response.
    #[error("request timed out")]
    Timeout,
    /// DNS resolution or TCP connect failed.
    #[error("could not connect")]
    NoInternet,
    /// The endpoint answered with something we could not use.
    #[error("invalid response: {0}")]
    Invalid(String),
    /// Anything else on the transport.
    #[error("transport error: {0}")]
    Transport(String),
}

impl DecisionError {
    /// Whether retrying cannot help.
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::ModelNotFound)
    }

    /// The message shown to the user when this error terminates a run.
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "API key invalid or expired",
            Self::RateLimited => "Rate limited",
            Self::NoInternet => "No internet",
            Self::Timeout => "Timeout",
            Self::ModelNotFound | Self::Http { .. } => "Could not reach AI service",
            Self::Invalid(_) | Self::Transport(_) => "Something went wrong",
        }
    }
}

impl ErrorCode for DecisionError {
    fn code(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "DECISION_AUTH",
            Self::ModelNotFound => "DECISION_MODEL_NOT_FOUND",
            Self::RateLimited => "DECISION_RATE_LIMITED",
            Self::Http { .. } => "DECISION_HTTP",
            Self::Timeout => "DECISION_TIMEOUT",
            Self::NoInternet => "DECISION_NO_INTERNET",
            Self::Invalid(_) => "DECISION_INVALID",
            Self::Transport(_) => "DECISION_TRANSPORT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_classification() {
        assert!(DecisionError::Auth { status: 401 }.is_permanent());
        assert!(DecisionError::ModelNotFound.is_permanent());
        assert!(!DecisionError::RateLimited.is_permanent());
        assert!(!DecisionError::Timeout.is_permanent());
    }

    #[test]
    fn user_messages() {
        assert_eq!(
            DecisionError::Auth { status: 401 }.user_message(),
            "API key invalid or expired"
        );
        assert_eq!(DecisionError::NoInternet.user_message(), "No internet");
        assert_eq!(
            DecisionError::Http { status: 500 }.user_message(),
            "Could not reach AI service"
        );
    }
}
