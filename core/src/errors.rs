use thiserror::Error;

/// Failure taxonomy for the AI dispatch pipeline.
///
/// "Provider unavailable" is deliberately absent as an error thrown by a
/// provider call: availability is surfaced through
/// [`crate::providers::AiProvider::available`] and an unavailable provider is
/// skipped, not failed.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("provider returned HTTP {0}")] Http(u16),
    #[error("provider returned an empty reply")] EmptyResponse,
    #[error("request timed out")] Timeout,
    #[error("transport failure: {0}")] Transport(String),
    #[error("no AI provider was available")] NoProviderAvailable,
    #[error("all AI providers failed")] AllProvidersFailed(#[source] Box<AiError>),
}

impl AiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "AI-1001",
            Self::EmptyResponse => "AI-1002",
            Self::Timeout => "AI-1003",
            Self::Transport(_) => "AI-1004",
            Self::NoProviderAvailable => "AI-1005",
            Self::AllProvidersFailed(_) => "AI-1006",
        }
    }

    pub fn explain(&self) -> &'static str {
        match self {
            Self::Http(_) => "The backend answered with a non-success HTTP status.",
            Self::EmptyResponse => "The backend answered but the reply carried no text.",
            Self::Timeout => "The request did not complete within the configured timeout.",
            Self::Transport(_) => "The request failed before an HTTP status was received.",
            Self::NoProviderAvailable => "Every configured AI provider reported itself unavailable.",
            Self::AllProvidersFailed(_) => "Every available AI provider was tried and failed.",
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if let Some(status) = err.status() {
            return Self::Http(status.as_u16());
        }
        Self::Transport(err.to_string())
    }
}
