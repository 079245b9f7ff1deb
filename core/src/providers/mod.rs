//! AI chat providers.
//!
//! Two structurally different backends sit behind the [`AiProvider`] trait:
//! an anonymous public HTTP endpoint ([`pollinations`]) that needs its own
//! timeout and retry machinery, and a host-injected capability
//! ([`puter`]) whose lifecycle is managed by the host. The dispatcher only
//! ever talks to the trait.

pub mod pollinations;
pub mod puter;

pub use pollinations::PollinationsClient;
pub use puter::{HostCapability, HostChatReply, HostUser, PuterClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AiError;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of the request payload. Assembled fresh per request; the
/// running transcript is never replayed to a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Pollinations,
    Puter,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pollinations => "pollinations",
            Self::Puter => "puter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pollinations" => Some(Self::Pollinations),
            "puter" => Some(Self::Puter),
            _ => None,
        }
    }
}

/// Normalised reply shape shared by both backends.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResult {
    pub content: String,
    pub provider: ProviderKind,
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self { model: None, timeout_ms: DEFAULT_TIMEOUT_MS }
    }
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Cheap availability probe. Returning `false` makes the dispatcher skip
    /// this provider without treating it as a failure.
    fn available(&self) -> bool;

    async fn chat(
        &self,
        messages: &[ChatMessage],
        opts: &ChatOptions,
    ) -> Result<ChatResult, AiError>;
}
