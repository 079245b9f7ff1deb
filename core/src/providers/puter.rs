//! Secondary provider: a host-injected Puter capability.
//!
//! The host object manages its own auth and request lifecycle, so this
//! client is a thin adapter: probe for the handle, forward one chat call,
//! and bound the wait. An absent handle means "unavailable", never an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::timeout;

use super::{AiProvider, ChatMessage, ChatOptions, ChatResult, ProviderKind};
use crate::errors::AiError;

/// Identity record returned by the host's auth surface.
#[derive(Debug, Clone, Serialize)]
pub struct HostUser {
    pub username: String,
}

/// Raw reply shape from the host capability before normalisation.
#[derive(Debug, Clone)]
pub struct HostChatReply {
    pub content: Option<String>,
}

/// The capability surface the host environment may inject. Substituted with
/// a fake in tests.
#[async_trait]
pub trait HostCapability: Send + Sync + 'static {
    fn is_signed_in(&self) -> bool;
    async fn sign_in(&self) -> anyhow::Result<()>;
    async fn sign_out(&self) -> anyhow::Result<()>;
    async fn get_user(&self) -> anyhow::Result<HostUser>;
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        model: Option<String>,
    ) -> anyhow::Result<HostChatReply>;
}

pub struct PuterClient {
    host: Option<Arc<dyn HostCapability>>,
}

impl PuterClient {
    pub fn new(host: Option<Arc<dyn HostCapability>>) -> Self {
        Self { host }
    }

    /// Client for an environment where the host never injected the
    /// capability.
    pub fn detached() -> Self {
        Self::new(None)
    }

    pub fn host(&self) -> Option<&Arc<dyn HostCapability>> {
        self.host.as_ref()
    }
}

#[async_trait]
impl AiProvider for PuterClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Puter
    }

    fn available(&self) -> bool {
        self.host.is_some()
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        opts: &ChatOptions,
    ) -> Result<ChatResult, AiError> {
        let host = self.host.clone().ok_or(AiError::NoProviderAvailable)?;
        let messages = messages.to_vec();
        let model = opts.model.clone();
        let result_model = model.clone();

        // The host call runs in its own task. On timeout only the wait is
        // abandoned; the host call itself is not cancelled and finishes (or
        // fails) on its own. Accepted limitation of the capability contract.
        let call = tokio::spawn(async move { host.chat(messages, model).await });
        let reply = match timeout(Duration::from_millis(opts.timeout_ms), call).await {
            Err(_elapsed) => return Err(AiError::Timeout),
            Ok(joined) => joined
                .map_err(|err| AiError::Transport(err.to_string()))?
                .map_err(|err| AiError::Transport(err.to_string()))?,
        };

        let content = reply
            .content
            .filter(|text| !text.is_empty())
            .ok_or(AiError::EmptyResponse)?;
        Ok(ChatResult { content, provider: ProviderKind::Puter, model: result_model })
    }
}
