//! Preference-ordered fallback over the two chat providers.
//!
//! The dispatcher is deliberately free of ambient state: preference, model
//! and timeout arrive as an explicit options value per call, and the
//! providers are injected at construction so tests can substitute fakes.

use std::sync::Arc;

use log::{debug, warn};

use crate::errors::AiError;
use crate::providers::{
    AiProvider, ChatMessage, ChatOptions, ChatResult, ProviderKind, DEFAULT_TIMEOUT_MS,
};

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub preferred: ProviderKind,
    pub model: Option<String>,
    pub timeout_ms: u64,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            preferred: ProviderKind::Pollinations,
            model: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

pub struct Dispatcher {
    primary: Arc<dyn AiProvider>,
    secondary: Arc<dyn AiProvider>,
}

impl Dispatcher {
    pub fn new(primary: Arc<dyn AiProvider>, secondary: Arc<dyn AiProvider>) -> Self {
        Self { primary, secondary }
    }

    /// Try the providers in preference order and return the first success.
    ///
    /// Attempts are strictly sequential: the second provider is never
    /// invoked while the first is outstanding, and a provider already tried
    /// is never retried here (each client owns its local retry budget). If
    /// every provider was skipped or failed, the last recorded error is
    /// surfaced wrapped in [`AiError::AllProvidersFailed`].
    pub async fn dispatch(
        &self,
        messages: &[ChatMessage],
        opts: &DispatchOptions,
    ) -> Result<ChatResult, AiError> {
        let order: [&Arc<dyn AiProvider>; 2] = if opts.preferred == self.secondary.kind() {
            [&self.secondary, &self.primary]
        } else {
            [&self.primary, &self.secondary]
        };
        let chat_opts = ChatOptions { model: opts.model.clone(), timeout_ms: opts.timeout_ms };

        let mut last_err: Option<AiError> = None;
        for provider in order {
            if !provider.available() {
                debug!("skipping unavailable provider {}", provider.kind().as_str());
                continue;
            }
            match provider.chat(messages, &chat_opts).await {
                Ok(result) => {
                    debug!(
                        "provider {} answered with model {:?}",
                        result.provider.as_str(),
                        result.model
                    );
                    return Ok(result);
                }
                Err(err) => {
                    warn!(
                        "provider {} failed ({}): {err}",
                        provider.kind().as_str(),
                        err.code()
                    );
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) => Err(AiError::AllProvidersFailed(Box::new(err))),
            None => Err(AiError::NoProviderAvailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    enum Behaviour {
        Succeed,
        Fail,
    }

    struct FakeProvider {
        kind: ProviderKind,
        available: bool,
        behaviour: Behaviour,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn new(kind: ProviderKind, available: bool, behaviour: Behaviour) -> (Arc<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = Arc::new(Self { kind, available, behaviour, calls: calls.clone() });
            (provider, calls)
        }
    }

    #[async_trait]
    impl AiProvider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn available(&self) -> bool {
            self.available
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            opts: &ChatOptions,
        ) -> Result<ChatResult, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Succeed => Ok(ChatResult {
                    content: format!("reply from {}", self.kind.as_str()),
                    provider: self.kind,
                    model: opts.model.clone(),
                }),
                Behaviour::Fail => Err(AiError::Http(500)),
            }
        }
    }

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::user("make a navbar")]
    }

    #[tokio::test]
    async fn primary_first_by_default_and_secondary_untouched() {
        let (primary, _) = FakeProvider::new(ProviderKind::Pollinations, true, Behaviour::Succeed);
        let (secondary, secondary_calls) =
            FakeProvider::new(ProviderKind::Puter, true, Behaviour::Succeed);
        let dispatcher = Dispatcher::new(primary, secondary);

        let result = dispatcher
            .dispatch(&messages(), &DispatchOptions::default())
            .await
            .unwrap();

        assert_eq!(result.provider, ProviderKind::Pollinations);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn preferred_secondary_goes_first() {
        let (primary, primary_calls) =
            FakeProvider::new(ProviderKind::Pollinations, true, Behaviour::Succeed);
        let (secondary, _) = FakeProvider::new(ProviderKind::Puter, true, Behaviour::Succeed);
        let dispatcher = Dispatcher::new(primary, secondary);

        let opts = DispatchOptions { preferred: ProviderKind::Puter, ..Default::default() };
        let result = dispatcher.dispatch(&messages(), &opts).await.unwrap();

        assert_eq!(result.provider, ProviderKind::Puter);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_when_primary_fails() {
        let (primary, primary_calls) =
            FakeProvider::new(ProviderKind::Pollinations, true, Behaviour::Fail);
        let (secondary, _) = FakeProvider::new(ProviderKind::Puter, true, Behaviour::Succeed);
        let dispatcher = Dispatcher::new(primary, secondary);

        let result = dispatcher
            .dispatch(&messages(), &DispatchOptions::default())
            .await
            .unwrap();

        assert_eq!(result.provider, ProviderKind::Puter);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn skips_unavailable_provider_without_calling_it() {
        let (primary, primary_calls) =
            FakeProvider::new(ProviderKind::Pollinations, false, Behaviour::Succeed);
        let (secondary, _) = FakeProvider::new(ProviderKind::Puter, true, Behaviour::Succeed);
        let dispatcher = Dispatcher::new(primary, secondary);

        let result = dispatcher
            .dispatch(&messages(), &DispatchOptions::default())
            .await
            .unwrap();

        assert_eq!(result.provider, ProviderKind::Puter);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn both_unavailable_fails_without_any_call() {
        let (primary, primary_calls) =
            FakeProvider::new(ProviderKind::Pollinations, false, Behaviour::Succeed);
        let (secondary, secondary_calls) =
            FakeProvider::new(ProviderKind::Puter, false, Behaviour::Succeed);
        let dispatcher = Dispatcher::new(primary, secondary);

        let err = dispatcher
            .dispatch(&messages(), &DispatchOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::NoProviderAvailable));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhaustion_carries_the_last_error() {
        let (primary, _) = FakeProvider::new(ProviderKind::Pollinations, true, Behaviour::Fail);
        let (secondary, secondary_calls) =
            FakeProvider::new(ProviderKind::Puter, true, Behaviour::Fail);
        let dispatcher = Dispatcher::new(primary, secondary);

        let err = dispatcher
            .dispatch(&messages(), &DispatchOptions::default())
            .await
            .unwrap_err();

        assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);
        match err {
            AiError::AllProvidersFailed(inner) => {
                assert!(matches!(*inner, AiError::Http(500)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
