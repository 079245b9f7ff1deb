//! Primary provider: the anonymous Pollinations text-generation endpoint.
//!
//! The endpoint needs no credentials, so this client carries its own
//! resilience: a per-attempt timeout and a bounded retry with backoff.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde_json::Value;
use tokio::time::{sleep, timeout};

use super::{AiProvider, ChatMessage, ChatOptions, ChatResult, ProviderKind};
use crate::errors::AiError;

pub const DEFAULT_ENDPOINT: &str = "https://text.pollinations.ai/";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

const MAX_ATTEMPTS: u64 = 2;
const TIMEOUT_BACKOFF_MS: u64 = 500;
const ERROR_BACKOFF_MS: u64 = 300;

#[derive(Clone)]
pub struct PollinationsClient {
    client: Client,
    endpoint: String,
}

impl PollinationsClient {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// The endpoint is injectable so tests can point the client at a local
    /// listener.
    pub fn with_endpoint(endpoint: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent("VibeCoder/0.1")
            .build()
            .context("failed to construct HTTP client")?;
        Ok(Self { client, endpoint: endpoint.to_string() })
    }

    pub fn http_client(&self) -> &Client {
        &self.client
    }

    async fn request_once(&self, body: &Value) -> Result<String, AiError> {
        let response = self.client.post(&self.endpoint).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Http(status.as_u16()));
        }
        reply_text(response.text().await?)
    }
}

#[async_trait]
impl AiProvider for PollinationsClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pollinations
    }

    fn available(&self) -> bool {
        true
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        opts: &ChatOptions,
    ) -> Result<ChatResult, AiError> {
        let model = opts.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let seed: u32 = rand::thread_rng().gen();
        let body = serde_json::json!({
            "messages": messages,
            "model": model,
            "seed": seed,
        });
        let per_attempt = Duration::from_millis(opts.timeout_ms);

        let mut attempt = 0;
        loop {
            attempt += 1;
            // A fresh timer per attempt; dropping the request future on
            // expiry also tears down the in-flight connection.
            match timeout(per_attempt, self.request_once(&body)).await {
                Ok(Ok(content)) => {
                    return Ok(ChatResult {
                        content,
                        provider: ProviderKind::Pollinations,
                        model: Some(model),
                    });
                }
                Err(_elapsed) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(AiError::Timeout);
                    }
                    sleep(Duration::from_millis(TIMEOUT_BACKOFF_MS * attempt)).await;
                }
                Ok(Err(err)) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(err);
                    }
                    sleep(Duration::from_millis(ERROR_BACKOFF_MS * attempt)).await;
                }
            }
        }
    }
}

/// The endpoint answers with freeform text, a bare JSON string, or a JSON
/// object carrying a `content` field. Anything else is taken verbatim.
fn reply_text(raw: String) -> Result<String, AiError> {
    let text = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::String(s)) => s,
        Ok(Value::Object(map)) => match map.get("content").and_then(Value::as_str) {
            Some(s) => s.to_string(),
            None => raw,
        },
        _ => raw,
    };
    if text.is_empty() {
        return Err(AiError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn reply_text_unwraps_bare_json_string() {
        assert_eq!(reply_text("\"hello\"".into()).unwrap(), "hello");
    }

    #[test]
    fn reply_text_unwraps_content_field() {
        assert_eq!(reply_text(r#"{"content":"hi"}"#.into()).unwrap(), "hi");
    }

    #[test]
    fn reply_text_passes_plain_text_through() {
        let raw = "```html\n<p>x</p>\n```";
        assert_eq!(reply_text(raw.into()).unwrap(), raw);
    }

    #[test]
    fn reply_text_keeps_raw_json_without_content_field() {
        let raw = r#"{"message":"hi"}"#;
        assert_eq!(reply_text(raw.into()).unwrap(), raw);
    }

    #[test]
    fn reply_text_rejects_empty_body() {
        assert!(matches!(reply_text(String::new()), Err(AiError::EmptyResponse)));
    }

    #[tokio::test]
    async fn chat_times_out_after_exactly_two_attempts() {
        // A listener that accepts connections but never answers forces every
        // attempt into the per-attempt timeout.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                if let Ok((socket, _)) = listener.accept().await {
                    counter.fetch_add(1, Ordering::SeqCst);
                    held.push(socket);
                }
            }
        });

        let client = PollinationsClient::with_endpoint(&format!("http://{addr}/")).unwrap();
        let opts = ChatOptions { model: None, timeout_ms: 50 };
        let err = client
            .chat(&[ChatMessage::user("hello")], &opts)
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::Timeout));
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }
}
