//! Model catalog lookups for the settings UI.
//!
//! Read-only helpers; the dispatcher never consults these. Model selection
//! reaches it as a plain string.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;

pub const TEXT_MODELS_URL: &str = "https://text.pollinations.ai/models";
pub const IMAGE_MODELS_URL: &str = "https://image.pollinations.ai/models";

/// Fetch a list of model identifiers. The endpoints answer with either an
/// array of strings or an array of objects carrying a `name`/`id` field.
pub async fn fetch_model_ids(client: &Client, url: &str) -> Result<Vec<String>> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(anyhow!("failed to list models: {}", response.status()));
    }
    let body: Value = response.json().await?;
    Ok(parse_model_ids(&body))
}

fn parse_model_ids(body: &Value) -> Vec<String> {
    let Some(items) = body.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("name")
                .or_else(|| map.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_arrays() {
        let body = serde_json::json!(["openai", "mistral"]);
        assert_eq!(parse_model_ids(&body), vec!["openai", "mistral"]);
    }

    #[test]
    fn parses_object_arrays() {
        let body = serde_json::json!([
            { "name": "openai", "description": "GPT-4o mini" },
            { "id": "llama" },
            42
        ]);
        assert_eq!(parse_model_ids(&body), vec!["openai", "llama"]);
    }

    #[test]
    fn non_array_bodies_yield_nothing() {
        assert!(parse_model_ids(&serde_json::json!({"models": []})).is_empty());
    }
}
