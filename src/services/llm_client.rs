use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Any service that turns a prompt into raw text.
///
/// Implementations return the model's text untouched; callers run it
/// through `parse_model_json` themselves.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32, force_json: bool) -> Result<String>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(
        client: Client,
        api_key: String,
        api_base: String,
        model: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, temperature: f32, force_json: bool) -> Result<String> {
        let mut generation_config = serde_json::json!({ "temperature": temperature });
        if force_json {
            generation_config["response_mime_type"] = serde_json::json!("application/json");
        }
        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        let res = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("Gemini API Error {}: {}", status, text)));
        }

        let body: JsonValue = res.json().await?;
        match response_text(&body) {
            Some(text) => Ok(text.to_string()),
            None => {
                // Blocked or empty candidates read as an empty reply.
                tracing::warn!(model = %self.model, "Gemini response carried no text");
                Ok(String::new())
            }
        }
    }
}

fn response_text(body: &JsonValue) -> Option<&str> {
    body.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .filter(|t| !t.trim().is_empty())
}
