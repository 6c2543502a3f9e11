use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{AssistantError, TextGenerator};
use crate::config::AssistantConfig;

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
}

/// Client for the Hugging Face inference router.
pub struct HuggingFaceClient {
    client: Client,
    api_key: String,
    model_url: String,
    max_new_tokens: u32,
    temperature: f32,
}

impl HuggingFaceClient {
    pub fn new(api_key: String, config: &AssistantConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build inference HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model_url: config.model_url.clone(),
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceClient {
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
        let body = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: self.max_new_tokens,
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&self.model_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AssistantError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: Value = serde_json::from_str(&text)?;
        debug!(model_url = %self.model_url, "inference call succeeded");
        Ok(extract_generated_text(parsed))
    }
}

/// The router answers `[{"generated_text": ...}]`; anything else is passed
/// back verbatim as compact JSON.
fn extract_generated_text(value: Value) -> String {
    if let Some(text) = value
        .as_array()
        .and_then(|items| items.first())
        .and_then(|first| first.get("generated_text"))
        .and_then(Value::as_str)
    {
        return text.to_string();
    }
    value.to_string()
}
