//! Forwards tracker data to an external text-generation endpoint.
//!
//! The proxy never fails: a missing credential, an empty follow-up list, or
//! any upstream error all degrade to a descriptive message.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AssistantConfig;
use crate::tracker::{ApplicationDigest, StuckApplication};

pub mod huggingface;
pub mod prompts;

pub use huggingface::HuggingFaceClient;

pub const DISABLED_MESSAGE: &str = "AI is disabled. No Hugging Face API key configured.";
pub const NO_FOLLOWUPS_MESSAGE: &str = "No stuck applications. No follow-ups needed.";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError>;
}

#[derive(Clone)]
pub struct AssistantProxy {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl AssistantProxy {
    /// `None` disables the assistant; no call is ever attempted.
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let generator = match config.api_key.as_ref() {
            Some(api_key) => {
                let client = HuggingFaceClient::new(api_key.clone(), config)?;
                Some(Arc::new(client) as Arc<dyn TextGenerator>)
            }
            None => None,
        };
        Ok(Self::new(generator))
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn summarize(&self, applications: &[ApplicationDigest]) -> String {
        let Some(generator) = self.generator.as_ref() else {
            return DISABLED_MESSAGE.to_string();
        };
        info!(applications = applications.len(), "requesting job search summary");
        complete(generator.as_ref(), prompts::summary_prompt(applications)).await
    }

    pub async fn suggest_followups(&self, stuck: &[StuckApplication]) -> String {
        let Some(generator) = self.generator.as_ref() else {
            return DISABLED_MESSAGE.to_string();
        };
        if stuck.is_empty() {
            return NO_FOLLOWUPS_MESSAGE.to_string();
        }
        info!(stuck = stuck.len(), "requesting follow-up suggestions");
        complete(generator.as_ref(), prompts::followup_prompt(stuck)).await
    }
}

async fn complete(generator: &dyn TextGenerator, prompt: serde_json::Result<String>) -> String {
    let outcome = match prompt {
        Ok(prompt) => generator.generate(&prompt).await,
        Err(err) => Err(AssistantError::from(err)),
    };
    outcome.unwrap_or_else(|err| {
        warn!(error = %err, "assistant call failed");
        format!("AI service unavailable: {err}")
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use uuid::Uuid;

    use super::*;
    use crate::tracker::ApplicationStatus;

    #[derive(Default)]
    struct RecordingGenerator {
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("generated".to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, AssistantError> {
            Err(AssistantError::Api {
                status: 503,
                message: "model is loading".to_string(),
            })
        }
    }

    fn stuck_app() -> StuckApplication {
        StuckApplication {
            id: Uuid::new_v4(),
            company: "Acme".to_string(),
            role: "Engineer".to_string(),
            status: ApplicationStatus::Interview,
            last_update: "2024-01-02T00:00:00+00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn disabled_proxy_answers_without_calling_out() {
        let proxy = AssistantProxy::disabled();
        assert!(!proxy.is_enabled());
        assert_eq!(proxy.summarize(&[]).await, DISABLED_MESSAGE);
        assert_eq!(proxy.suggest_followups(&[stuck_app()]).await, DISABLED_MESSAGE);
    }

    #[tokio::test]
    async fn from_config_without_key_is_disabled() {
        let proxy = AssistantProxy::from_config(&AssistantConfig::default()).unwrap();
        assert!(!proxy.is_enabled());
    }

    #[tokio::test]
    async fn from_config_with_key_is_enabled() {
        let config = AssistantConfig {
            api_key: Some("hf_test".to_string()),
            ..AssistantConfig::default()
        };
        assert!(AssistantProxy::from_config(&config).unwrap().is_enabled());
    }

    #[tokio::test]
    async fn empty_followups_skip_the_generator() {
        let generator = Arc::new(RecordingGenerator::default());
        let proxy = AssistantProxy::new(Some(generator.clone() as Arc<dyn TextGenerator>));
        assert_eq!(proxy.suggest_followups(&[]).await, NO_FOLLOWUPS_MESSAGE);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn followups_forward_one_prompt() {
        let generator = Arc::new(RecordingGenerator::default());
        let proxy = AssistantProxy::new(Some(generator.clone() as Arc<dyn TextGenerator>));
        assert_eq!(proxy.suggest_followups(&[stuck_app()]).await, "generated");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Acme"));
    }

    #[tokio::test]
    async fn summary_with_empty_list_still_calls_generator() {
        let generator = Arc::new(RecordingGenerator::default());
        let proxy = AssistantProxy::new(Some(generator.clone() as Arc<dyn TextGenerator>));
        assert_eq!(proxy.summarize(&[]).await, "generated");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_degrade_to_fallback_text() {
        let proxy = AssistantProxy::new(Some(Arc::new(FailingGenerator) as Arc<dyn TextGenerator>));
        let text = proxy.summarize(&[]).await;
        assert_eq!(
            text,
            "AI service unavailable: API error (status 503): model is loading"
        );
    }
}
