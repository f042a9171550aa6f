use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{create_client, finish, prompt, send, BackendAnalysis, BackendRequest, PromptInput, ScoringBackend};
use crate::config::MistralSettings;
use crate::error::{AppError, Result};

/// Mistral chat-completions backend.
pub struct MistralBackend {
    settings: MistralSettings,
    client: reqwest::Client,
}

impl MistralBackend {
    pub const NAME: &'static str = "mistral";

    pub fn new(settings: MistralSettings, timeout: Duration) -> Result<Self> {
        Ok(Self {
            settings,
            client: create_client(timeout)?,
        })
    }

    fn api_key(&self) -> Option<&str> {
        self.settings.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    fn extract_text(body: &Value) -> Result<String> {
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::malformed_response("Invalid Mistral API response structure"))
    }
}

#[async_trait]
impl ScoringBackend for MistralBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check_availability(&self) -> Result<()> {
        match self.api_key() {
            Some(_) => Ok(()),
            None => Err(AppError::configuration("Mistral API key not configured")),
        }
    }

    fn build_request(&self, input: &PromptInput<'_>) -> Result<BackendRequest> {
        self.check_availability()?;
        let api_key = self.api_key().unwrap_or_default();

        let body = json!({
            "model": self.settings.model,
            "messages": [
                { "role": "user", "content": prompt::build_prompt(input) }
            ],
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
        });

        Ok(BackendRequest {
            url: self.settings.api_url.clone(),
            headers: vec![
                ("Authorization".to_string(), format!("Bearer {}", api_key)),
            ],
            body,
        })
    }

    async fn invoke(&self, input: &PromptInput<'_>) -> Result<BackendAnalysis> {
        let request = self.build_request(input)?;
        tracing::info!("Requesting Mistral analysis for \"{}\"", input.title);

        let envelope = send(&self.client, "Mistral", request).await?;
        let text = Self::extract_text(&envelope)?;
        finish(&text, input.keyword)
    }
}
