use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{create_client, finish, prompt, send, BackendAnalysis, BackendRequest, PromptInput, ScoringBackend};
use crate::config::GeminiSettings;
use crate::error::{AppError, Result};

/// Google Gemini `generateContent` backend. The default provider.
pub struct GeminiBackend {
    settings: GeminiSettings,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub const NAME: &'static str = "gemini";

    pub fn new(settings: GeminiSettings, timeout: Duration) -> Result<Self> {
        Ok(Self {
            settings,
            client: create_client(timeout)?,
        })
    }

    fn api_key(&self) -> Option<&str> {
        self.settings.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    fn endpoint(&self) -> String {
        format!("{}{}:generateContent", self.settings.api_url, self.settings.model)
    }

    fn extract_text(body: &Value) -> Result<String> {
        body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::malformed_response("Invalid Gemini API response structure"))
    }
}

#[async_trait]
impl ScoringBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check_availability(&self) -> Result<()> {
        match self.api_key() {
            Some(_) => Ok(()),
            None => Err(AppError::configuration("Google API key not configured")),
        }
    }

    fn build_request(&self, input: &PromptInput<'_>) -> Result<BackendRequest> {
        self.check_availability()?;
        let api_key = self.api_key().unwrap_or_default();

        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt::build_prompt(input) }]
            }],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "topK": 1,
                "topP": 1,
                "maxOutputTokens": self.settings.max_output_tokens,
            }
        });

        Ok(BackendRequest {
            url: self.endpoint(),
            headers: vec![
                ("x-goog-api-key".to_string(), api_key.to_string()),
            ],
            body,
        })
    }

    async fn invoke(&self, input: &PromptInput<'_>) -> Result<BackendAnalysis> {
        let request = self.build_request(input)?;
        tracing::info!("Requesting Gemini analysis for \"{}\"", input.title);

        let envelope = send(&self.client, "Gemini", request).await?;
        let text = Self::extract_text(&envelope)?;
        finish(&text, input.keyword)
    }
}
