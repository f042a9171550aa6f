//! Scoring backends - pluggable AI providers behind one trait.
//!
//! A backend turns page HTML, title and an optional target keyword into raw
//! scores plus suggestions. Providers differ only in endpoint, auth, request
//! body and where the answer text sits in the response envelope; prompt
//! construction and answer decoding are shared (`prompt`, `response`).

pub mod gemini;
pub mod mistral;
pub mod prompt;
pub mod response;
pub mod selector;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::domain::models::{RawScores, Suggestion};
use crate::error::{AppError, Result};

pub use gemini::GeminiBackend;
pub use mistral::MistralBackend;
pub use selector::BackendSelector;

/// What a backend is asked to score.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub html: &'a str,
    pub title: &'a str,
    pub keyword: Option<&'a str>,
}

impl<'a> PromptInput<'a> {
    pub fn new(html: &'a str, title: &'a str, keyword: Option<&'a str>) -> Self {
        Self {
            html,
            title,
            keyword: keyword.map(str::trim).filter(|k| !k.is_empty()),
        }
    }
}

/// A fully prepared provider request. Building one never touches the network.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl BackendRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Scores and suggestions as decoded from a provider answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendAnalysis {
    pub scores: RawScores,
    pub suggestions: Vec<Suggestion>,
}

#[async_trait]
pub trait ScoringBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fails with a configuration error when credentials are absent.
    fn check_availability(&self) -> Result<()>;

    fn build_request(&self, input: &PromptInput<'_>) -> Result<BackendRequest>;

    async fn invoke(&self, input: &PromptInput<'_>) -> Result<BackendAnalysis>;
}

/// Shared HTTP client for provider calls with a bounded request timeout.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {}", e)))
}

/// POST a prepared request and return the decoded JSON envelope.
///
/// Transport failures and non-200 answers are `BackendUnavailable`; a body that
/// is not JSON at all is `MalformedResponse`.
pub(crate) async fn send(
    client: &reqwest::Client,
    backend: &str,
    request: BackendRequest,
) -> Result<Value> {
    // `.json()` sets the content type; providers only add auth headers.
    let mut builder = client.post(&request.url).json(&request.body);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let started = std::time::Instant::now();
    let response = builder.send().await.map_err(|e| {
        AppError::backend_unavailable(format!("Failed to analyze page: {} request failed: {}", backend, e))
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        AppError::backend_unavailable(format!("Failed to analyze page: could not read {} response: {}", backend, e))
    })?;
    tracing::debug!(
        "{} answered {} in {}ms ({} bytes)",
        backend,
        status.as_u16(),
        started.elapsed().as_millis(),
        body.len()
    );

    if status != reqwest::StatusCode::OK {
        return Err(AppError::backend_unavailable(format!(
            "Failed to analyze page: {}",
            body
        )));
    }

    serde_json::from_str(&body).map_err(|e| {
        AppError::malformed_response(format!("Invalid JSON in {} API response: {}", backend, e))
    })
}

/// Decode the provider's answer text and apply the keyword policy.
pub(crate) fn finish(text: &str, keyword: Option<&str>) -> Result<BackendAnalysis> {
    let mut analysis = response::parse_analysis(text)?;
    response::apply_keyword_policy(&mut analysis.scores, &mut analysis.suggestions, keyword);
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeminiSettings, MistralSettings};
    use crate::test_utils::mocks;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one HTTP request, answer 200 with `body` and return the raw request head.
    async fn capture_one(listener: TcpListener, body: String) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        let head_end = loop {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before the request head was complete");
            raw.extend_from_slice(&buf[..n]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&raw[..head_end]).to_string();

        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while raw.len() - head_end < content_length {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        head
    }

    fn content_type_lines(head: &str) -> usize {
        head.lines()
            .filter(|line| line.to_ascii_lowercase().starts_with("content-type:"))
            .count()
    }

    #[tokio::test]
    async fn test_gemini_sends_a_single_content_type() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let answer = mocks::gemini_response(&mocks::analysis_json(70, "ok"));
        let server = tokio::spawn(capture_one(listener, answer));

        let settings = GeminiSettings {
            api_key: Some("test-key".into()),
            api_url: format!("http://{}/models/", addr),
            ..GeminiSettings::default()
        };
        let backend = GeminiBackend::new(settings, Duration::from_secs(5)).unwrap();
        backend
            .invoke(&PromptInput::new("<html></html>", "Home", Some("tea")))
            .await
            .unwrap();

        let head = server.await.unwrap();
        assert_eq!(content_type_lines(&head), 1, "request head:\n{}", head);
        assert!(head.to_ascii_lowercase().contains("content-type: application/json"));
    }

    #[tokio::test]
    async fn test_mistral_sends_a_single_content_type() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let answer = mocks::mistral_response(&mocks::analysis_json(60, "ok"));
        let server = tokio::spawn(capture_one(listener, answer));

        let settings = MistralSettings {
            api_key: Some("test-key".into()),
            api_url: format!("http://{}/v1/chat/completions", addr),
            ..MistralSettings::default()
        };
        let backend = MistralBackend::new(settings, Duration::from_secs(5)).unwrap();
        backend
            .invoke(&PromptInput::new("<html></html>", "Home", Some("tea")))
            .await
            .unwrap();

        let head = server.await.unwrap();
        assert_eq!(content_type_lines(&head), 1, "request head:\n{}", head);
    }

    #[test]
    fn test_prompt_input_treats_blank_keyword_as_absent() {
        assert_eq!(PromptInput::new("<html>", "T", Some("  ")).keyword, None);
        assert_eq!(PromptInput::new("<html>", "T", Some(" seo ")).keyword, Some("seo"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = BackendRequest {
            url: "https://example.test".into(),
            headers: vec![("Authorization".into(), "Bearer k".into())],
            body: Value::Null,
        };
        assert_eq!(request.header("authorization"), Some("Bearer k"));
        assert_eq!(request.header("x-goog-api-key"), None);
    }
}
