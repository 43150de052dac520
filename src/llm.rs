// src/llm.rs

use crate::config::{LlmBackend, LlmSection};
use crate::error::ServiceError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// A generative text service: prompt in, response text out.
///
/// One call, no retries. Callers decide how to degrade on error.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Gemini (generateContent)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(client: Client, base_url: &str, model: &str, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let request = GenerateRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let body: GenerateResponse = check_status(response).await?.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        non_empty(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible chat completions (Ollama, hosted APIs)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct ChatClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatClient {
    pub fn new(client: Client, base_url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.0,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let chat: ChatResponse = check_status(builder.send().await?).await?.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        non_empty(content)
    }

    fn name(&self) -> &str {
        "chat"
    }
}

/// Map non-2xx statuses to `ServiceError`, keeping the body for the log.
async fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        Err(ServiceError::Quota {
            status: status.as_u16(),
            body,
        })
    } else {
        Err(ServiceError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn non_empty(text: String) -> Result<String, ServiceError> {
    if text.trim().is_empty() {
        Err(ServiceError::EmptyResponse)
    } else {
        debug!(chars = text.len(), "Generated text received");
        Ok(text)
    }
}

/// Named in the error when a Gemini endpoint is configured without `api_key_env`.
const DEFAULT_GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

/// Build the generator selected in config. `Ok(None)` means the heuristics
/// backend: run without any service.
pub fn resolve_generator(llm: &LlmSection) -> Result<Option<Box<dyn TextGenerator>>, ServiceError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(llm.timeout_secs))
        .build()?;

    match llm.backend {
        LlmBackend::Gemini => {
            let api_key = llm
                .gemini
                .api_key()?
                .ok_or_else(|| ServiceError::MissingApiKey(DEFAULT_GEMINI_KEY_ENV.to_string()))?;
            info!(url = %llm.gemini.base_url, model = %llm.gemini.model, "Using Gemini backend");
            Ok(Some(Box::new(GeminiClient::new(
                client,
                &llm.gemini.base_url,
                &llm.gemini.model,
                api_key,
            ))))
        }
        LlmBackend::Ollama => {
            info!(url = %llm.ollama.base_url, model = %llm.ollama.model, "Using Ollama (local) backend");
            Ok(Some(Box::new(ChatClient::new(
                client,
                &llm.ollama.base_url,
                &llm.ollama.model,
                llm.ollama.api_key()?,
            ))))
        }
        LlmBackend::Remote => {
            info!(url = %llm.remote.base_url, model = %llm.remote.model, "Using remote API backend");
            Ok(Some(Box::new(ChatClient::new(
                client,
                &llm.remote.base_url,
                &llm.remote.model,
                llm.remote.api_key()?,
            ))))
        }
        LlmBackend::Heuristics => {
            info!("Heuristics backend selected, no generative service");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_gemini_joins_parts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/gemini-test:generateContent")
                    .header("x-goog-api-key", "secret");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "Hello, " }, { "text": "world." }] }
                    }]
                }));
            })
            .await;

        let gemini = GeminiClient::new(Client::new(), &server.base_url(), "gemini-test", "secret".into());
        let text = gemini.generate("hi").await.unwrap();

        mock.assert_async().await;
        assert_eq!(text, "Hello, world.");
    }

    #[tokio::test]
    async fn test_gemini_quota() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(429)
                    .body(r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#);
            })
            .await;

        let gemini = GeminiClient::new(Client::new(), &server.base_url(), "m", "k".into());
        let err = gemini.generate("hi").await.unwrap_err();
        assert!(matches!(err, ServiceError::Quota { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_gemini_no_candidates() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({ "candidates": [] }));
            })
            .await;

        let gemini = GeminiClient::new(Client::new(), &server.base_url(), "m", "k".into());
        assert!(matches!(
            gemini.generate("hi").await,
            Err(ServiceError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_chat_sends_bearer() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "fixed" } }]
                }));
            })
            .await;

        let chat = ChatClient::new(
            Client::new(),
            &server.url("/v1/"),
            "gpt-test",
            Some("sk-test".into()),
        );
        assert_eq!(chat.generate("fix me").await.unwrap(), "fixed");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_server_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500).body("boom");
            })
            .await;

        let chat = ChatClient::new(Client::new(), &server.base_url(), "m", None);
        match chat.generate("x").await {
            Err(ServiceError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_gemini_without_key_env_names_default_var() {
        let mut llm = LlmSection::default();
        llm.gemini.api_key_env = None;
        match resolve_generator(&llm) {
            Err(ServiceError::MissingApiKey(var)) => assert_eq!(var, "GEMINI_API_KEY"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("gemini must not resolve without a key"),
        }
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let llm = LlmSection {
            backend: LlmBackend::Ollama,
            ..Default::default()
        };
        let generator = resolve_generator(&llm).unwrap().unwrap();
        assert_eq!(generator.name(), "chat");
    }

    #[test]
    fn test_remote_with_unset_key_env_fails() {
        let mut llm = LlmSection {
            backend: LlmBackend::Remote,
            ..Default::default()
        };
        llm.remote.api_key_env = Some("SENTENCE_INVOICE_TEST_UNSET_REMOTE_KEY".to_string());
        assert!(matches!(
            resolve_generator(&llm),
            Err(ServiceError::MissingApiKey(var)) if var == "SENTENCE_INVOICE_TEST_UNSET_REMOTE_KEY"
        ));
    }

    #[test]
    fn test_heuristics_backend_has_no_generator() {
        let llm = LlmSection {
            backend: LlmBackend::Heuristics,
            ..Default::default()
        };
        assert!(resolve_generator(&llm).unwrap().is_none());
    }
}
