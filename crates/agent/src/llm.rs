use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use intake_core::config::LlmConfig;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Client for an OpenAI-compatible chat completions endpoint (Groq by default).
pub struct GroqClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<SecretString>,
}

impl GroqClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build LLM HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key.clone(),
        })
    }

    fn build_request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages,
        })
    }
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("LLM API key is not configured"))?;

        let url = format!("{}/chat/completions", self.base_url);
        debug!(%url, model = %self.model, messages = messages.len(), "chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&self.build_request_body(messages))
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("chat completion returned {status}: {body}");
        }

        let completion: CompletionResponse =
            response.json().await.context("malformed chat completion response")?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat completion returned no choices"))
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use intake_core::config::LlmConfig;

    use crate::llm::{ChatMessage, GroqClient, LlmClient};

    async fn completions(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let authorized = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == "Bearer gsk-test");
        if !authorized {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad key" })));
        }
        let last = body["messages"].as_array().and_then(|m| m.last()).cloned().unwrap_or_default();
        let content = format!(
            "{} / {}",
            body["model"].as_str().unwrap_or_default(),
            last["content"].as_str().unwrap_or_default()
        );
        (
            StatusCode::OK,
            Json(json!({
                "choices": [{ "message": { "role": "assistant", "content": content } }]
            })),
        )
    }

    async fn spawn_fake() -> String {
        let app = Router::new().route("/openai/v1/chat/completions", post(completions));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}/openai/v1/")
    }

    fn config(base_url: String, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(|key| key.to_string().into()),
            base_url,
            model: "llama-test".to_string(),
            temperature: 0.1,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn completion_returns_first_choice_content() {
        let base_url = spawn_fake().await;
        let client = GroqClient::new(&config(base_url, Some("gsk-test"))).expect("client");

        let reply = client
            .complete(&[ChatMessage::system("rules"), ChatMessage::user("hello")])
            .await
            .expect("reply");

        assert_eq!(reply, "llama-test / hello");
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let client = GroqClient::new(&config(spawn_fake().await, Some("wrong"))).expect("client");

        let error = client.complete(&[ChatMessage::user("hello")]).await.expect_err("rejected");

        assert!(error.to_string().contains("401"));
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let client =
            GroqClient::new(&config("http://127.0.0.1:9".to_string(), None)).expect("client");

        let error = client.complete(&[ChatMessage::user("hello")]).await.expect_err("no key");

        assert!(error.to_string().contains("not configured"));
    }

    #[test]
    fn messages_keep_unknown_roles_and_default_content() {
        let message: ChatMessage =
            serde_json::from_value(json!({ "role": "tool" })).expect("parse");
        assert_eq!(message, ChatMessage { role: "tool".to_string(), content: String::new() });
    }
}
