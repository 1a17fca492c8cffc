//! Ollama backend implementation.
//!
//! Uses the native `/api/chat` endpoint with streaming disabled, so every
//! request yields exactly one completion.

use super::{endpoint, ModelError};
use crate::conversation::Message;
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const BACKEND: &str = "ollama";

/// Ollama backend for local LLM inference.
pub struct OllamaBackend {
    pub model: String,
    host: String,
    temperature: Option<f32>,
    client: Client,
}

impl OllamaBackend {
    /// Create a new Ollama backend. Chat requests carry no timeout: local
    /// models can take a long time to load.
    pub fn new(model: String, host: String, temperature: Option<f32>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            model,
            host,
            temperature,
            client,
        })
    }

    /// Send the conversation and return the trimmed reply.
    pub async fn chat(&self, messages: &[Message]) -> Result<String, ModelError> {
        let url = endpoint(&self.host, "/api/chat");

        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: self.temperature.map(|temperature| OllamaOptions { temperature }),
        };

        debug!(model = %self.model, messages = messages.len(), "sending chat request to Ollama");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|source| ModelError::Connect {
                backend: BACKEND,
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                backend: BACKEND,
                status,
                message: error_message(&body),
            });
        }

        let reply: OllamaChatResponse = response
            .json()
            .await
            .map_err(|source| ModelError::Decode {
                backend: BACKEND,
                source,
            })?;

        Ok(reply.message.content.trim().to_string())
    }

    /// Check if the server is reachable.
    pub async fn health_check(&self) -> Result<()> {
        let url = endpoint(&self.host, "/api/tags");
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .with_context(|| format!("Failed to connect to Ollama at {} - is it running?", self.host))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!("Ollama health check failed: {}", response.status()))
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// Ollama reports failures as `{"error": "..."}`; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<OllamaError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string())
}
