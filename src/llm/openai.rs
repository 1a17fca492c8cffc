//! OpenAI-compatible backend implementation.
//!
//! Targets local servers that mimic the OpenAI chat-completions API
//! (llama.cpp server, LM Studio, vLLM, ...).

use super::{endpoint, ModelError};
use crate::conversation::Message;
use anyhow::{anyhow, Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const BACKEND: &str = "openai";

/// Backend for OpenAI-compatible servers.
pub struct OpenAIBackend {
    pub model: String,
    base_url: String,
    api_key: Option<String>,
    temperature: Option<f32>,
    client: Client,
}

impl OpenAIBackend {
    /// Create a new OpenAI-compatible backend.
    pub fn new(
        model: String,
        base_url: String,
        api_key: Option<String>,
        temperature: Option<f32>,
    ) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            model,
            base_url,
            api_key,
            temperature,
            client,
        })
    }

    /// API key from config or environment. Local servers usually need none.
    fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.is_empty())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_key() {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Send the conversation and return the trimmed reply.
    pub async fn chat(&self, messages: &[Message]) -> Result<String, ModelError> {
        let url = endpoint(&self.base_url, "/chat/completions");

        let request = OpenAIRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        debug!(model = %self.model, messages = messages.len(), "sending chat completion request");
        let response = self
            .authorize(self.client.post(&url))
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
            let message = serde_json::from_str::<OpenAIError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.trim().to_string());
            return Err(ModelError::Status {
                backend: BACKEND,
                status,
                message,
            });
        }

        let completion: OpenAIResponse =
            response
                .json()
                .await
                .map_err(|source| ModelError::Decode {
                    backend: BACKEND,
                    source,
                })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default().trim().to_string())
            .ok_or(ModelError::EmptyResponse { backend: BACKEND })
    }

    /// Check if the server is reachable.
    pub async fn health_check(&self) -> Result<()> {
        let url = endpoint(&self.base_url, "/models");
        let response = self
            .authorize(self.client.get(&url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .with_context(|| format!("Failed to connect to {} - is the server running?", self.base_url))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!("Model server health check failed: {}", response.status()))
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}
