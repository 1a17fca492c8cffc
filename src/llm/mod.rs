//! LLM backend implementations.
//!
//! Both backends talk to a locally hosted model server: Ollama's native chat
//! API, or any server exposing the OpenAI chat-completions API.

pub mod ollama;
pub mod openai;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::BackendConfig;
use crate::conversation::Message;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

/// Any failure reaching the model or making sense of its reply.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to connect to {backend} at {url}: {source}")]
    Connect {
        backend: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{backend} request failed with status {status}: {message}")]
    Status {
        backend: &'static str,
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("failed to parse {backend} response: {source}")]
    Decode {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{backend} returned no completion")]
    EmptyResponse { backend: &'static str },
}

/// A model that answers a conversation with one completion.
#[async_trait]
pub trait ChatModel {
    /// Send the whole conversation and wait for the next assistant message.
    async fn complete(&self, messages: &[Message]) -> Result<String, ModelError>;

    /// Backend name, e.g. `ollama`.
    fn name(&self) -> &'static str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;
}

/// Enum-based backend for model servers.
pub enum Backend {
    Ollama(ollama::OllamaBackend),
    OpenAI(openai::OpenAIBackend),
}

impl Backend {
    /// Check if the server is reachable.
    pub async fn health_check(&self) -> Result<()> {
        match self {
            Backend::Ollama(b) => b.health_check().await,
            Backend::OpenAI(b) => b.health_check().await,
        }
    }
}

#[async_trait]
impl ChatModel for Backend {
    async fn complete(&self, messages: &[Message]) -> Result<String, ModelError> {
        match self {
            Backend::Ollama(b) => b.chat(messages).await,
            Backend::OpenAI(b) => b.chat(messages).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Backend::Ollama(_) => "ollama",
            Backend::OpenAI(_) => "openai",
        }
    }

    fn model(&self) -> &str {
        match self {
            Backend::Ollama(b) => &b.model,
            Backend::OpenAI(b) => &b.model,
        }
    }
}

/// Create a backend from configuration.
pub fn create_backend(config: &BackendConfig) -> Result<Backend> {
    let backend = match config {
        BackendConfig::Ollama {
            model,
            host,
            temperature,
        } => Backend::Ollama(ollama::OllamaBackend::new(
            model.clone(),
            host.clone(),
            *temperature,
        )?),
        BackendConfig::OpenAI {
            model,
            base_url,
            api_key,
            temperature,
        } => Backend::OpenAI(openai::OpenAIBackend::new(
            model.clone(),
            base_url.clone(),
            api_key.clone(),
            *temperature,
        )?),
    };
    Ok(backend)
}

/// Join a base URL and an API path without doubling the slash.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
