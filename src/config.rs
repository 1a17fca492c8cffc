//! Configuration management for wari.
//!
//! Configuration is loaded from `~/.config/wari/config.toml`. Every field has a
//! default, so a missing file (or a partial one) is fine.

use crate::mode::Mode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,
    /// User preferences.
    #[serde(default)]
    pub preferences: Preferences,
    /// How suggested commands are run.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Backend configuration for locally hosted models.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Ollama local server.
    Ollama {
        /// Model name (default: qwen2.5-coder:3b).
        #[serde(default = "default_ollama_model")]
        model: String,
        /// Ollama host URL (default: http://localhost:11434).
        #[serde(default = "default_ollama_host")]
        host: String,
        /// Sampling temperature, left to the server when unset.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        temperature: Option<f32>,
    },
    /// Any server speaking the OpenAI chat-completions API (llama.cpp, LM Studio, vLLM).
    OpenAI {
        /// Model name as the server knows it.
        #[serde(default = "default_openai_model")]
        model: String,
        /// API base URL (default: http://localhost:8080/v1).
        #[serde(default = "default_openai_base_url")]
        base_url: String,
        /// API key (falls back to OPENAI_API_KEY, optional for local servers).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
        /// Sampling temperature, left to the server when unset.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        temperature: Option<f32>,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Ollama {
            model: default_ollama_model(),
            host: default_ollama_host(),
            temperature: None,
        }
    }
}

fn default_ollama_model() -> String {
    "qwen2.5-coder:3b".to_string()
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_model() -> String {
    "local-model".to_string()
}

fn default_openai_base_url() -> String {
    "http://localhost:8080/v1".to_string()
}

/// User preferences for the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Mode the session starts in.
    #[serde(default)]
    pub start_mode: Mode,
    /// Where the user is, mentioned to the model in chat mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Describe the host environment (OS, shell, cwd) in the command prompt.
    #[serde(default = "default_true")]
    pub share_context: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            start_mode: Mode::default(),
            location: None,
            share_context: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Settings for running confirmed commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Shell used as `<shell> -c <command>`; `sh` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("wari"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, using defaults if not found.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, using defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Get the backend type as a string.
    pub fn backend_type(&self) -> &'static str {
        match &self.backend {
            BackendConfig::Ollama { .. } => "ollama",
            BackendConfig::OpenAI { .. } => "openai",
        }
    }

    /// Get the model name.
    pub fn model_name(&self) -> &str {
        match &self.backend {
            BackendConfig::Ollama { model, .. } => model,
            BackendConfig::OpenAI { model, .. } => model,
        }
    }

    /// Apply command-line overrides on top of the loaded file.
    pub fn apply_overrides(&mut self, model: Option<String>, host: Option<String>) {
        match &mut self.backend {
            BackendConfig::Ollama {
                model: m, host: h, ..
            } => {
                if let Some(model) = model {
                    *m = model;
                }
                if let Some(host) = host {
                    *h = host;
                }
            }
            BackendConfig::OpenAI {
                model: m,
                base_url,
                ..
            } => {
                if let Some(model) = model {
                    *m = model;
                }
                if let Some(host) = host {
                    *base_url = host;
                }
            }
        }
    }
}
