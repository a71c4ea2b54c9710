//! Global configuration types for Colloquy.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls
//! the default model and provider endpoint settings.

use serde::{Deserialize, Serialize};

/// Top-level configuration for Colloquy.
///
/// Loaded from `~/.colloquy/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Model used when a command does not name one explicitly.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Completion provider endpoint settings.
    #[serde(default)]
    pub provider: ProviderSettings,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            provider: ProviderSettings::default(),
        }
    }
}

/// Connection settings for the OpenAI-compatible completion endpoint.
///
/// The API key itself never lives in the config file; the config names the
/// environment variable it is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of the provider API (e.g., "https://api.openai.com/v1").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}
