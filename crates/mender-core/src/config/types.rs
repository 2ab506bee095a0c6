//! Sub-configuration structs. They are flattened into one JSON object on disk.

use serde::{Deserialize, Deserializer, Serialize};

/// Provider used when `model_provider` is not set.
pub const DEFAULT_PROVIDER: &str = "openai";

/// Model used when neither `model` nor `openai_model` is set.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Media server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Server base URL, e.g. `http://jellyfin.local:8096` (required)
    pub jellyfin_url: String,

    /// Server API key (required)
    pub jellyfin_api_key: String,

    /// User whose view of the library is queried (required)
    pub user_id: String,

    /// Item types to include. Empty or null means the default album + artist pair.
    #[serde(deserialize_with = "null_as_empty")]
    pub item_types: Vec<String>,

    /// Restrict the query to one library or collection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_id: Option<String>,

    /// Timeout applied to every HTTP request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            jellyfin_url: String::new(),
            jellyfin_api_key: String::new(),
            user_id: String::new(),
            item_types: Vec::new(),
            library_id: None,
            request_timeout_secs: 30,
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Text generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend name: "openai", "anthropic", "google" or "local"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_provider: Option<String>,

    /// Model name, passed to the backend as-is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Older name for `model`, still honoured when `model` is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_model: Option<String>,

    /// API keys (support ${ENV_VAR} syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,

    /// Ollama endpoint for the "local" backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_url: Option<String>,

    /// Flat USD-per-token rate for the end-of-run estimate
    pub cost_per_token: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_provider: None,
            model: None,
            openai_model: None,
            openai_api_key: None,
            anthropic_api_key: None,
            google_api_key: None,
            ollama_url: None,
            cost_per_token: 0.00001,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory that receives one log file per run
    pub log_dir: String,

    /// Log level: error, warn, info, debug, trace
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            log_level: "info".to_string(),
        }
    }
}
