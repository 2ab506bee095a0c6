//! Configuration management for Mender.
//!
//! Configuration is a single flat JSON object (`config.json`). Internally it is
//! split into library, LLM and logging sections, flattened on disk so existing
//! config files keep working.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use crate::types::DEFAULT_ITEM_TYPES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the working directory and the platform config dir.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Root configuration structure for Mender.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Media server settings
    #[serde(flatten)]
    pub library: LibraryConfig,

    /// LLM provider settings
    #[serde(flatten)]
    pub llm: LlmConfig,

    /// Logging settings
    #[serde(flatten)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse and validate configuration from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Pick the config file to load.
    ///
    /// An explicit path wins. Otherwise `./config.json` is used if it exists,
    /// then the platform config directory.
    pub fn locate(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return expand_path(&path.to_string_lossy());
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return local;
        }
        Self::default_path()
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.mender.mender/config.json
    /// - Linux: ~/.config/mender/config.json
    /// - Windows: C:\Users\<User>\AppData\Roaming\mender\config\config.json
    ///
    /// Falls back to ~/.mender/config.json if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "mender", "mender")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".mender").join(CONFIG_FILE_NAME)
            })
    }

    /// Server base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.library.jellyfin_url.trim_end_matches('/')
    }

    /// Item types to query, falling back to albums and artists.
    pub fn item_types(&self) -> Vec<String> {
        if self.library.item_types.is_empty() {
            DEFAULT_ITEM_TYPES.iter().map(|t| t.to_string()).collect()
        } else {
            self.library.item_types.clone()
        }
    }

    /// Selected backend name.
    pub fn provider(&self) -> &str {
        self.llm
            .model_provider
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PROVIDER)
    }

    /// Selected model name: `model`, then the legacy `openai_model`, then the default.
    pub fn model(&self) -> &str {
        fn set(m: &Option<String>) -> Option<&str> {
            m.as_deref().filter(|m| !m.trim().is_empty())
        }
        set(&self.llm.model)
            .or_else(|| set(&self.llm.openai_model))
            .unwrap_or(DEFAULT_MODEL)
    }

    /// Resolved run log directory (with ~ expansion).
    pub fn log_dir(&self) -> PathBuf {
        expand_path(&self.logging.log_dir)
    }

    /// Copy with credentials masked, for display.
    pub fn redacted(&self) -> Self {
        fn mask(value: &mut String) {
            if !value.is_empty() {
                *value = "********".to_string();
            }
        }
        let mut copy = self.clone();
        mask(&mut copy.library.jellyfin_api_key);
        for key in [
            &mut copy.llm.openai_api_key,
            &mut copy.llm.anthropic_api_key,
            &mut copy.llm.google_api_key,
        ]
        .into_iter()
        .flatten()
        {
            mask(key);
        }
        copy
    }

    /// Serialize the config to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Starter file for `mender config init`.
    pub fn template() -> Self {
        let mut config = Self::default();
        config.library.jellyfin_url = "http://localhost:8096".to_string();
        config.library.jellyfin_api_key = "${JELLYFIN_API_KEY}".to_string();
        config.library.user_id = "<jellyfin user id>".to_string();
        config.library.item_types = DEFAULT_ITEM_TYPES.iter().map(|t| t.to_string()).collect();
        config.llm.model_provider = Some(DEFAULT_PROVIDER.to_string());
        config.llm.model = Some(DEFAULT_MODEL.to_string());
        config.llm.openai_api_key = Some("${OPENAI_API_KEY}".to_string());
        config
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Resolve `${ENV_VAR}` references in config strings.
///
/// Plain values pass through; empty values and unset variables yield `None`.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "jellyfin_url": "http://media.local:8096/",
        "jellyfin_api_key": "secret",
        "user_id": "u1"
    }"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_json_str(MINIMAL).unwrap();
        assert_eq!(config.base_url(), "http://media.local:8096");
        assert_eq!(config.item_types(), vec!["MusicAlbum", "MusicArtist"]);
        assert_eq!(config.provider(), "openai");
        assert_eq!(config.model(), "gpt-4.1-mini");
        assert_eq!(config.library.request_timeout_secs, 30);
        assert!(config.library.library_id.is_none());
        assert_eq!(config.logging.log_dir, "logs");
    }

    #[test]
    fn test_full_config() {
        let json = r#"{
            "jellyfin_url": "http://media.local:8096",
            "jellyfin_api_key": "secret",
            "user_id": "u1",
            "item_types": ["MusicAlbum", "Playlist"],
            "library_id": "lib-7",
            "model": "claude-3-5-haiku-latest",
            "model_provider": "anthropic",
            "anthropic_api_key": "ak",
            "cost_per_token": 0.000002
        }"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.item_types(), vec!["MusicAlbum", "Playlist"]);
        assert_eq!(config.library.library_id.as_deref(), Some("lib-7"));
        assert_eq!(config.provider(), "anthropic");
        assert_eq!(config.model(), "claude-3-5-haiku-latest");
        assert_eq!(config.llm.anthropic_api_key.as_deref(), Some("ak"));
        assert!((config.llm.cost_per_token - 0.000002).abs() < 1e-15);
    }

    #[test]
    fn test_legacy_openai_model_key() {
        let json = r#"{
            "jellyfin_url": "http://x", "jellyfin_api_key": "k", "user_id": "u",
            "openai_model": "gpt-4o-mini"
        }"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_model_takes_precedence_over_legacy_key() {
        let json = r#"{
            "jellyfin_url": "http://x", "jellyfin_api_key": "k", "user_id": "u",
            "model": "gpt-4.1", "openai_model": "gpt-4o-mini"
        }"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.model(), "gpt-4.1");
    }

    #[test]
    fn test_empty_model_falls_back_to_legacy_key() {
        let json = r#"{
            "jellyfin_url": "http://x", "jellyfin_api_key": "k", "user_id": "u",
            "model": "", "openai_model": "gpt-4o-mini"
        }"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_null_item_types_use_defaults() {
        let json = r#"{
            "jellyfin_url": "http://x", "jellyfin_api_key": "k", "user_id": "u",
            "item_types": null
        }"#;
        let config = Config::from_json_str(json).unwrap();
        assert!(config.library.item_types.is_empty());
        assert_eq!(config.item_types(), vec!["MusicAlbum", "MusicArtist"]);
    }

    #[test]
    fn test_missing_required_key_is_error() {
        let json = r#"{"jellyfin_url": "http://x", "jellyfin_api_key": "k"}"#;
        let err = Config::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = Config::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.library.user_id, "u1");
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let err = Config::load_from(Path::new("/definitely/not/here/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }

    #[test]
    fn test_locate_prefers_explicit_path() {
        let path = Config::locate(Some(Path::new("/etc/mender/custom.json")));
        assert_eq!(path, PathBuf::from("/etc/mender/custom.json"));
    }

    #[test]
    fn test_redacted_masks_credentials() {
        let mut config = Config::from_json_str(MINIMAL).unwrap();
        config.llm.openai_api_key = Some("sk-live".to_string());
        let json = config.redacted().to_json().unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("sk-live"));
        assert!(json.contains("********"));
        assert!(json.contains("http://media.local:8096/"));
    }

    #[test]
    fn test_serialized_config_is_flat() {
        let config = Config::from_json_str(MINIMAL).unwrap();
        let value: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(value["user_id"], "u1");
        assert_eq!(value["log_dir"], "logs");
        assert!(value.get("library").is_none());
    }

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_MENDER_123}"), None);
    }

    #[test]
    fn test_template_is_valid() {
        let json = Config::template().to_json().unwrap();
        let config = Config::from_json_str(&json).unwrap();
        assert_eq!(config.provider(), "openai");
    }
}
