//! Configuration validation: required keys and range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate that required keys are present and values are usable.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("jellyfin_url", &self.library.jellyfin_url),
            ("jellyfin_api_key", &self.library.jellyfin_api_key),
            ("user_id", &self.library.user_id),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{key} is required"
                )));
            }
        }
        let url = self.library.jellyfin_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "jellyfin_url must start with http:// or https:// (got {url:?})"
            )));
        }
        if self.library.item_types.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "item_types must not contain empty names".into(),
            ));
        }
        if self.library.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }
        if !self.llm.cost_per_token.is_finite() || self.llm.cost_per_token < 0.0 {
            return Err(ConfigError::ValidationError(
                "cost_per_token must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}
