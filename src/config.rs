use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use crate::error::{Result, DubError};

/// Environment variable that overrides `api.base_url`
pub const API_BASE_URL_ENV: &str = "DUBFLOW_API_BASE_URL";

/// Backend location used when neither the environment nor the config file sets one
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

fn default_user_agent() -> String {
    format!("dubflow/{}", env!("CARGO_PKG_VERSION"))
}

fn default_complete_message() -> String {
    "Processing complete!".to_string()
}

fn default_error_message() -> String {
    "Error processing video. Please ensure backend is running.".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the dubbing backend (without trailing path)
    pub base_url: String,
    /// Transport timeout in seconds; unset means wait indefinitely
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Milliseconds between two phase ticks
    pub tick_interval_ms: u64,
    /// Phase labels shown while the backend works, in display order
    pub status_messages: Vec<String>,
    /// Label shown once the backend confirms success
    #[serde(default = "default_complete_message")]
    pub complete_message: String,
    /// Label shown when the backend call fails
    #[serde(default = "default_error_message")]
    pub error_message: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_API_BASE_URL.to_string(),
                request_timeout_secs: None,
                user_agent: default_user_agent(),
            },
            processing: ProcessingConfig {
                tick_interval_ms: 3000,
                status_messages: vec![
                    "Initializing workflow...".to_string(),
                    "Uploading video...".to_string(),
                    "Extracting audio track...".to_string(),
                    "Segmenting audio for timestamps...".to_string(),
                    "Transcribing speech to text...".to_string(),
                    "Translating text to target language...".to_string(),
                    "Generating new speech from translated text...".to_string(),
                    "Synchronizing translated audio with video...".to_string(),
                    "Merging audio and video streams...".to_string(),
                    "Finalizing translated video...".to_string(),
                ],
                complete_message: default_complete_message(),
                error_message: default_error_message(),
            },
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl ProcessingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DubError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| DubError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DubError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| DubError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Apply `DUBFLOW_API_BASE_URL` from the process environment
    pub fn apply_env(&mut self) {
        self.apply_base_url_override(std::env::var(API_BASE_URL_ENV).ok());
    }

    /// Replace the base URL when the override is set and non-blank
    pub fn apply_base_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            self.api.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(DubError::Config("api.base_url must not be empty".to_string()));
        }
        if self.processing.tick_interval_ms == 0 {
            return Err(DubError::Config("processing.tick_interval_ms must be greater than zero".to_string()));
        }
        if self.processing.status_messages.is_empty() {
            return Err(DubError::Config("processing.status_messages must contain at least one label".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.processing.status_messages.len(), 10);
        assert_eq!(config.processing.tick_interval(), Duration::from_secs(3));
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert!(config.api.request_timeout().is_none());
    }

    #[test]
    fn test_base_url_override() {
        let mut config = Config::default();
        config.apply_base_url_override(None);
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);

        config.apply_base_url_override(Some("   ".to_string()));
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);

        config.apply_base_url_override(Some("https://dub.example.com".to_string()));
        assert_eq!(config.api.base_url, "https://dub.example.com");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.processing.status_messages.clear();
        assert!(matches!(config.validate(), Err(DubError::Config(_))));

        let mut config = Config::default();
        config.processing.tick_interval_ms = 0;
        assert!(matches!(config.validate(), Err(DubError::Config(_))));

        let mut config = Config::default();
        config.api.base_url = String::new();
        assert!(matches!(config.validate(), Err(DubError::Config(_))));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dubflow.toml");

        let mut config = Config::default();
        config.api.request_timeout_secs = Some(600);
        config.processing.tick_interval_ms = 1500;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.api.request_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(loaded.processing.tick_interval_ms, 1500);
        assert_eq!(loaded.processing.status_messages, config.processing.status_messages);
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dubflow.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "http://10.0.0.2:8000"

[processing]
tick_interval_ms = 500
status_messages = ["Working..."]
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.api.base_url, "http://10.0.0.2:8000");
        assert!(config.api.user_agent.starts_with("dubflow/"));
        assert_eq!(config.processing.complete_message, "Processing complete!");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = Config::from_file("/nonexistent/dubflow.toml");
        assert!(matches!(result, Err(DubError::Config(_))));
    }
}
