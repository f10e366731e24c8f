//! Configuration management for WeatherBot
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::error::{AppError, AppResult};
use crate::security::ScreenThresholds;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound for any outbound timeout, in seconds
const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub security: ScreenThresholds,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// SQLite conversation store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a request waits for another request's write transaction
    ///
    /// Exchanges on the same store serialize at the SQLite write lock, so this
    /// must exceed the sum of the outbound timeouts.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            busy_timeout_seconds: default_busy_timeout(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://weatherbot.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    120
}

/// Open-Meteo provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherConfig {
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
            language: default_language(),
            timeout_seconds: default_weather_timeout(),
        }
    }
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_language() -> String {
    "es".to_string()
}

fn default_weather_timeout() -> u64 {
    10
}

/// Chat-completions provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Inline API key; takes precedence over `api_key_env`
    #[serde(default, skip_serializing)]
    api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the config file or the environment
    ///
    /// Blank values count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Per-call timeouts for the chat-completions provider, in seconds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_short_timeout")]
    pub classification_seconds: u64,
    #[serde(default = "default_short_timeout")]
    pub extraction_seconds: u64,
    #[serde(default = "default_generation_timeout")]
    pub generation_seconds: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            classification_seconds: default_short_timeout(),
            extraction_seconds: default_short_timeout(),
            generation_seconds: default_generation_timeout(),
        }
    }
}

impl TimeoutsConfig {
    pub fn classification(&self) -> Duration {
        Duration::from_secs(self.classification_seconds)
    }

    pub fn extraction(&self) -> Duration {
        Duration::from_secs(self.extraction_seconds)
    }

    pub fn generation(&self) -> Duration {
        Duration::from_secs(self.generation_seconds)
    }
}

fn default_short_timeout() -> u64 {
    5
}

fn default_generation_timeout() -> u64 {
    30
}

/// Conversation behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Prior messages supplied to the generator as context
    #[serde(default = "default_history_window")]
    pub history_window: u32,
    /// Maximum accepted message length, in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            max_message_chars: default_max_message_chars(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

fn default_history_window() -> u32 {
    10
}

fn default_max_message_chars() -> usize {
    1000
}

fn default_title_max_chars() -> usize {
    50
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate cross-field and range constraints
    pub fn validate(&self) -> AppResult<()> {
        if self.server.port == 0 {
            return Err(AppError::Config("server.port must be non-zero".to_string()));
        }

        for (name, url) in [
            ("weather.geocoding_url", &self.weather.geocoding_url),
            ("weather.forecast_url", &self.weather.forecast_url),
            ("llm.base_url", &self.llm.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::Config(format!(
                    "{} must start with http:// or https://, got '{}'",
                    name, url
                )));
            }
        }

        if self.llm.model.trim().is_empty() {
            return Err(AppError::Config("llm.model cannot be empty".to_string()));
        }

        for (name, seconds) in [
            ("weather.timeout_seconds", self.weather.timeout_seconds),
            (
                "timeouts.classification_seconds",
                self.timeouts.classification_seconds,
            ),
            ("timeouts.extraction_seconds", self.timeouts.extraction_seconds),
            ("timeouts.generation_seconds", self.timeouts.generation_seconds),
        ] {
            if seconds == 0 || seconds > MAX_TIMEOUT_SECONDS {
                return Err(AppError::Config(format!(
                    "{} must be in (0, {}], got {}",
                    name, MAX_TIMEOUT_SECONDS, seconds
                )));
            }
        }

        if self.database.max_connections == 0 {
            return Err(AppError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        if !(1..=50).contains(&self.chat.history_window) {
            return Err(AppError::Config(format!(
                "chat.history_window must be in 1..=50, got {}",
                self.chat.history_window
            )));
        }

        if !(1..=10_000).contains(&self.chat.max_message_chars) {
            return Err(AppError::Config(format!(
                "chat.max_message_chars must be in 1..=10000, got {}",
                self.chat.max_message_chars
            )));
        }

        if self.chat.title_max_chars == 0 {
            return Err(AppError::Config(
                "chat.title_max_chars must be at least 1".to_string(),
            ));
        }

        if self.security.block_threshold == 0 {
            return Err(AppError::Config(
                "security.block_threshold must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather.timeout_seconds)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.database.busy_timeout_seconds)
    }
}
