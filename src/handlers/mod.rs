//! HTTP request handlers for the WeatherBot API

use crate::analysis::{HybridAnalyzer, KeywordAnalyzer, LlmAnalyzer, MessageAnalyzer};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::llm::{ChatCompletion, LlmResponseGenerator, OpenAiClient, ResponseGenerator};
use crate::metrics::Metrics;
use crate::middleware::{request_id_middleware, session_middleware};
use crate::orchestrator::{ChatSettings, ConversationOrchestrator};
use crate::security::SecurityScreen;
use crate::store;
use crate::weather::{OpenMeteoClient, WeatherGateway};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod chat;
pub mod conversations;
pub mod health;
pub mod metrics;
pub mod weather;

/// Application state shared across all handlers
///
/// All fields are Arc'd (or internally pooled) for cheap cloning across
/// Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    orchestrator: Arc<ConversationOrchestrator>,
    weather: Arc<dyn WeatherGateway>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Build production state: open the store and wire the real providers
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be opened or migrated, or a client
    /// cannot be constructed.
    pub async fn from_config(config: Config) -> AppResult<Self> {
        let pool = store::connect(&config.database).await?;
        let metrics = Arc::new(new_metrics()?);

        let weather: Arc<dyn WeatherGateway> = Arc::new(OpenMeteoClient::new(
            &config.weather,
            config.weather_timeout(),
        )?);
        let completions: Arc<dyn ChatCompletion> = Arc::new(OpenAiClient::new(&config.llm)?);

        let analyzer: Arc<dyn MessageAnalyzer> = Arc::new(HybridAnalyzer::new(
            Arc::new(LlmAnalyzer::new(
                completions.clone(),
                config.timeouts.classification(),
                config.timeouts.extraction(),
            )),
            KeywordAnalyzer::new()?,
            metrics.clone(),
        ));

        let screen = Arc::new(SecurityScreen::new(config.security)?);
        let generator: Arc<dyn ResponseGenerator> = Arc::new(LlmResponseGenerator::new(
            completions,
            screen.clone(),
            config.timeouts.generation(),
        )?);

        Self::assemble(config, pool, metrics, screen, analyzer, weather, generator)
    }

    /// Build state around caller-supplied collaborators
    ///
    /// Used by tests to inject fakes for the analyzer, the weather provider
    /// and the generator.
    pub fn with_components(
        config: Config,
        pool: SqlitePool,
        analyzer: Arc<dyn MessageAnalyzer>,
        weather: Arc<dyn WeatherGateway>,
        generator: Arc<dyn ResponseGenerator>,
    ) -> AppResult<Self> {
        let metrics = Arc::new(new_metrics()?);
        let screen = Arc::new(SecurityScreen::new(config.security)?);
        Self::assemble(config, pool, metrics, screen, analyzer, weather, generator)
    }

    fn assemble(
        config: Config,
        pool: SqlitePool,
        metrics: Arc<Metrics>,
        screen: Arc<SecurityScreen>,
        analyzer: Arc<dyn MessageAnalyzer>,
        weather: Arc<dyn WeatherGateway>,
        generator: Arc<dyn ResponseGenerator>,
    ) -> AppResult<Self> {
        let orchestrator = Arc::new(ConversationOrchestrator::new(
            pool.clone(),
            screen,
            analyzer,
            weather.clone(),
            generator,
            metrics.clone(),
            ChatSettings::from(&config.chat),
        ));

        Ok(Self {
            config: Arc::new(config),
            pool,
            orchestrator,
            weather,
            metrics,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn orchestrator(&self) -> &ConversationOrchestrator {
        &self.orchestrator
    }

    pub fn weather(&self) -> &dyn WeatherGateway {
        self.weather.as_ref()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

fn new_metrics() -> AppResult<Metrics> {
    Metrics::new().map_err(|e| AppError::Internal(format!("metrics registration failed: {}", e)))
}

/// `{success: true, data}` envelope shared by the JSON endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Assemble the full HTTP router
///
/// Everything under `/api` is scoped to a session token; every route gets a
/// request id.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/chat", post(chat::handler))
        .route("/conversations", get(conversations::list))
        .route(
            "/conversations/{id}",
            get(conversations::show).delete(conversations::destroy),
        )
        .route("/weather/current", get(weather::current))
        .route("/weather/forecast", get(weather::forecast))
        .route("/v1/chat/message", post(chat::handler))
        .route("/v1/chat/conversations", get(conversations::list))
        .route(
            "/v1/chat/conversations/{id}",
            get(conversations::show).delete(conversations::destroy),
        )
        .layer(middleware::from_fn(session_middleware));

    Router::new()
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .nest("/api", api)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory_config() -> Config {
        toml::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 3000

[database]
url = "sqlite::memory:"

[llm]
api_key_env = "WEATHERBOT_TEST_UNSET_KEY"
"#,
        )
        .expect("should parse test config")
    }

    #[tokio::test]
    async fn test_from_config_builds_without_api_key() {
        let state = AppState::from_config(in_memory_config())
            .await
            .expect("state should build");

        assert_eq!(state.config().server.port, 3000);
        assert_eq!(state.config().chat.history_window, 10);
    }

    #[tokio::test]
    async fn test_appstate_is_clonable() {
        let state = AppState::from_config(in_memory_config())
            .await
            .expect("state should build");

        let cloned = state.clone();
        assert!(std::ptr::eq(cloned.metrics(), state.metrics()));
    }

    #[test]
    fn test_api_response_envelope() {
        let body = serde_json::to_value(ApiResponse::ok(vec![1, 2])).expect("serialize");
        assert_eq!(body, serde_json::json!({"success": true, "data": [1, 2]}));
    }
}
