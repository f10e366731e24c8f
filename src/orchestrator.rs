//! Conversation orchestration
//!
//! One call to [`ConversationOrchestrator::process`] handles one chat
//! exchange end to end: screen, resolve the conversation, store the user
//! turn, look up weather when the message needs it, generate, store the
//! reply and bookkeeping. Every write happens inside one SQLite transaction;
//! a generation failure rolls all of it back, including a conversation
//! created for this exchange.

use crate::analysis::MessageAnalyzer;
use crate::config::ChatConfig;
use crate::error::{AppError, AppResult};
use crate::llm::{GenerationRequest, ResponseGenerator};
use crate::metrics::{MessageOutcome, Metrics, log_recording_failure};
use crate::security::SecurityScreen;
use crate::store::{self, Message, NewMessage};
use crate::weather::{WeatherError, WeatherGateway, WeatherSnapshot};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Instant;

/// Tunables for the exchange pipeline
#[derive(Debug, Clone, Copy)]
pub struct ChatSettings {
    pub history_window: u32,
    pub title_max_chars: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_window: 10,
            title_max_chars: 50,
        }
    }
}

impl From<&ChatConfig> for ChatSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            history_window: config.history_window,
            title_max_chars: config.title_max_chars,
        }
    }
}

/// Both persisted sides of a completed exchange
#[derive(Debug, Clone)]
pub struct ChatExchange {
    pub conversation_id: i64,
    pub user_message: Message,
    pub assistant_message: Message,
}

/// What the weather step produced for this message
#[derive(Debug, Default)]
struct WeatherContext {
    city: Option<String>,
    snapshot: Option<WeatherSnapshot>,
    error: Option<WeatherError>,
}

impl WeatherContext {
    /// Localized sentence for the model when the lookup failed
    fn diagnostic(&self) -> Option<String> {
        self.error
            .map(|err| err.user_message(self.city.as_deref().unwrap_or_default()))
    }
}

pub struct ConversationOrchestrator {
    pool: SqlitePool,
    screen: Arc<SecurityScreen>,
    analyzer: Arc<dyn MessageAnalyzer>,
    weather: Arc<dyn WeatherGateway>,
    generator: Arc<dyn ResponseGenerator>,
    metrics: Arc<Metrics>,
    settings: ChatSettings,
}

impl ConversationOrchestrator {
    pub fn new(
        pool: SqlitePool,
        screen: Arc<SecurityScreen>,
        analyzer: Arc<dyn MessageAnalyzer>,
        weather: Arc<dyn WeatherGateway>,
        generator: Arc<dyn ResponseGenerator>,
        metrics: Arc<Metrics>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            pool,
            screen,
            analyzer,
            weather,
            generator,
            metrics,
            settings,
        }
    }

    /// Process one user message for `session_token`
    ///
    /// # Errors
    ///
    /// - [`AppError::SecurityViolation`] when the screen blocks the message;
    ///   nothing is written
    /// - [`AppError::NotFound`] when `conversation_id` is not owned by the session
    /// - [`AppError::Generation`] with the localized sentence when the reply
    ///   could not be produced; the transaction is rolled back
    pub async fn process(
        &self,
        session_token: &str,
        raw_message: &str,
        conversation_id: Option<i64>,
    ) -> AppResult<ChatExchange> {
        let result = self.run(session_token, raw_message, conversation_id).await;

        let outcome = match &result {
            Ok(_) => MessageOutcome::Success,
            Err(AppError::SecurityViolation) => MessageOutcome::SecurityBlocked,
            Err(AppError::Generation(_)) => MessageOutcome::GenerationFailed,
            Err(AppError::NotFound(_)) => MessageOutcome::NotFound,
            Err(_) => MessageOutcome::Failed,
        };
        log_recording_failure("record_message", self.metrics.record_message(outcome));

        result
    }

    async fn run(
        &self,
        session_token: &str,
        raw_message: &str,
        conversation_id: Option<i64>,
    ) -> AppResult<ChatExchange> {
        let verdict = self.screen.evaluate(raw_message);
        if verdict.suspicious {
            tracing::warn!(
                score = verdict.score,
                pattern = verdict.matched_pattern.unwrap_or(""),
                message_preview = %raw_message.chars().take(100).collect::<String>(),
                "Security: suspicious patterns detected in user message"
            );
            return Err(AppError::SecurityViolation);
        }

        let mut tx = self.pool.begin().await?;

        let conversation = match conversation_id {
            Some(id) => store::claim_conversation(&mut tx, id, session_token).await?,
            None => store::create_conversation(&mut tx, session_token).await?,
        };

        let user_message =
            store::insert_message(&mut tx, NewMessage::user(conversation.id, raw_message)).await?;

        let weather = self.weather_context(raw_message).await;

        let history = store::history_window(
            &mut tx,
            conversation.id,
            user_message.id,
            self.settings.history_window,
        )
        .await?;

        let diagnostic = weather.diagnostic();
        let request = GenerationRequest {
            message: raw_message,
            weather: weather.snapshot.as_ref(),
            weather_error: diagnostic.as_deref(),
            history: &history,
            is_first_message: history.is_empty(),
            user_city: weather.city.as_deref(),
        };

        let started = Instant::now();
        let generated = self.generator.generate(request).await;
        log_recording_failure(
            "record_generation_duration",
            self.metrics
                .record_generation_duration(started.elapsed().as_secs_f64() * 1000.0),
        );

        let reply = match generated {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    conversation_id = conversation.id,
                    detail = %e.detail,
                    "Generation failed, rolling back exchange"
                );
                tx.rollback().await?;
                return Err(AppError::Generation(e.user_message));
            }
        };
        if reply.leakage_blocked {
            self.metrics.record_leakage_blocked();
        }

        let weather_data_used = weather.snapshot.is_some();
        let assistant_message = store::insert_message(
            &mut tx,
            NewMessage::assistant(
                conversation.id,
                &reply.text,
                weather_data_used,
                weather.error.map(|e| e.code()),
            ),
        )
        .await?;

        let title = store::derive_title(raw_message, self.settings.title_max_chars);
        store::record_exchange(&mut tx, conversation.id, &assistant_message.content, &title)
            .await?;

        tx.commit().await?;

        tracing::info!(
            conversation_id = conversation.id,
            user_message_id = user_message.id,
            assistant_message_id = assistant_message.id,
            weather_data_used,
            weather_error = weather.error.map(|e| e.code()).unwrap_or(""),
            "Chat exchange stored"
        );

        Ok(ChatExchange {
            conversation_id: conversation.id,
            user_message,
            assistant_message,
        })
    }

    /// Weather step; failures degrade to "no data" and are never fatal
    async fn weather_context(&self, message: &str) -> WeatherContext {
        if !self.analyzer.needs_weather_data(message).await {
            return WeatherContext::default();
        }

        let Some(city) = self.analyzer.extract_city(message).await else {
            tracing::debug!("Weather needed but no city could be resolved");
            return WeatherContext::default();
        };

        let result = self.weather.current_weather(&city).await;
        log_recording_failure(
            "record_weather_lookup",
            self.metrics
                .record_weather_lookup(result.as_ref().map(|_| ()).map_err(|e| *e)),
        );

        match result {
            Ok(snapshot) => WeatherContext {
                city: Some(city),
                snapshot: Some(snapshot),
                error: None,
            },
            Err(error) => {
                tracing::warn!(
                    city = %city,
                    error_code = error.code(),
                    "Weather lookup failed, continuing without data"
                );
                WeatherContext {
                    city: Some(city),
                    snapshot: None,
                    error: Some(error),
                }
            }
        }
    }
}
