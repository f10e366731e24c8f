//! Shared fakes and fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use weatherbot::analysis::MessageAnalyzer;
use weatherbot::config::Config;
use weatherbot::llm::{GeneratedReply, GenerationError, GenerationRequest, ResponseGenerator};
use weatherbot::store;
use weatherbot::weather::{ForecastSet, WeatherError, WeatherGateway, WeatherSnapshot};

/// Parse a config whose store lives in `dir`
pub fn test_config(dir: &TempDir) -> Config {
    let db_path = dir.path().join("weatherbot.db");
    let toml = format!(
        r#"
[server]
host = "127.0.0.1"
port = 3000

[database]
url = "sqlite://{}"
"#,
        db_path.display()
    );
    toml::from_str(&toml).expect("test config should parse")
}

/// File-backed store in a throw-away directory
pub async fn temp_store() -> (TempDir, Config, SqlitePool) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = test_config(&dir);
    let pool = store::connect(&config.database)
        .await
        .expect("store should open");
    (dir, config, pool)
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("count query")
}

pub fn snapshot(location: &str) -> WeatherSnapshot {
    WeatherSnapshot {
        location: location.to_string(),
        temperature: 22.5,
        feels_like: 21.8,
        humidity: 40.0,
        precipitation: 0.0,
        wind_speed: 12.3,
        weather_code: 0,
        weather_description: "Despejado".to_string(),
        units: BTreeMap::from([("temperature_2m".to_string(), "°C".to_string())]),
    }
}

/// Analyzer with canned answers
pub struct FakeAnalyzer {
    pub needs_weather: bool,
    pub city: Option<String>,
}

impl FakeAnalyzer {
    pub fn weather_for(city: &str) -> Self {
        Self {
            needs_weather: true,
            city: Some(city.to_string()),
        }
    }

    pub fn no_weather() -> Self {
        Self {
            needs_weather: false,
            city: None,
        }
    }
}

#[async_trait]
impl MessageAnalyzer for FakeAnalyzer {
    async fn needs_weather_data(&self, _message: &str) -> bool {
        self.needs_weather
    }

    async fn extract_city(&self, _message: &str) -> Option<String> {
        self.city.clone()
    }
}

/// Weather gateway returning one fixed outcome and counting calls
pub struct FakeWeather {
    outcome: Result<WeatherSnapshot, WeatherError>,
    calls: AtomicUsize,
}

impl FakeWeather {
    pub fn ok(location: &str) -> Self {
        Self {
            outcome: Ok(snapshot(location)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: WeatherError) -> Self {
        Self {
            outcome: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherGateway for FakeWeather {
    async fn current_weather(&self, _city: &str) -> Result<WeatherSnapshot, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }

    async fn forecast(&self, _city: &str, _days: u8) -> Result<ForecastSet, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(snapshot) => Ok(ForecastSet {
                location: snapshot.location.clone(),
                days: Vec::new(),
                units: BTreeMap::new(),
            }),
            Err(e) => Err(*e),
        }
    }
}

/// What the generator was asked, captured by value
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub message: String,
    pub weather: Option<WeatherSnapshot>,
    pub weather_error: Option<String>,
    pub history_len: usize,
    pub is_first_message: bool,
    pub user_city: Option<String>,
}

/// Generator that replies with fixed text (or fails) and records requests
pub struct RecordingGenerator {
    reply: Result<String, String>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl RecordingGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(user_message: &str) -> Self {
        Self {
            reply: Err(user_message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ResponseGenerator for RecordingGenerator {
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GeneratedReply, GenerationError> {
        self.seen.lock().expect("lock").push(SeenRequest {
            message: request.message.to_string(),
            weather: request.weather.cloned(),
            weather_error: request.weather_error.map(str::to_string),
            history_len: request.history.len(),
            is_first_message: request.is_first_message,
            user_city: request.user_city.map(str::to_string),
        });

        match &self.reply {
            Ok(text) => Ok(GeneratedReply {
                text: text.clone(),
                leakage_blocked: false,
            }),
            Err(user_message) => Err(GenerationError {
                user_message: user_message.clone(),
                detail: "injected failure".to_string(),
            }),
        }
    }
}
