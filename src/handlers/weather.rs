//! Direct weather lookups, bypassing the chat pipeline

use crate::error::AppError;
use crate::handlers::{ApiResponse, AppState};
use crate::metrics::log_recording_failure;
use crate::weather::{ForecastSet, MAX_FORECAST_DAYS, WeatherError, WeatherSnapshot};
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

pub const DEFAULT_FORECAST_DAYS: u8 = 3;

#[derive(Debug, Deserialize)]
pub struct CurrentParams {
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
    #[serde(default)]
    pub city: String,
    pub days: Option<u32>,
}

/// Failure of a direct lookup
pub enum WeatherFailure {
    Request(AppError),
    Provider { error: WeatherError, city: String },
}

impl From<AppError> for WeatherFailure {
    fn from(err: AppError) -> Self {
        Self::Request(err)
    }
}

impl IntoResponse for WeatherFailure {
    fn into_response(self) -> Response {
        match self {
            Self::Request(err) => err.into_response(),
            Self::Provider { error, city } => {
                let body = Json(serde_json::json!({
                    "success": false,
                    "message": error.user_message(&city),
                    "error_type": error.code(),
                }));
                (StatusCode::BAD_GATEWAY, body).into_response()
            }
        }
    }
}

fn require_city(city: &str) -> Result<String, WeatherFailure> {
    let city = city.trim();
    if city.is_empty() {
        return Err(AppError::Validation("El parámetro 'city' es obligatorio".to_string()).into());
    }
    Ok(city.to_string())
}

fn query_error(rejection: QueryRejection) -> WeatherFailure {
    AppError::Validation(format!("Parámetros no válidos: {}", rejection.body_text())).into()
}

fn record(state: &AppState, result: Result<(), WeatherError>) {
    log_recording_failure(
        "record_weather_lookup",
        state.metrics().record_weather_lookup(result),
    );
}

pub async fn current(
    State(state): State<AppState>,
    params: Result<Query<CurrentParams>, QueryRejection>,
) -> Result<Json<ApiResponse<WeatherSnapshot>>, WeatherFailure> {
    let Query(params) = params.map_err(query_error)?;
    let city = require_city(&params.city)?;

    let result = state.weather().current_weather(&city).await;
    record(&state, result.as_ref().map(|_| ()).map_err(|e| *e));

    match result {
        Ok(snapshot) => Ok(Json(ApiResponse::ok(snapshot))),
        Err(error) => Err(WeatherFailure::Provider { error, city }),
    }
}

pub async fn forecast(
    State(state): State<AppState>,
    params: Result<Query<ForecastParams>, QueryRejection>,
) -> Result<Json<ApiResponse<ForecastSet>>, WeatherFailure> {
    let Query(params) = params.map_err(query_error)?;
    let city = require_city(&params.city)?;
    // Out-of-range values saturate so the gateway reports INVALID_PARAMETERS
    let days = params
        .days
        .map(|d| u8::try_from(d).unwrap_or(u8::MAX))
        .unwrap_or(DEFAULT_FORECAST_DAYS);

    tracing::debug!(city = %city, days, max_days = MAX_FORECAST_DAYS, "Forecast requested");

    let result = state.weather().forecast(&city, days).await;
    record(&state, result.as_ref().map(|_| ()).map_err(|e| *e));

    match result {
        Ok(set) => Ok(Json(ApiResponse::ok(set))),
        Err(error) => Err(WeatherFailure::Provider { error, city }),
    }
}
