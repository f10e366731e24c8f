//! Weather data acquisition
//!
//! Geocodes a city name, then fetches current conditions or a daily
//! forecast. Every failure is reported as one of a closed set of
//! [`WeatherError`] codes; the raw provider detail is logged where it occurs.

pub mod codes;
pub mod open_meteo;
mod types;

pub use open_meteo::OpenMeteoClient;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Current conditions for one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub location: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub weather_code: i64,
    pub weather_description: String,
    /// Provider unit labels keyed by field name (`temperature_2m` -> `°C`)
    pub units: BTreeMap<String, String>,
}

/// One day of a daily forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDay {
    pub date: String,
    pub max_temp: f64,
    pub min_temp: f64,
    pub precipitation_probability: Option<f64>,
    pub weather_code: i64,
    pub weather_description: String,
}

/// Daily forecast for one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSet {
    pub location: String,
    pub days: Vec<ForecastDay>,
    pub units: BTreeMap<String, String>,
}

/// Maximum forecast horizon accepted by the provider
pub const MAX_FORECAST_DAYS: u8 = 16;

/// Closed taxonomy of weather lookup failures
///
/// `Display` yields the stable code string persisted with an exchange.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherError {
    #[error("ciudad_no_encontrada")]
    CityNotFound,
    #[error("parametros_invalidos")]
    InvalidParameters,
    #[error("limite_excedido")]
    RateLimitExceeded,
    #[error("error_servidor_clima")]
    ServerError,
    #[error("error_api_clima")]
    ApiError,
    #[error("respuesta_invalida")]
    InvalidResponse,
    #[error("sin_conexion_internet")]
    NoInternetConnection,
    #[error("timeout_api_clima")]
    Timeout,
    #[error("error_general_clima")]
    General,
}

impl WeatherError {
    pub const ALL: [WeatherError; 9] = [
        Self::CityNotFound,
        Self::InvalidParameters,
        Self::RateLimitExceeded,
        Self::ServerError,
        Self::ApiError,
        Self::InvalidResponse,
        Self::NoInternetConnection,
        Self::Timeout,
        Self::General,
    ];

    /// Stable code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::CityNotFound => "ciudad_no_encontrada",
            Self::InvalidParameters => "parametros_invalidos",
            Self::RateLimitExceeded => "limite_excedido",
            Self::ServerError => "error_servidor_clima",
            Self::ApiError => "error_api_clima",
            Self::InvalidResponse => "respuesta_invalida",
            Self::NoInternetConnection => "sin_conexion_internet",
            Self::Timeout => "timeout_api_clima",
            Self::General => "error_general_clima",
        }
    }

    /// Localized sentence shown to the user; only city-not-found names the city
    pub fn user_message(&self, city: &str) -> String {
        match self {
            Self::CityNotFound => format!(
                "No pude encontrar información meteorológica para '{}'. ¿Podrías verificar el nombre de la ciudad?",
                city
            ),
            Self::InvalidParameters => {
                "Hubo un problema con los parámetros de consulta del clima. Intenta con otra ciudad."
                    .to_string()
            }
            Self::RateLimitExceeded => "El servicio meteorológico está temporalmente saturado. Por favor intenta nuevamente en unos minutos.".to_string(),
            Self::ServerError => {
                "El servicio meteorológico está experimentando problemas técnicos. Intenta más tarde."
                    .to_string()
            }
            Self::ApiError => {
                "No pude acceder al servicio meteorológico en este momento. Intenta nuevamente."
                    .to_string()
            }
            Self::InvalidResponse => "Recibí una respuesta inesperada del servicio meteorológico. Intenta con otra consulta.".to_string(),
            Self::NoInternetConnection => {
                "No puedo conectarme al servicio meteorológico. Verifica tu conexión a internet."
                    .to_string()
            }
            Self::Timeout => {
                "La consulta meteorológica está tardando demasiado. Intenta nuevamente.".to_string()
            }
            Self::General => "Ocurrió un error inesperado al obtener datos del clima. Por favor intenta más tarde.".to_string(),
        }
    }

    /// Classify a non-success HTTP status from the provider
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidParameters,
            429 => Self::RateLimitExceeded,
            500..=599 => Self::ServerError,
            _ => Self::ApiError,
        }
    }

    /// Classify a transport-level failure
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::NoInternetConnection
        } else if err.is_decode() {
            Self::InvalidResponse
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16())
        } else {
            Self::General
        }
    }
}

/// Source of weather data, injectable for tests
#[async_trait]
pub trait WeatherGateway: Send + Sync {
    async fn current_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError>;

    /// Daily forecast for `days` days (1..=16)
    async fn forecast(&self, city: &str, days: u8) -> Result<ForecastSet, WeatherError>;
}
