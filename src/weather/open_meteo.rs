//! Open-Meteo geocoding and forecast client

use super::codes::describe;
use super::types::{CurrentResponse, DailyResponse, GeocodedPlace, GeocodingResponse};
use super::{
    ForecastDay, ForecastSet, MAX_FORECAST_DAYS, WeatherError, WeatherGateway, WeatherSnapshot,
};
use crate::config::WeatherConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,weather_code,wind_speed_10m";
const DAILY_FIELDS: &str =
    "weather_code,temperature_2m_max,temperature_2m_min,precipitation_probability_max";

/// HTTP client for the Open-Meteo public APIs
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: reqwest::Client,
    geocoding_url: String,
    forecast_url: String,
    language: String,
}

impl OpenMeteoClient {
    /// Build a client whose every request is bounded by `timeout`
    pub fn new(config: &WeatherConfig, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build weather client: {}", e)))?;

        Ok(Self {
            http,
            geocoding_url: config.geocoding_url.trim_end_matches('/').to_string(),
            forecast_url: config.forecast_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
        })
    }

    /// Resolve a city name to coordinates (first match only)
    async fn geocode(&self, city: &str) -> Result<GeocodedPlace, WeatherError> {
        let url = format!("{}/search", self.geocoding_url);
        let query = [
            ("name", city.to_string()),
            ("count", "1".to_string()),
            ("language", self.language.clone()),
            ("format", "json".to_string()),
        ];

        let response: GeocodingResponse = self.get_json(&url, &query, city).await?;

        match response.results.into_iter().next() {
            Some(place) => Ok(place),
            None => {
                tracing::info!(city = %city, "Geocoding returned no results");
                Err(WeatherError::CityNotFound)
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        city: &str,
    ) -> Result<T, WeatherError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                let classified = WeatherError::from_transport(&e);
                tracing::warn!(
                    city = %city,
                    url = %url,
                    error = %e,
                    code = classified.code(),
                    "Weather request failed"
                );
                classified
            })?;

        let status = response.status();
        if !status.is_success() {
            let classified = WeatherError::from_status(status.as_u16());
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                city = %city,
                url = %url,
                status = status.as_u16(),
                body = %truncate_for_log(&body),
                code = classified.code(),
                "Weather provider returned an error status"
            );
            return Err(classified);
        }

        let bytes = response.bytes().await.map_err(|e| {
            let classified = WeatherError::from_transport(&e);
            tracing::warn!(city = %city, error = %e, code = classified.code(), "Failed to read weather response");
            classified
        })?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(city = %city, url = %url, error = %e, "Unexpected weather payload shape");
            WeatherError::InvalidResponse
        })
    }
}

fn truncate_for_log(body: &str) -> String {
    body.chars().take(200).collect()
}

fn location_name(place: &GeocodedPlace, requested: &str) -> String {
    place
        .name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(requested)
        .to_string()
}

#[async_trait]
impl WeatherGateway for OpenMeteoClient {
    async fn current_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(WeatherError::CityNotFound);
        }

        let place = self.geocode(city).await?;

        let url = format!("{}/forecast", self.forecast_url);
        let query = [
            ("latitude", place.latitude.to_string()),
            ("longitude", place.longitude.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("timezone", "auto".to_string()),
        ];
        let payload: CurrentResponse = self.get_json(&url, &query, city).await?;
        let current = payload.current;

        let snapshot = WeatherSnapshot {
            location: location_name(&place, city),
            temperature: current.temperature_2m,
            feels_like: current.apparent_temperature,
            humidity: current.relative_humidity_2m,
            precipitation: current.precipitation,
            wind_speed: current.wind_speed_10m,
            weather_code: current.weather_code,
            weather_description: describe(current.weather_code).to_string(),
            units: payload.current_units,
        };

        tracing::debug!(
            city = %city,
            location = %snapshot.location,
            weather_code = snapshot.weather_code,
            "Current weather fetched"
        );

        Ok(snapshot)
    }

    async fn forecast(&self, city: &str, days: u8) -> Result<ForecastSet, WeatherError> {
        if !(1..=MAX_FORECAST_DAYS).contains(&days) {
            return Err(WeatherError::InvalidParameters);
        }
        let city = city.trim();
        if city.is_empty() {
            return Err(WeatherError::CityNotFound);
        }

        let place = self.geocode(city).await?;

        let url = format!("{}/forecast", self.forecast_url);
        let query = [
            ("latitude", place.latitude.to_string()),
            ("longitude", place.longitude.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("forecast_days", days.to_string()),
            ("timezone", "auto".to_string()),
        ];
        let payload: DailyResponse = self.get_json(&url, &query, city).await?;
        let daily = payload.daily;

        let expected = usize::from(days);
        let returned = daily.time.len();
        let probabilities_ok = daily.precipitation_probability_max.is_empty()
            || daily.precipitation_probability_max.len() == returned;
        let consistent = daily.temperature_2m_max.len() == returned
            && daily.temperature_2m_min.len() == returned
            && daily.weather_code.len() == returned
            && probabilities_ok;
        if !consistent || returned < expected {
            tracing::warn!(
                city = %city,
                requested_days = days,
                returned_days = returned,
                consistent,
                "Forecast payload is ragged or shorter than requested"
            );
            return Err(WeatherError::InvalidResponse);
        }

        let days = (0..expected)
            .map(|i| ForecastDay {
                date: daily.time[i].clone(),
                max_temp: daily.temperature_2m_max[i],
                min_temp: daily.temperature_2m_min[i],
                precipitation_probability: daily
                    .precipitation_probability_max
                    .get(i)
                    .copied()
                    .flatten(),
                weather_code: daily.weather_code[i],
                weather_description: describe(daily.weather_code[i]).to_string(),
            })
            .collect();

        Ok(ForecastSet {
            location: location_name(&place, city),
            days,
            units: payload.daily_units,
        })
    }
}
