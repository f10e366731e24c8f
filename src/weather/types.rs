//! Open-Meteo response payloads

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodingResponse {
    #[serde(default)]
    pub results: Vec<GeocodedPlace>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodedPlace {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentResponse {
    pub current: CurrentBlock,
    #[serde(default)]
    pub current_units: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentBlock {
    pub temperature_2m: f64,
    pub relative_humidity_2m: f64,
    pub apparent_temperature: f64,
    pub precipitation: f64,
    pub weather_code: i64,
    pub wind_speed_10m: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DailyResponse {
    pub daily: DailyBlock,
    #[serde(default)]
    pub daily_units: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DailyBlock {
    pub time: Vec<String>,
    pub temperature_2m_max: Vec<f64>,
    pub temperature_2m_min: Vec<f64>,
    #[serde(default)]
    pub precipitation_probability_max: Vec<Option<f64>>,
    pub weather_code: Vec<i64>,
}
