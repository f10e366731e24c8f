//! WeatherBot - conversational weather assistant backend
//!
//! Answers weather questions by combining Open-Meteo data with an
//! OpenAI-compatible chat model while screening every message for prompt
//! injection before it reaches the model.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod metrics;
pub mod middleware;
pub mod orchestrator;
pub mod security;
pub mod store;
pub mod telemetry;
pub mod weather;
