//! Message analysis: does a message need live weather data, and for which city
//!
//! Two-stage strategy. The model-based [`LlmAnalyzer`] answers first under a
//! short timeout; on any failure or ambiguous answer the deterministic
//! [`KeywordAnalyzer`] decides instead. [`HybridAnalyzer`] wires the two and
//! never skips the fallback.

pub mod hybrid;
pub mod keyword;
pub mod llm_based;

pub use hybrid::HybridAnalyzer;
pub use keyword::KeywordAnalyzer;
pub use llm_based::LlmAnalyzer;

use crate::llm::LlmError;
use async_trait::async_trait;

/// Infallible analysis as seen by the orchestrator
#[async_trait]
pub trait MessageAnalyzer: Send + Sync {
    async fn needs_weather_data(&self, message: &str) -> bool;

    async fn extract_city(&self, message: &str) -> Option<String>;
}

/// A primary strategy that may fail and hand over to the fallback
#[async_trait]
pub trait AnalysisStrategy: Send + Sync {
    async fn classify(&self, message: &str) -> Result<bool, AnalysisError>;

    async fn extract(&self, message: &str) -> Result<Option<String>, AnalysisError>;
}

/// Why a primary strategy produced no usable answer
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("analysis call failed: {0}")]
    Backend(#[from] LlmError),

    #[error("analysis answer was empty")]
    EmptyResponse,

    #[error("analysis answer was ambiguous: '{response}'")]
    Ambiguous { response: String },

    #[error("analysis answer too long ({chars} chars)")]
    Oversized { chars: usize },
}
