//! Two-stage analyzer: model first, keyword heuristics on any failure

use super::{AnalysisStrategy, KeywordAnalyzer, MessageAnalyzer};
use crate::metrics::{AnalysisStage, Metrics, log_recording_failure};
use async_trait::async_trait;
use std::sync::Arc;

pub struct HybridAnalyzer {
    primary: Arc<dyn AnalysisStrategy>,
    fallback: KeywordAnalyzer,
    metrics: Arc<Metrics>,
}

impl HybridAnalyzer {
    pub fn new(
        primary: Arc<dyn AnalysisStrategy>,
        fallback: KeywordAnalyzer,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            primary,
            fallback,
            metrics,
        }
    }

    fn note_fallback(&self, stage: AnalysisStage, error: &dyn std::fmt::Display, message: &str) {
        tracing::warn!(
            stage = stage.as_str(),
            error = %error,
            message_preview = %message.chars().take(100).collect::<String>(),
            "Model-based analysis failed, using keyword fallback"
        );
        log_recording_failure("record_fallback", self.metrics.record_fallback(stage));
    }
}

#[async_trait]
impl MessageAnalyzer for HybridAnalyzer {
    async fn needs_weather_data(&self, message: &str) -> bool {
        match self.primary.classify(message).await {
            Ok(needed) => {
                tracing::debug!(needed, strategy = "llm", "Weather need classified");
                needed
            }
            Err(e) => {
                self.note_fallback(AnalysisStage::Classification, &e, message);
                let needed = self.fallback.needs_weather_data(message);
                tracing::debug!(needed, strategy = "keyword", "Weather need classified");
                needed
            }
        }
    }

    async fn extract_city(&self, message: &str) -> Option<String> {
        match self.primary.extract(message).await {
            Ok(city) => {
                tracing::debug!(city = ?city, strategy = "llm", "City extracted");
                city
            }
            Err(e) => {
                self.note_fallback(AnalysisStage::Extraction, &e, message);
                let city = self.fallback.extract_city(message);
                tracing::debug!(city = ?city, strategy = "keyword", "City extracted");
                city
            }
        }
    }
}
