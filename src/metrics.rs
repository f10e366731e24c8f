//! Prometheus metrics for WeatherBot
//!
//! Tracks:
//! - chat exchanges by outcome
//! - weather lookups by result code
//! - analysis fallbacks by stage
//! - replies replaced by the leakage filter
//! - generation latency
//!
//! Exposed at `/metrics` in Prometheus text format. Label values come from
//! enums so cardinality stays fixed.

use crate::weather::WeatherError;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Final outcome of one chat exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Success,
    SecurityBlocked,
    GenerationFailed,
    NotFound,
    Failed,
}

impl MessageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::SecurityBlocked => "security_blocked",
            Self::GenerationFailed => "generation_failed",
            Self::NotFound => "not_found",
            Self::Failed => "failed",
        }
    }
}

/// Which analysis step fell back to keyword heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Classification,
    Extraction,
}

impl AnalysisStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Extraction => "extraction",
        }
    }
}

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    messages_total: IntCounterVec,
    weather_lookups_total: IntCounterVec,
    analysis_fallbacks_total: IntCounterVec,
    leakage_blocked_total: IntCounter,
    generation_duration: Histogram,
}

impl Metrics {
    /// Register all metrics with a fresh registry
    ///
    /// # Errors
    ///
    /// Returns an error if registration fails (duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let messages_total = IntCounterVec::new(
            Opts::new(
                "weatherbot_messages_total",
                "Chat exchanges processed, by outcome",
            ),
            &["outcome"],
        )?;

        // Cardinality: "ok" plus one series per weather error code
        let weather_lookups_total = IntCounterVec::new(
            Opts::new(
                "weatherbot_weather_lookups_total",
                "Weather provider lookups, by result code",
            ),
            &["result"],
        )?;

        let analysis_fallbacks_total = IntCounterVec::new(
            Opts::new(
                "weatherbot_analysis_fallbacks_total",
                "Times the keyword heuristics replaced the model-based analysis",
            ),
            &["stage"],
        )?;

        let leakage_blocked_total = IntCounter::with_opts(Opts::new(
            "weatherbot_leakage_blocked_total",
            "Generated replies replaced because they looked like credential leakage",
        ))?;

        let generation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "weatherbot_generation_duration_ms",
                "Reply generation latency in milliseconds",
            )
            .buckets(vec![
                50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0,
            ]),
        )?;

        registry.register(Box::new(messages_total.clone()))?;
        registry.register(Box::new(weather_lookups_total.clone()))?;
        registry.register(Box::new(analysis_fallbacks_total.clone()))?;
        registry.register(Box::new(leakage_blocked_total.clone()))?;
        registry.register(Box::new(generation_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            messages_total,
            weather_lookups_total,
            analysis_fallbacks_total,
            leakage_blocked_total,
            generation_duration,
        })
    }

    pub fn record_message(&self, outcome: MessageOutcome) -> Result<(), prometheus::Error> {
        self.messages_total
            .get_metric_with_label_values(&[outcome.as_str()])?
            .inc();
        Ok(())
    }

    pub fn record_weather_lookup(
        &self,
        result: Result<(), WeatherError>,
    ) -> Result<(), prometheus::Error> {
        let label = match result {
            Ok(()) => "ok",
            Err(err) => err.code(),
        };
        self.weather_lookups_total
            .get_metric_with_label_values(&[label])?
            .inc();
        Ok(())
    }

    pub fn record_fallback(&self, stage: AnalysisStage) -> Result<(), prometheus::Error> {
        self.analysis_fallbacks_total
            .get_metric_with_label_values(&[stage.as_str()])?
            .inc();
        Ok(())
    }

    pub fn record_leakage_blocked(&self) {
        self.leakage_blocked_total.inc();
    }

    /// Record generation latency
    ///
    /// # Errors
    ///
    /// Rejects NaN, infinite and negative values, which would corrupt the
    /// histogram's percentiles.
    pub fn record_generation_duration(&self, duration_ms: f64) -> Result<(), prometheus::Error> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {}",
                duration_ms
            )));
        }
        self.generation_duration.observe(duration_ms);
        Ok(())
    }

    /// Encode every registered metric in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    metric_family_count = metric_families.len(),
                    "Prometheus text encoder failed"
                );
                e
            })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("Metrics output is not valid UTF-8: {}", e))
        })
    }
}

/// Log a failed metrics write without failing the caller
pub(crate) fn log_recording_failure(operation: &str, result: Result<(), prometheus::Error>) {
    if let Err(e) = result {
        tracing::warn!(operation, error = %e, "Failed to record metric");
    }
}
