//! Model-based classification and city extraction
//!
//! Short completions with strict answer formats: `SI`/`NO` for the weather
//! need, a bare city name or `NINGUNA` for extraction. Anything else is an
//! [`AnalysisError`] so the caller falls back.

use super::{AnalysisError, AnalysisStrategy};
use crate::llm::prompts::{classification_prompt, extraction_prompt};
use crate::llm::{CallProfile, ChatCompletion, ChatCompletionRequest, ChatMessage};
use crate::security::sanitize_user_input;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Longest city answer accepted, in characters
const MAX_CITY_ANSWER_CHARS: usize = 50;

pub struct LlmAnalyzer {
    client: Arc<dyn ChatCompletion>,
    classification_timeout: Duration,
    extraction_timeout: Duration,
}

impl LlmAnalyzer {
    pub fn new(
        client: Arc<dyn ChatCompletion>,
        classification_timeout: Duration,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            client,
            classification_timeout,
            extraction_timeout,
        }
    }

    async fn ask(
        &self,
        prompt: String,
        profile: CallProfile,
        timeout: Duration,
    ) -> Result<String, AnalysisError> {
        let request = ChatCompletionRequest::new(
            self.client.model(),
            vec![ChatMessage::user(prompt)],
            profile,
        );
        Ok(self.client.complete(&request, timeout).await?)
    }
}

#[async_trait]
impl AnalysisStrategy for LlmAnalyzer {
    async fn classify(&self, message: &str) -> Result<bool, AnalysisError> {
        let prompt = classification_prompt(&sanitize_user_input(message).text);
        let answer = self
            .ask(prompt, CallProfile::CLASSIFICATION, self.classification_timeout)
            .await?;
        parse_classification(&answer)
    }

    async fn extract(&self, message: &str) -> Result<Option<String>, AnalysisError> {
        let prompt = extraction_prompt(&sanitize_user_input(message).text);
        let answer = self
            .ask(prompt, CallProfile::EXTRACTION, self.extraction_timeout)
            .await?;
        parse_city(&answer)
    }
}

/// Interpret a `SI`/`NO` answer by its first word
pub fn parse_classification(answer: &str) -> Result<bool, AnalysisError> {
    let normalized = answer.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }

    let first_word = normalized
        .split(|c: char| !c.is_alphanumeric())
        .find(|word| !word.is_empty())
        .unwrap_or("");

    match first_word {
        "SI" | "SÍ" | "YES" => Ok(true),
        "NO" => Ok(false),
        _ => Err(AnalysisError::Ambiguous {
            response: answer.chars().take(100).collect(),
        }),
    }
}

/// Interpret a city answer; `NINGUNA` means no city
pub fn parse_city(answer: &str) -> Result<Option<String>, AnalysisError> {
    let city = answer
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '.' | '!' | '?' | '¿' | '¡' | '`'))
        .trim();

    if city.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    if city.to_uppercase() == "NINGUNA" {
        return Ok(None);
    }

    let chars = city.chars().count();
    if chars > MAX_CITY_ANSWER_CHARS || city.contains('\n') {
        return Err(AnalysisError::Oversized { chars });
    }

    let mut letters = city.chars();
    let capitalized = match letters.next() {
        Some(first) => first.to_uppercase().chain(letters).collect(),
        None => String::new(),
    };
    Ok(Some(capitalized))
}
