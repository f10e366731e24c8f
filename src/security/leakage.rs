//! Output leakage filter
//!
//! A reply that looks like it discloses credentials is replaced wholesale
//! with a fixed technical-error sentence.

use crate::error::{AppError, AppResult};
use regex::RegexSet;

/// Replacement text for a blocked reply
pub const LEAKAGE_REPLACEMENT: &str =
    "Lo siento, hubo un problema técnico. Por favor intenta nuevamente.";

const FORBIDDEN_PATTERNS: &[&str] = &[
    r"(?i)API\s*KEY",
    r"(?i)sk-[a-zA-Z0-9]{48}",
    r"(?i)Bearer\s+[a-zA-Z0-9]",
    r"(?i)password",
    r"(?i)secret",
    r"(?i)token",
    r"(?i)authorization",
];

/// Result of filtering a generated reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeakageVerdict {
    Clean(String),
    Blocked { pattern: &'static str },
}

impl LeakageVerdict {
    /// Text safe to return to the caller
    pub fn into_text(self) -> String {
        match self {
            Self::Clean(text) => text,
            Self::Blocked { .. } => LEAKAGE_REPLACEMENT.to_string(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

#[derive(Debug, Clone)]
pub struct LeakageFilter {
    patterns: RegexSet,
}

impl LeakageFilter {
    pub fn new() -> AppResult<Self> {
        let patterns = RegexSet::new(FORBIDDEN_PATTERNS)
            .map_err(|e| AppError::Internal(format!("invalid leakage pattern: {}", e)))?;
        Ok(Self { patterns })
    }

    pub fn filter(&self, reply: String) -> LeakageVerdict {
        match self.patterns.matches(&reply).iter().next() {
            Some(index) => {
                let pattern = FORBIDDEN_PATTERNS[index];
                tracing::error!(
                    pattern = pattern,
                    reply_length = reply.len(),
                    "Potential information leakage detected in generated reply"
                );
                LeakageVerdict::Blocked { pattern }
            }
            None => LeakageVerdict::Clean(reply),
        }
    }
}
