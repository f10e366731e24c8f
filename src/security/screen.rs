//! Prompt-injection screening
//!
//! Two-tier classifier run before any persistence or model call:
//!
//! 1. **High-risk patterns**: phrase-level regexes (instruction override,
//!    role spoofing, persona hijack, structural markers). Any match blocks.
//! 2. **Heuristic score**: evaluated only when no pattern matched. Points for
//!    repeated role labels, distinct instruction-trigger keywords and dense
//!    long payloads. The message blocks when the score reaches the threshold.

use crate::error::{AppError, AppResult};
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};

/// Phrase-level patterns; a single match marks the message suspicious
const HIGH_RISK_PATTERNS: &[&str] = &[
    r"(?i)\bignore\s+(all\s+)?previous\s+instructions?",
    r"(?i)\bignore\s+above",
    r"(?i)\bforget\s+(everything|all)\b",
    r"(?i)\bnew\s+(instructions?|rules?)\s*:",
    r"(?i)\bsystem\s*:",
    r"(?i)\bassistant\s*:",
    r"(?i)\buser\s*:",
    r"(?i)\brole\s*:\s*(system|assistant|user)",
    r"(?i)\bact\s+as\b",
    r"(?i)\bpretend\s+(you\s+are|to\s+be)\b",
    r"(?i)\byou\s+are\s+now\b",
    r"(?i)\bfrom\s+now\s+on\s+you\s+(are|will)\b",
    r"(?i)\boverride\s+your\s+(instructions?|role|system)",
    r"(?i)\bchange\s+your\s+(role|personality|instructions?)",
    r"(?i)\bdisregard\s+(your\s+)?(previous\s+)?instructions?",
    r"(?i)</?system>",
    r"(?i)</?assistant>",
    r"(?i)</?user>",
    r"(?i)\[SYSTEM\]",
    r"(?i)\[ASSISTANT\]",
    r"(?i)\[USER\]",
    r"(?i)\bEND\s+SYSTEM\b",
    r"(?i)\bBEGIN\s+SYSTEM\b",
];

/// Role labels counted by the heuristic tier
const ROLE_LABEL_PATTERN: &str = r"(?i)\b(system|assistant|user)\s*:";

/// Instruction-trigger keywords, one point each when present
///
/// Matched at a word start so inflections ("ignored", "roles") count while
/// embedded substrings do not. `act` must be a whole word: "actual",
/// "action" and "exactly" are everyday words.
const TRIGGER_KEYWORDS: &[(&str, &str)] = &[
    ("ignore", r"(?i)\bignore"),
    ("forget", r"(?i)\bforget"),
    ("override", r"(?i)\boverrid"),
    ("change", r"(?i)\bchang"),
    ("pretend", r"(?i)\bpretend"),
    ("act", r"(?i)\bact\b"),
    ("role", r"(?i)\brole"),
    ("system", r"(?i)\bsystem"),
];

/// Tunable scoring constants for the heuristic tier
///
/// Empirically tuned; load them from `[security]` rather than re-deriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScreenThresholds {
    /// Score at or above which a message blocks
    #[serde(default = "default_block_threshold")]
    pub block_threshold: u32,
    /// Points when role labels appear more than once
    #[serde(default = "default_role_label_points")]
    pub role_label_points: u32,
    /// Length (characters) a message must exceed to count as long
    #[serde(default = "default_long_message_chars")]
    pub long_message_chars: usize,
    /// Periods a long message must exceed to count as dense
    #[serde(default = "default_long_message_periods")]
    pub long_message_periods: usize,
    /// Points for a long, dense message
    #[serde(default = "default_long_message_points")]
    pub long_message_points: u32,
}

impl Default for ScreenThresholds {
    fn default() -> Self {
        Self {
            block_threshold: default_block_threshold(),
            role_label_points: default_role_label_points(),
            long_message_chars: default_long_message_chars(),
            long_message_periods: default_long_message_periods(),
            long_message_points: default_long_message_points(),
        }
    }
}

fn default_block_threshold() -> u32 {
    4
}

fn default_role_label_points() -> u32 {
    3
}

fn default_long_message_chars() -> usize {
    500
}

fn default_long_message_periods() -> usize {
    5
}

fn default_long_message_points() -> u32 {
    2
}

/// Outcome of screening a single message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenVerdict {
    pub suspicious: bool,
    /// Heuristic score; zero when a high-risk pattern decided the verdict
    pub score: u32,
    /// The high-risk pattern that matched, if any
    pub matched_pattern: Option<&'static str>,
}

/// Pattern/heuristic classifier for adversarial input
#[derive(Debug, Clone)]
pub struct SecurityScreen {
    high_risk: RegexSet,
    role_labels: Regex,
    keywords: Vec<Regex>,
    thresholds: ScreenThresholds,
}

impl SecurityScreen {
    /// Compile the rule sets
    ///
    /// Returns an error only if a built-in pattern fails to compile.
    pub fn new(thresholds: ScreenThresholds) -> AppResult<Self> {
        let high_risk = RegexSet::new(HIGH_RISK_PATTERNS)
            .map_err(|e| AppError::Internal(format!("invalid high-risk pattern: {}", e)))?;
        let role_labels = Regex::new(ROLE_LABEL_PATTERN)
            .map_err(|e| AppError::Internal(format!("invalid role-label pattern: {}", e)))?;
        let keywords = TRIGGER_KEYWORDS
            .iter()
            .map(|(word, pattern)| {
                Regex::new(pattern).map_err(|e| {
                    AppError::Internal(format!("invalid trigger keyword '{}': {}", word, e))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            high_risk,
            role_labels,
            keywords,
            thresholds,
        })
    }

    pub fn thresholds(&self) -> &ScreenThresholds {
        &self.thresholds
    }

    /// Returns true if the message should be rejected
    pub fn is_suspicious(&self, text: &str) -> bool {
        self.evaluate(text).suspicious
    }

    /// Screen a message and report why it was (or was not) flagged
    pub fn evaluate(&self, text: &str) -> ScreenVerdict {
        if let Some(index) = self.high_risk.matches(text).iter().next() {
            return ScreenVerdict {
                suspicious: true,
                score: 0,
                matched_pattern: Some(HIGH_RISK_PATTERNS[index]),
            };
        }

        let score = self.heuristic_score(text);
        ScreenVerdict {
            suspicious: score >= self.thresholds.block_threshold,
            score,
            matched_pattern: None,
        }
    }

    /// Heuristic tier score, independent of the high-risk tier
    pub fn heuristic_score(&self, text: &str) -> u32 {
        let mut score = 0;

        if self.role_labels.find_iter(text).count() > 1 {
            score += self.thresholds.role_label_points;
        }

        score += self
            .keywords
            .iter()
            .filter(|keyword| keyword.is_match(text))
            .count() as u32;

        let periods = text.chars().filter(|c| *c == '.').count();
        if text.chars().count() > self.thresholds.long_message_chars
            && periods > self.thresholds.long_message_periods
        {
            score += self.thresholds.long_message_points;
        }

        score
    }
}
