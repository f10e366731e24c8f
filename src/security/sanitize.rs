//! User-input normalization applied before text reaches the model
//!
//! Persistence always keeps the verbatim message; only the model sees the
//! sanitized form.

/// Maximum characters forwarded to the model (token exhaustion guard)
pub const MAX_MODEL_INPUT_CHARS: usize = 1000;

/// Result of sanitizing a user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub text: String,
    pub truncated: bool,
}

/// Strip control characters, collapse whitespace and cap the length
///
/// TAB, LF and CR survive the control-character pass but are folded into
/// single spaces by whitespace collapsing. Truncation counts characters, not
/// bytes, and appends `...`.
pub fn sanitize_user_input(raw: &str) -> Sanitized {
    let without_controls: String = raw
        .chars()
        .filter(|c| !is_stripped_control(*c))
        .collect();

    let collapsed = without_controls
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.chars().count() > MAX_MODEL_INPUT_CHARS {
        let mut text: String = collapsed.chars().take(MAX_MODEL_INPUT_CHARS).collect();
        text.push_str("...");
        tracing::warn!(
            original_chars = collapsed.chars().count(),
            max_chars = MAX_MODEL_INPUT_CHARS,
            "Message truncated before generation"
        );
        return Sanitized {
            text,
            truncated: true,
        };
    }

    Sanitized {
        text: collapsed,
        truncated: false,
    }
}

fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}')
}
