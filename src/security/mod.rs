//! Input screening and output filtering
//!
//! - [`SecurityScreen`] flags adversarial input before any expensive work
//! - [`sanitize`] normalizes text before it reaches the model
//! - [`LeakageFilter`] blocks credential-like text in generated replies

pub mod leakage;
pub mod sanitize;
pub mod screen;

pub use leakage::{LEAKAGE_REPLACEMENT, LeakageFilter, LeakageVerdict};
pub use sanitize::{Sanitized, sanitize_user_input};
pub use screen::{ScreenThresholds, ScreenVerdict, SecurityScreen};
