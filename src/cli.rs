//! Command-line interface for WeatherBot
//!
//! Provides argument parsing and subcommand handling for the weatherbot binary.

use clap::{Parser, Subcommand};

/// Conversational weather assistant backend
#[derive(Parser)]
#[command(name = "weatherbot")]
#[command(version)]
#[command(about = "Conversational weather assistant backend")]
#[command(
    long_about = "WeatherBot answers weather questions in Spanish by combining Open-Meteo \
    data with an OpenAI-compatible chat model, screening every message for prompt injection \
    before it reaches the model."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# WeatherBot Configuration
# ========================
#
# Only [server] is required; every other section falls back to the defaults
# shown here.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"
port = 3000

# ─────────────────────────────────────────────────────────────────────────────
# CONVERSATION STORE
# ─────────────────────────────────────────────────────────────────────────────

[database]
# SQLite URL; the file is created on first start
url = "sqlite://weatherbot.db"
max_connections = 5

# Exchanges serialize on the SQLite write lock. Keep this above the sum of the
# outbound timeouts below.
busy_timeout_seconds = 120

# ─────────────────────────────────────────────────────────────────────────────
# WEATHER PROVIDER (Open-Meteo, no key required)
# ─────────────────────────────────────────────────────────────────────────────

[weather]
geocoding_url = "https://geocoding-api.open-meteo.com/v1"
forecast_url = "https://api.open-meteo.com/v1"
# Language for geocoded place names
language = "es"
timeout_seconds = 10

# ─────────────────────────────────────────────────────────────────────────────
# CHAT MODEL (any OpenAI-compatible /chat/completions endpoint)
# ─────────────────────────────────────────────────────────────────────────────

[llm]
base_url = "https://api.openai.com/v1"
model = "gpt-3.5-turbo"

# The key is read from this environment variable. An inline `api_key = "..."`
# takes precedence but is never written back out.
api_key_env = "OPENAI_API_KEY"

# ─────────────────────────────────────────────────────────────────────────────
# TIMEOUTS (seconds, 1-300)
# ─────────────────────────────────────────────────────────────────────────────

[timeouts]
classification_seconds = 5   # keyword fallback on expiry
extraction_seconds = 5       # keyword fallback on expiry
generation_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# CONVERSATIONS
# ─────────────────────────────────────────────────────────────────────────────

[chat]
# Prior messages sent to the model as context (1-50)
history_window = 10
# Longest accepted user message, in characters
max_message_chars = 1000
# Conversation titles are cut to this many characters plus "..."
title_max_chars = 50

# ─────────────────────────────────────────────────────────────────────────────
# INJECTION SCREEN
# ─────────────────────────────────────────────────────────────────────────────
#
# High-risk phrases always block. Otherwise a heuristic score is summed and
# the message blocks once it reaches block_threshold:
#   - role_label_points when role labels (system:, user:...) repeat
#   - 1 per distinct trigger keyword
#   - long_message_points for long messages with many sentences

[security]
block_threshold = 4
role_label_points = 3
long_message_chars = 500
long_message_periods = 5
long_message_points = 2

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG overrides)
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}
