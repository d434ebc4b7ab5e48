//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Root of the per-device snapshot directories.
    pub data_dir: PathBuf,
    pub allowed_origin: String,
    pub openai_api_key: Option<String>,
    pub question_model: String,
    pub summary_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub transition_settle: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server Settings ---
        let bind_address_str = var("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let data_dir = PathBuf::from(var("DATA_DIR", "./data"));
        let allowed_origin = var("ALLOWED_ORIGIN", "http://localhost:3000");

        // --- Provider Settings ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty());
        let question_model = var("QUESTION_MODEL", "gpt-4o-mini");
        let summary_model = var("SUMMARY_MODEL", "gpt-4o-mini");
        let tts_model = var("TTS_MODEL", "gpt-4o-mini-tts");
        let tts_voice = var("TTS_VOICE", "alloy");

        // --- Session Settings ---
        let settle_str = var("TRANSITION_SETTLE_MS", "300");
        let settle_ms = settle_str.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "TRANSITION_SETTLE_MS".to_string(),
                format!("'{}' is not a number of milliseconds", settle_str),
            )
        })?;

        Ok(Self {
            bind_address,
            log_level,
            data_dir,
            allowed_origin,
            openai_api_key,
            question_model,
            summary_model,
            tts_model,
            tts_voice,
            transition_settle: Duration::from_millis(settle_ms),
        })
    }

    /// The OpenAI key, required by anything that talks to the provider.
    pub fn require_openai_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))
    }
}
