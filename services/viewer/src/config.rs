//! services/viewer/src/config.rs
//!
//! Defines the viewer's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use crate::playback::ResetPolicy;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_FALLBACK_AUDIO_PATH: &str =
    "/media/audio/narration/derivative_intuition_narration.mp3";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which narration backend the viewer uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NarrationMode {
    /// Play the pre-recorded file referenced by the content.
    File,
    /// Synthesize speech from the narrative text.
    Synthesized,
}

/// Spacing and budget of the status polling loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            max_attempts: 60,
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub poll: PollPolicy,
    pub request_timeout: Duration,
    pub log_level: Level,
    pub store_path: Option<PathBuf>,
    pub narration_mode: NarrationMode,
    pub fallback_audio_path: String,
    pub openai_api_key: Option<String>,
    pub tts_voice: String,
    pub reset_policy: ResetPolicy,
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

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Remote Service ---
        let api_base_url = lookup("API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "API_BASE_URL".to_string(),
                format!("'{}' is not an http(s) URL", api_base_url),
            ));
        }

        let defaults = PollPolicy::default();
        let interval_ms = parse_or("POLL_INTERVAL_MS", &lookup, defaults.interval.as_millis() as u64)?;
        let max_attempts = parse_or("POLL_MAX_ATTEMPTS", &lookup, defaults.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "POLL_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let timeout_secs = parse_or("REQUEST_TIMEOUT_SECS", &lookup, 30u64)?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Persisted State ---
        let store_path = lookup("STORE_PATH").map(PathBuf::from);

        // --- Narration ---
        let narration_mode = match lookup("NARRATION_MODE")
            .unwrap_or_else(|| "file".to_string())
            .to_lowercase()
            .as_str()
        {
            "file" => NarrationMode::File,
            "synthesized" => NarrationMode::Synthesized,
            other => {
                return Err(ConfigError::InvalidValue(
                    "NARRATION_MODE".to_string(),
                    format!("'{}' is not one of: file, synthesized", other),
                ))
            }
        };
        let fallback_audio_path = lookup("FALLBACK_AUDIO_PATH")
            .unwrap_or_else(|| DEFAULT_FALLBACK_AUDIO_PATH.to_string());
        let openai_api_key = lookup("OPENAI_API_KEY");
        if narration_mode == NarrationMode::Synthesized && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()));
        }
        let tts_voice = lookup("TTS_VOICE").unwrap_or_else(|| "alloy".to_string());

        let reset_policy = match lookup("RESET_POLICY")
            .unwrap_or_else(|| "retain".to_string())
            .to_lowercase()
            .as_str()
        {
            "retain" => ResetPolicy::RetainTranscript,
            "clear" => ResetPolicy::ClearTranscript,
            other => {
                return Err(ConfigError::InvalidValue(
                    "RESET_POLICY".to_string(),
                    format!("'{}' is not one of: retain, clear", other),
                ))
            }
        };

        Ok(Self {
            api_base_url,
            poll: PollPolicy {
                interval: Duration::from_millis(interval_ms),
                max_attempts,
            },
            request_timeout: Duration::from_secs(timeout_secs),
            log_level,
            store_path,
            narration_mode,
            fallback_audio_path,
            openai_api_key,
            tts_voice,
            reset_policy,
        })
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_the_observed_client() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.poll, PollPolicy::default());
        assert_eq!(config.poll.interval, Duration::from_secs(5));
        assert_eq!(config.poll.max_attempts, 60);
        assert_eq!(config.narration_mode, NarrationMode::File);
        assert_eq!(config.reset_policy, ResetPolicy::RetainTranscript);
        assert!(config.store_path.is_none());
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let config = config_from(&[("API_BASE_URL", "https://learn.example/")]).unwrap();
        assert_eq!(config.api_base_url, "https://learn.example");
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = config_from(&[("POLL_MAX_ATTEMPTS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "POLL_MAX_ATTEMPTS"));
    }

    #[test]
    fn synthesized_narration_requires_an_api_key() {
        let err = config_from(&[("NARRATION_MODE", "synthesized")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(key) if key == "OPENAI_API_KEY"));
    }

    #[test]
    fn unknown_reset_policy_is_rejected() {
        assert!(config_from(&[("RESET_POLICY", "sometimes")]).is_err());
    }
}
