use std::str::FromStr;

use anyhow::{Context, Result};

use crate::llm_client::LlmSettings;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    pub llm_temperature: Option<f32>,
    /// Upper bound on submitted document length, in characters.
    pub max_document_chars: usize,
    pub static_dir: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            google_api_key: require_env("GOOGLE_API_KEY")?,
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_MODEL),
            gemini_api_base: env_or("GEMINI_API_BASE", DEFAULT_API_BASE),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)?,
            llm_max_retries: parse_env("LLM_MAX_RETRIES", 3)?,
            llm_temperature: std::env::var("LLM_TEMPERATURE")
                .ok()
                .map(|v| v.parse::<f32>())
                .transpose()
                .context("LLM_TEMPERATURE must be a number")?,
            max_document_chars: parse_env("MAX_DOCUMENT_CHARS", 100_000)?,
            static_dir: env_or("STATIC_DIR", "static"),
            port: parse_env("PORT", 5000)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// Provider settings handed to the LLM client at startup.
    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            api_key: self.google_api_key.clone(),
            model: self.gemini_model.clone(),
            base_url: self.gemini_api_base.trim_end_matches('/').to_string(),
            timeout_secs: self.llm_timeout_secs,
            max_retries: self.llm_max_retries.max(1),
            temperature: self.llm_temperature,
        }
    }
}

#[cfg(test)]
impl Config {
    /// Fixed configuration for router and handler tests.
    pub fn for_tests(static_dir: &str) -> Self {
        Config {
            google_api_key: "test-key".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_api_base: "http://localhost:9999/".to_string(),
            llm_timeout_secs: 30,
            llm_max_retries: 0,
            llm_temperature: Some(0.2),
            max_document_chars: 1000,
            static_dir: static_dir.to_string(),
            port: 5000,
            rust_log: "info".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_settings_trims_trailing_slash() {
        let settings = Config::for_tests("static").llm_settings();
        assert_eq!(settings.base_url, "http://localhost:9999");
        assert_eq!(settings.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_llm_settings_always_allows_one_attempt() {
        let settings = Config::for_tests("static").llm_settings();
        assert_eq!(settings.max_retries, 1);
    }

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u64 = parse_env("CLAUSELENS_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_env_rejects_non_numeric_value() {
        std::env::set_var("CLAUSELENS_TEST_BAD_NUMBER", "abc");
        let err = parse_env::<u16>("CLAUSELENS_TEST_BAD_NUMBER", 5000).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("CLAUSELENS_TEST_BAD_NUMBER"));
        assert!(message.contains("'abc'"));
    }

    #[test]
    fn test_require_env_reports_missing_key() {
        let err = require_env("CLAUSELENS_TEST_MISSING_KEY").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Required environment variable 'CLAUSELENS_TEST_MISSING_KEY' is not set"
        );
    }
}
