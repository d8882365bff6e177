//! Hook and translator configuration.
//! Loaded from JSON or built in code; the target language is validated
//! against a fixed allow-list before anything installs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::translate::fallback::DEFAULT_MAX_ATTEMPTS;

/// Target languages the pipeline accepts.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "ar", "de", "en", "es", "fr", "hi", "ja", "ku", "pt", "ru", "tr", "zh",
];

pub fn is_supported_language(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&code.to_ascii_lowercase().as_str())
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    UnsupportedLanguage(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::UnsupportedLanguage(code) => {
                write!(f, "unsupported language code: {code}")
            }
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Target language (ISO 639-1, from `SUPPORTED_LANGUAGES`).
    pub language: String,
    /// Source language, "auto" resolves through detection.
    pub source_language: String,
    /// Print the fixed attribution line after each captured error.
    pub show_credits: bool,
    /// Terminate the process with a non-zero status after a capture.
    pub auto_exit: bool,
    /// In-memory cache capacity.
    pub cache_capacity: usize,
    /// In-memory cache TTL in seconds; 0 disables expiry.
    pub cache_ttl_secs: u64,
    /// Fallback rounds across the engine list.
    pub retry_budget: u32,
    /// Engine names in priority order.
    pub engines: Vec<String>,
    /// Optional on-disk cache file.
    pub cache_file: Option<String>,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            language: "ar".to_string(),
            source_language: "auto".to_string(),
            show_credits: true,
            auto_exit: true,
            cache_capacity: 512,
            cache_ttl_secs: 600,
            retry_budget: DEFAULT_MAX_ATTEMPTS,
            engines: vec![
                "google".to_string(),
                "mymemory".to_string(),
                "libre".to_string(),
            ],
            cache_file: None,
        }
    }
}

impl HookConfig {
    pub fn new(language: &str) -> Result<Self, ConfigError> {
        let config = Self {
            language: language.to_string(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file, then validate.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_supported_language(&self.language) {
            return Err(ConfigError::UnsupportedLanguage(self.language.clone()));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid("cache_capacity must be > 0".into()));
        }
        if self.retry_budget == 0 {
            return Err(ConfigError::Invalid("retry_budget must be > 0".into()));
        }
        if self.engines.is_empty() {
            return Err(ConfigError::Invalid("engine list must not be empty".into()));
        }
        Ok(())
    }
}
