//! Environment-driven configuration for the prediction pipeline
//!
//! Every value has a default except the model API key, which must be present
//! and plausible at startup.

use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Shortest accepted model API key
pub const MIN_API_KEY_LENGTH: usize = 20;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required variable not set
    #[error("Environment variable not found: {0}")]
    Missing(String),

    /// Variable set but unusable
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    /// Supplementary file could not be read or parsed
    #[error("Failed to load {path}: {reason}")]
    File { path: String, reason: String },
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            reason: format!("could not parse '{}'", raw),
        }),
        Err(_) => Ok(default),
    }
}

/// Settings for the chat-completion endpoint
#[derive(Clone)]
pub struct ModelClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl fmt::Debug for ModelClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ModelClientConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_MAX_TOKENS: u32 = 512;
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

    /// Build a configuration with defaults around a validated key
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        validate_api_key(&api_key)?;

        Ok(Self {
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECONDS),
        })
    }

    /// Load from `OPENAI_*` and `MODEL_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::Missing("OPENAI_API_KEY".to_string()))?;

        let mut config = Self::new(api_key.trim())?;

        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(model) = env::var("OPENAI_MODEL") {
            config.model = model;
        }
        config.max_tokens = parse_var("MODEL_MAX_TOKENS", Self::DEFAULT_MAX_TOKENS)?;
        config.timeout = Duration::from_secs(
            parse_var("MODEL_TIMEOUT_SECONDS", Self::DEFAULT_TIMEOUT_SECONDS)?,
        );

        if config.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "MODEL_TIMEOUT_SECONDS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        info!("Risk model configured: model={}, base_url={}, timeout={:?}",
            config.model, config.base_url, config.timeout);

        Ok(config)
    }
}

fn validate_api_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty() {
        return Err(ConfigError::Missing("OPENAI_API_KEY".to_string()));
    }
    if key.len() < MIN_API_KEY_LENGTH || key.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid {
            key: "OPENAI_API_KEY".to_string(),
            reason: "key is malformed".to_string(),
        });
    }
    Ok(())
}

/// Keyword set that tags a symptom when any keyword appears in a metric note
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SymptomTrigger {
    pub tag: String,
    pub keywords: Vec<String>,
}

impl SymptomTrigger {
    pub fn new(tag: &str, keywords: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// Built-in symptom keyword table
pub fn default_symptom_triggers() -> Vec<SymptomTrigger> {
    vec![
        SymptomTrigger::new("fatigue", &["fatigue", "tired"]),
        SymptomTrigger::new("frequent urination", &["frequent urination", "polyuria"]),
        SymptomTrigger::new("excessive thirst", &["thirst", "polydipsia"]),
        SymptomTrigger::new("unexplained weight loss", &["weight loss"]),
        SymptomTrigger::new("blurred vision", &["blurred vision"]),
        SymptomTrigger::new("numbness/tingling", &["numbness", "tingling"]),
        SymptomTrigger::new("chest pain", &["chest pain"]),
        SymptomTrigger::new("shortness of breath", &["shortness of breath"]),
    ]
}

/// Load a replacement trigger table from a JSON array of `{tag, keywords}`
pub fn load_symptom_triggers(path: &Path) -> Result<Vec<SymptomTrigger>, ConfigError> {
    let file_error = |reason: String| ConfigError::File {
        path: path.display().to_string(),
        reason,
    };

    let raw = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
    let triggers: Vec<SymptomTrigger> = serde_json::from_str(&raw).map_err(|e| file_error(e.to_string()))?;

    Ok(triggers
        .into_iter()
        .map(|t| SymptomTrigger {
            tag: t.tag,
            keywords: t.keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        })
        .collect())
}

/// Bounds for the metric history fed into a feature record
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationConfig {
    /// How far back to read samples
    pub window_days: i64,
    /// Upper bound on samples read per request
    pub sample_limit: usize,
    /// Raw samples echoed to the model
    pub recent_sample_count: usize,
    pub symptom_triggers: Vec<SymptomTrigger>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            sample_limit: 50,
            recent_sample_count: 10,
            symptom_triggers: default_symptom_triggers(),
        }
    }
}

impl AggregationConfig {
    /// Load from `METRIC_*`, `RECENT_SAMPLE_COUNT` and `SYMPTOM_TRIGGERS_PATH`
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let window_days = parse_var("METRIC_WINDOW_DAYS", defaults.window_days)?;
        if window_days <= 0 {
            return Err(ConfigError::Invalid {
                key: "METRIC_WINDOW_DAYS".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let symptom_triggers = match env::var("SYMPTOM_TRIGGERS_PATH") {
            Ok(path) => {
                info!("Loading symptom triggers from {}", path);
                load_symptom_triggers(Path::new(&path))?
            }
            Err(_) => defaults.symptom_triggers,
        };

        Ok(Self {
            window_days,
            sample_limit: parse_var("METRIC_SAMPLE_LIMIT", defaults.sample_limit)?,
            recent_sample_count: parse_var("RECENT_SAMPLE_COUNT", defaults.recent_sample_count)?,
            symptom_triggers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_api_key_rejected() {
        assert!(matches!(
            ModelClientConfig::new("sk-short"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(ModelClientConfig::new(""), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_valid_key_gets_defaults() {
        let config = ModelClientConfig::new("sk-test-0123456789abcdef").unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(!format!("{:?}", config).contains("0123456789"));
    }

    #[test]
    fn test_default_aggregation_bounds() {
        let config = AggregationConfig::default();
        assert_eq!(config.window_days, 30);
        assert_eq!(config.sample_limit, 50);
        assert_eq!(config.recent_sample_count, 10);
        assert_eq!(config.symptom_triggers.len(), 8);
    }

    #[test]
    fn test_load_symptom_triggers_lowercases_keywords() {
        let path = std::env::temp_dir().join(format!("triggers-{}.json", std::process::id()));
        std::fs::write(&path, r#"[{"tag": "dizziness", "keywords": ["Dizzy", "VERTIGO"]}]"#).unwrap();

        let triggers = load_symptom_triggers(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(triggers, vec![SymptomTrigger::new("dizziness", &["dizzy", "vertigo"])]);
    }
}
