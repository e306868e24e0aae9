//! Engine configuration
//!
//! Every field has a default, so an empty TOML file is a valid config.
//! Values are layered: defaults, then the optional file, then `KNOT_*`
//! environment variables.

use crate::error::KnotError;
use knot_stages::{StageSettings, DEFAULT_ADVISOR_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "KNOT_";

/// Advisory model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            api_key: None,
            model: String::new(),
            max_tokens: 4096,
            temperature: 0.1,
            timeout_ms: u64::try_from(DEFAULT_ADVISOR_TIMEOUT.as_millis()).unwrap_or(15_000),
        }
    }
}

/// Pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Try the delegate orchestrator before the rule-based pipeline
    pub delegate_enabled: bool,
    pub delegate_timeout_ms: u64,
    /// Upper bound on a single stage
    pub stage_timeout_ms: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            delegate_enabled: true,
            delegate_timeout_ms: 60_000,
            stage_timeout_ms: 300_000,
        }
    }
}

/// Ingestion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub max_requests_per_minute: u32,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: 60,
        }
    }
}

/// Landscape settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandscapeConfig {
    pub merge_threshold: f64,
    /// Replaces the built-in emerging-area probes when set
    pub emerging_keywords: Option<Vec<String>>,
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        let stages = StageSettings::default();
        Self {
            merge_threshold: stages.merge_threshold,
            emerging_keywords: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnotConfig {
    pub llm: LlmConfig,
    pub orchestration: OrchestrationConfig,
    pub ingestion: IngestionConfig,
    pub landscape: LandscapeConfig,
    /// Dataset directory; the embedded demo dataset when unset
    pub data_dir: Option<PathBuf>,
}

impl KnotConfig {
    /// Load from an optional file, then apply environment overrides
    ///
    /// # Errors
    /// [`KnotError::Config`] when the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, KnotError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Parse a TOML file
    ///
    /// # Errors
    /// [`KnotError::Config`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, KnotError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KnotError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "configuration file loaded");
        Ok(config)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// [`KnotError::Config`] on invalid TOML or mistyped fields.
    pub fn from_toml_str(content: &str) -> Result<Self, KnotError> {
        toml::from_str(content).map_err(|e| KnotError::Config(e.to_string()))
    }

    /// Apply `KNOT_*` overrides read through `lookup`
    ///
    /// Unparsable values are logged and ignored.
    #[must_use]
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(enabled) = parsed(&var, "LLM_ENABLED") {
            self.llm.enabled = enabled;
        }
        if let Some(endpoint) = var("LLM_ENDPOINT") {
            self.llm.endpoint = endpoint;
        }
        if let Some(key) = var("LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(max_tokens) = parsed(&var, "LLM_MAX_TOKENS") {
            self.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = parsed(&var, "LLM_TEMPERATURE") {
            self.llm.temperature = temperature;
        }
        if let Some(timeout) = parsed(&var, "LLM_TIMEOUT_MS") {
            self.llm.timeout_ms = timeout;
        }

        if let Some(enabled) = parsed(&var, "DELEGATE_ENABLED") {
            self.orchestration.delegate_enabled = enabled;
        }
        if let Some(timeout) = parsed(&var, "DELEGATE_TIMEOUT_MS") {
            self.orchestration.delegate_timeout_ms = timeout;
        }
        if let Some(timeout) = parsed(&var, "STAGE_TIMEOUT_MS") {
            self.orchestration.stage_timeout_ms = timeout;
        }

        if let Some(limit) = parsed(&var, "MAX_REQUESTS_PER_MINUTE") {
            self.ingestion.max_requests_per_minute = limit;
        }
        if let Some(threshold) = parsed(&var, "MERGE_THRESHOLD") {
            self.landscape.merge_threshold = threshold;
        }
        if let Some(dir) = var("DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Stage tunables derived from this config
    #[must_use]
    pub fn stage_settings(&self) -> StageSettings {
        StageSettings {
            max_requests_per_minute: self.ingestion.max_requests_per_minute,
            merge_threshold: self.landscape.merge_threshold,
            emerging_keywords: self.landscape.emerging_keywords.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.orchestration.stage_timeout_ms)
    }

    #[inline]
    #[must_use]
    pub fn delegate_timeout(&self) -> Duration {
        Duration::from_millis(self.orchestration.delegate_timeout_ms)
    }

    #[inline]
    #[must_use]
    pub fn advisor_timeout(&self) -> Duration {
        Duration::from_millis(self.llm.timeout_ms)
    }
}

fn parsed<T, F>(var: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = var(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = %format!("{ENV_PREFIX}{name}"), value = %raw, "ignoring unparsable override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(KnotConfig::from_toml_str("").unwrap(), KnotConfig::default());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = KnotConfig::default();
        assert!(!config.llm.enabled);
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.llm.timeout_ms, 15_000);
        assert!(config.orchestration.delegate_enabled);
        assert_eq!(config.stage_timeout(), Duration::from_secs(300));
        assert_eq!(config.ingestion.max_requests_per_minute, 60);
        assert_eq!(config.landscape.merge_threshold, 0.15);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = KnotConfig::from_toml_str(
            r#"
            data_dir = "/srv/knot"

            [ingestion]
            max_requests_per_minute = 5

            [landscape]
            emerging_keywords = ["lidar"]
            "#,
        )
        .unwrap();
        assert_eq!(config.ingestion.max_requests_per_minute, 5);
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/knot")));
        assert_eq!(config.orchestration, OrchestrationConfig::default());

        let settings = config.stage_settings();
        assert_eq!(settings.max_requests_per_minute, 5);
        assert_eq!(settings.emerging_keywords, Some(vec!["lidar".to_string()]));
    }

    #[test]
    fn mistyped_field_is_config_error() {
        let err = KnotConfig::from_toml_str("[ingestion]\nmax_requests_per_minute = \"many\"").unwrap_err();
        assert!(matches!(err, KnotError::Config(_)));
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("KNOT_LLM_ENABLED", "true"),
            ("KNOT_LLM_MODEL", "gpt-4o"),
            ("KNOT_STAGE_TIMEOUT_MS", "250"),
            ("KNOT_MAX_REQUESTS_PER_MINUTE", "not-a-number"),
            ("KNOT_DATA_DIR", "/tmp/data"),
        ]
        .into_iter()
        .collect();
        let config = KnotConfig::default().with_env_overrides(|k| env.get(k).map(|v| (*v).to_string()));

        assert!(config.llm.enabled);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.stage_timeout(), Duration::from_millis(250));
        assert_eq!(config.ingestion.max_requests_per_minute, 60);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/data")));
    }

    #[test]
    fn file_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knot.toml");
        std::fs::write(&path, "[orchestration]\ndelegate_enabled = false\n").unwrap();
        let config = KnotConfig::from_file(&path).unwrap();
        assert!(!config.orchestration.delegate_enabled);

        let missing = KnotConfig::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, KnotError::Config(_)));
    }
}
