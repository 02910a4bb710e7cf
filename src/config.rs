use crate::errors::{AppError, AppResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "https://rm98036.administradorlinux.com.br:8443/api/v1";
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// How swallowed failures are treated by the profile resolver and the
/// dashboard aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Downgrade to onboarding or a zeroed metric and keep going.
    #[default]
    Tolerant,
    /// Return the underlying error to the caller.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DowngradeLogLevel {
    Debug,
    #[default]
    Warn,
    Error,
}

impl DowngradeLogLevel {
    pub fn log(self, source: &'static str, error: &AppError) {
        match self {
            Self::Debug => tracing::debug!(source, error = %error, "failure downgraded"),
            Self::Warn => tracing::warn!(source, error = %error, "failure downgraded"),
            Self::Error => tracing::error!(source, error = %error, "failure downgraded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub timeout_ms: u64,
    pub data_dir: PathBuf,
    pub failure_policy: FailurePolicy,
    pub downgrade_log_level: DowngradeLogLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            data_dir: PathBuf::from(".inner-health"),
            failure_policy: FailurePolicy::default(),
            downgrade_log_level: DowngradeLogLevel::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_yaml_str(raw: &str) -> AppResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }

    /// Applies `INNER_HEALTH_*` environment overrides on top of the loaded values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("INNER_HEALTH_API_URL").filter(|value| !value.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("INNER_HEALTH_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(timeout_ms) if timeout_ms > 0 => self.timeout_ms = timeout_ms,
                _ => tracing::warn!(value = %raw, "ignoring invalid INNER_HEALTH_TIMEOUT_MS"),
            }
        }
        if let Some(dir) = lookup("INNER_HEALTH_DATA_DIR").filter(|value| !value.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("state.sqlite")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}
