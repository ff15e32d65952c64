//! Engine configuration

use crate::error::GenerationError;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine configuration
///
/// Missing keys take their defaults; unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Directory artifacts are written to
    pub storage_root: PathBuf,
    /// Soft ceiling for one generation run
    pub time_budget_ms: u64,
    /// Minimum remaining budget to start the template stage
    pub min_template_budget_ms: u64,
    /// Minimum remaining budget to start the scratch stage
    pub min_scratch_budget_ms: u64,
    /// Remove placeholders nothing bound
    pub clear_unbound_placeholders: bool,
    /// strftime format for dates bound into documents
    pub date_format: String,
    /// Templates larger than this are rejected as malformed
    pub max_template_bytes: u64,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With storage root
    #[inline]
    #[must_use]
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// With soft time budget
    #[inline]
    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With stage minimums
    #[inline]
    #[must_use]
    pub fn with_stage_minimums(mut self, template: Duration, scratch: Duration) -> Self {
        self.min_template_budget_ms = u64::try_from(template.as_millis()).unwrap_or(u64::MAX);
        self.min_scratch_budget_ms = u64::try_from(scratch.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With unbound-placeholder sweep on or off
    #[inline]
    #[must_use]
    pub fn with_clear_unbound(mut self, clear: bool) -> Self {
        self.clear_unbound_placeholders = clear;
        self
    }

    /// With date format
    #[inline]
    #[must_use]
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// With template size limit
    #[inline]
    #[must_use]
    pub fn with_max_template_bytes(mut self, max: u64) -> Self {
        self.max_template_bytes = max;
        self
    }

    #[inline]
    #[must_use]
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    #[inline]
    #[must_use]
    pub fn min_template_budget(&self) -> Duration {
        Duration::from_millis(self.min_template_budget_ms)
    }

    #[inline]
    #[must_use]
    pub fn min_scratch_budget(&self) -> Duration {
        Duration::from_millis(self.min_scratch_budget_ms)
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Returns `GenerationError::Config` on syntax errors, unknown keys or
    /// invalid values
    pub fn from_toml_str(raw: &str) -> Result<Self, GenerationError> {
        let config: Self = toml::from_str(raw).map_err(|e| GenerationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns `GenerationError::Config` if the file is unreadable or invalid
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, GenerationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GenerationError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns `GenerationError::Config` naming the first invalid value
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.time_budget_ms == 0 {
            return Err(GenerationError::Config("time_budget_ms must be positive".into()));
        }
        if self.min_template_budget_ms > self.time_budget_ms {
            return Err(GenerationError::Config(
                "min_template_budget_ms exceeds time_budget_ms".into(),
            ));
        }
        if self.max_template_bytes == 0 {
            return Err(GenerationError::Config("max_template_bytes must be positive".into()));
        }
        if self.storage_root.as_os_str().is_empty() {
            return Err(GenerationError::Config("storage_root must not be empty".into()));
        }
        if self.date_format.trim().is_empty() {
            return Err(GenerationError::Config("date_format must not be empty".into()));
        }
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(GenerationError::Config(format!(
                "date_format {:?} is not a valid strftime pattern",
                self.date_format
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./generated"),
            time_budget_ms: 30_000,
            min_template_budget_ms: 2_000,
            min_scratch_budget_ms: 500,
            clear_unbound_placeholders: true,
            date_format: "%B %d, %Y".to_string(),
            max_template_bytes: 25 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.time_budget(), Duration::from_secs(30));
        assert!(config.clear_unbound_placeholders);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            storage_root = "/var/lib/dossier"
            time_budget_ms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/var/lib/dossier"));
        assert_eq!(config.time_budget_ms, 5000);
        assert_eq!(config.date_format, "%B %d, %Y");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml_str("retries = 3").unwrap_err();
        assert!(matches!(err, GenerationError::Config(_)));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let err = EngineConfig::from_toml_str("time_budget_ms = 0").unwrap_err();
        assert!(err.to_string().contains("time_budget_ms"));
    }

    #[test]
    fn bad_date_format_is_rejected() {
        let err = EngineConfig::new().with_date_format("%Q").validate().unwrap_err();
        assert!(err.to_string().contains("strftime"));
    }

    #[test]
    fn builder_sets_fields() {
        let config = EngineConfig::new()
            .with_storage_root("/tmp/x")
            .with_time_budget(Duration::from_millis(1500))
            .with_clear_unbound(false);
        assert_eq!(config.time_budget_ms, 1500);
        assert!(!config.clear_unbound_placeholders);
    }
}
