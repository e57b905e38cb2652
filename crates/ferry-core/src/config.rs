//! Import configuration
//!
//! Read once when the orchestrator is constructed and never mutated during a
//! run. Can be built in code or loaded from a TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{FerryError, Result, RiskLevel};

const CONFIG_FILE: &str = "ferry.toml";

/// Configuration for the import pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Maximum number of records sampled for analysis
    pub max_sample_records: usize,
    /// Patterns below this confidence are discarded
    pub confidence_threshold: f64,
    /// Highest risk level a plan may carry and still be auto-applied
    pub auto_migration_risk: RiskLevel,
    /// Whether naming-convention findings are surfaced as recommendations
    pub enforce_naming: bool,
    /// Whether type bindings are generated
    pub generate_bindings: bool,
    /// Whether safety checks run
    pub run_safety_checks: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_sample_records: 100,
            confidence_threshold: 0.7,
            auto_migration_risk: RiskLevel::Low,
            enforce_naming: true,
            generate_bindings: true,
            run_safety_checks: true,
        }
    }
}

impl ImportConfig {
    /// Creates a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_sample_records(mut self, max: usize) -> Self {
        self.max_sample_records = max;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_auto_migration_risk(mut self, risk: RiskLevel) -> Self {
        self.auto_migration_risk = risk;
        self
    }

    pub fn with_naming_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_naming = enforce;
        self
    }

    pub fn with_bindings(mut self, generate: bool) -> Self {
        self.generate_bindings = generate;
        self
    }

    pub fn with_safety_checks(mut self, run: bool) -> Self {
        self.run_safety_checks = run;
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.max_sample_records == 0 {
            return Err(FerryError::Configuration(
                "max_sample_records must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(FerryError::Configuration(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ImportConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded import configuration");
        Ok(config)
    }

    /// Load from the default location, falling back to defaults if absent
    pub fn load_or_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// `<config dir>/ferry/ferry.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ferry").join(CONFIG_FILE))
}
