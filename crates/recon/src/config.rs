use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::Domain;
use crate::reference::table_specs;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    pub domain: Domain,
    pub tables: HashMap<String, TableConfig>,
    #[serde(default)]
    pub rules: RuleConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    pub file: String,
    /// Canonical column name -> header used in the source file.
    #[serde(default)]
    pub columns: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Per-domain thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// Fraction of gross pay withheld when attendance is below threshold.
    #[serde(default = "default_deduction_rate")]
    pub deduction_rate: f64,
    /// Minimum days present to avoid the deduction.
    #[serde(default = "default_attendance_threshold_days")]
    pub attendance_threshold_days: u32,
    /// Amount, in whole currency units, above which a transaction is high risk.
    #[serde(default = "default_high_risk_amount")]
    pub high_risk_amount: i64,
}

fn default_deduction_rate() -> f64 {
    0.10
}

fn default_attendance_threshold_days() -> u32 {
    20
}

fn default_high_risk_amount() -> i64 {
    100_000
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            deduction_rate: default_deduction_rate(),
            attendance_threshold_days: default_attendance_threshold_days(),
            high_risk_amount: default_high_risk_amount(),
        }
    }
}

impl RuleConfig {
    /// Deduction rate in basis points. Money math stays in integers.
    pub fn deduction_bps(&self) -> i64 {
        (self.deduction_rate * 10_000.0).round() as i64
    }

    pub fn high_risk_cents(&self) -> i64 {
        self.high_risk_amount.saturating_mul(100)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !(0.0..=1.0).contains(&self.deduction_rate) {
            return Err(ReconError::ConfigValidation(format!(
                "deduction_rate must be between 0 and 1, got {}",
                self.deduction_rate
            )));
        }
        if self.high_risk_amount < 0 {
            return Err(ReconError::ConfigValidation(format!(
                "high_risk_amount must not be negative, got {}",
                self.high_risk_amount
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Normalize + Engine + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NormalizeConfig {
    /// Keep the latest row for a repeated natural key instead of rejecting
    /// every occurrence. Exact duplicate transactions are rejected regardless.
    #[serde(default)]
    pub last_write_wins: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: default_chunk_size(),
        }
    }
}

/// Default report files for a run, relative to the config's directory.
/// `--output` and `--csv` on the command line take precedence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub csv: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        let specs = table_specs(self.domain);

        // Every required table must be configured
        for spec in specs.iter().filter(|s| s.required) {
            if !self.tables.contains_key(spec.name) {
                return Err(ReconError::ConfigValidation(format!(
                    "{} recon requires table '{}'",
                    self.domain, spec.name
                )));
            }
        }

        // No tables the domain does not read
        for table in self.tables.keys() {
            if !specs.iter().any(|s| s.name == table) {
                return Err(ReconError::ConfigValidation(format!(
                    "table '{table}' is not used by {} recon",
                    self.domain
                )));
            }
        }

        if self.engine.chunk_size == 0 {
            return Err(ReconError::ConfigValidation(
                "engine.chunk_size must be greater than 0".into(),
            ));
        }

        self.rules.validate()
    }
}

// ---------------------------------------------------------------------------
// Composite
// ---------------------------------------------------------------------------

/// Several single-domain configs run as one job.
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeConfig {
    pub name: String,
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    pub name: String,
    /// Path to a `.recon.toml`, relative to the composite config.
    pub config: String,
}

impl CompositeConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: CompositeConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.steps.is_empty() {
            return Err(ReconError::ConfigValidation(
                "composite config needs at least one step".into(),
            ));
        }
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate step name '{}'",
                    step.name
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
