//! Configuration Management
//!
//! Loads analysis settings and the extraction pattern table from TOML files.
//! Configuration includes:
//! - Analysis settings (evaluation window, significance threshold)
//! - Malformed date handling
//! - Report shaping preferences
//! - The ordered pattern rules and the message id ignore list

use crate::errors::AuditError;
use crate::raslog::extract::{default_rules, RuleSpec, DEFAULT_IGNORE_MESSAGE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// What the window filter does with rows whose dates did not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MalformedDatePolicy {
    /// Treat as outside the evaluation window (default)
    #[default]
    Exclude,
    /// Treat as inside the evaluation window
    Retain,
}

impl std::fmt::Display for MalformedDatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedDatePolicy::Exclude => write!(f, "exclude"),
            MalformedDatePolicy::Retain => write!(f, "retain"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub patterns: PatternConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Evaluation window, in calendar months before the collection date
    #[serde(default = "default_window_months")]
    pub window_months: u32,
    /// A monthly bucket is significant above this many occurrences
    #[serde(default = "default_threshold_count")]
    pub threshold_count: u64,
    #[serde(default)]
    pub malformed_dates: MalformedDatePolicy,
    /// Drop the chassis name column when it repeats the switch name
    #[serde(default = "default_true")]
    pub suppress_redundant_chassis: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_months: default_window_months(),
            threshold_count: default_threshold_count(),
            malformed_dates: MalformedDatePolicy::default(),
            suppress_redundant_chassis: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Regex matched against `Message_ID`; matching messages are dropped
    #[serde(default = "default_ignore_message")]
    pub ignore_message: Option<String>,
    /// Subset and order of `rules` to apply; all rules when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<Vec<String>>,
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleSpec>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            ignore_message: default_ignore_message(),
            enabled: None,
            rules: default_rules(),
        }
    }
}

fn default_window_months() -> u32 {
    6
}
fn default_threshold_count() -> u64 {
    3
}
fn default_true() -> bool {
    true
}
fn default_ignore_message() -> Option<String> {
    Some(DEFAULT_IGNORE_MESSAGE.to_string())
}

impl Config {
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config from {}", p))?;
                toml::from_str(&content).context("Failed to parse config")?
            }
            None => {
                // Try default locations - expand ~ to actual home directory
                let mut default_paths = vec![std::path::PathBuf::from("raslog-audit.toml")];
                if let Some(home) = dirs::home_dir() {
                    default_paths.push(home.join(".config/raslog-audit/config.toml"));
                }

                let mut loaded = None;
                for p in &default_paths {
                    if let Ok(content) = std::fs::read_to_string(p) {
                        tracing::debug!(path = %p.display(), "loading config");
                        loaded = Some(toml::from_str(&content).with_context(|| {
                            format!("Failed to parse config {}", p.display())
                        })?);
                        break;
                    }
                }
                loaded.unwrap_or_else(|| {
                    tracing::debug!("No config file found, using defaults");
                    Self::default()
                })
            }
        };

        // Override with environment variables
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Apply `RASLOG_AUDIT_*` overrides. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(months) = lookup("RASLOG_AUDIT_WINDOW_MONTHS") {
            if let Ok(n) = months.trim().parse::<u32>() {
                self.analysis.window_months = n;
            }
        }
        if let Some(threshold) = lookup("RASLOG_AUDIT_THRESHOLD") {
            if let Ok(n) = threshold.trim().parse::<u64>() {
                self.analysis.threshold_count = n;
            }
        }
        if let Some(policy) = lookup("RASLOG_AUDIT_MALFORMED_DATES") {
            if let Ok(p) = <MalformedDatePolicy as clap::ValueEnum>::from_str(policy.trim(), true) {
                self.analysis.malformed_dates = p;
            }
        }
    }

    /// Reject settings no pipeline run could make sense of.
    pub fn validate(&self) -> std::result::Result<(), AuditError> {
        if self.analysis.window_months == 0 {
            return Err(AuditError::Config(
                "analysis.window_months must be at least 1".to_string(),
            ));
        }
        if self.patterns.rules.is_empty() {
            return Err(AuditError::Config(
                "patterns.rules must define at least one rule".to_string(),
            ));
        }
        Ok(())
    }
}
