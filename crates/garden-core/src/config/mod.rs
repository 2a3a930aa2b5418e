//! Configuration system for the garden.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{GardenError, GardenResult};

/// Lifecycle thresholds and archive bound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Refinements needed to move from CAPTURED to REFINING.
    pub refining_threshold: u32,
    /// Refinements needed to reach MATURE and to finalize.
    pub maturity_threshold: u32,
    /// Maximum number of archived ideas retained per user.
    pub archive_capacity: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            refining_threshold: 3,
            maturity_threshold: 5,
            archive_capacity: 5,
        }
    }
}

/// Similarity thresholds used by duplicate detection and consolidation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Minimum score for a match to be reported at capture time.
    pub duplicate_scan_threshold: f64,
    /// A capture is blocked when any score is strictly greater than this.
    pub duplicate_block_threshold: f64,
    /// Minimum score for ideas to be grouped as a consolidation suggestion.
    pub consolidation_threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            duplicate_scan_threshold: 0.25,
            duplicate_block_threshold: 0.6,
            consolidation_threshold: 0.3,
        }
    }
}

/// XP rewards per lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RewardConfig {
    pub create_xp: u64,
    pub refine_xp: u64,
    pub finalize_xp: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            create_xp: 10,
            refine_xp: 5,
            finalize_xp: 50,
        }
    }
}

/// Reminder digest settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReminderConfig {
    /// Active ideas untouched for this many days need attention.
    pub stale_after_days: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            stale_after_days: 7,
        }
    }
}

/// Main garden configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GardenConfig {
    pub lifecycle: LifecycleConfig,
    pub similarity: SimilarityConfig,
    pub rewards: RewardConfig,
    pub reminders: ReminderConfig,
    /// Path to the SQLite database.
    pub db_path: PathBuf,
}

impl Default for GardenConfig {
    fn default() -> Self {
        let garden_dir = dirs::home_dir()
            .map(|h| h.join(".garden"))
            .unwrap_or_else(|| PathBuf::from(".garden"));

        Self {
            lifecycle: LifecycleConfig::default(),
            similarity: SimilarityConfig::default(),
            rewards: RewardConfig::default(),
            reminders: ReminderConfig::default(),
            db_path: garden_dir.join("garden.db"),
        }
    }
}

impl GardenConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> GardenResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| GardenError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| GardenError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| GardenError::Configuration(e.to_string()))?,
            _ => {
                return Err(GardenError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("GARDEN_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(capacity) = env_parse("GARDEN_ARCHIVE_CAPACITY") {
            config.lifecycle.archive_capacity = capacity;
        }
        if let Some(threshold) = env_parse("GARDEN_REFINING_THRESHOLD") {
            config.lifecycle.refining_threshold = threshold;
        }
        if let Some(threshold) = env_parse("GARDEN_MATURITY_THRESHOLD") {
            config.lifecycle.maturity_threshold = threshold;
        }

        config
    }

    /// Check that thresholds are consistent.
    pub fn validate(&self) -> GardenResult<()> {
        let lc = &self.lifecycle;
        if lc.refining_threshold == 0 || lc.maturity_threshold == 0 {
            return Err(GardenError::Configuration(
                "lifecycle thresholds must be greater than zero".to_string(),
            ));
        }
        if lc.refining_threshold >= lc.maturity_threshold {
            return Err(GardenError::Configuration(format!(
                "refining_threshold ({}) must be below maturity_threshold ({})",
                lc.refining_threshold, lc.maturity_threshold
            )));
        }

        let sim = &self.similarity;
        for (name, value) in [
            ("duplicate_scan_threshold", sim.duplicate_scan_threshold),
            ("duplicate_block_threshold", sim.duplicate_block_threshold),
            ("consolidation_threshold", sim.consolidation_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GardenError::Configuration(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.reminders.stale_after_days < 1 {
            return Err(GardenError::Configuration(
                "stale_after_days must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> GardenConfigBuilder {
        GardenConfigBuilder::default()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Builder for GardenConfig.
#[derive(Default)]
pub struct GardenConfigBuilder {
    config: GardenConfig,
}

impl GardenConfigBuilder {
    /// Set lifecycle configuration.
    pub fn lifecycle(mut self, config: LifecycleConfig) -> Self {
        self.config.lifecycle = config;
        self
    }

    /// Set similarity configuration.
    pub fn similarity(mut self, config: SimilarityConfig) -> Self {
        self.config.similarity = config;
        self
    }

    /// Set reward configuration.
    pub fn rewards(mut self, config: RewardConfig) -> Self {
        self.config.rewards = config;
        self
    }

    /// Set reminder configuration.
    pub fn reminders(mut self, config: ReminderConfig) -> Self {
        self.config.reminders = config;
        self
    }

    /// Set archive capacity.
    pub fn archive_capacity(mut self, capacity: usize) -> Self {
        self.config.lifecycle.archive_capacity = capacity;
        self
    }

    /// Set database path.
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_path = path.into();
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> GardenResult<GardenConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
