//! Search configuration for the fare search.
//!
//! Every threshold the frontier and the expansion steps consult lives here.
//! The struct is built once per request and passed in by reference; nothing
//! reads thresholds from ambient state.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;

/// Configuration loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration parameters for one fare search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Overall request timeout (milliseconds).
    pub request_timeout_ms: u64,

    /// Share of the timeout after which the search hurries out, degrading
    /// to thru-only patterns (percent, 0 disables).
    pub hurry_out_percent: u8,

    /// Degrade once this many distinct outbound schedules were offered
    /// (0 disables).
    pub max_unique_outbound_schedules: usize,

    /// Degrade once this many expansions failed a gate (0 disables).
    pub max_failed_expansions: usize,

    /// Degrade once the diversity policy skipped this many nodes
    /// (0 disables). Counted independently of gate failures.
    pub max_policy_skips: usize,

    /// Stop after this many consecutive dequeues without a newly admitted
    /// solution (0 disables).
    pub max_not_used_dequeues: usize,

    /// Only produce solutions whose fare markets share a marketing carrier.
    pub online_only: bool,

    /// Whether mixed-carrier (interline) solutions are wanted.
    pub allow_interline: bool,

    /// Domestic request; switches tag rules to their domestic variants.
    pub domestic: bool,

    /// RoutedFares nodes scoring above this multiple of the cheapest admitted
    /// price are skipped once their carriers' quotas are met.
    pub routed_skip_cutoff_coef: f64,

    /// Schedule combinations offered per priced fare path.
    pub max_combinations_per_fare_path: usize,

    /// Worker threads for pricing-unit initialisation.
    pub worker_threads: usize,

    /// Pricing units initialised per fork-join batch.
    pub init_batch_size: usize,

    /// Maximum number of cached pricing units.
    pub pricing_unit_cache_capacity: u64,
}

impl SearchConfig {
    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates configuration from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hurry_out_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "hurry_out_percent must be at most 100, got {}",
                self.hurry_out_percent
            )));
        }
        if !self.routed_skip_cutoff_coef.is_finite() || self.routed_skip_cutoff_coef < 1.0 {
            return Err(ConfigError::Invalid(
                "routed_skip_cutoff_coef must be a finite value >= 1.0".to_string(),
            ));
        }
        if self.max_combinations_per_fare_path == 0 {
            return Err(ConfigError::Invalid(
                "max_combinations_per_fare_path must be positive".to_string(),
            ));
        }
        if self.worker_threads == 0 || self.init_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "worker_threads and init_batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Point in time after which the search degrades to thru-only patterns.
    pub fn hurry_deadline(&self, start: Instant) -> Option<Instant> {
        if self.hurry_out_percent == 0 {
            return None;
        }
        let ms = self.request_timeout_ms.saturating_mul(self.hurry_out_percent as u64) / 100;
        start.checked_add(Duration::from_millis(ms))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_capacity: self.pricing_unit_cache_capacity,
            worker_threads: self.worker_threads,
            batch_size: self.init_batch_size,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            hurry_out_percent: 70,
            max_unique_outbound_schedules: 200,
            max_failed_expansions: 10_000,
            max_policy_skips: 50_000,
            max_not_used_dequeues: 100_000,
            online_only: false,
            allow_interline: true,
            domestic: false,
            routed_skip_cutoff_coef: 2.0,
            max_combinations_per_fare_path: 16,
            worker_threads: 4,
            init_batch_size: 8,
            pricing_unit_cache_capacity: 10_000,
        }
    }
}
