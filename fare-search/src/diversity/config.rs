//! Diversity policy configuration.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{CarrierCode, Money};
use crate::search::ConfigError;

/// Fare cut-off multiplier applying while the cheapest price is at most
/// `up_to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub up_to: Money,
    pub multiplier: f64,
}

/// Share of `options_required` per diversity bucket (percent, sums to 100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketDistribution {
    /// Cheap and fast.
    pub gold: u8,
    /// Expensive and fast.
    pub luxury: u8,
    /// Cheap and slow.
    pub ugly: u8,
    /// Expensive and slow.
    pub junk: u8,
}

impl Default for BucketDistribution {
    fn default() -> Self {
        Self {
            gold: 25,
            luxury: 25,
            ugly: 25,
            junk: 25,
        }
    }
}

/// Parameters shared by every diversity policy variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityConfig {
    /// Number of solutions the request asks for.
    pub options_required: usize,

    /// Maximum solutions per carrier (and for the interline group). 0 means
    /// no limit.
    pub per_carrier_quota: usize,

    /// Per-carrier option counts overriding `per_carrier_quota`. A count of 0
    /// leaves the carrier uncapped, even when `per_carrier_quota` is set. The
    /// Basic policy also treats these carriers as preferred: it does not stop
    /// before each of them has its count.
    pub carrier_quotas: BTreeMap<CarrierCode, usize>,

    /// Explicit fare cut-off multiplier of the cheapest price.
    pub fare_cutoff_coef: Option<f64>,

    /// Cut-off multipliers by cheapest price, used without an explicit
    /// coefficient. The first range whose bound covers the cheapest price
    /// applies.
    pub cutoff_price_ranges: Vec<PriceRange>,

    /// Coefficient of the calculated fare cut-off.
    pub fare_cutoff_correction: f64,

    pub buckets: BucketDistribution,

    /// Coefficient of the travel-time separator.
    pub travel_time_separator_coef: f64,

    /// Alt-dates: solutions kept per date pair.
    pub options_per_date_pair: usize,

    /// Alt-dates: solutions kept per fare level within a date pair.
    pub options_per_fare_level: usize,

    /// Alt-dates: width of a fare level, as a percentage of the date pair's
    /// cheapest price.
    pub fare_level_band_percent: u8,

    /// Alt-dates: drop solutions priced above this multiple of the cheapest.
    pub price_jump_factor: f64,

    /// Alt-dates: as `price_jump_factor`, applied to snowmen.
    pub snowman_price_jump_factor: f64,
}

impl DiversityConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.options_required == 0 {
            return Err(ConfigError::Invalid(
                "options_required must be positive".to_string(),
            ));
        }
        let b = self.buckets;
        let total = b.gold as u32 + b.luxury as u32 + b.ugly as u32 + b.junk as u32;
        if total != 100 {
            return Err(ConfigError::Invalid(format!(
                "bucket distribution must sum to 100, got {}",
                total
            )));
        }
        if self.fare_cutoff_coef.is_some_and(|c| !c.is_finite() || c <= 0.0) {
            return Err(ConfigError::Invalid(
                "fare_cutoff_coef must be positive".to_string(),
            ));
        }
        if self.cutoff_price_ranges.iter().any(|r| !r.multiplier.is_finite() || r.multiplier <= 0.0) {
            return Err(ConfigError::Invalid(
                "cutoff price range multipliers must be positive".to_string(),
            ));
        }
        for (name, factor) in [
            ("price_jump_factor", self.price_jump_factor),
            ("snowman_price_jump_factor", self.snowman_price_jump_factor),
        ] {
            if !factor.is_finite() || factor < 1.0 {
                return Err(ConfigError::Invalid(format!("{} must be >= 1.0", name)));
            }
        }
        if self.options_per_date_pair == 0 || self.options_per_fare_level == 0 {
            return Err(ConfigError::Invalid(
                "alt-dates quotas must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Option cap for `carrier`; `None` when unlimited.
    pub fn carrier_quota(&self, carrier: Option<CarrierCode>) -> Option<usize> {
        match carrier.and_then(|c| self.carrier_quotas.get(&c)) {
            Some(&quota) => (quota > 0).then_some(quota),
            None => (self.per_carrier_quota > 0).then_some(self.per_carrier_quota),
        }
    }

    /// Target count of a bucket, rounded up.
    pub fn bucket_target(&self, percent: u8) -> usize {
        (self.options_required * percent as usize).div_ceil(100)
    }

    /// Configured cut-off multiplier for a cheapest price of `min_price`.
    pub fn cutoff_multiplier(&self, min_price: Money) -> Option<f64> {
        self.fare_cutoff_coef.or_else(|| {
            self.cutoff_price_ranges
                .iter()
                .find(|r| r.up_to >= min_price)
                .map(|r| r.multiplier)
        })
    }
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            options_required: 10,
            per_carrier_quota: 0,
            carrier_quotas: BTreeMap::new(),
            fare_cutoff_coef: None,
            cutoff_price_ranges: Vec::new(),
            fare_cutoff_correction: 1.0,
            buckets: BucketDistribution::default(),
            travel_time_separator_coef: 1.0,
            options_per_date_pair: 3,
            options_per_fare_level: 2,
            fare_level_band_percent: 10,
            price_jump_factor: 3.0,
            snowman_price_jump_factor: 3.5,
        }
    }
}
