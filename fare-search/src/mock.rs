//! In-memory pricing engine and scenario files for testing without a fare
//! database.
//!
//! A [`Scenario`] is a JSON document bundling routing data, filed fares and
//! the search and diversity configuration of one request. The
//! [`FixtureEngine`] serves the filed fares as if they came from the pricing
//! rules engine.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::diversity::{DiversityConfig, DiversityPolicy, PolicyKind};
use crate::domain::{CarrierCode, DomainError, FareMarketId, Money, RoutingData, RoutingInput};
use crate::pricing::{
    FarePathValidator, PricingError, PricingUnit, PricingUnitFactory, PricingUnitPathBuilder,
    SummaryOracle, UnitFares, UnitOption,
};
use crate::search::{ConfigError, SearchConfig};

/// Pricing-unit path builder that prices units from a fixed fare table.
///
/// A unit's options are every combination of one filed fare per member
/// market, priced at the sum of their amounts. Fares must never be filed
/// below their market's lower bound, or the search loses its cheapest-first
/// guarantee.
#[derive(Debug, Default)]
pub struct FixtureEngine {
    fares: HashMap<FareMarketId, Vec<UnitOption>>,
    failing: HashSet<FareMarketId>,
    validator: Option<Arc<dyn FarePathValidator>>,
    init_calls: AtomicUsize,
}

impl FixtureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// One fare per market, filed at the market's lower bound.
    pub fn from_lower_bounds(routing: &RoutingData) -> Self {
        let mut engine = Self::new();
        for fm in routing.fare_markets() {
            engine = engine.with_fare(fm.id, format!("Y{}", fm.id.0), fm.lower_bound);
        }
        engine
    }

    /// File another fare in `market`.
    pub fn with_fare(mut self, market: FareMarketId, fare_basis: impl Into<String>, amount: Money) -> Self {
        self.fares.entry(market).or_default().push(UnitOption {
            fare_basis: fare_basis.into(),
            amount,
        });
        self
    }

    /// Replace every fare filed in `market`.
    pub fn with_fares(mut self, market: FareMarketId, fares: Vec<UnitOption>) -> Self {
        self.fares.insert(market, fares);
        self
    }

    /// Make initialisation of any unit containing `market` fail.
    pub fn failing(mut self, market: FareMarketId) -> Self {
        self.failing.insert(market);
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn FarePathValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Number of `init_pricing_unit` calls so far.
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::Relaxed)
    }
}

impl PricingUnitPathBuilder for FixtureEngine {
    fn init_pricing_unit(
        &self,
        unit: &PricingUnit,
    ) -> Result<Arc<dyn PricingUnitFactory>, PricingError> {
        self.init_calls.fetch_add(1, Ordering::Relaxed);

        let mut options = vec![UnitOption {
            fare_basis: String::new(),
            amount: Money::ZERO,
        }];
        for fm in &unit.fare_markets {
            if self.failing.contains(fm) {
                return Err(PricingError::InitFailed {
                    unit: unit.to_string(),
                    message: format!("fare rules for {} unavailable", fm),
                });
            }
            let fares = self
                .fares
                .get(fm)
                .filter(|f| !f.is_empty())
                .ok_or_else(|| PricingError::InitFailed {
                    unit: unit.to_string(),
                    message: format!("no fares filed in {}", fm),
                })?;
            options = options
                .iter()
                .flat_map(|prefix| {
                    fares.iter().map(move |fare| UnitOption {
                        fare_basis: if prefix.fare_basis.is_empty() {
                            fare.fare_basis.clone()
                        } else {
                            format!("{}/{}", prefix.fare_basis, fare.fare_basis)
                        },
                        amount: prefix.amount + fare.amount,
                    })
                })
                .collect();
        }

        Ok(Arc::new(UnitFares::new(unit.clone(), options)))
    }

    fn validator(&self) -> Option<Arc<dyn FarePathValidator>> {
        self.validator.clone()
    }
}

/// Scenario loading error.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("fare {fare_basis} in {market} is filed below the market's lower bound")]
    BelowLowerBound {
        market: FareMarketId,
        fare_basis: String,
    },
}

/// A fare filed in one market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiledFare {
    pub fare_market: FareMarketId,
    pub fare_basis: String,
    pub amount: Money,
}

/// One shopping request with everything needed to run it offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub routing: RoutingInput,

    /// Filed fares. Markets without any get one fare at their lower bound.
    #[serde(default)]
    pub fares: Vec<FiledFare>,

    /// Markets whose pricing units fail to initialise.
    #[serde(default)]
    pub failing_markets: Vec<FareMarketId>,

    /// Governing-carrier pairs whose fares never combine.
    #[serde(default)]
    pub incompatible_carriers: Vec<(CarrierCode, CarrierCode)>,

    #[serde(default)]
    pub config: SearchConfig,

    #[serde(default)]
    pub diversity: DiversityConfig,

    #[serde(default)]
    pub policy: PolicyKind,
}

impl Scenario {
    /// Loads a scenario from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        Self::from_json_str(&contents)
    }

    /// Parses a scenario and validates both of its configurations.
    pub fn from_json_str(s: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_json::from_str(s).map_err(ConfigError::from)?;
        scenario.config.validate()?;
        scenario.diversity.validate()?;
        Ok(scenario)
    }

    pub fn routing_data(&self) -> Result<RoutingData, ScenarioError> {
        Ok(RoutingData::build(self.routing.clone())?)
    }

    /// The fixture engine serving this scenario's fares over `routing`.
    pub fn engine(&self, routing: &RoutingData) -> Result<FixtureEngine, ScenarioError> {
        let mut filed: HashMap<FareMarketId, Vec<UnitOption>> = HashMap::new();
        for fare in &self.fares {
            let market = routing
                .market_ref(fare.fare_market)
                .map(|r| routing.market(r))
                .ok_or(DomainError::UnknownFareMarket(fare.fare_market))?;
            if fare.amount < market.lower_bound {
                return Err(ScenarioError::BelowLowerBound {
                    market: fare.fare_market,
                    fare_basis: fare.fare_basis.clone(),
                });
            }
            filed.entry(fare.fare_market).or_default().push(UnitOption {
                fare_basis: fare.fare_basis.clone(),
                amount: fare.amount,
            });
        }

        let mut engine = FixtureEngine::from_lower_bounds(routing);
        for (market, fares) in filed {
            engine = engine.with_fares(market, fares);
        }
        for market in &self.failing_markets {
            engine = engine.failing(*market);
        }
        Ok(engine)
    }

    pub fn oracle(&self) -> SummaryOracle {
        self.incompatible_carriers
            .iter()
            .fold(SummaryOracle::new(), |oracle, (a, b)| oracle.forbid(*a, *b))
    }

    pub fn policy(&self) -> Box<dyn DiversityPolicy> {
        self.policy.build(self.diversity.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PuShape;

    const SCENARIO: &str = r#"{
        "routing": {
            "fare_markets": [
                {"id": 1, "governing_carrier": "BA", "lower_bound": 10000},
                {"id": 2, "governing_carrier": "BA", "lower_bound": 15000}
            ],
            "legs": [
                {
                    "paths": [{"id": 1, "solution_type": "OW", "positions": [[1]]}],
                    "schedules": [{"id": 1, "carrier": "BA", "departure": "2026-06-01", "segments": 1, "duration_mins": 90}]
                },
                {
                    "paths": [{"id": 2, "solution_type": "OW", "positions": [[2]]}],
                    "schedules": [{"id": 2, "carrier": "BA", "departure": "2026-06-08", "segments": 1, "duration_mins": 95}]
                }
            ]
        },
        "fares": [
            {"fare_market": 1, "fare_basis": "QOW", "amount": 12000},
            {"fare_market": 1, "fare_basis": "YOW", "amount": 30000}
        ],
        "diversity": {"options_required": 3},
        "policy": "basic"
    }"#;

    fn unit(markets: &[u32]) -> PricingUnit {
        PricingUnit {
            shape: PuShape::RoundTrip,
            fare_markets: markets.iter().map(|m| FareMarketId(*m)).collect(),
        }
    }

    #[test]
    fn load_scenario() {
        let scenario = Scenario::from_json_str(SCENARIO).unwrap();
        assert_eq!(scenario.policy, PolicyKind::Basic);
        assert_eq!(scenario.diversity.options_required, 3);
        assert_eq!(scenario.config, SearchConfig::default());

        let routing = scenario.routing_data().unwrap();
        let engine = scenario.engine(&routing).unwrap();

        // Filed fares replace the lower-bound default
        let fm1 = engine.init_pricing_unit(&unit(&[1])).unwrap();
        let amounts: Vec<_> = fm1.options().iter().map(|o| o.amount).collect();
        assert_eq!(amounts, vec![Money::from_major(120), Money::from_major(300)]);

        let fm2 = engine.init_pricing_unit(&unit(&[2])).unwrap();
        assert_eq!(fm2.options()[0].fare_basis, "Y2");
        assert_eq!(engine.init_calls(), 2);
    }

    #[test]
    fn multi_market_units_sum_their_fares() {
        let engine = FixtureEngine::new()
            .with_fare(FareMarketId(1), "A", Money::from_major(100))
            .with_fare(FareMarketId(1), "B", Money::from_major(120))
            .with_fare(FareMarketId(2), "C", Money::from_major(50));
        let factory = engine.init_pricing_unit(&unit(&[1, 2])).unwrap();
        let options: Vec<_> = factory
            .options()
            .iter()
            .map(|o| (o.fare_basis.as_str(), o.amount.minor() / 100))
            .collect();
        assert_eq!(options, vec![("A/C", 150), ("B/C", 170)]);
    }

    #[test]
    fn failing_and_missing_markets() {
        let engine = FixtureEngine::new()
            .with_fare(FareMarketId(1), "A", Money::from_major(100))
            .failing(FareMarketId(1));
        assert!(matches!(
            engine.init_pricing_unit(&unit(&[1])),
            Err(PricingError::InitFailed { .. })
        ));

        let err = FixtureEngine::new().init_pricing_unit(&unit(&[7])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to initialise pricing unit RT[FM7]: no fares filed in FM7"
        );
    }

    #[test]
    fn fares_below_lower_bound_rejected() {
        let json = SCENARIO.replace("12000", "9000");
        let scenario = Scenario::from_json_str(&json).unwrap();
        let routing = scenario.routing_data().unwrap();
        assert!(matches!(
            scenario.engine(&routing),
            Err(ScenarioError::BelowLowerBound { .. })
        ));
    }

    #[test]
    fn invalid_scenarios() {
        assert!(matches!(
            Scenario::from_json_str("{"),
            Err(ScenarioError::Config(ConfigError::Json(_)))
        ));
        assert!(matches!(
            Scenario::from_json_file("/nonexistent/scenario.json"),
            Err(ScenarioError::Config(ConfigError::Io(_)))
        ));

        let json = SCENARIO.replace(r#""options_required": 3"#, r#""options_required": 0"#);
        assert!(matches!(
            Scenario::from_json_str(&json),
            Err(ScenarioError::Config(ConfigError::Invalid(_)))
        ));
    }
}
