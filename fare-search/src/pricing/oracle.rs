//! Combinability-rule oracle.

use std::collections::HashSet;

use crate::catalog::{EoeRequirement, Pattern};
use crate::domain::{CarrierCode, FareMarket, Money};

/// Opaque combinability checks the search consults at the Route and
/// RoutedFares levels.
pub trait CombinabilityOracle {
    /// Whether fares of the bound markets may be combined under `pattern`.
    fn is_combinable(&self, pattern: &Pattern, markets: &[&FareMarket]) -> bool;

    /// Cheapest fare of `market` usable under the required end-on-end
    /// indicator, or `None` if the market has no such fare.
    fn summary_lower_bound(&self, market: &FareMarket, eoe: EoeRequirement) -> Option<Money>;
}

/// Oracle backed by the per-market end-on-end summaries plus a list of
/// governing-carrier pairs whose fares never combine.
#[derive(Debug, Clone, Default)]
pub struct SummaryOracle {
    incompatible: HashSet<(CarrierCode, CarrierCode)>,
}

impl SummaryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forbid combining fares governed by `a` with fares governed by `b`.
    pub fn forbid(mut self, a: CarrierCode, b: CarrierCode) -> Self {
        self.incompatible.insert((a.min(b), a.max(b)));
        self
    }
}

impl CombinabilityOracle for SummaryOracle {
    fn is_combinable(&self, _pattern: &Pattern, markets: &[&FareMarket]) -> bool {
        for (i, a) in markets.iter().enumerate() {
            for b in &markets[i + 1..] {
                let (x, y) = (a.governing_carrier, b.governing_carrier);
                if self.incompatible.contains(&(x.min(y), x.max(y))) {
                    return false;
                }
            }
        }
        true
    }

    fn summary_lower_bound(&self, market: &FareMarket, eoe: EoeRequirement) -> Option<Money> {
        let Some(summary) = market.eoe else {
            return Some(market.lower_bound);
        };
        let amount = match eoe {
            EoeRequirement::Any => return Some(market.lower_bound),
            EoeRequirement::Required => summary.eoe?,
            EoeRequirement::Forbidden => summary.not_eoe?,
        };
        Some(amount.max(market.lower_bound))
    }
}
