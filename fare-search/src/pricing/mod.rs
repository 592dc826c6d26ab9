//! Contracts of the pricing collaborators the search drives, and the default
//! lazy fare-path factory.
//!
//! The search itself never prices a fare. It asks a [`PricingUnitPathBuilder`]
//! to group bound fare markets into pricing units, to initialise each unit
//! (possibly on worker threads), and to hand back a [`FarePathFactory`] it can
//! advance one fare path at a time.

mod combination;
mod diagnostics;
mod oracle;
mod unit;

use std::sync::Arc;

pub use combination::{CombinationFactory, FarePathFactory, FarePathValidator, Validation};
pub use diagnostics::{DiagnosticsSink, NullSink, VecSink};
pub use oracle::{CombinabilityOracle, SummaryOracle};
pub use unit::{
    PricedFarePath, PricedUnit, PricingUnit, PricingUnitFactory, PricingUnitPath,
    RoutedCandidate, UnitFares, UnitOption,
};

/// Recoverable pricing failures. The search counts these like gate failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    /// No valid pricing-unit path exists for the candidate
    #[error("no valid pricing-unit path for pattern {0}")]
    NoPath(String),

    /// A pricing unit could not be initialised
    #[error("failed to initialise pricing unit {unit}: {message}")]
    InitFailed { unit: String, message: String },

    /// Some pricing units are not initialised yet
    #[error("{0} pricing unit(s) not ready")]
    NotReady(usize),
}

/// Builds pricing-unit paths and their factories for routed candidates.
///
/// `init_pricing_unit` runs on the cache's worker pool, hence `Sync`.
pub trait PricingUnitPathBuilder: Sync {
    fn build_path(&self, candidate: &RoutedCandidate<'_>) -> Result<PricingUnitPath, PricingError> {
        PricingUnitPath::from_candidate(candidate)
    }

    fn init_pricing_unit(
        &self,
        unit: &PricingUnit,
    ) -> Result<Arc<dyn PricingUnitFactory>, PricingError>;

    fn validator(&self) -> Option<Arc<dyn FarePathValidator>> {
        None
    }

    fn fare_path_factory(
        &self,
        path: &PricingUnitPath,
        units: Vec<Arc<dyn PricingUnitFactory>>,
    ) -> Box<dyn FarePathFactory> {
        Box::new(CombinationFactory::new(path.clone(), units, self.validator()))
    }
}
