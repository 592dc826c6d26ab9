//! Pricing units, pricing-unit paths and priced fare paths.

use std::fmt;

use crate::catalog::{Pattern, PuShape, Slot};
use crate::domain::{FareMarket, FareMarketId, Money};

use super::PricingError;

/// A pricing unit: fare markets combined under one shape. Used as the
/// pricing-unit cache key, so two routed candidates sharing a unit share its
/// initialised factory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PricingUnit {
    pub shape: PuShape,
    pub fare_markets: Vec<FareMarketId>,
}

impl fmt::Display for PricingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.shape.code())?;
        for (i, fm) in self.fare_markets.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", fm)?;
        }
        f.write_str("]")
    }
}

/// The fare markets a RoutedFares node binds, handed to the path builder.
#[derive(Debug, Clone)]
pub struct RoutedCandidate<'a> {
    pub pattern: &'a Pattern,
    /// Bound fare market per slot, in slot order.
    pub markets: Vec<(Slot, &'a FareMarket)>,
}

impl RoutedCandidate<'_> {
    pub fn market(&self, slot: Slot) -> Option<&FareMarket> {
        self.markets
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, fm)| *fm)
    }
}

/// Ordered pricing units covering a whole candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingUnitPath {
    pub units: Vec<PricingUnit>,
}

impl PricingUnitPath {
    /// Group the candidate's fare markets by the pattern's pricing units.
    pub fn from_candidate(candidate: &RoutedCandidate<'_>) -> Result<Self, PricingError> {
        let mut units = Vec::with_capacity(candidate.pattern.units().len());
        for template in candidate.pattern.units() {
            let fare_markets = template
                .slots
                .iter()
                .map(|slot| {
                    candidate
                        .market(*slot)
                        .map(|fm| fm.id)
                        .ok_or_else(|| PricingError::NoPath(candidate.pattern.name().to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            units.push(PricingUnit {
                shape: template.shape,
                fare_markets,
            });
        }
        Ok(Self { units })
    }
}

/// One sellable fare option for a pricing unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOption {
    pub fare_basis: String,
    pub amount: Money,
}

/// An initialised pricing unit: its options, cheapest first.
pub trait PricingUnitFactory: Send + Sync + fmt::Debug {
    fn unit(&self) -> &PricingUnit;

    /// Valid fare options in ascending amount order.
    fn options(&self) -> &[UnitOption];
}

/// Pricing-unit factory over a fixed option list.
#[derive(Debug, Clone)]
pub struct UnitFares {
    unit: PricingUnit,
    options: Vec<UnitOption>,
}

impl UnitFares {
    /// Sorts the options by amount, then fare basis.
    pub fn new(unit: PricingUnit, mut options: Vec<UnitOption>) -> Self {
        options.sort_by(|a, b| {
            a.amount
                .cmp(&b.amount)
                .then_with(|| a.fare_basis.cmp(&b.fare_basis))
        });
        Self { unit, options }
    }
}

impl PricingUnitFactory for UnitFares {
    fn unit(&self) -> &PricingUnit {
        &self.unit
    }

    fn options(&self) -> &[UnitOption] {
        &self.options
    }
}

/// A pricing unit with its chosen fare option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedUnit {
    pub unit: PricingUnit,
    pub option: UnitOption,
}

/// A fully priced fare path: one option per pricing unit plus any surcharge
/// the validator applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedFarePath {
    pub units: Vec<PricedUnit>,
    pub surcharge: Money,
    pub total: Money,
}

impl PricedFarePath {
    pub fn new(units: Vec<PricedUnit>) -> Self {
        let total = units.iter().map(|u| u.option.amount).sum();
        Self {
            units,
            surcharge: Money::ZERO,
            total,
        }
    }

    pub fn with_surcharge(mut self, surcharge: Money) -> Self {
        self.surcharge += surcharge;
        self.total += surcharge;
        self
    }

    pub fn fare_bases(&self) -> Vec<&str> {
        self.units
            .iter()
            .map(|u| u.option.fare_basis.as_str())
            .collect()
    }
}
