//! Solutions: a priced fare path paired with concrete schedules.

use std::fmt;
use std::sync::Arc;

use crate::catalog::{PatternId, Slot};
use crate::domain::{CarrierCode, DatePair, MarketRef, Money, ScheduleId};
use crate::pricing::PricedFarePath;

/// Carrier applicability of a routed candidate.
///
/// Online solutions are flown and priced on one carrier; everything else
/// lands in a single interline group for quota purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Applicability {
    Online(CarrierCode),
    Interline,
}

impl Applicability {
    pub fn carrier(self) -> Option<CarrierCode> {
        match self {
            Applicability::Online(c) => Some(c),
            Applicability::Interline => None,
        }
    }
}

impl fmt::Display for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Applicability::Online(c) => write!(f, "{}", c),
            Applicability::Interline => f.write_str("interline"),
        }
    }
}

/// Terminal product of a PricedPath expansion.
#[derive(Debug, Clone)]
pub struct PricedResult {
    pub pattern: PatternId,
    pub markets: Vec<(Slot, MarketRef)>,
    pub applicability: Applicability,
    pub fare_path: Arc<PricedFarePath>,
}

impl PricedResult {
    pub fn total(&self) -> Money {
        self.fare_path.total
    }
}

/// Schedule ids of a solution, one per leg. Two solutions with the same
/// combination are duplicates regardless of how they were priced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleCombination(pub Vec<ScheduleId>);

impl fmt::Display for ScheduleCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{}", id)?;
        }
        Ok(())
    }
}

/// A fully priced itinerary candidate handed to the diversity policy.
#[derive(Debug, Clone)]
pub struct Solution {
    pub key: ScheduleCombination,
    pub price: Money,
    pub applicability: Applicability,
    pub date_pair: DatePair,
    /// Total elapsed flying time over all legs.
    pub duration_mins: u32,
    /// Segment count per leg.
    pub segments: Vec<u8>,
    pub pattern: PatternId,
    pub fare_path: Arc<PricedFarePath>,
}

impl Solution {
    pub fn carrier(&self) -> Option<CarrierCode> {
        self.applicability.carrier()
    }

    /// A round trip whose legs have different shapes (segment counts).
    pub fn is_snowman(&self) -> bool {
        matches!(self.segments.as_slice(), [a, b] if a != b)
    }

    pub fn is_nonstop(&self) -> bool {
        self.segments.iter().all(|s| *s <= 1)
    }
}
