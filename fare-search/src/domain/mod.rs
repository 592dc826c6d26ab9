//! Domain types for the fare search.
//!
//! This module contains the value types the search reasons about: carriers,
//! amounts, schedules, fare markets and the routing data that ties them to
//! legs. All types enforce their invariants at construction time, so code
//! that receives these types can trust their validity.

mod carrier;
mod error;
mod fare_market;
mod money;
mod routing;
mod schedule;

pub use carrier::{CarrierCode, InvalidCarrierCode};
pub use error::DomainError;
pub use fare_market::{EoeSummary, FareMarket, FareMarketId, FareTags};
pub use money::Money;
pub use routing::{
    DirectionalPath, LegData, LegIndex, LegInput, MarketRef, PathId, PathInput, RoutingData,
    RoutingInput, SolutionType,
};
pub use schedule::{DatePair, Schedule, ScheduleId};
