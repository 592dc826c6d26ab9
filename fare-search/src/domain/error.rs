//! Domain error types.
//!
//! These errors represent malformed routing input handed to the search by
//! its data provider. They are distinct from search-time outcomes.

use super::{FareMarketId, InvalidCarrierCode, ScheduleId};

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A path or schedule refers to a fare market that was not supplied
    #[error("unknown fare market {0}")]
    UnknownFareMarket(FareMarketId),

    /// The same fare market id was supplied twice
    #[error("duplicate fare market {0}")]
    DuplicateFareMarket(FareMarketId),

    /// A fare market refers to a schedule that no leg carries
    #[error("unknown schedule {0}")]
    UnknownSchedule(ScheduleId),

    /// The same schedule id appears twice across the legs
    #[error("duplicate schedule {0}")]
    DuplicateSchedule(ScheduleId),

    /// Number of fare-market positions does not match the path's solution type
    #[error("path {path} has {found} fare-market positions, expected {expected}")]
    PathShape {
        path: u32,
        expected: usize,
        found: usize,
    },

    /// A path position has no candidate fare markets
    #[error("path {0} has an empty fare-market position")]
    EmptyPosition(u32),

    /// Routing data must cover one or two legs
    #[error("routing data must have 1 or 2 legs, found {0}")]
    LegCount(usize),

    /// A solution pattern is internally inconsistent
    #[error("invalid solution pattern {name}: {reason}")]
    PatternShape { name: String, reason: &'static str },

    #[error(transparent)]
    Carrier(#[from] InvalidCarrierCode),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::UnknownFareMarket(FareMarketId(9));
        assert_eq!(err.to_string(), "unknown fare market FM9");

        let err = DomainError::PathShape {
            path: 3,
            expected: 2,
            found: 1,
        };
        assert_eq!(
            err.to_string(),
            "path 3 has 1 fare-market positions, expected 2"
        );

        let err = DomainError::LegCount(3);
        assert_eq!(err.to_string(), "routing data must have 1 or 2 legs, found 3");

        let err = DomainError::UnknownSchedule(ScheduleId(4));
        assert_eq!(err.to_string(), "unknown schedule S4");

        let err = DomainError::PatternShape {
            name: "OW/OW".into(),
            reason: "slot used twice",
        };
        assert_eq!(
            err.to_string(),
            "invalid solution pattern OW/OW: slot used twice"
        );
    }
}
