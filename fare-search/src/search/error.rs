//! Search error types.

use crate::cache::WorkerPoolError;
use crate::domain::{DomainError, LegIndex};

/// Error from fare search.
///
/// Gate failures, policy skips and pricing-unit build failures never show up
/// here; they are counted in the frontier statistics. Cancellation is not an
/// error either: it yields an aborted outcome carrying the partial result.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Required routing data is absent; no search was performed
    #[error("no routing data for the {leg} leg")]
    NoRoutingData { leg: LegIndex },

    /// The frontier emptied without admitting a single solution
    #[error("no combinable fares")]
    NoCombinableFares,

    /// Invalid search configuration
    #[error("invalid search configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    WorkerPool(#[from] WorkerPoolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SearchError::NoRoutingData {
            leg: LegIndex::Inbound,
        };
        assert_eq!(err.to_string(), "no routing data for the inbound leg");

        assert_eq!(SearchError::NoCombinableFares.to_string(), "no combinable fares");

        let err = SearchError::InvalidConfig("bad".into());
        assert_eq!(err.to_string(), "invalid search configuration: bad");

        let err: SearchError = DomainError::LegCount(3).into();
        assert_eq!(err.to_string(), "routing data must have 1 or 2 legs, found 3");
    }
}
