//! Frontier seeding: one Pattern-level node per pattern the routing data can
//! serve.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::catalog::SolutionCatalog;
use crate::domain::{LegIndex, RoutingData};

use super::config::SearchConfig;
use super::error::SearchError;
use super::frontier::Frontier;
use super::node::PartialSolution;

/// Build the initial frontier.
///
/// Every leg of the routing data must carry at least one directional path;
/// a leg without any is a precondition failure and no search is performed.
/// Patterns whose leg count differs from the request's, or whose solution
/// types have no path on some leg, are simply not seeded.
pub fn seed(
    catalog: &SolutionCatalog,
    routing: &RoutingData,
    config: &SearchConfig,
    start: Instant,
) -> Result<Frontier, SearchError> {
    let legs = &LegIndex::ALL[..routing.leg_count()];
    for leg in legs {
        if routing.leg(*leg).is_none_or(|data| data.paths().is_empty()) {
            return Err(SearchError::NoRoutingData { leg: *leg });
        }
    }

    let mut frontier = Frontier::new(config, start);
    for pattern in catalog.patterns() {
        if pattern.leg_count() != legs.len() {
            continue;
        }

        let mut candidates: [Arc<[usize]>; 2] = [Arc::from([]), Arc::from([])];
        for leg in legs {
            let paths = match (pattern.solution_type(*leg), routing.leg(*leg)) {
                (Some(t), Some(data)) => data.paths_of_type(t),
                _ => Vec::new(),
            };
            candidates[leg.index()] = Arc::from(paths);
        }

        match PartialSolution::seed(pattern, routing, candidates) {
            Some(node) => frontier.enqueue(node),
            None => trace!(pattern = pattern.name(), "No paths for pattern"),
        }
    }

    debug!(seeded = frontier.len(), patterns = catalog.len(), "Frontier seeded");
    Ok(frontier)
}
