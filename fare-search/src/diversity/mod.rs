//! Diversity policies: which nodes are worth expanding and which priced
//! solutions are worth keeping.
//!
//! The frontier asks the policy for an [`Action`] on every dequeued node and
//! hands every priced schedule combination to [`DiversityPolicy::add_solution`].
//! After the loop, [`DiversityPolicy::remove_unwanted_solutions`] drops
//! solutions that later, better ones made redundant.

mod alt_dates;
mod basic;
mod config;
mod price_only;
mod set;
mod statistics;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use alt_dates::AltDates;
pub use basic::{Basic, BasicParameters, Bucket};
pub use config::{BucketDistribution, DiversityConfig, PriceRange};
pub use price_only::PriceOnly;
pub use set::SolutionSet;
pub use statistics::{GroupStats, SearchStatistics};

use crate::domain::Money;
use crate::search::{Applicability, NodeView, ScheduleCombination, Solution};

/// Verdict on a dequeued node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Use,
    Skip,
    Stop,
}

/// Quota and cut-off logic deciding what the search explores and keeps.
pub trait DiversityPolicy {
    fn action(&self, node: &NodeView) -> Action;

    /// Whether no further solution for `applicability` is wanted.
    fn is_quota_satisfied(&self, applicability: &Applicability) -> bool;

    /// Admit `solution` if it is still needed. Duplicates of an admitted
    /// schedule combination are rejected.
    fn add_solution(&mut self, solution: Solution) -> bool;

    /// Evict admitted solutions made redundant by later ones.
    fn remove_unwanted_solutions(&mut self) -> Vec<Solution>;

    fn solutions(&self) -> &SolutionSet;

    /// Hand over the admitted solutions, leaving the policy empty.
    fn take_solutions(&mut self) -> Vec<Solution>;

    fn statistics(&self) -> &SearchStatistics;
}

/// Policy variant selected by a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    PriceOnly,
    Basic,
    AltDates,
}

impl PolicyKind {
    pub fn build(self, config: DiversityConfig) -> Box<dyn DiversityPolicy> {
        match self {
            PolicyKind::PriceOnly => Box::new(PriceOnly::new(config)),
            PolicyKind::Basic => Box::new(Basic::new(config)),
            PolicyKind::AltDates => Box::new(AltDates::new(config)),
        }
    }
}

/// Whether `applicability` has reached its configured option cap.
fn cap_reached(
    config: &DiversityConfig,
    stats: &SearchStatistics,
    applicability: &Applicability,
) -> bool {
    config
        .carrier_quota(applicability.carrier())
        .is_some_and(|q| stats.count_for(applicability) >= q)
}

/// A capped group whose node already costs more than anything it holds.
fn carrier_skip(config: &DiversityConfig, stats: &SearchStatistics, node: &NodeView) -> bool {
    let Some(app) = node.applicability else {
        return false;
    };
    cap_reached(config, stats, &app)
        && stats
            .applicability(&app)
            .is_some_and(|g| node.score > g.max_price)
}

/// Evict the most expensive solutions of every group over its cap.
fn evict_over_cap(config: &DiversityConfig, set: &mut SolutionSet) -> Vec<Solution> {
    let mut by_price: Vec<(Money, ScheduleCombination, Applicability)> = set
        .iter()
        .map(|s| (s.price, s.key.clone(), s.applicability))
        .collect();
    by_price.sort();

    let mut counts = BTreeMap::new();
    let mut evicted = Vec::new();
    for (_, key, app) in by_price {
        let count = counts.entry(app).or_insert(0usize);
        *count += 1;
        if config.carrier_quota(app.carrier()).is_some_and(|q| *count > q) {
            evicted.extend(set.remove(&key));
        }
    }
    evicted
}
