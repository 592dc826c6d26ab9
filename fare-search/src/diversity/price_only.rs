//! The plain cheapest-first policy with per-carrier caps.

use tracing::debug;

use crate::search::{Applicability, NodeView, Solution};

use super::{
    Action, DiversityConfig, DiversityPolicy, SearchStatistics, SolutionSet, cap_reached,
    carrier_skip, evict_over_cap,
};

/// Keeps the `options_required` cheapest solutions, at most the configured
/// quota per carrier.
#[derive(Debug)]
pub struct PriceOnly {
    config: DiversityConfig,
    set: SolutionSet,
    stats: SearchStatistics,
}

impl PriceOnly {
    pub fn new(config: DiversityConfig) -> Self {
        Self {
            config,
            set: SolutionSet::new(),
            stats: SearchStatistics::default(),
        }
    }

    fn is_full(&self) -> bool {
        self.stats.total_options() >= self.config.options_required
    }
}

impl DiversityPolicy for PriceOnly {
    fn action(&self, node: &NodeView) -> Action {
        // Nodes come out cheapest first, so nothing later can displace an
        // admitted solution.
        if self.is_full() {
            return Action::Stop;
        }
        if carrier_skip(&self.config, &self.stats, node) {
            return Action::Skip;
        }
        Action::Use
    }

    fn is_quota_satisfied(&self, applicability: &Applicability) -> bool {
        self.is_full() || cap_reached(&self.config, &self.stats, applicability)
    }

    fn add_solution(&mut self, solution: Solution) -> bool {
        if self.is_full() || cap_reached(&self.config, &self.stats, &solution.applicability) {
            return false;
        }
        if self.set.contains(&solution.key) {
            debug!(key = %solution.key, "Duplicate solution rejected");
            return false;
        }
        self.stats.add(&solution);
        self.set.insert(solution).is_ok()
    }

    fn remove_unwanted_solutions(&mut self) -> Vec<Solution> {
        let mut evicted = evict_over_cap(&self.config, &mut self.set);

        let mut prices: Vec<_> = self.set.iter().map(|s| (s.price, s.key.clone())).collect();
        prices.sort();
        for (_, key) in prices.into_iter().skip(self.config.options_required) {
            evicted.extend(self.set.remove(&key));
        }

        self.stats = SearchStatistics::from_solutions(self.set.iter());
        evicted
    }

    fn solutions(&self) -> &SolutionSet {
        &self.set
    }

    fn take_solutions(&mut self) -> Vec<Solution> {
        self.stats = SearchStatistics::default();
        self.set.take()
    }

    fn statistics(&self) -> &SearchStatistics {
        &self.stats
    }
}
