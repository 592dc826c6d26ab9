//! Alternate-dates diversity: a few options per date pair, spread over fare
//! levels, without price jumps.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::domain::{DatePair, Money};
use crate::search::{Applicability, NodeView, ScheduleCombination, Solution};

use super::{
    Action, DiversityConfig, DiversityPolicy, SearchStatistics, SolutionSet, cap_reached,
    carrier_skip, evict_over_cap,
};

/// Keeps `options_per_date_pair` solutions per date pair and
/// `options_per_fare_level` per fare level within it.
///
/// A fare level is a band `fare_level_band_percent` of the date pair's
/// cheapest price wide. Solutions priced above `price_jump_factor` times the
/// cheapest overall (`snowman_price_jump_factor` for snowmen) are dropped.
#[derive(Debug)]
pub struct AltDates {
    config: DiversityConfig,
    set: SolutionSet,
    stats: SearchStatistics,
}

impl AltDates {
    pub fn new(config: DiversityConfig) -> Self {
        Self {
            config,
            set: SolutionSet::new(),
            stats: SearchStatistics::default(),
        }
    }

    /// Highest price a solution may have given the cheapest overall.
    fn price_limit(&self, snowman: bool, cheapest: Money) -> Money {
        let factor = if snowman {
            self.config.snowman_price_jump_factor
        } else {
            self.config.price_jump_factor
        };
        cheapest.scale(factor)
    }

    fn fare_level(&self, cheapest: Money, price: Money) -> usize {
        let width = cheapest
            .scale(self.config.fare_level_band_percent as f64 / 100.0)
            .max(Money::from_minor(1));
        ((price - cheapest).max(Money::ZERO).minor() / width.minor()) as usize
    }

    fn level_count(&self, date_pair: &DatePair, cheapest: Money, level: usize) -> usize {
        self.set
            .iter()
            .filter(|s| s.date_pair == *date_pair && self.fare_level(cheapest, s.price) == level)
            .count()
    }
}

/// Order within a date pair: cheaper first; at equal price regular
/// itineraries before snowmen, then fewer segments.
fn preference(s: &Solution) -> (Money, bool, u32, ScheduleCombination) {
    let segments: u32 = s.segments.iter().map(|n| *n as u32).sum();
    (s.price, s.is_snowman(), segments, s.key.clone())
}

impl DiversityPolicy for AltDates {
    fn action(&self, node: &NodeView) -> Action {
        if let Some(cheapest) = self.stats.min_price() {
            // Nothing above the snowman limit survives the final pass
            let limit = self.price_limit(true, cheapest).max(self.price_limit(false, cheapest));
            if node.score > limit {
                return Action::Stop;
            }
        }
        if carrier_skip(&self.config, &self.stats, node) {
            return Action::Skip;
        }
        Action::Use
    }

    fn is_quota_satisfied(&self, applicability: &Applicability) -> bool {
        cap_reached(&self.config, &self.stats, applicability)
    }

    fn add_solution(&mut self, solution: Solution) -> bool {
        if self.set.contains(&solution.key) {
            debug!(key = %solution.key, "Duplicate solution rejected");
            return false;
        }
        if cap_reached(&self.config, &self.stats, &solution.applicability) {
            return false;
        }
        if let Some(cheapest) = self.stats.min_price() {
            if solution.price > self.price_limit(solution.is_snowman(), cheapest) {
                return false;
            }
        }

        if let Some(group) = self.stats.date_pair(&solution.date_pair) {
            // Ties with the date pair's dearest option are kept for the
            // final pass to break
            let tie = solution.price == group.max_price;
            if group.count >= self.config.options_per_date_pair && !tie {
                return false;
            }
            let level = self.fare_level(group.min_price, solution.price);
            if self.level_count(&solution.date_pair, group.min_price, level)
                >= self.config.options_per_fare_level
                && !tie
            {
                return false;
            }
        }

        self.stats.add(&solution);
        self.set.insert(solution).is_ok()
    }

    fn remove_unwanted_solutions(&mut self) -> Vec<Solution> {
        let mut evicted = evict_over_cap(&self.config, &mut self.set);

        let Some(cheapest) = self.set.iter().map(|s| s.price).min() else {
            self.stats = SearchStatistics::default();
            return evicted;
        };
        let regular = self.price_limit(false, cheapest);
        let snowman = self.price_limit(true, cheapest);
        evicted.extend(self.set.retain(|s| {
            s.price <= if s.is_snowman() { snowman } else { regular }
        }));

        let mut by_date_pair: BTreeMap<DatePair, Vec<&Solution>> = BTreeMap::new();
        for s in self.set.iter() {
            by_date_pair.entry(s.date_pair).or_default().push(s);
        }
        let mut keep: HashSet<ScheduleCombination> = HashSet::new();
        for solutions in by_date_pair.values_mut() {
            solutions.sort_by_key(|s| preference(s));
            let dp_cheapest = solutions.first().map_or(Money::ZERO, |s| s.price);
            let mut levels: BTreeMap<usize, usize> = BTreeMap::new();
            let mut kept = 0;
            for s in solutions.iter() {
                let level = levels.entry(self.fare_level(dp_cheapest, s.price)).or_insert(0);
                if kept < self.config.options_per_date_pair
                    && *level < self.config.options_per_fare_level
                {
                    *level += 1;
                    kept += 1;
                    keep.insert(s.key.clone());
                }
            }
        }
        let dropped = self.set.retain(|s| keep.contains(&s.key));
        for s in &dropped {
            debug!(date_pair = %s.date_pair, key = %s.key, price = %s.price, "Solution evicted");
        }
        evicted.extend(dropped);

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
