//! The search driver: seeds the frontier, pulls priced fare paths in
//! cheapest-first order, turns them into schedule-level solutions for the
//! diversity policy, and finalizes the admitted set.

use std::time::Instant;

use tracing::{debug, info, trace};

use crate::cache::PricingUnitCache;
use crate::catalog::SolutionCatalog;
use crate::diversity::DiversityPolicy;
use crate::domain::{DatePair, LegIndex, MarketRef, RoutingData, Schedule};
use crate::pricing::{CombinabilityOracle, DiagnosticsSink, PricingUnitPathBuilder};

use super::config::SearchConfig;
use super::error::SearchError;
use super::frontier::{AbortFlag, Frontier, FrontierStats, NextResult, StopReason};
use super::node::ExpandContext;
use super::seed::seed;
use super::solution::{PricedResult, ScheduleCombination, Solution};

/// How a search run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// The frontier emptied.
    Complete,
    Stopped(StopReason),
    /// The abort flag was observed; solutions are the partial result.
    Aborted,
}

/// Result of a search run.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Admitted solutions, cheapest first.
    pub solutions: Vec<Solution>,

    /// Solutions admitted during the loop and evicted by the final pass.
    pub evicted: Vec<Solution>,

    pub status: SearchStatus,

    pub stats: FrontierStats,

    /// Schedule combinations offered to the diversity policy.
    pub offered: usize,
}

/// Lazy best-first fare search over one request's routing data.
pub struct FareSearch<'a> {
    catalog: &'a SolutionCatalog,
    routing: &'a RoutingData,
    oracle: &'a dyn CombinabilityOracle,
    builder: &'a dyn PricingUnitPathBuilder,
    config: &'a SearchConfig,
    cache: PricingUnitCache,
}

impl<'a> FareSearch<'a> {
    /// Create a search, starting its pricing-unit worker pool.
    pub fn new(
        catalog: &'a SolutionCatalog,
        routing: &'a RoutingData,
        oracle: &'a dyn CombinabilityOracle,
        builder: &'a dyn PricingUnitPathBuilder,
        config: &'a SearchConfig,
    ) -> Result<Self, SearchError> {
        config
            .validate()
            .map_err(|e| SearchError::InvalidConfig(e.to_string()))?;
        let cache = PricingUnitCache::new(&config.cache_config())?;
        Ok(Self {
            catalog,
            routing,
            oracle,
            builder,
            config,
            cache,
        })
    }

    pub fn cache(&self) -> &PricingUnitCache {
        &self.cache
    }

    /// Seed a frontier with one node per servable pattern.
    pub fn seed(&self, start: Instant) -> Result<Frontier, SearchError> {
        seed(self.catalog, self.routing, self.config, start)
    }

    /// Advance the frontier to its next priced fare path.
    pub fn next_priced_result(
        &self,
        frontier: &mut Frontier,
        policy: &dyn DiversityPolicy,
        abort: &AbortFlag,
        diagnostics: &mut dyn DiagnosticsSink,
    ) -> NextResult {
        let mut ctx = ExpandContext {
            catalog: self.catalog,
            routing: self.routing,
            oracle: self.oracle,
            builder: self.builder,
            cache: &self.cache,
            config: self.config,
            policy,
            diagnostics,
        };
        frontier.next_priced_result(&mut ctx, abort)
    }

    /// Offer the schedule combinations a priced fare path applies to.
    ///
    /// Returns `(offered, admitted)`. At most `max_combinations_per_fare_path`
    /// combinations are offered.
    pub fn offer(
        &self,
        result: &PricedResult,
        frontier: &mut Frontier,
        policy: &mut dyn DiversityPolicy,
    ) -> (usize, usize) {
        let per_leg: Vec<Vec<&Schedule>> = LegIndex::ALL[..self.routing.leg_count()]
            .iter()
            .map(|leg| {
                let markets: Vec<MarketRef> = result
                    .markets
                    .iter()
                    .filter(|(slot, _)| slot.leg() == *leg)
                    .map(|(_, m)| *m)
                    .collect();
                self.routing.applicable_schedules(*leg, &markets)
            })
            .collect();

        let combinations = schedule_combinations(&per_leg, self.config.max_combinations_per_fare_path);
        let offered = combinations.len();
        let mut admitted = 0;
        for schedules in combinations {
            let Some(solution) = build_solution(result, &schedules) else {
                continue;
            };
            if let Some(outbound) = schedules.first() {
                frontier.record_outbound_schedule(outbound.id);
            }
            let key = solution.key.clone();
            if policy.add_solution(solution) {
                trace!(%key, price = %result.total(), "Solution admitted");
                admitted += 1;
            }
        }
        (offered, admitted)
    }

    /// Apply the policy's final pass and return `(solutions, evicted)`, the
    /// solutions sorted by price and then schedule combination.
    pub fn finalize(policy: &mut dyn DiversityPolicy) -> (Vec<Solution>, Vec<Solution>) {
        let evicted = policy.remove_unwanted_solutions();
        let mut solutions = policy.take_solutions();
        solutions.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.key.cmp(&b.key)));
        (solutions, evicted)
    }

    /// Run the search to completion, stop or abort.
    pub fn run(
        &self,
        policy: &mut dyn DiversityPolicy,
        abort: &AbortFlag,
        diagnostics: &mut dyn DiagnosticsSink,
    ) -> Result<SearchOutcome, SearchError> {
        let start = Instant::now();
        let mut frontier = self.seed(start)?;
        let mut offered = 0;

        let status = loop {
            match self.next_priced_result(&mut frontier, &*policy, abort, &mut *diagnostics) {
                NextResult::Priced(result) => {
                    debug!(
                        pattern = result.pattern.0,
                        applicability = %result.applicability,
                        total = %result.total(),
                        "Priced fare path"
                    );
                    let (n, _) = self.offer(&result, &mut frontier, policy);
                    offered += n;
                }
                NextResult::Exhausted => break SearchStatus::Complete,
                NextResult::Stopped(reason) => break SearchStatus::Stopped(reason),
                NextResult::Aborted => break SearchStatus::Aborted,
            }
        };

        let (solutions, evicted) = Self::finalize(policy);
        let stats = frontier.stats().clone();

        info!(
            ?status,
            solutions = solutions.len(),
            evicted = evicted.len(),
            offered,
            dequeues = stats.dequeues,
            failed = stats.failed_expansions,
            skipped = stats.policy_skips,
            degraded = ?stats.degraded,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fare search finished"
        );

        if status == SearchStatus::Complete && solutions.is_empty() {
            return Err(SearchError::NoCombinableFares);
        }

        Ok(SearchOutcome {
            solutions,
            evicted,
            status,
            stats,
            offered,
        })
    }
}

/// Cartesian product of per-leg schedules, outbound-major, truncated to
/// `limit` entries.
fn schedule_combinations<'s>(per_leg: &[Vec<&'s Schedule>], limit: usize) -> Vec<Vec<&'s Schedule>> {
    let mut out: Vec<Vec<&Schedule>> = vec![Vec::new()];
    for schedules in per_leg {
        let mut next = Vec::new();
        'outer: for prefix in &out {
            for s in schedules {
                if next.len() >= limit {
                    break 'outer;
                }
                let mut combination = prefix.clone();
                combination.push(*s);
                next.push(combination);
            }
        }
        out = next;
    }
    if per_leg.is_empty() {
        out.clear();
    }
    out
}

fn build_solution(result: &PricedResult, schedules: &[&Schedule]) -> Option<Solution> {
    let outbound = schedules.first()?;
    Some(Solution {
        key: ScheduleCombination(schedules.iter().map(|s| s.id).collect()),
        price: result.total(),
        applicability: result.applicability,
        date_pair: DatePair::new(outbound.departure, schedules.get(1).map(|s| s.departure)),
        duration_mins: schedules.iter().map(|s| s.duration_mins).sum(),
        segments: schedules.iter().map(|s| s.segments).collect(),
        pattern: result.pattern,
        fare_path: result.fare_path.clone(),
    })
}
