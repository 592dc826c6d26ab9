//! Unit tests for the lazy best-first fare search.

use super::*;
use crate::cache::PricingUnitCache;
use crate::catalog::SolutionCatalog;
use crate::diversity::tests_support::{ba, solution};
use crate::diversity::{DiversityConfig, DiversityPolicy, PriceOnly};
use crate::domain::{
    CarrierCode, FareMarket, FareMarketId, FareTags, LegIndex, LegInput, Money, PathInput,
    RoutingData, RoutingInput, Schedule, ScheduleId, SolutionType,
};
use crate::mock::FixtureEngine;
use crate::pricing::{
    DiagnosticsSink, FarePathValidator, NullSink, PricedFarePath, SummaryOracle, Validation,
    VecSink,
};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

fn carrier(s: &str) -> CarrierCode {
    CarrierCode::parse(s).unwrap()
}

fn lh() -> Applicability {
    Applicability::Online(carrier("LH"))
}

fn market(id: u32, governing: &str, lower_bound: i64) -> FareMarket {
    FareMarket {
        id: FareMarketId(id),
        governing_carrier: carrier(governing),
        marketing_carriers: vec![],
        lower_bound: Money::from_major(lower_bound),
        tags: FareTags::normal_tag1(),
        eoe: None,
        schedules: vec![],
    }
}

fn path(id: u32, solution_type: SolutionType, positions: &[&[u32]]) -> PathInput {
    PathInput {
        id,
        solution_type,
        positions: positions
            .iter()
            .map(|p| p.iter().map(|m| FareMarketId(*m)).collect())
            .collect(),
    }
}

fn schedule(id: u32, day: u32, segments: u8) -> Schedule {
    Schedule {
        id: ScheduleId(id),
        carrier: carrier("BA"),
        departure: NaiveDate::from_ymd_opt(2026, 6, day).unwrap(),
        segments,
        duration_mins: 60 * segments as u32,
    }
}

fn one_way(markets: Vec<FareMarket>, paths: Vec<PathInput>) -> RoutingData {
    RoutingData::build(RoutingInput {
        fare_markets: markets,
        legs: vec![LegInput {
            paths,
            schedules: vec![schedule(1, 1, 1)],
        }],
    })
    .unwrap()
}

fn round_trip(
    markets: Vec<FareMarket>,
    outbound: Vec<PathInput>,
    inbound: Vec<PathInput>,
) -> RoutingData {
    RoutingData::build(RoutingInput {
        fare_markets: markets,
        legs: vec![
            LegInput {
                paths: outbound,
                schedules: vec![schedule(1, 1, 1)],
            },
            LegInput {
                paths: inbound,
                schedules: vec![schedule(101, 8, 1)],
            },
        ],
    })
    .unwrap()
}

fn unlimited() -> PriceOnly {
    PriceOnly::new(DiversityConfig {
        options_required: usize::MAX,
        ..DiversityConfig::default()
    })
}

/// Collaborators of one search, owned in one place.
struct Fixture {
    catalog: SolutionCatalog,
    routing: RoutingData,
    engine: FixtureEngine,
    oracle: SummaryOracle,
    config: SearchConfig,
    cache: PricingUnitCache,
}

impl Fixture {
    fn new(routing: RoutingData) -> Self {
        let engine = FixtureEngine::from_lower_bounds(&routing);
        Self::with_engine(routing, engine)
    }

    fn with_engine(routing: RoutingData, engine: FixtureEngine) -> Self {
        let config = SearchConfig {
            max_not_used_dequeues: 0,
            ..SearchConfig::default()
        };
        Self {
            catalog: SolutionCatalog::standard(),
            routing,
            engine,
            oracle: SummaryOracle::new(),
            cache: PricingUnitCache::new(&config.cache_config()).unwrap(),
            config,
        }
    }

    fn with_config(mut self, config: SearchConfig) -> Self {
        self.cache = PricingUnitCache::new(&config.cache_config()).unwrap();
        self.config = config;
        self
    }

    fn ctx<'a>(
        &'a self,
        policy: &'a dyn DiversityPolicy,
        diagnostics: &'a mut dyn DiagnosticsSink,
    ) -> ExpandContext<'a> {
        ExpandContext {
            catalog: &self.catalog,
            routing: &self.routing,
            oracle: &self.oracle,
            builder: &self.engine,
            cache: &self.cache,
            config: &self.config,
            policy,
            diagnostics,
        }
    }

    fn search(&self) -> FareSearch<'_> {
        FareSearch::new(
            &self.catalog,
            &self.routing,
            &self.oracle,
            &self.engine,
            &self.config,
        )
        .unwrap()
    }

    fn frontier(&self) -> Frontier {
        seed(&self.catalog, &self.routing, &self.config, Instant::now()).unwrap()
    }

    /// Totals of every priced fare path, in discovery order.
    fn priced_totals(&self) -> (Vec<Money>, FrontierStats) {
        let policy = unlimited();
        let mut sink = NullSink;
        let mut frontier = self.frontier();
        let mut ctx = self.ctx(&policy, &mut sink);
        let mut totals = Vec::new();
        loop {
            match frontier.next_priced_result(&mut ctx, &AbortFlag::new()) {
                NextResult::Priced(result) => totals.push(result.total()),
                NextResult::Exhausted => break,
                other => panic!("unexpected {:?}", other),
            }
        }
        (totals, frontier.stats().clone())
    }
}

/// Adds a fixed amount to every fare path using one fare basis.
#[derive(Debug)]
struct Surcharge {
    fare_basis: &'static str,
    amount: Money,
}

impl FarePathValidator for Surcharge {
    fn validate(&self, path: &PricedFarePath) -> Validation {
        if path.fare_bases().contains(&self.fare_basis) {
            Validation::Surcharge(self.amount)
        } else {
            Validation::Valid
        }
    }
}

#[test]
fn seed_requires_paths_on_every_leg() {
    let routing = round_trip(
        vec![market(1, "BA", 100)],
        vec![path(1, SolutionType::Ow, &[&[1]])],
        vec![],
    );
    let fx = Fixture::new(routing);
    let err = seed(&fx.catalog, &fx.routing, &fx.config, Instant::now()).unwrap_err();
    assert!(matches!(
        err,
        SearchError::NoRoutingData {
            leg: LegIndex::Inbound
        }
    ));
}

#[test]
fn seed_only_patterns_with_paths() {
    let fx = Fixture::new(one_way(
        vec![market(1, "BA", 100)],
        vec![path(1, SolutionType::Ow, &[&[1]])],
    ));
    let frontier = fx.frontier();
    assert_eq!(frontier.len(), 1);
    let node = frontier.peek().unwrap();
    assert_eq!(node.level(), Level::Pattern);
    assert_eq!(node.score(), Money::from_major(100));

    let fx = Fixture::new(round_trip(
        vec![market(1, "BA", 100), market(2, "BA", 150)],
        vec![path(1, SolutionType::Ow, &[&[1]])],
        vec![path(2, SolutionType::Ow, &[&[2]])],
    ));
    assert_eq!(fx.frontier().len(), 1);
}

#[test]
fn cheapest_path_first_across_patterns() {
    let fx = Fixture::new(one_way(
        vec![market(1, "BA", 300), market(2, "BA", 90), market(3, "BA", 110)],
        vec![
            path(1, SolutionType::Ow, &[&[1]]),
            path(2, SolutionType::OwOw, &[&[2], &[3]]),
        ],
    ));
    let (totals, stats) = fx.priced_totals();
    assert_eq!(totals, vec![Money::from_major(200), Money::from_major(300)]);
    assert_eq!(stats.products, 2);
    assert_eq!(stats.failed_expansions, 0);
    assert_eq!(stats.degraded, None);
}

#[test]
fn route_binds_every_candidate_once() {
    // Two candidates per position: four routes, four fare paths
    let fx = Fixture::new(one_way(
        vec![
            market(1, "BA", 100),
            market(2, "BA", 120),
            market(3, "BA", 10),
            market(4, "BA", 15),
        ],
        vec![path(1, SolutionType::OwOw, &[&[2, 1], &[4, 3]])],
    ));
    let (totals, _) = fx.priced_totals();
    let majors: Vec<i64> = totals.iter().map(|m| m.minor() / 100).collect();
    assert_eq!(majors, vec![110, 115, 130, 135]);
}

#[test]
fn costlier_fare_path_waits_at_its_real_cost() {
    let routing = one_way(
        vec![market(1, "BA", 100), market(2, "LH", 150)],
        vec![
            path(1, SolutionType::Ow, &[&[1]]),
            path(2, SolutionType::Ow, &[&[2]]),
        ],
    );
    let engine = FixtureEngine::from_lower_bounds(&routing).with_validator(Arc::new(Surcharge {
        fare_basis: "Y1",
        amount: Money::from_major(500),
    }));
    let fx = Fixture::with_engine(routing, engine);

    let (totals, _) = fx.priced_totals();
    assert_eq!(totals, vec![Money::from_major(150), Money::from_major(600)]);
}

#[test]
fn build_failure_counts_as_gate_failure() {
    let routing = one_way(
        vec![market(1, "BA", 100)],
        vec![path(1, SolutionType::Ow, &[&[1]])],
    );
    let engine = FixtureEngine::from_lower_bounds(&routing).failing(FareMarketId(1));
    let fx = Fixture::with_engine(routing, engine);

    let policy = unlimited();
    let mut sink = VecSink::new();
    let mut frontier = fx.frontier();
    let result = frontier.next_priced_result(&mut fx.ctx(&policy, &mut sink), &AbortFlag::new());

    assert!(matches!(result, NextResult::Exhausted));
    assert_eq!(frontier.stats().failed_expansions, 1);
    assert_eq!(sink.matching("gate-failure build").count(), 1);
    // Failures are not cached, so nothing is
    assert_eq!(fx.cache.entry_count(), 0);
}

#[test]
fn online_only_rejects_mixed_carriers() {
    let routing = one_way(
        vec![market(1, "BA", 100), market(2, "LH", 100)],
        vec![path(1, SolutionType::OwOw, &[&[1], &[2]])],
    );
    let fx = Fixture::new(routing).with_config(SearchConfig {
        online_only: true,
        max_not_used_dequeues: 0,
        ..SearchConfig::default()
    });
    let (totals, stats) = fx.priced_totals();
    assert!(totals.is_empty());
    assert_eq!(stats.failed_expansions, 1);

    let err = fx
        .search()
        .run(&mut unlimited(), &AbortFlag::new(), &mut NullSink)
        .unwrap_err();
    assert!(matches!(err, SearchError::NoCombinableFares));
}

#[test]
fn shared_marketing_carrier_is_online() {
    let mut lh = market(2, "LH", 100);
    lh.marketing_carriers = vec![carrier("BA")];
    let fx = Fixture::new(one_way(
        vec![market(1, "BA", 100), lh],
        vec![path(1, SolutionType::OwOw, &[&[1], &[2]])],
    ));
    let outcome = fx
        .search()
        .run(&mut unlimited(), &AbortFlag::new(), &mut NullSink)
        .unwrap();
    assert_eq!(outcome.solutions.len(), 1);
    assert_eq!(
        outcome.solutions[0].applicability,
        Applicability::Online(carrier("BA"))
    );
}

#[test]
fn thru_only_mode_drops_local_patterns() {
    let routing = one_way(
        vec![market(1, "BA", 300), market(2, "BA", 90), market(3, "BA", 110)],
        vec![
            path(1, SolutionType::Ow, &[&[1]]),
            path(2, SolutionType::OwOw, &[&[2], &[3]]),
        ],
    );
    // A zero timeout hurries out before the first dequeue
    let fx = Fixture::new(routing).with_config(SearchConfig {
        request_timeout_ms: 0,
        hurry_out_percent: 100,
        max_not_used_dequeues: 0,
        ..SearchConfig::default()
    });
    let (totals, stats) = fx.priced_totals();
    assert_eq!(totals, vec![Money::from_major(300)]);
    assert_eq!(stats.degraded, Some(DegradeReason::HurryOut));
    assert_eq!(stats.thru_only_skips, 1);
}

#[test]
fn diagnostics_lines() {
    let fx = Fixture::new(one_way(
        vec![market(1, "BA", 100)],
        vec![path(1, SolutionType::Ow, &[&[1]])],
    ));
    let policy = unlimited();
    let mut sink = VecSink::new();
    let mut frontier = fx.frontier();
    let seeded = frontier.len();
    let result = frontier.next_priced_result(&mut fx.ctx(&policy, &mut sink), &AbortFlag::new());
    assert!(matches!(result, NextResult::Priced(_)));

    assert_eq!(sink.matching("dequeue pattern").count(), 1);
    assert_eq!(sink.matching("dequeue priced").count(), 1);
    assert_eq!(
        sink.matching("enqueue").count() + seeded,
        frontier.stats().enqueued
    );
    assert!(sink.lines.iter().all(|l| !l.starts_with("skip")));
}

#[test]
fn policy_stop_ends_the_search() {
    let fx = Fixture::new(one_way(
        vec![market(1, "BA", 100), market(2, "BA", 200)],
        vec![
            path(1, SolutionType::Ow, &[&[1]]),
            path(2, SolutionType::Ow, &[&[2]]),
        ],
    ));
    let mut policy = PriceOnly::new(DiversityConfig {
        options_required: 1,
        ..DiversityConfig::default()
    });
    let outcome = fx
        .search()
        .run(&mut policy, &AbortFlag::new(), &mut NullSink)
        .unwrap();
    assert_eq!(outcome.status, SearchStatus::Stopped(StopReason::Policy));
    assert_eq!(outcome.solutions.len(), 1);
    assert_eq!(outcome.solutions[0].price, Money::from_major(100));
}

#[test]
fn unproductive_search_stops() {
    // Every fare path prices the same single schedule, so only the first is new
    let routing = one_way(
        vec![market(1, "BA", 100)],
        vec![path(1, SolutionType::Ow, &[&[1]])],
    );
    let mut engine = FixtureEngine::new();
    for i in 0..10 {
        engine = engine.with_fare(FareMarketId(1), format!("F{}", i), Money::from_major(100 + i));
    }
    // Five dequeues reach the first fare path, one per fare path after that
    let fx = Fixture::with_engine(routing, engine).with_config(SearchConfig {
        max_not_used_dequeues: 6,
        ..SearchConfig::default()
    });

    let outcome = fx
        .search()
        .run(&mut unlimited(), &AbortFlag::new(), &mut NullSink)
        .unwrap();
    assert_eq!(outcome.status, SearchStatus::Stopped(StopReason::NotUsed));
    assert_eq!(outcome.solutions.len(), 1);
    assert!(outcome.stats.products < 10);
}

#[test]
fn offer_limits_schedule_combinations() {
    let mut restricted = market(2, "BA", 150);
    restricted.schedules = vec![ScheduleId(102), ScheduleId(103)];
    let routing = RoutingData::build(RoutingInput {
        fare_markets: vec![market(1, "BA", 100), restricted],
        legs: vec![
            LegInput {
                paths: vec![path(1, SolutionType::Ow, &[&[1]])],
                schedules: vec![schedule(1, 1, 1), schedule(2, 1, 2)],
            },
            LegInput {
                paths: vec![path(2, SolutionType::Ow, &[&[2]])],
                schedules: vec![schedule(101, 8, 1), schedule(102, 8, 1), schedule(103, 9, 2)],
            },
        ],
    })
    .unwrap();
    let fx = Fixture::new(routing).with_config(SearchConfig {
        max_combinations_per_fare_path: 3,
        ..SearchConfig::default()
    });
    let search = fx.search();
    let mut policy = unlimited();
    let mut frontier = search.seed(Instant::now()).unwrap();

    let NextResult::Priced(result) =
        search.next_priced_result(&mut frontier, &policy, &AbortFlag::new(), &mut NullSink)
    else {
        panic!("expected a priced fare path");
    };
    assert_eq!(result.total(), Money::from_major(250));

    let (offered, admitted) = search.offer(&result, &mut frontier, &mut policy);
    assert_eq!((offered, admitted), (3, 3));
    assert_eq!(frontier.unique_outbound_schedules(), 2);

    let keys: Vec<String> = policy.solutions().iter().map(|s| s.key.to_string()).collect();
    assert!(keys.contains(&"S1-S102".to_string()));
    assert!(keys.contains(&"S2-S102".to_string()));
    assert!(!keys.iter().any(|k| k.ends_with("S101")));

    // The same fare path again admits nothing new
    assert_eq!(search.offer(&result, &mut frontier, &mut policy), (3, 0));
}

#[test]
fn abort_returns_partial_outcome() {
    let fx = Fixture::new(one_way(
        vec![market(1, "BA", 100)],
        vec![path(1, SolutionType::Ow, &[&[1]])],
    ));
    let abort = AbortFlag::new();
    abort.abort();
    let outcome = fx
        .search()
        .run(&mut unlimited(), &abort, &mut NullSink)
        .unwrap();
    assert_eq!(outcome.status, SearchStatus::Aborted);
    assert!(outcome.solutions.is_empty());
    assert_eq!(outcome.stats.dequeues, 0);
}

#[test]
fn failed_expansions_switch_to_thru_only() {
    // Both routes of the cheap local path are interline and fail the carrier
    // gate; the second local path is then dropped unexpanded.
    let routing = one_way(
        vec![
            market(1, "BA", 40),
            market(2, "LH", 50),
            market(3, "LH", 55),
            market(4, "BA", 60),
            market(5, "BA", 60),
            market(6, "BA", 300),
        ],
        vec![
            path(1, SolutionType::OwOw, &[&[1], &[2, 3]]),
            path(2, SolutionType::OwOw, &[&[4], &[5]]),
            path(3, SolutionType::Ow, &[&[6]]),
        ],
    );
    let fx = Fixture::new(routing).with_config(SearchConfig {
        online_only: true,
        max_failed_expansions: 1,
        max_not_used_dequeues: 0,
        ..SearchConfig::default()
    });

    let (totals, stats) = fx.priced_totals();
    assert_eq!(totals, vec![Money::from_major(300)]);
    assert_eq!(stats.failed_expansions, 2);
    assert_eq!(stats.policy_skips, 0);
    assert_eq!(stats.degraded, Some(DegradeReason::FailedExpansions));
    assert_eq!(stats.thru_only_skips, 1);
}

/// Three BA fare markets on one thru path, plus a dearer local BA path.
fn one_carrier_routing() -> RoutingData {
    one_way(
        vec![
            market(1, "BA", 100),
            market(2, "BA", 110),
            market(3, "BA", 120),
            market(4, "BA", 100),
            market(5, "BA", 100),
        ],
        vec![
            path(1, SolutionType::Ow, &[&[1, 2, 3]]),
            path(2, SolutionType::OwOw, &[&[4], &[5]]),
        ],
    )
}

fn one_per_carrier() -> PriceOnly {
    PriceOnly::new(DiversityConfig {
        per_carrier_quota: 1,
        ..DiversityConfig::default()
    })
}

#[test]
fn routes_of_a_satisfied_carrier_are_skipped() {
    let fx = Fixture::new(one_carrier_routing());
    let mut sink = VecSink::new();
    let outcome = fx
        .search()
        .run(&mut one_per_carrier(), &AbortFlag::new(), &mut sink)
        .unwrap();

    assert_eq!(outcome.status, SearchStatus::Complete);
    assert_eq!(outcome.solutions.len(), 1);
    assert_eq!(outcome.solutions[0].price, Money::from_major(100));
    // The 110 and 120 routes and the local route
    assert_eq!(outcome.stats.policy_skips, 3);
    assert_eq!(outcome.stats.failed_expansions, 0);
    assert_eq!(outcome.stats.degraded, None);
    assert_eq!(
        sink.lines.iter().filter(|l| l.starts_with("skip route") && l.ends_with("quota met")).count(),
        3
    );
    assert_eq!(sink.matching("gate-failure").count(), 0);
}

#[test]
fn policy_skips_switch_to_thru_only() {
    // The failed-expansion cap is tighter but skips never count against it
    let fx = Fixture::new(one_carrier_routing()).with_config(SearchConfig {
        max_failed_expansions: 1,
        max_policy_skips: 1,
        max_not_used_dequeues: 0,
        ..SearchConfig::default()
    });
    let outcome = fx
        .search()
        .run(&mut one_per_carrier(), &AbortFlag::new(), &mut NullSink)
        .unwrap();

    assert_eq!(outcome.solutions.len(), 1);
    assert_eq!(outcome.stats.policy_skips, 2);
    assert_eq!(outcome.stats.failed_expansions, 0);
    assert_eq!(outcome.stats.degraded, Some(DegradeReason::PolicySkips));
    assert_eq!(outcome.stats.thru_only_skips, 1);
}

#[test]
fn routed_fares_above_cutoff_skipped_once_quota_met() {
    let fx = Fixture::new(one_way(
        vec![market(1, "BA", 300)],
        vec![path(1, SolutionType::Ow, &[&[1]])],
    ));

    // Walk down to the RoutedFares node with nothing admitted yet
    let mut frontier = fx.frontier();
    let routed = {
        let open = unlimited();
        let mut sink = NullSink;
        let mut ctx = fx.ctx(&open, &mut sink);
        loop {
            let node = frontier.dequeue().unwrap();
            if node.level() == Level::RoutedFares {
                break node;
            }
            let expansion = node.expand(&mut ctx);
            for n in expansion.same_level.into_iter().chain(expansion.child) {
                frontier.enqueue(n);
            }
        }
    };
    assert_eq!(routed.score(), Money::from_major(300));

    // BA's single slot is taken at 300 and LH sets the cheapest price at 100,
    // so the cut-off is 200 and the node does not beat BA's admitted price
    let mut policy = one_per_carrier();
    assert!(policy.add_solution(solution(1, lh(), 100)));
    assert!(policy.add_solution(solution(2, ba(), 300)));

    let mut sink = VecSink::new();
    let mut frontier = Frontier::new(&fx.config, Instant::now());
    frontier.enqueue(routed);
    let result = frontier.next_priced_result(&mut fx.ctx(&policy, &mut sink), &AbortFlag::new());

    assert!(matches!(result, NextResult::Exhausted));
    assert_eq!(frontier.stats().expansions, 1);
    assert_eq!(frontier.stats().policy_skips, 1);
    assert_eq!(frontier.stats().failed_expansions, 0);
    assert_eq!(frontier.stats().products, 0);
    assert_eq!(
        sink.lines.iter().filter(|l| l.starts_with("skip routed") && l.contains("cutoff=")).count(),
        1
    );
}

mod proptests {
    use super::*;
    use crate::diversity::PolicyKind;
    use proptest::prelude::*;

    const TYPES: [SolutionType; 6] = [
        SolutionType::Ow,
        SolutionType::Hrt,
        SolutionType::OwOw,
        SolutionType::OwHrt,
        SolutionType::HrtOw,
        SolutionType::HrtHrt,
    ];
    const CARRIERS: [&str; 3] = ["BA", "LH", "AF"];

    /// (carrier, lower bound, tag bits, extra fare above the bound)
    type RawMarket = (usize, i64, u8, Option<i64>);
    /// (solution type, two positions of market indices)
    type RawPath = (usize, Vec<Vec<usize>>);

    #[derive(Debug, Clone)]
    struct RawRouting {
        markets: Vec<RawMarket>,
        legs: Vec<(Vec<RawPath>, u32)>,
    }

    fn market_strategy() -> impl Strategy<Value = RawMarket> {
        (0..3usize, 20..400i64, 0..32u8, prop::option::of(0..150i64))
    }

    fn path_strategy() -> impl Strategy<Value = RawPath> {
        (
            0..TYPES.len(),
            prop::collection::vec(prop::collection::vec(0..6usize, 1..3), 2),
        )
    }

    fn leg_strategy() -> impl Strategy<Value = (Vec<RawPath>, u32)> {
        (prop::collection::vec(path_strategy(), 1..4), 1..3u32)
    }

    fn routing_strategy() -> impl Strategy<Value = RawRouting> {
        (
            prop::collection::vec(market_strategy(), 1..6),
            prop::collection::vec(leg_strategy(), 1..=2),
        )
            .prop_map(|(markets, legs)| RawRouting { markets, legs })
    }

    impl RawRouting {
        fn fixture(&self) -> Fixture {
            let n = self.markets.len();
            let fare_markets: Vec<FareMarket> = self
                .markets
                .iter()
                .enumerate()
                .map(|(i, (c, lb, bits, _))| FareMarket {
                    tags: FareTags {
                        tag1: bits & 1 != 0,
                        tag2: bits & 2 != 0,
                        tag3: bits & 4 != 0,
                        normal: bits & 8 != 0,
                        special: bits & 16 != 0,
                    },
                    ..market(i as u32 + 1, CARRIERS[*c], *lb)
                })
                .collect();

            let legs = self
                .legs
                .iter()
                .enumerate()
                .map(|(leg, (paths, schedules))| LegInput {
                    paths: paths
                        .iter()
                        .enumerate()
                        .map(|(p, (t, positions))| {
                            let solution_type = TYPES[*t];
                            PathInput {
                                id: (leg * 100 + p) as u32,
                                solution_type,
                                positions: positions
                                    .iter()
                                    .take(solution_type.fare_market_count())
                                    .map(|ids| {
                                        ids.iter().map(|m| FareMarketId((m % n) as u32 + 1)).collect()
                                    })
                                    .collect(),
                            }
                        })
                        .collect(),
                    schedules: (0..*schedules)
                        .map(|s| schedule(leg as u32 * 100 + s + 1, 1 + leg as u32 * 7, s as u8 + 1))
                        .collect(),
                })
                .collect();

            let routing = RoutingData::build(RoutingInput { fare_markets, legs }).unwrap();
            let mut engine = FixtureEngine::from_lower_bounds(&routing);
            for (i, (_, lb, _, extra)) in self.markets.iter().enumerate() {
                if let Some(extra) = extra {
                    engine = engine.with_fare(
                        FareMarketId(i as u32 + 1),
                        format!("X{}", i + 1),
                        Money::from_major(lb + extra),
                    );
                }
            }
            Fixture::with_engine(routing, engine)
        }
    }

    /// Expand every node in dequeue order, returning each parent's view
    /// alongside what its expansion produced.
    fn walk(fx: &Fixture) -> Vec<(NodeView, Vec<(Level, Money)>, Option<Money>)> {
        let policy = unlimited();
        let mut sink = NullSink;
        let mut frontier = fx.frontier();
        let mut ctx = fx.ctx(&policy, &mut sink);
        let mut steps = Vec::new();
        while let Some(node) = frontier.dequeue() {
            assert!(steps.len() < 1_000_000, "search did not terminate");
            let view = node.view();
            let expansion = node.expand(&mut ctx);
            let produced: Vec<(Level, Money)> = expansion
                .same_level
                .iter()
                .chain(&expansion.child)
                .map(|n| (n.level(), n.score()))
                .collect();
            let child = expansion.child.as_ref().map(|c| c.level());
            if let Some(level) = child {
                assert_eq!(Some(level), view.level.next(), "child skipped a level");
            }
            assert!(expansion.same_level.iter().all(|n| n.level() == view.level));
            let product = expansion.product.as_ref().map(|p| p.total());
            for n in expansion.same_level.into_iter().chain(expansion.child) {
                frontier.enqueue(n);
            }
            steps.push((view, produced, product));
        }
        steps
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn expansion_is_admissible(raw in routing_strategy()) {
            let fx = raw.fixture();
            for (parent, produced, product) in walk(&fx) {
                for (_, score) in &produced {
                    prop_assert!(*score >= parent.score, "{:?} scored below parent {:?}", score, parent);
                }
                if let Some(total) = product {
                    prop_assert!(total >= parent.score);
                }
            }
        }

        #[test]
        fn priced_nodes_stay_at_their_level(raw in routing_strategy()) {
            let fx = raw.fixture();
            for (parent, produced, _) in walk(&fx) {
                if parent.level == Level::PricedPath {
                    prop_assert!(produced.iter().all(|(l, _)| *l == Level::PricedPath));
                    prop_assert!(produced.len() <= 1);
                }
            }
        }

        #[test]
        fn fare_paths_come_out_cheapest_first(raw in routing_strategy()) {
            let fx = raw.fixture();
            let (totals, stats) = fx.priced_totals();
            for pair in totals.windows(2) {
                prop_assert!(pair[0] <= pair[1], "{:?} before {:?}", pair[0], pair[1]);
            }
            prop_assert_eq!(stats.products, totals.len());
        }

        #[test]
        fn admitted_solutions_are_distinct(
            raw in routing_strategy(),
            kind in prop::sample::select(vec![PolicyKind::PriceOnly, PolicyKind::Basic, PolicyKind::AltDates]),
        ) {
            let fx = raw.fixture();
            let mut policy = kind.build(DiversityConfig {
                options_required: 5,
                ..DiversityConfig::default()
            });
            match fx.search().run(policy.as_mut(), &AbortFlag::new(), &mut NullSink) {
                Ok(outcome) => {
                    let keys: HashSet<_> = outcome.solutions.iter().map(|s| s.key.clone()).collect();
                    prop_assert_eq!(keys.len(), outcome.solutions.len());
                    for pair in outcome.solutions.windows(2) {
                        prop_assert!(pair[0].price <= pair[1].price);
                    }
                }
                Err(e) => prop_assert!(matches!(e, SearchError::NoCombinableFares)),
            }
        }
    }
}
