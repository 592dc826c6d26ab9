//! PartialSolution: the four-level search node and its expansion.
//!
//! A node refines an abstract pattern into a priced fare path in four steps:
//!
//! 1. **Pattern**: one directional path per leg, chosen by a cursor over the
//!    leg's candidates (cheapest first).
//! 2. **Route**: the pattern's slots bound one by one, left to right, to a
//!    candidate fare market of the chosen path position.
//! 3. **RoutedFares**: all slots bound and the Route gates passed; carries the
//!    carrier applicability.
//! 4. **PricedPath**: a lazy fare-path factory cursor over the pricing-unit
//!    path.
//!
//! Expanding a node yields at most one *child* one level up, plus *same-level*
//! refinements (next candidate, next slot binding, or the PricedPath node
//! itself re-enqueued at its next cursor position). Every node produced has a
//! score no lower than its parent's: unfixed positions are estimated with
//! their cheapest candidate and candidate lists are sorted ascending.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cache::PricingUnitCache;
use crate::catalog::{Pattern, PatternId, SolutionCatalog, Slot};
use crate::diversity::DiversityPolicy;
use crate::domain::{CarrierCode, FareMarket, LegIndex, MarketRef, Money, RoutingData};
use crate::pricing::{
    CombinabilityOracle, DiagnosticsSink, FarePathFactory, PricedFarePath, PricingUnitPathBuilder,
    RoutedCandidate,
};

use super::config::SearchConfig;
use super::solution::{Applicability, PricedResult};

/// Refinement level of a node. Ordered Pattern < Route < RoutedFares < PricedPath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Pattern,
    Route,
    RoutedFares,
    PricedPath,
}

impl Level {
    pub fn next(self) -> Option<Level> {
        match self {
            Level::Pattern => Some(Level::Route),
            Level::Route => Some(Level::RoutedFares),
            Level::RoutedFares => Some(Level::PricedPath),
            Level::PricedPath => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Pattern => "pattern",
            Level::Route => "route",
            Level::RoutedFares => "routed",
            Level::PricedPath => "priced",
        };
        f.write_str(s)
    }
}

/// Validation gate that rejected an expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Pattern tag rule (Route level).
    Tag,
    /// Combinability oracle (Route level).
    Combinability,
    /// Online/interline carrier feasibility (Route level).
    Carrier,
    /// End-on-end summary (RoutedFares level).
    Eoe,
    /// Pricing-unit path or factory construction (RoutedFares level).
    Build,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Gate::Tag => "tag",
            Gate::Combinability => "combinability",
            Gate::Carrier => "carrier",
            Gate::Eoe => "eoe",
            Gate::Build => "build",
        };
        f.write_str(s)
    }
}

/// How an expansion went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Expanded,
    GateFailed(Gate),
    /// Discarded because the diversity policy no longer needs it.
    PolicySkipped,
    /// A PricedPath cursor ran dry.
    Exhausted,
}

/// Nodes and product produced by one `expand` call.
#[derive(Debug)]
pub struct Expansion {
    pub same_level: Vec<PartialSolution>,
    pub child: Option<PartialSolution>,
    pub product: Option<PricedResult>,
    pub verdict: Verdict,
}

impl Expansion {
    fn new(verdict: Verdict) -> Self {
        Self {
            same_level: Vec::new(),
            child: None,
            product: None,
            verdict,
        }
    }

    fn with_same_level(mut self, nodes: Vec<PartialSolution>) -> Self {
        self.same_level = nodes;
        self
    }
}

/// Read-only collaborators an expansion consults.
pub struct ExpandContext<'a> {
    pub catalog: &'a SolutionCatalog,
    pub routing: &'a RoutingData,
    pub oracle: &'a dyn CombinabilityOracle,
    pub builder: &'a dyn PricingUnitPathBuilder,
    pub cache: &'a PricingUnitCache,
    pub config: &'a SearchConfig,
    pub policy: &'a dyn DiversityPolicy,
    pub diagnostics: &'a mut dyn DiagnosticsSink,
}

/// What the diversity policy sees of a dequeued node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeView {
    pub level: Level,
    pub score: Money,
    pub pattern: PatternId,
    /// Known from the RoutedFares level on.
    pub applicability: Option<Applicability>,
}

/// A search node.
#[derive(Debug)]
pub struct PartialSolution {
    score: Money,
    pattern: PatternId,
    /// Pattern level: first leg whose cursor may still advance.
    /// Route level: number of slots already bound.
    fixed_prefix: usize,
    state: NodeState,
}

#[derive(Debug)]
enum NodeState {
    Pattern(PatternState),
    Route(RouteState),
    RoutedFares(RoutedState),
    PricedPath(PricedState),
}

#[derive(Debug, Clone)]
struct PatternState {
    /// Path indices per leg, ascending lower bound.
    candidates: [Arc<[usize]>; 2],
    cursor: [usize; 2],
    legs: usize,
}

#[derive(Debug, Clone)]
struct RouteState {
    paths: [Option<usize>; 2],
    /// Candidate index per slot.
    bound: [Option<usize>; 4],
}

#[derive(Debug, Clone)]
struct RoutedState {
    markets: Vec<(Slot, MarketRef)>,
    applicability: Applicability,
}

#[derive(Debug)]
struct PricedState {
    markets: Vec<(Slot, MarketRef)>,
    applicability: Applicability,
    factory: Box<dyn FarePathFactory>,
    /// Fare path drawn from the factory but costlier than the node's score.
    realized: Option<PricedFarePath>,
}

impl PartialSolution {
    /// A Pattern-level node with every leg cursor at its cheapest candidate.
    ///
    /// Returns `None` if a leg the pattern needs has no candidates.
    pub(crate) fn seed(
        pattern: &Pattern,
        routing: &RoutingData,
        candidates: [Arc<[usize]>; 2],
    ) -> Option<Self> {
        let legs = pattern.leg_count();
        if candidates.iter().take(legs).any(|c| c.is_empty()) {
            return None;
        }
        let state = PatternState {
            candidates,
            cursor: [0, 0],
            legs,
        };
        let score = pattern_score(routing, &state)?;
        Some(Self {
            score,
            pattern: pattern.id(),
            fixed_prefix: 0,
            state: NodeState::Pattern(state),
        })
    }

    pub fn score(&self) -> Money {
        self.score
    }

    pub fn level(&self) -> Level {
        match self.state {
            NodeState::Pattern(_) => Level::Pattern,
            NodeState::Route(_) => Level::Route,
            NodeState::RoutedFares(_) => Level::RoutedFares,
            NodeState::PricedPath(_) => Level::PricedPath,
        }
    }

    pub fn pattern(&self) -> PatternId {
        self.pattern
    }

    pub fn fixed_prefix(&self) -> usize {
        self.fixed_prefix
    }

    pub fn applicability(&self) -> Option<Applicability> {
        match &self.state {
            NodeState::RoutedFares(s) => Some(s.applicability),
            NodeState::PricedPath(s) => Some(s.applicability),
            _ => None,
        }
    }

    pub fn view(&self) -> NodeView {
        NodeView {
            level: self.level(),
            score: self.score,
            pattern: self.pattern,
            applicability: self.applicability(),
        }
    }

    /// Refine this node one step.
    pub fn expand(self, ctx: &mut ExpandContext<'_>) -> Expansion {
        let catalog = ctx.catalog;
        let Some(pattern) = catalog.pattern(self.pattern) else {
            return Expansion::new(Verdict::Exhausted);
        };
        let Self {
            score,
            pattern: id,
            fixed_prefix,
            state,
        } = self;

        match state {
            NodeState::Pattern(st) => expand_pattern(score, id, fixed_prefix, st, ctx),
            NodeState::Route(st) => expand_route(score, pattern, fixed_prefix, st, ctx),
            NodeState::RoutedFares(st) => expand_routed(score, pattern, st, ctx),
            NodeState::PricedPath(st) => expand_priced(score, id, st, ctx),
        }
    }
}

impl fmt::Display for PartialSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} P{} score={} fixed={}",
            self.level(),
            self.pattern.0,
            self.score,
            self.fixed_prefix
        )?;
        if let Some(a) = self.applicability() {
            write!(f, " {}", a)?;
        }
        Ok(())
    }
}

fn pattern_score(routing: &RoutingData, st: &PatternState) -> Option<Money> {
    let mut score = Money::ZERO;
    for (leg, &cursor) in LegIndex::ALL.iter().zip(&st.cursor).take(st.legs) {
        let path_idx = *st.candidates[leg.index()].get(cursor)?;
        score += routing.leg(*leg)?.paths().get(path_idx)?.lower_bound();
    }
    Some(score)
}

/// Candidate fare markets of a slot under the route's chosen paths.
fn slot_candidates<'r>(
    routing: &'r RoutingData,
    paths: &[Option<usize>; 2],
    slot: Slot,
) -> &'r [MarketRef] {
    let leg = slot.leg();
    paths[leg.index()]
        .and_then(|p| routing.leg(leg)?.paths().get(p))
        .map(|path| path.candidates(slot.position()))
        .unwrap_or_default()
}

/// Bound slots at their fare market's lower bound, unbound ones at their
/// cheapest candidate's.
fn route_score(routing: &RoutingData, pattern: &Pattern, st: &RouteState) -> Option<Money> {
    let mut score = Money::ZERO;
    for slot in pattern.slots() {
        let idx = st.bound[slot.index()].unwrap_or(0);
        let market = *slot_candidates(routing, &st.paths, slot).get(idx)?;
        score += routing.market(market).lower_bound;
    }
    Some(score)
}

fn record(ctx: &mut ExpandContext<'_>, line: impl FnOnce() -> String) {
    if ctx.diagnostics.is_active() {
        ctx.diagnostics.record(line());
    }
}

fn expand_pattern(
    score: Money,
    id: PatternId,
    fixed_prefix: usize,
    st: PatternState,
    ctx: &mut ExpandContext<'_>,
) -> Expansion {
    let mut same_level = Vec::new();
    for leg in fixed_prefix..st.legs {
        if st.cursor[leg] + 1 >= st.candidates[leg].len() {
            continue;
        }
        let mut next = st.clone();
        next.cursor[leg] += 1;
        if let Some(next_score) = pattern_score(ctx.routing, &next) {
            same_level.push(PartialSolution {
                score: next_score,
                pattern: id,
                fixed_prefix: leg,
                state: NodeState::Pattern(next),
            });
        }
    }

    let mut paths = [None, None];
    for leg in 0..st.legs {
        paths[leg] = st.candidates[leg].get(st.cursor[leg]).copied();
    }
    let child = PartialSolution {
        score,
        pattern: id,
        fixed_prefix: 0,
        state: NodeState::Route(RouteState {
            paths,
            bound: [None; 4],
        }),
    };

    let mut expansion = Expansion::new(Verdict::Expanded).with_same_level(same_level);
    expansion.child = Some(child);
    expansion
}

fn expand_route(
    score: Money,
    pattern: &Pattern,
    fixed_prefix: usize,
    st: RouteState,
    ctx: &mut ExpandContext<'_>,
) -> Expansion {
    let routing = ctx.routing;
    let slots = pattern.slots();
    let mut same_level = Vec::new();

    // Next candidate for the most recently bound slot
    if let Some(&last) = fixed_prefix.checked_sub(1).and_then(|i| slots.get(i)) {
        let k = st.bound[last.index()].unwrap_or(0);
        if k + 1 < slot_candidates(routing, &st.paths, last).len() {
            let mut next = st.clone();
            next.bound[last.index()] = Some(k + 1);
            if let Some(next_score) = route_score(routing, pattern, &next) {
                same_level.push(PartialSolution {
                    score: next_score,
                    pattern: pattern.id(),
                    fixed_prefix,
                    state: NodeState::Route(next),
                });
            }
        }
    }

    // Bind the next slot to its cheapest candidate
    if let Some(&slot) = slots.get(fixed_prefix) {
        let mut deeper = st;
        deeper.bound[slot.index()] = Some(0);
        same_level.push(PartialSolution {
            score,
            pattern: pattern.id(),
            fixed_prefix: fixed_prefix + 1,
            state: NodeState::Route(deeper),
        });
        return Expansion::new(Verdict::Expanded).with_same_level(same_level);
    }

    let mut markets = Vec::with_capacity(slots.len());
    for slot in &slots {
        let idx = st.bound[slot.index()].unwrap_or(0);
        match slot_candidates(routing, &st.paths, *slot).get(idx) {
            Some(m) => markets.push((*slot, *m)),
            None => return Expansion::new(Verdict::Exhausted).with_same_level(same_level),
        }
    }
    let fms: Vec<&FareMarket> = markets.iter().map(|(_, m)| routing.market(*m)).collect();

    let tags: Vec<_> = fms.iter().map(|fm| fm.tags).collect();
    if !pattern.validate(&tags, ctx.config.domestic) {
        return route_gate_failure(ctx, pattern, score, Gate::Tag, same_level);
    }
    if !ctx.oracle.is_combinable(pattern, &fms) {
        return route_gate_failure(ctx, pattern, score, Gate::Combinability, same_level);
    }

    let applicability = match online_carrier(&fms) {
        Some(carrier) => Applicability::Online(carrier),
        None if ctx.config.online_only || !ctx.config.allow_interline => {
            return route_gate_failure(ctx, pattern, score, Gate::Carrier, same_level);
        }
        None => Applicability::Interline,
    };

    if ctx.policy.is_quota_satisfied(&applicability) {
        record(ctx, || {
            format!("skip route {} {} score={}: quota met", pattern.name(), applicability, score)
        });
        return Expansion::new(Verdict::PolicySkipped).with_same_level(same_level);
    }

    let eoe = pattern.required_eoe();
    let refined: Money = fms
        .iter()
        .map(|fm| {
            ctx.oracle
                .summary_lower_bound(fm, eoe)
                .map_or(fm.lower_bound, |b| b.max(fm.lower_bound))
        })
        .sum();

    let mut expansion = Expansion::new(Verdict::Expanded).with_same_level(same_level);
    expansion.child = Some(PartialSolution {
        score: refined.max(score),
        pattern: pattern.id(),
        fixed_prefix: slots.len(),
        state: NodeState::RoutedFares(RoutedState {
            markets,
            applicability,
        }),
    });
    expansion
}

fn route_gate_failure(
    ctx: &mut ExpandContext<'_>,
    pattern: &Pattern,
    score: Money,
    gate: Gate,
    same_level: Vec<PartialSolution>,
) -> Expansion {
    debug!(pattern = pattern.name(), %gate, %score, "Route gate failed");
    record(ctx, || format!("gate-failure {} {} score={}", gate, pattern.name(), score));
    Expansion::new(Verdict::GateFailed(gate)).with_same_level(same_level)
}

/// A carrier marketing every bound fare market, preferring the first
/// market's governing carrier.
fn online_carrier(fms: &[&FareMarket]) -> Option<CarrierCode> {
    let (first, rest) = fms.split_first()?;
    let common: Vec<CarrierCode> = first
        .carriers()
        .into_iter()
        .filter(|c| rest.iter().all(|fm| fm.carriers().contains(c)))
        .collect();
    if common.contains(&first.governing_carrier) {
        Some(first.governing_carrier)
    } else {
        common.into_iter().min()
    }
}

fn expand_routed(
    score: Money,
    pattern: &Pattern,
    st: RoutedState,
    ctx: &mut ExpandContext<'_>,
) -> Expansion {
    let routing = ctx.routing;
    let eoe = pattern.required_eoe();
    let fms: Vec<(Slot, &FareMarket)> = st
        .markets
        .iter()
        .map(|(slot, m)| (*slot, routing.market(*m)))
        .collect();

    if let Some((_, fm)) = fms
        .iter()
        .find(|(_, fm)| ctx.oracle.summary_lower_bound(fm, eoe).is_none())
    {
        debug!(pattern = pattern.name(), fare_market = %fm.id, ?eoe, "EOE summary gate failed");
        record(ctx, || {
            format!("gate-failure {} {} score={} {}", Gate::Eoe, pattern.name(), score, fm.id)
        });
        return Expansion::new(Verdict::GateFailed(Gate::Eoe));
    }

    if let Some(min_price) = ctx.policy.statistics().min_price() {
        let cutoff = min_price.scale(ctx.config.routed_skip_cutoff_coef);
        if score > cutoff && ctx.policy.is_quota_satisfied(&st.applicability) {
            record(ctx, || {
                format!(
                    "skip routed {} {} score={} cutoff={}",
                    pattern.name(),
                    st.applicability,
                    score,
                    cutoff
                )
            });
            return Expansion::new(Verdict::PolicySkipped);
        }
    }

    let candidate = RoutedCandidate {
        pattern,
        markets: fms,
    };
    let built = ctx.builder.build_path(&candidate).and_then(|path| {
        let units = ctx.cache.ensure(&path.units, ctx.builder)?;
        Ok(ctx.builder.fare_path_factory(&path, units))
    });
    let factory = match built {
        Ok(factory) => factory,
        Err(e) => {
            debug!(pattern = pattern.name(), error = %e, "Pricing-unit path not built");
            record(ctx, || format!("gate-failure {} {}: {}", Gate::Build, pattern.name(), e));
            return Expansion::new(Verdict::GateFailed(Gate::Build));
        }
    };
    let Some(bound) = factory.lower_bound_of_next() else {
        record(ctx, || format!("gate-failure {} {}: no fare paths", Gate::Build, pattern.name()));
        return Expansion::new(Verdict::GateFailed(Gate::Build));
    };

    let mut expansion = Expansion::new(Verdict::Expanded);
    expansion.child = Some(PartialSolution {
        score: bound.max(score),
        pattern: pattern.id(),
        fixed_prefix: st.markets.len(),
        state: NodeState::PricedPath(PricedState {
            markets: st.markets,
            applicability: st.applicability,
            factory,
            realized: None,
        }),
    });
    expansion
}

fn expand_priced(
    score: Money,
    id: PatternId,
    mut st: PricedState,
    ctx: &mut ExpandContext<'_>,
) -> Expansion {
    let fare_path = match st.realized.take() {
        Some(held) => held,
        None => match st.factory.next(ctx.diagnostics) {
            None => return Expansion::new(Verdict::Exhausted),
            // Costlier than promised: wait in the queue at the real cost
            Some(fp) if fp.total > score => {
                let real = fp.total;
                st.realized = Some(fp);
                return Expansion::new(Verdict::Expanded).with_same_level(vec![PartialSolution {
                    score: real,
                    pattern: id,
                    fixed_prefix: st.markets.len(),
                    state: NodeState::PricedPath(st),
                }]);
            }
            Some(fp) => fp,
        },
    };

    let product = PricedResult {
        pattern: id,
        markets: st.markets.clone(),
        applicability: st.applicability,
        fare_path: Arc::new(fare_path),
    };

    let mut same_level = Vec::new();
    if let Some(next) = st.factory.lower_bound_of_next() {
        same_level.push(PartialSolution {
            score: next.max(score),
            pattern: id,
            fixed_prefix: st.markets.len(),
            state: NodeState::PricedPath(st),
        });
    }

    let mut expansion = Expansion::new(Verdict::Expanded).with_same_level(same_level);
    expansion.product = Some(product);
    expansion
}
