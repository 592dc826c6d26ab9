//! The frontier: a min-priority queue of partial solutions and the lazy
//! expansion loop that drains it.
//!
//! Ties on score are broken by level (deeper first, so nearly finished work
//! completes before new branches open) and then by insertion order, which
//! makes the dequeue order fully deterministic.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Instant;

use tracing::{debug, trace};

use crate::diversity::Action;
use crate::domain::{Money, ScheduleId};

use super::config::SearchConfig;
use super::node::{ExpandContext, Level, PartialSolution, Verdict};
use super::solution::PricedResult;

/// Externally owned cancellation flag, optionally backed by a deadline.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag that also reads as set once `deadline` has passed.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Some(deadline),
        }
    }

    pub fn abort(&self) {
        self.flag.store(true, AtomicOrdering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(AtomicOrdering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Why the search switched to thru-only patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeReason {
    HurryOut,
    UniqueOutboundSchedules,
    FailedExpansions,
    PolicySkips,
}

/// Why the loop stopped before the frontier emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The diversity policy issued STOP.
    Policy,
    /// Too many consecutive dequeues without a newly admitted solution.
    NotUsed,
}

/// Result of one `next_priced_result` call.
#[derive(Debug)]
pub enum NextResult {
    Priced(PricedResult),
    /// The frontier is empty.
    Exhausted,
    Stopped(StopReason),
    Aborted,
}

/// Aggregate counters of one search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontierStats {
    pub enqueued: usize,
    pub dequeues: usize,
    pub expansions: usize,
    pub failed_expansions: usize,
    pub policy_skips: usize,
    /// Local-routing nodes dropped after degradation.
    pub thru_only_skips: usize,
    pub exhausted: usize,
    pub products: usize,
    pub degraded: Option<DegradeReason>,
}

struct Queued {
    score: Money,
    level: Level,
    seq: u64,
    node: PartialSolution,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // BinaryHeap is a max-heap: the "greatest" entry is the cheapest,
    // deepest, oldest one.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.level.cmp(&other.level))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of partial solutions plus the backpressure state the
/// expansion loop consults.
pub struct Frontier {
    heap: BinaryHeap<Queued>,
    seq: u64,
    stats: FrontierStats,
    hurry_deadline: Option<Instant>,
    max_unique_outbound: usize,
    max_failed: usize,
    max_policy_skips: usize,
    max_not_used: usize,
    outbound_seen: HashSet<ScheduleId>,
    not_used: usize,
    last_admitted: usize,
}

impl Frontier {
    pub fn new(config: &SearchConfig, start: Instant) -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
            stats: FrontierStats::default(),
            hurry_deadline: config.hurry_deadline(start),
            max_unique_outbound: config.max_unique_outbound_schedules,
            max_failed: config.max_failed_expansions,
            max_policy_skips: config.max_policy_skips,
            max_not_used: config.max_not_used_dequeues,
            outbound_seen: HashSet::new(),
            not_used: 0,
            last_admitted: 0,
        }
    }

    pub fn enqueue(&mut self, node: PartialSolution) {
        trace!(node = %node, "Enqueue");
        self.seq += 1;
        self.stats.enqueued += 1;
        self.heap.push(Queued {
            score: node.score(),
            level: node.level(),
            seq: self.seq,
            node,
        });
    }

    pub fn dequeue(&mut self) -> Option<PartialSolution> {
        self.heap.pop().map(|q| q.node)
    }

    pub fn peek(&self) -> Option<&PartialSolution> {
        self.heap.peek().map(|q| &q.node)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn stats(&self) -> &FrontierStats {
        &self.stats
    }

    pub fn is_degraded(&self) -> bool {
        self.stats.degraded.is_some()
    }

    /// Note an outbound schedule offered to the diversity policy.
    pub fn record_outbound_schedule(&mut self, id: ScheduleId) {
        self.outbound_seen.insert(id);
    }

    pub fn unique_outbound_schedules(&self) -> usize {
        self.outbound_seen.len()
    }

    /// Switch to thru-only mode once a backpressure cap or the hurry-out
    /// deadline is hit. Only the first reason is kept.
    fn check_degradation(&mut self) {
        if self.is_degraded() {
            return;
        }
        let reason = if self.hurry_deadline.is_some_and(|d| Instant::now() >= d) {
            Some(DegradeReason::HurryOut)
        } else if self.max_unique_outbound > 0 && self.outbound_seen.len() >= self.max_unique_outbound
        {
            Some(DegradeReason::UniqueOutboundSchedules)
        } else if self.max_failed > 0 && self.stats.failed_expansions > self.max_failed {
            Some(DegradeReason::FailedExpansions)
        } else if self.max_policy_skips > 0 && self.stats.policy_skips > self.max_policy_skips {
            Some(DegradeReason::PolicySkips)
        } else {
            None
        };

        if let Some(reason) = reason {
            debug!(
                ?reason,
                failed = self.stats.failed_expansions,
                skips = self.stats.policy_skips,
                outbound = self.outbound_seen.len(),
                "Switching search to thru-only mode"
            );
            self.stats.degraded = Some(reason);
        }
    }

    /// Pop and expand nodes until one yields a priced fare path, or the
    /// search stops, aborts or runs dry.
    pub fn next_priced_result(
        &mut self,
        ctx: &mut ExpandContext<'_>,
        abort: &AbortFlag,
    ) -> NextResult {
        loop {
            if abort.is_set() {
                debug!(dequeues = self.stats.dequeues, "Search aborted");
                return NextResult::Aborted;
            }

            let admitted = ctx.policy.statistics().total_options();
            if admitted > self.last_admitted {
                self.last_admitted = admitted;
                self.not_used = 0;
            }
            if self.max_not_used > 0 && self.not_used >= self.max_not_used {
                debug!(not_used = self.not_used, "Search unproductive, stopping");
                return NextResult::Stopped(StopReason::NotUsed);
            }

            self.check_degradation();

            let Some(node) = self.dequeue() else {
                return NextResult::Exhausted;
            };
            self.stats.dequeues += 1;
            self.not_used += 1;

            if self.is_degraded()
                && ctx
                    .catalog
                    .pattern(node.pattern())
                    .is_some_and(|p| p.requires_local())
            {
                trace!(node = %node, "Skipping local pattern in thru-only mode");
                self.stats.thru_only_skips += 1;
                continue;
            }

            match ctx.policy.action(&node.view()) {
                Action::Use => {}
                Action::Skip => {
                    trace!(node = %node, "Policy skip");
                    if ctx.diagnostics.is_active() {
                        ctx.diagnostics.record(format!("skip {}", node));
                    }
                    self.stats.policy_skips += 1;
                    continue;
                }
                Action::Stop => {
                    debug!(node = %node, "Policy stop");
                    return NextResult::Stopped(StopReason::Policy);
                }
            }

            if ctx.diagnostics.is_active() {
                ctx.diagnostics.record(format!("dequeue {}", node));
            }
            trace!(node = %node, "Expand");
            self.stats.expansions += 1;
            let expansion = node.expand(ctx);

            match expansion.verdict {
                Verdict::Expanded => {}
                Verdict::GateFailed(_) => self.stats.failed_expansions += 1,
                Verdict::PolicySkipped => self.stats.policy_skips += 1,
                Verdict::Exhausted => self.stats.exhausted += 1,
            }

            for n in expansion.same_level.into_iter().chain(expansion.child) {
                if ctx.diagnostics.is_active() {
                    ctx.diagnostics.record(format!("enqueue {}", n));
                }
                self.enqueue(n);
            }

            if let Some(product) = expansion.product {
                self.stats.products += 1;
                return NextResult::Priced(product);
            }
        }
    }
}

impl std::fmt::Debug for Frontier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontier")
            .field("len", &self.heap.len())
            .field("stats", &self.stats)
            .finish()
    }
}
