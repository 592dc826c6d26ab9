//! Lazy k-best enumeration of fare paths over a pricing-unit path.
//!
//! Each pricing unit offers options sorted by amount. A combination picks one
//! option index per unit; its base cost is the sum of the chosen amounts.
//! Starting from all-zeros, popping the cheapest combination and pushing its
//! single-index successors yields combinations in non-decreasing base cost.
//! Validator surcharges can push a fare path above later bases, so validated
//! paths wait in a ready heap until nothing cheaper can still appear.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::domain::Money;

use super::{
    DiagnosticsSink, PricedFarePath, PricedUnit, PricingUnitFactory, PricingUnitPath,
};

/// Outcome of validating one combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// Valid once the given amount is added to the total.
    Surcharge(Money),
    Invalid(String),
}

/// Hook that re-checks combined fares (combinability, minimum fares).
pub trait FarePathValidator: Send + Sync + fmt::Debug {
    fn validate(&self, path: &PricedFarePath) -> Validation;
}

/// Lazy cursor over the priced fare paths of one pricing-unit path.
pub trait FarePathFactory: fmt::Debug {
    /// The next valid fare path, cheapest first; `None` once exhausted.
    fn next(&mut self, diagnostics: &mut dyn DiagnosticsSink) -> Option<PricedFarePath>;

    /// A lower bound on the total of the next fare path. Never decreases
    /// between calls; `None` once exhausted.
    fn lower_bound_of_next(&self) -> Option<Money>;
}

struct Ready {
    total: Money,
    seq: u64,
    path: PricedFarePath,
}

impl PartialEq for Ready {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ready {}

impl PartialOrd for Ready {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ready {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.total, self.seq).cmp(&(other.total, other.seq))
    }
}

/// Default [`FarePathFactory`]: lattice walk over initialised pricing units.
pub struct CombinationFactory {
    path: PricingUnitPath,
    units: Vec<Arc<dyn PricingUnitFactory>>,
    validator: Option<Arc<dyn FarePathValidator>>,
    lattice: BinaryHeap<Reverse<(Money, Vec<usize>)>>,
    seen: HashSet<Vec<usize>>,
    ready: BinaryHeap<Reverse<Ready>>,
    seq: u64,
    rejected: usize,
}

impl CombinationFactory {
    pub fn new(
        path: PricingUnitPath,
        units: Vec<Arc<dyn PricingUnitFactory>>,
        validator: Option<Arc<dyn FarePathValidator>>,
    ) -> Self {
        let mut factory = Self {
            path,
            units,
            validator,
            lattice: BinaryHeap::new(),
            seen: HashSet::new(),
            ready: BinaryHeap::new(),
            seq: 0,
            rejected: 0,
        };
        let origin = vec![0; factory.units.len()];
        if let Some(cost) = factory.cost(&origin) {
            factory.seen.insert(origin.clone());
            factory.lattice.push(Reverse((cost, origin)));
        }
        factory
    }

    /// Number of combinations the validator rejected so far.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    fn cost(&self, idx: &[usize]) -> Option<Money> {
        if self.units.is_empty() {
            return None;
        }
        self.units
            .iter()
            .zip(idx)
            .map(|(u, &i)| u.options().get(i).map(|o| o.amount))
            .sum()
    }

    fn materialise(&self, idx: &[usize]) -> Option<PricedFarePath> {
        let units = self
            .units
            .iter()
            .zip(idx)
            .map(|(u, &i)| {
                u.options().get(i).map(|o| PricedUnit {
                    unit: u.unit().clone(),
                    option: o.clone(),
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(PricedFarePath::new(units))
    }

    fn push_successors(&mut self, idx: &[usize]) {
        for pos in 0..idx.len() {
            let mut succ = idx.to_vec();
            succ[pos] += 1;
            if self.seen.contains(&succ) {
                continue;
            }
            if let Some(cost) = self.cost(&succ) {
                self.seen.insert(succ.clone());
                self.lattice.push(Reverse((cost, succ)));
            }
        }
    }

    fn lattice_min(&self) -> Option<Money> {
        self.lattice.peek().map(|Reverse((cost, _))| *cost)
    }
}

impl FarePathFactory for CombinationFactory {
    fn next(&mut self, diagnostics: &mut dyn DiagnosticsSink) -> Option<PricedFarePath> {
        loop {
            let lattice_min = self.lattice_min();
            let ready_first = match (self.ready.peek(), lattice_min) {
                (Some(Reverse(r)), Some(min)) => r.total <= min,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if ready_first {
                return self.ready.pop().map(|Reverse(r)| r.path);
            }

            let Reverse((_, idx)) = self.lattice.pop()?;
            self.push_successors(&idx);

            let Some(path) = self.materialise(&idx) else {
                continue;
            };
            let verdict = match &self.validator {
                Some(v) => v.validate(&path),
                None => Validation::Valid,
            };
            let path = match verdict {
                Validation::Valid => path,
                Validation::Surcharge(amount) => path.with_surcharge(amount),
                Validation::Invalid(reason) => {
                    self.rejected += 1;
                    if diagnostics.is_active() {
                        diagnostics.record(format!(
                            "fare path rejected [{}]: {}",
                            path.fare_bases().join(" "),
                            reason
                        ));
                    }
                    continue;
                }
            };
            self.seq += 1;
            self.ready.push(Reverse(Ready {
                total: path.total,
                seq: self.seq,
                path,
            }));
        }
    }

    fn lower_bound_of_next(&self) -> Option<Money> {
        let ready = self.ready.peek().map(|Reverse(r)| r.total);
        match (ready, self.lattice_min()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

impl fmt::Debug for CombinationFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinationFactory")
            .field("units", &self.path.units)
            .field("pending", &self.lattice.len())
            .field("ready", &self.ready.len())
            .field("rejected", &self.rejected)
            .finish()
    }
}
