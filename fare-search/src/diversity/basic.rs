//! Bucketed diversity: a mix of cheap, fast, expensive and slow options.
//!
//! Until `options_required` solutions are in, everything is admitted. At that
//! point the fare separator, fare cut-off and travel-time separator are fixed
//! from the statistics, and every later solution must fill a bucket still
//! under its target, swapping out a solution of the most over-filled bucket.

use std::collections::BTreeMap;
use std::fmt;
use std::mem;

use tracing::debug;

use crate::domain::{CarrierCode, Money};
use crate::search::{Applicability, NodeView, ScheduleCombination, Solution};

use super::{
    Action, DiversityConfig, DiversityPolicy, SearchStatistics, SolutionSet, cap_reached,
    carrier_skip, evict_over_cap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    /// Cheap and fast.
    Gold,
    /// Expensive and fast.
    Luxury,
    /// Cheap and slow.
    Ugly,
    /// Expensive and slow.
    Junk,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [Bucket::Gold, Bucket::Luxury, Bucket::Ugly, Bucket::Junk];
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Bucket::Gold => "GOLD",
            Bucket::Luxury => "LUXURY",
            Bucket::Ugly => "UGLY",
            Bucket::Junk => "JUNK",
        };
        f.write_str(s)
    }
}

/// Thresholds fixed once the requested number of options is reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasicParameters {
    /// Solutions at or below this price are cheap.
    pub fare_separator: Money,
    /// Nodes above this price stop the search.
    pub fare_cutoff: Money,
    /// Solutions at or below this many minutes are fast.
    pub travel_time_separator: f64,
}

impl BasicParameters {
    /// Derive the thresholds from the admitted solutions. `None` while no
    /// solution has been admitted.
    pub fn compute(stats: &SearchStatistics, config: &DiversityConfig) -> Option<Self> {
        let min_price = stats.min_price()?;
        let max_price = stats.max_price()?;
        let avg = stats.avg_price()?;
        let min = min_price.as_f64();
        let max = max_price.as_f64();

        let fare_separator = if max > 0.0 {
            Money::from_f64(min + (avg - min) * (avg / max))
        } else {
            min_price
        };

        let log_max = max.log10();
        let calculated = if log_max > 0.0 {
            Money::from_f64(
                max * (1.0
                    + (avg + 1.0 - min) / (max + 1.0 - min) * config.fare_cutoff_correction
                        / log_max),
            )
        } else {
            max_price
        };
        // Multiplier cut-offs are whole currency units
        let fare_cutoff = match config.cutoff_multiplier(min_price) {
            Some(m) => Money::from_f64((min * m).round()).max(calculated),
            None => calculated,
        };

        let min_duration = stats.min_duration()? as f64;
        let avg_duration = stats.avg_duration()?;
        let travel_time_separator = if min_duration > 1.0 && avg_duration > 0.0 {
            min_duration
                + (avg_duration - min_duration)
                    * (min_duration / avg_duration).cos()
                    * config.travel_time_separator_coef
                    / min_duration.log10()
        } else {
            min_duration
        };

        Some(Self {
            fare_separator,
            fare_cutoff,
            travel_time_separator,
        })
    }

    pub fn bucket(&self, price: Money, duration_mins: u32) -> Bucket {
        let cheap = price <= self.fare_separator;
        let fast = duration_mins as f64 <= self.travel_time_separator;
        match (cheap, fast) {
            (true, true) => Bucket::Gold,
            (false, true) => Bucket::Luxury,
            (true, false) => Bucket::Ugly,
            (false, false) => Bucket::Junk,
        }
    }
}

/// The bucketed policy with preferred-carrier requirements.
#[derive(Debug)]
pub struct Basic {
    config: DiversityConfig,
    set: SolutionSet,
    stats: SearchStatistics,
    params: Option<BasicParameters>,
    swapped: Vec<Solution>,
}

impl Basic {
    pub fn new(config: DiversityConfig) -> Self {
        Self {
            config,
            set: SolutionSet::new(),
            stats: SearchStatistics::default(),
            params: None,
            swapped: Vec::new(),
        }
    }

    pub fn parameters(&self) -> Option<&BasicParameters> {
        self.params.as_ref()
    }

    fn is_preferred(&self, carrier: Option<CarrierCode>) -> bool {
        carrier.is_some_and(|c| self.config.carrier_quotas.contains_key(&c))
    }

    /// A preferred carrier still short of its required count.
    fn preferred_unmet(&self, applicability: &Applicability) -> bool {
        applicability.carrier().is_some_and(|c| {
            self.config
                .carrier_quotas
                .get(&c)
                .is_some_and(|q| self.stats.carrier_count(c) < *q)
        })
    }

    fn all_preferred_met(&self) -> bool {
        self.config
            .carrier_quotas
            .iter()
            .all(|(c, q)| self.stats.carrier_count(*c) >= *q)
    }

    /// Preferred carriers' solutions count as GOLD.
    fn bucket_of(&self, params: &BasicParameters, solution: &Solution) -> Bucket {
        if self.is_preferred(solution.carrier()) {
            Bucket::Gold
        } else {
            params.bucket(solution.price, solution.duration_mins)
        }
    }

    fn bucket_target(&self, bucket: Bucket) -> usize {
        let b = self.config.buckets;
        let percent = match bucket {
            Bucket::Gold => b.gold,
            Bucket::Luxury => b.luxury,
            Bucket::Ugly => b.ugly,
            Bucket::Junk => b.junk,
        };
        self.config.bucket_target(percent)
    }

    fn bucket_counts(&self, params: &BasicParameters) -> BTreeMap<Bucket, usize> {
        let mut counts = BTreeMap::new();
        for s in self.set.iter() {
            *counts.entry(self.bucket_of(params, s)).or_insert(0) += 1;
        }
        counts
    }

    fn buckets_full(&self) -> bool {
        let Some(params) = &self.params else {
            return false;
        };
        let counts = self.bucket_counts(params);
        Bucket::ALL
            .iter()
            .all(|b| counts.get(b).copied().unwrap_or(0) >= self.bucket_target(*b))
    }

    /// Remove the most expensive non-preferred solution of the most
    /// over-filled bucket, never `keep`.
    fn swap_out(&mut self, keep: Option<&ScheduleCombination>) -> Option<Solution> {
        let params = self.params?;
        let counts = self.bucket_counts(&params);
        let excess = |b: Bucket| {
            counts.get(&b).copied().unwrap_or(0) as isize - self.bucket_target(b) as isize
        };

        let victim = self
            .set
            .iter()
            .filter(|s| Some(&s.key) != keep && !self.is_preferred(s.carrier()))
            .max_by(|a, b| {
                let (ba, bb) = (self.bucket_of(&params, a), self.bucket_of(&params, b));
                excess(ba)
                    .cmp(&excess(bb))
                    .then_with(|| a.price.cmp(&b.price))
                    .then_with(|| a.key.cmp(&b.key))
            })
            .map(|s| s.key.clone())?;

        let removed = self.set.remove(&victim)?;
        self.stats = SearchStatistics::from_solutions(self.set.iter());
        Some(removed)
    }

    fn admit(&mut self, solution: Solution) -> bool {
        self.stats.add(&solution);
        let admitted = self.set.insert(solution).is_ok();

        if self.params.is_none() && self.stats.total_options() >= self.config.options_required {
            self.params = BasicParameters::compute(&self.stats, &self.config);
            if let Some(p) = &self.params {
                debug!(
                    fare_separator = %p.fare_separator,
                    fare_cutoff = %p.fare_cutoff,
                    travel_time_separator = p.travel_time_separator,
                    "Diversity parameters set"
                );
            }
        }
        admitted
    }
}

impl DiversityPolicy for Basic {
    fn action(&self, node: &NodeView) -> Action {
        if let Some(params) = &self.params {
            if node.score > params.fare_cutoff {
                if self.all_preferred_met() {
                    return Action::Stop;
                }
                // Only preferred carriers short of their count are still wanted
                if node.applicability.is_some_and(|a| !self.preferred_unmet(&a)) {
                    return Action::Skip;
                }
            }
        }
        if carrier_skip(&self.config, &self.stats, node) {
            return Action::Skip;
        }
        Action::Use
    }

    fn is_quota_satisfied(&self, applicability: &Applicability) -> bool {
        cap_reached(&self.config, &self.stats, applicability)
            || (self.buckets_full() && !self.preferred_unmet(applicability))
    }

    fn add_solution(&mut self, solution: Solution) -> bool {
        if self.set.contains(&solution.key) {
            debug!(key = %solution.key, "Duplicate solution rejected");
            return false;
        }
        if cap_reached(&self.config, &self.stats, &solution.applicability) {
            return false;
        }

        let Some(params) = self.params else {
            return self.admit(solution);
        };

        let preferred = self.preferred_unmet(&solution.applicability);
        if !preferred {
            if solution.price > params.fare_cutoff {
                return false;
            }
            let bucket = self.bucket_of(&params, &solution);
            let count = self.bucket_counts(&params).get(&bucket).copied().unwrap_or(0);
            if count >= self.bucket_target(bucket) {
                return false;
            }
        }

        let key = solution.key.clone();
        if !self.admit(solution) {
            return false;
        }
        if self.set.len() > self.config.options_required {
            if let Some(out) = self.swap_out(Some(&key)) {
                debug!(admitted = %key, evicted = %out.key, "Solution swapped");
                self.swapped.push(out);
            }
        }
        true
    }

    fn remove_unwanted_solutions(&mut self) -> Vec<Solution> {
        let mut evicted = mem::take(&mut self.swapped);
        evicted.extend(evict_over_cap(&self.config, &mut self.set));

        if let Some(params) = self.params {
            let quotas = &self.config.carrier_quotas;
            evicted.extend(self.set.retain(|s| {
                s.price <= params.fare_cutoff || s.carrier().is_some_and(|c| quotas.contains_key(&c))
            }));
        }
        self.stats = SearchStatistics::from_solutions(self.set.iter());

        while self.set.len() > self.config.options_required {
            match self.swap_out(None) {
                Some(out) => evicted.push(out),
                None => break,
            }
        }
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
