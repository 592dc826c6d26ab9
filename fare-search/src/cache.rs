//! Pricing-unit factory cache and its fork-join initialiser.
//!
//! Many RoutedFares nodes share pricing units (the same round trip on the same
//! fare markets turns up under several schedule pairings), so initialised
//! factories are cached by [`PricingUnit`]. Units missing from the cache are
//! initialised on a bounded rayon pool in batches of `batch_size`; the caller
//! blocks until every batch has joined. Failures are logged and not cached,
//! so a later node may retry them.

use std::collections::HashMap;
use std::sync::Arc;

use moka::sync::Cache as MokaCache;
use rayon::prelude::*;
use tracing::{trace, warn};

use crate::pricing::{PricingError, PricingUnit, PricingUnitFactory, PricingUnitPathBuilder};

type FactoryEntry = Arc<dyn PricingUnitFactory>;

/// Configuration for the cache and its worker pool.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached pricing units.
    pub max_capacity: u64,

    /// Worker threads used for initialisation.
    pub worker_threads: usize,

    /// Units initialised per fork-join batch.
    pub batch_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            worker_threads: 4,
            batch_size: 8,
        }
    }
}

/// The worker pool could not be started.
#[derive(Debug, thiserror::Error)]
#[error("failed to start pricing-unit worker pool: {0}")]
pub struct WorkerPoolError(#[from] rayon::ThreadPoolBuildError);

/// Cache of initialised pricing-unit factories.
pub struct PricingUnitCache {
    units: MokaCache<PricingUnit, FactoryEntry>,
    pool: rayon::ThreadPool,
    batch_size: usize,
}

impl PricingUnitCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Result<Self, WorkerPoolError> {
        let units = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .build();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads.max(1))
            .thread_name(|i| format!("pu-init-{}", i))
            .build()?;

        Ok(Self {
            units,
            pool,
            batch_size: config.batch_size.max(1),
        })
    }

    pub fn get(&self, unit: &PricingUnit) -> Option<FactoryEntry> {
        self.units.get(unit)
    }

    /// Return factories for `units` in order, initialising missing ones on
    /// the worker pool first.
    ///
    /// Fails with [`PricingError::NotReady`] if any unit could not be
    /// initialised; the failures are logged, not propagated.
    pub fn ensure(
        &self,
        units: &[PricingUnit],
        builder: &dyn PricingUnitPathBuilder,
    ) -> Result<Vec<FactoryEntry>, PricingError> {
        let mut fresh: HashMap<&PricingUnit, FactoryEntry> = HashMap::new();
        let mut missing: Vec<&PricingUnit> = Vec::new();
        for unit in units {
            if !self.units.contains_key(unit) && !missing.contains(&unit) {
                missing.push(unit);
            }
        }

        let mut failed = 0;
        for batch in missing.chunks(self.batch_size) {
            let results: Vec<_> = self.pool.install(|| {
                batch
                    .par_iter()
                    .map(|unit| (*unit, builder.init_pricing_unit(unit)))
                    .collect()
            });

            for (unit, result) in results {
                match result {
                    Ok(factory) => {
                        trace!(unit = %unit, options = factory.options().len(), "Initialised pricing unit");
                        self.units.insert(unit.clone(), factory.clone());
                        fresh.insert(unit, factory);
                    }
                    Err(e) => {
                        warn!(unit = %unit, error = %e, "Pricing unit initialisation failed");
                        failed += 1;
                    }
                }
            }
        }

        if failed > 0 {
            return Err(PricingError::NotReady(failed));
        }

        let mut out = Vec::with_capacity(units.len());
        for unit in units {
            match fresh.get(unit).cloned().or_else(|| self.units.get(unit)) {
                Some(factory) => out.push(factory),
                None => return Err(PricingError::NotReady(1)),
            }
        }
        Ok(out)
    }

    /// Number of cached units (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.units.run_pending_tasks();
        self.units.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.units.invalidate_all();
    }
}

impl std::fmt::Debug for PricingUnitCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingUnitCache")
            .field("entries", &self.units.entry_count())
            .field("threads", &self.pool.current_num_threads())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}
