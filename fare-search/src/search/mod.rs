//! Lazy best-first fare search.
//!
//! The frontier holds partial solutions ordered by an admissible lower bound
//! on their final price. Each dequeued node is refined one level (pattern,
//! route, routed fares, priced path) or advanced one fare path, so priced
//! fare paths come out cheapest first and nothing is priced before it could
//! possibly be the next-cheapest answer.

mod config;
mod error;
mod frontier;
mod node;
mod orchestrator;
mod seed;
mod solution;

pub use config::{ConfigError, SearchConfig};
pub use error::SearchError;
pub use frontier::{AbortFlag, DegradeReason, Frontier, FrontierStats, NextResult, StopReason};
pub use node::{ExpandContext, Expansion, Gate, Level, NodeView, PartialSolution, Verdict};
pub use orchestrator::{FareSearch, SearchOutcome, SearchStatus};
pub use seed::seed;
pub use solution::{Applicability, PricedResult, ScheduleCombination, Solution};

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
