//! Lazy best-first fare search.
//!
//! Given routing data for a one-way or round-trip request, finds the cheapest
//! priced itineraries by refining abstract fare-construction patterns into
//! concrete fare paths only when they could be the next-cheapest answer, and
//! lets a diversity policy decide which of them to keep.

pub mod cache;
pub mod catalog;
pub mod diversity;
pub mod domain;
pub mod mock;
pub mod pricing;
pub mod search;
