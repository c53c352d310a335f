//! Report aggregation.
//!
//! Turns raw per-category tables into the derived views shown in the
//! study report.

pub mod aggregator;

pub use aggregator::*;
