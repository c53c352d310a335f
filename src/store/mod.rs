//! Append-only record storage.
//!
//! One CSV dataset per record category, created on first append and
//! never rewritten.

pub mod clock;
pub mod error;
pub mod record_store;

pub use clock::*;
pub use error::*;
pub use record_store::*;
