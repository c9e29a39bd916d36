//! Core ledger data structures and logic.
//!
//! This module contains blocks and their headers, the backward chain
//! iterator, and the fork-aware ledger that ties them to storage.

pub mod block;
pub mod iterator;
pub mod ledger;

// Re-export commonly used types
pub use block::*;
pub use iterator::*;
pub use ledger::*;
