//! Utility helpers for the ledger binary.

/// Formatting utilities
pub mod format;

/// Logging setup
pub mod logging;

pub use format::*;
pub use logging::{init_logging, LogFormat};
