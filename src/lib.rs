//! forkledger - a persistent, fork-aware block ledger.
//!
//! Blocks commit to their data through a merkle root and link to their
//! parent by header hash. The [`Ledger`] validates each appended block
//! against the branch tip it extends and stores blocks, tips and the best
//! tip in an embedded `sled` database.

pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod storage;
pub mod utils;

pub use crate::config::{Config, ForkPolicy};
pub use crate::core::{Block, BlockHeader, ChainIterator, ExtraValidator, Ledger};
pub use crate::crypto::{merkle_root, Hash256};
pub use crate::error::{LedgerError, Result, StorageError, ValidationError};
pub use crate::storage::{Store, WriteBatch};
