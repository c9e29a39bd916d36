//! Error types for the ledger.
//!
//! Every fallible operation returns [`Result`], whose error is a
//! [`LedgerError`]. Validation, orphan and lookup failures are recoverable and
//! leave the ledger untouched; storage failures report that the underlying
//! transaction did not commit.

use crate::crypto::Hash256;

// Core error types
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Orphan block: no tip with hash {prev_hash}")]
    Orphan { prev_hash: Hash256 },
    #[error("Duplicate block: {0}")]
    Duplicate(Hash256),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Crypto error: {0}")]
    Crypto(String),
}

/// The rule a block broke when checked against its parent header.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid index: expected {expected}, found {actual}")]
    InvalidIndex { expected: u64, actual: u64 },
    #[error("Time regression: block time {time} is before parent time {parent_time}")]
    TimeRegression { time: i64, parent_time: i64 },
    #[error("Invalid previous hash: expected {expected}, found {actual}")]
    InvalidPreviousHash { expected: Hash256, actual: Hash256 },
    #[error("Invalid merkle root: expected {expected}, found {actual}")]
    InvalidMerkleRoot { expected: Hash256, actual: Hash256 },
    #[error("Extra data too large: {len} bytes (max {max})")]
    ExtraTooLarge { len: usize, max: usize },
    #[error("Extra data rejected by validator")]
    ExtraRejected,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Corrupted store: {0}")]
    Corrupted(String),
    #[error("Transaction aborted")]
    Aborted,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {field}")]
    InvalidConfig { field: String },
    #[error("Value out of range for {field}: {value} (expected {range})")]
    ValueOutOfRange {
        field: String,
        value: String,
        range: String,
    },
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::Storage(err.into())
    }
}

impl LedgerError {
    /// True for rejections that leave the ledger unchanged and may be retried
    /// with a different block.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation(_) | LedgerError::Orphan { .. } | LedgerError::Duplicate(_)
        )
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, LedgerError>;
