//! Persistent storage layer for the ledger.
//!
//! Blocks live in a single `sled` tree keyed by header hash. The same tree
//! holds two reserved records: the serialized list of tip hashes and the
//! best-tip hash. Reserved keys are shorter than a hash, so they never
//! collide with a block key.
//!
//! Multi-key updates are collected in a [`WriteBatch`] and applied by
//! [`Store::commit`] inside one `sled` transaction: either every write lands
//! or none does.

use crate::config::StorageConfig;
use crate::core::Block;
use crate::crypto::Hash256;
use crate::error::{ConfigError, Result, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Tree};
use std::path::Path;
use tracing::debug;

/// Storage keys for the reserved records
pub mod keys {
    /// Name of the tree holding blocks and ledger records
    pub const BLOCKS_TREE: &[u8] = b"blocks";
    /// Serialized `Vec<Hash256>` of branch tips
    pub const TIPS: &[u8] = b"tips";
    /// Serialized `Hash256` of the best tip
    pub const BEST_TIP: &[u8] = b"bestTip";
}

/// Serialize a value for storage
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StorageError::from(e).into())
}

/// Deserialize a stored value
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| StorageError::from(e).into())
}

/// Page cache size in bytes for a size given in MB
pub fn cache_capacity_bytes(cache_capacity_mb: usize) -> Result<u64> {
    u64::try_from(cache_capacity_mb)
        .ok()
        .and_then(|mb| mb.checked_mul(1024 * 1024))
        .ok_or_else(|| {
            ConfigError::ValueOutOfRange {
                field: "storage.cache_capacity_mb".to_string(),
                value: cache_capacity_mb.to_string(),
                range: format!("1..={}", u64::MAX / (1024 * 1024)),
            }
            .into()
        })
}

/// Pending writes applied atomically by [`Store::commit`]
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    writes: Vec<(Vec<u8>, Vec<u8>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw key/value write
    pub fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.writes.push((key.to_vec(), value));
    }

    /// Queue a block under its header hash
    pub fn put_block(&mut self, block: &Block) -> Result<Hash256> {
        let hash = block.hash();
        self.set(hash.as_slice(), encode(block)?);
        Ok(hash)
    }

    /// Queue the tip-hash list
    pub fn put_tips(&mut self, tips: &[Hash256]) -> Result<()> {
        self.set(keys::TIPS, encode(&tips.to_vec())?);
        Ok(())
    }

    /// Queue the best-tip hash
    pub fn put_best_tip(&mut self, hash: &Hash256) -> Result<()> {
        self.set(keys::BEST_TIP, encode(hash)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Handle to the ledger's key-value store
///
/// Cloning is cheap; clones share the same database.
#[derive(Debug, Clone)]
pub struct Store {
    db: Db,
    blocks: Tree,
    flush_on_commit: bool,
}

impl Store {
    /// Open (or create) the store described by `config`
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let cache_capacity = cache_capacity_bytes(config.cache_capacity_mb)?;
        let db = sled::Config::new()
            .path(&config.db_path)
            .cache_capacity(cache_capacity)
            .open()
            .map_err(StorageError::from)?;
        Self::from_db(db, config.flush_on_commit)
    }

    /// Open a store at `path` with default settings
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = StorageConfig {
            db_path: path.as_ref().to_path_buf(),
            ..StorageConfig::default()
        };
        Self::open(&config)
    }

    fn from_db(db: Db, flush_on_commit: bool) -> Result<Self> {
        let blocks = db.open_tree(keys::BLOCKS_TREE).map_err(StorageError::from)?;
        Ok(Self {
            db,
            blocks,
            flush_on_commit,
        })
    }

    /// Read a raw value
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self.blocks.get(key).map_err(StorageError::from)?;
        Ok(value.map(|v| v.to_vec()))
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.blocks.contains_key(key).map_err(StorageError::from)?)
    }

    /// Load a block by header hash, `None` if absent
    pub fn load_block(&self, hash: &Hash256) -> Result<Option<Block>> {
        self.get(hash.as_slice())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Load the tip-hash list, `None` on an uninitialized store
    pub fn load_tips(&self) -> Result<Option<Vec<Hash256>>> {
        self.get(keys::TIPS)?.map(|bytes| decode(&bytes)).transpose()
    }

    /// Load the best-tip hash, `None` on an uninitialized store
    pub fn load_best_tip(&self) -> Result<Option<Hash256>> {
        self.get(keys::BEST_TIP)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Apply every write in `batch` in a single transaction
    pub fn commit(&self, batch: WriteBatch) -> Result<()> {
        let result: std::result::Result<(), TransactionError<()>> =
            self.blocks.transaction(|tx| {
                for (key, value) in &batch.writes {
                    tx.insert(key.as_slice(), value.as_slice())?;
                }
                Ok::<(), ConflictableTransactionError<()>>(())
            });

        match result {
            Ok(()) => {}
            Err(TransactionError::Storage(e)) => return Err(StorageError::from(e).into()),
            Err(TransactionError::Abort(())) => return Err(StorageError::Aborted.into()),
        }
        debug!(writes = batch.len(), "committed write batch");
        Ok(())
    }

    /// Flush if the store was opened with `flush_on_commit`.
    ///
    /// Separate from [`Store::commit`]: a failed flush does not undo a
    /// committed transaction.
    pub fn sync(&self) -> Result<()> {
        if self.flush_on_commit {
            self.flush()?;
        }
        Ok(())
    }

    /// True when no block or ledger record has been written
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush().map_err(StorageError::from)?;
        Ok(())
    }
}
