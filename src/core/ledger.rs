//! Fork-aware block ledger.
//!
//! The ledger owns the store handle and an in-memory cache of the branch
//! tips. Appending a block validates it against the tip it extends, then
//! writes the block, the new tip list and (if it moved) the best-tip pointer
//! in one transaction. The cache is replaced only after that transaction
//! commits.

use crate::config::{Config, ForkPolicy};
use crate::core::{Block, BlockHeader, ChainIterator, ExtraValidator};
use crate::crypto::Hash256;
use crate::error::{LedgerError, Result, StorageError};
use crate::storage::{Store, WriteBatch};
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// A branch head with its cached hash
#[derive(Debug, Clone, PartialEq, Eq)]
struct Tip {
    hash: Hash256,
    header: BlockHeader,
}

impl Tip {
    fn new(header: BlockHeader) -> Self {
        Self {
            hash: header.hash(),
            header,
        }
    }
}

/// Branch tips plus the position of the best one
#[derive(Debug, Clone)]
struct TipSet {
    tips: Vec<Tip>,
    best: usize,
}

impl TipSet {
    fn new(tips: Vec<Tip>) -> Self {
        let best = select_best(&tips);
        Self { tips, best }
    }

    fn position(&self, hash: &Hash256) -> Option<usize> {
        self.tips.iter().position(|tip| tip.hash == *hash)
    }

    fn best(&self) -> &Tip {
        &self.tips[self.best]
    }

    fn hashes(&self) -> Vec<Hash256> {
        self.tips.iter().map(|tip| tip.hash).collect()
    }
}

/// Greatest index wins; among equal indices the smallest hash wins.
fn select_best(tips: &[Tip]) -> usize {
    tips.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.header
                .index
                .cmp(&b.header.index)
                .then_with(|| b.hash.cmp(&a.hash))
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Persistent, fork-aware chain of blocks
#[derive(Debug)]
pub struct Ledger {
    store: Store,
    // Only ever replaced wholesale after a commit, so a poisoned lock still
    // guards a consistent value.
    state: RwLock<TipSet>,
    fork_policy: ForkPolicy,
}

impl Ledger {
    /// Open the ledger described by `config`, creating it if needed
    pub fn open(config: &Config) -> Result<Self> {
        let store = Store::open(&config.storage)?;
        Self::with_store(store, config.ledger.fork_policy)
    }

    /// Open the ledger at `path` with default settings
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_store(Store::open_path(path)?, ForkPolicy::default())
    }

    /// Build a ledger over an open store.
    ///
    /// An empty store is initialized with the genesis block; otherwise the
    /// tips and best tip are loaded back.
    pub fn with_store(store: Store, fork_policy: ForkPolicy) -> Result<Self> {
        let state = match store.load_tips()? {
            None if !store.is_empty() => {
                return Err(StorageError::Corrupted(
                    "records present without a tip list".to_string(),
                )
                .into());
            }
            None => Self::initialize(&store)?,
            Some(hashes) => Self::load(&store, hashes)?,
        };

        Ok(Self {
            store,
            state: RwLock::new(state),
            fork_policy,
        })
    }

    fn initialize(store: &Store) -> Result<TipSet> {
        let genesis = Block::genesis();

        let mut batch = WriteBatch::new();
        let hash = batch.put_block(&genesis)?;
        batch.put_tips(&[hash])?;
        batch.put_best_tip(&hash)?;
        store.commit(batch)?;
        store.sync()?;

        info!(genesis = %hash, "initialized new ledger");
        Ok(TipSet::new(vec![Tip::new(genesis.header)]))
    }

    fn load(store: &Store, hashes: Vec<Hash256>) -> Result<TipSet> {
        if hashes.is_empty() {
            return Err(StorageError::Corrupted("empty tip list".to_string()).into());
        }

        let mut tips = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let block = store.load_block(&hash)?.ok_or_else(|| {
                StorageError::Corrupted(format!("tip {} has no stored block", hash))
            })?;
            tips.push(Tip {
                hash,
                header: block.header,
            });
        }

        let best_hash = store
            .load_best_tip()?
            .ok_or_else(|| StorageError::Corrupted("missing best tip record".to_string()))?;
        let best = tips
            .iter()
            .position(|tip| tip.hash == best_hash)
            .ok_or_else(|| {
                StorageError::Corrupted(format!("best tip {} is not a tip", best_hash))
            })?;

        info!(
            tips = tips.len(),
            best_index = tips[best].header.index,
            best = %best_hash,
            "reopened ledger"
        );
        Ok(TipSet { tips, best })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, TipSet> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, TipSet> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate `block` against the tip it extends and persist it.
    ///
    /// Returns the new block's hash. On any error nothing is written and the
    /// tips are unchanged. A flush failure after the commit is logged, not
    /// returned: the block is already part of the ledger.
    pub fn add_block(&self, block: Block, extra_validator: ExtraValidator<'_>) -> Result<Hash256> {
        // Held across lookup, validation and commit so that concurrent
        // appends cannot both extend the same tip.
        let mut state = self.write_state();

        let hash = block.hash();
        let prev_hash = block.header.prev_hash;

        let (slot, parent) = match state.position(&prev_hash) {
            Some(slot) => (Some(slot), state.tips[slot].header.clone()),
            None => (None, self.fork_parent(&hash, &prev_hash)?),
        };

        if let Err(e) = block.validate(&parent, extra_validator) {
            warn!(index = block.header.index, hash = %hash, error = %e, "rejected invalid block");
            return Err(e.into());
        }

        let mut tips = state.tips.clone();
        let tip = Tip {
            hash,
            header: block.header.clone(),
        };
        match slot {
            Some(slot) => tips[slot] = tip,
            None => tips.push(tip),
        }
        let next = TipSet::new(tips);
        let best_moved = next.best().hash != state.best().hash;

        let mut batch = WriteBatch::new();
        batch.put_block(&block)?;
        batch.put_tips(&next.hashes())?;
        if best_moved {
            batch.put_best_tip(&next.best().hash)?;
        }
        self.store.commit(batch)?;
        *state = next;

        debug!(
            index = block.header.index,
            hash = %hash,
            tips = state.tips.len(),
            fork = slot.is_none(),
            "appended block"
        );
        if best_moved {
            info!(index = state.best().header.index, best = %state.best().hash, "best tip moved");
        }
        drop(state);

        // Already committed and visible; a failed flush only delays durability.
        if let Err(e) = self.store.sync() {
            warn!(hash = %hash, error = %e, "flush after append failed");
        }
        Ok(hash)
    }

    /// Parent header for a block that extends no tip.
    fn fork_parent(&self, hash: &Hash256, prev_hash: &Hash256) -> Result<BlockHeader> {
        let orphan = || {
            warn!(hash = %hash, prev_hash = %prev_hash, "rejected orphan block");
            LedgerError::Orphan {
                prev_hash: *prev_hash,
            }
        };

        match self.fork_policy {
            ForkPolicy::ExtendTips => Err(orphan()),
            ForkPolicy::RetainForks => {
                if self.store.contains(hash.as_slice())? {
                    return Err(LedgerError::Duplicate(*hash));
                }
                match self.store.load_block(prev_hash)? {
                    Some(parent) => Ok(parent.header),
                    None => Err(orphan()),
                }
            }
        }
    }

    /// Fetch a block by header hash
    pub fn get_block(&self, hash: &Hash256) -> Result<Block> {
        self.store
            .load_block(hash)?
            .ok_or_else(|| LedgerError::NotFound(format!("block {}", hash)))
    }

    /// Check whether a block is stored
    pub fn contains(&self, hash: &Hash256) -> Result<bool> {
        self.store.contains(hash.as_slice())
    }

    /// Fetch the block at `index` on the best branch
    pub fn block_at_index(&self, index: u64) -> Result<Block> {
        let best = self.best_tip();
        if index > best.index {
            return Err(LedgerError::NotFound(format!("block at index {}", index)));
        }

        for block in self.iter_from(best.hash()) {
            let block = block?;
            if block.header.index == index {
                return Ok(block);
            }
        }
        Err(LedgerError::NotFound(format!("block at index {}", index)))
    }

    /// Headers of every branch tip
    pub fn tips(&self) -> Vec<BlockHeader> {
        self.read_state()
            .tips
            .iter()
            .map(|tip| tip.header.clone())
            .collect()
    }

    /// Header of the best tip
    pub fn best_tip(&self) -> BlockHeader {
        self.read_state().best().header.clone()
    }

    /// Hash of the best tip
    pub fn best_hash(&self) -> Hash256 {
        self.read_state().best().hash
    }

    /// Tip header with the given hash, if it is a tip
    pub fn tip(&self, hash: &Hash256) -> Option<BlockHeader> {
        let state = self.read_state();
        state.position(hash).map(|i| state.tips[i].header.clone())
    }

    pub fn fork_policy(&self) -> ForkPolicy {
        self.fork_policy
    }

    /// Iterate the best branch from its tip back to genesis
    pub fn iter(&self) -> ChainIterator {
        self.iter_from(self.best_hash())
    }

    /// Iterate from `hash` back to genesis
    pub fn iter_from(&self, hash: Hash256) -> ChainIterator {
        ChainIterator::new(self.store.clone(), hash)
    }

    /// Underlying store handle
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }
}
