//! Backward traversal of stored blocks.

use crate::core::Block;
use crate::crypto::Hash256;
use crate::error::{LedgerError, Result};
use crate::storage::Store;
use std::iter::FusedIterator;
use tracing::debug;

/// Walks a branch from a starting hash back to genesis.
///
/// Each step reads the block under the cursor and moves the cursor to that
/// block's parent. The walk ends once the cursor reaches the zero hash, which
/// is genesis's parent. Single pass; build a new iterator to start over.
#[derive(Debug, Clone)]
pub struct ChainIterator {
    store: Store,
    cursor: Hash256,
}

impl ChainIterator {
    pub fn new(store: Store, start: Hash256) -> Self {
        Self { store, cursor: start }
    }

    /// Hash of the block the next call to [`ChainIterator::prev`] returns
    pub fn cursor(&self) -> Hash256 {
        self.cursor
    }

    /// Return the block under the cursor and step to its parent.
    ///
    /// `Ok(None)` marks the end of the chain.
    pub fn prev(&mut self) -> Result<Option<Block>> {
        if self.cursor.is_zero() {
            return Ok(None);
        }

        let block = self
            .store
            .load_block(&self.cursor)?
            .ok_or_else(|| LedgerError::NotFound(format!("block {}", self.cursor)))?;

        debug!(index = block.header.index, hash = %self.cursor, "iterator step");
        self.cursor = block.header.prev_hash;
        Ok(Some(block))
    }
}

impl Iterator for ChainIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.prev() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => None,
            Err(e) => {
                self.cursor = Hash256::zero();
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for ChainIterator {}
