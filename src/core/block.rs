//! Block data structures and validation logic.
//!
//! A block is a header plus an ordered sequence of opaque data items. The
//! header commits to the data through its merkle root and to its parent
//! through `prev_hash`.

use crate::crypto::{hash_data, merkle_root, Hash256, MerkleProof, MerkleTree};
use crate::error::{Result, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp of the genesis block
pub const GENESIS_TIMESTAMP: &str = "1993-08-08T00:00:00Z";

/// Largest `extra` the 4-byte length prefix can describe
pub const MAX_EXTRA_LEN: usize = u32::MAX as usize;

/// Optional caller-supplied check on a header's `extra` bytes
pub type ExtraValidator<'a> = Option<&'a dyn Fn(&[u8]) -> bool>;

/// Block header containing metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Position along the branch, genesis is 0
    pub index: u64,
    /// Creation time in Unix seconds
    pub time: i64,
    /// Hash of the parent header, zero for genesis
    pub prev_hash: Hash256,
    /// Merkle root of the block data
    pub merkle_root: Hash256,
    /// Application-defined bytes
    pub extra: Vec<u8>,
}

impl BlockHeader {
    /// Canonical encoding used for hashing.
    ///
    /// `index` and `time` are 8-byte big-endian, both hashes are fixed width
    /// and `extra` carries a 4-byte big-endian length prefix.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + 8 + 2 * Hash256::LEN + 4 + self.extra.len());
        buf.extend_from_slice(&self.index.to_be_bytes());
        buf.extend_from_slice(&self.time.to_be_bytes());
        buf.extend_from_slice(self.prev_hash.as_slice());
        buf.extend_from_slice(self.merkle_root.as_slice());
        // Oversized `extra` fails validation, so the saturated prefix never
        // reaches a stored header.
        let extra_len = u32::try_from(self.extra.len()).unwrap_or(u32::MAX);
        buf.extend_from_slice(&extra_len.to_be_bytes());
        buf.extend_from_slice(&self.extra);
        buf
    }

    /// Calculate the hash of this block header
    pub fn hash(&self) -> Hash256 {
        hash_data(&self.to_bytes())
    }

    /// Check if this is a genesis header
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_hash.is_zero()
    }
}

/// Complete block structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header
    pub header: BlockHeader,
    /// Opaque data items committed to by the header
    pub data: Vec<Vec<u8>>,
}

impl Block {
    /// Create a block extending `parent`, stamped with the current time
    pub fn new(parent: &BlockHeader, extra: Vec<u8>, data: Vec<Vec<u8>>) -> Self {
        Self::with_time(parent, Utc::now().timestamp(), extra, data)
    }

    /// Create a block extending `parent` with an explicit timestamp
    pub fn with_time(parent: &BlockHeader, time: i64, extra: Vec<u8>, data: Vec<Vec<u8>>) -> Self {
        let header = BlockHeader {
            index: parent.index + 1,
            time,
            prev_hash: parent.hash(),
            merkle_root: merkle_root(&data),
            extra,
        };
        Self { header, data }
    }

    /// Create the genesis block
    ///
    /// # Panics
    ///
    /// Panics if [`GENESIS_TIMESTAMP`] is not valid RFC 3339.
    pub fn genesis() -> Self {
        let time = DateTime::parse_from_rfc3339(GENESIS_TIMESTAMP)
            .expect("genesis timestamp constant must be valid RFC 3339")
            .with_timezone(&Utc)
            .timestamp();

        Self {
            header: BlockHeader {
                index: 0,
                time,
                prev_hash: Hash256::zero(),
                merkle_root: Hash256::zero(),
                extra: Vec::new(),
            },
            data: Vec::new(),
        }
    }

    /// Get the hash of this block
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }

    /// Index of this block along its branch
    pub fn index(&self) -> u64 {
        self.header.index
    }

    /// Check the block against the header of its claimed parent.
    ///
    /// Reports the first broken rule: index, time, parent hash, merkle root,
    /// `extra` length, then `extra` when a validator is supplied.
    pub fn validate(
        &self,
        parent: &BlockHeader,
        extra_validator: ExtraValidator<'_>,
    ) -> std::result::Result<(), ValidationError> {
        let header = &self.header;

        if header.index != parent.index + 1 {
            return Err(ValidationError::InvalidIndex {
                expected: parent.index + 1,
                actual: header.index,
            });
        }

        if header.time < parent.time {
            return Err(ValidationError::TimeRegression {
                time: header.time,
                parent_time: parent.time,
            });
        }

        let parent_hash = parent.hash();
        if header.prev_hash != parent_hash {
            return Err(ValidationError::InvalidPreviousHash {
                expected: parent_hash,
                actual: header.prev_hash,
            });
        }

        let computed_root = merkle_root(&self.data);
        if header.merkle_root != computed_root {
            return Err(ValidationError::InvalidMerkleRoot {
                expected: computed_root,
                actual: header.merkle_root,
            });
        }

        check_extra_len(header.extra.len())?;

        if let Some(is_extra_valid) = extra_validator {
            if !is_extra_valid(&header.extra) {
                return Err(ValidationError::ExtraRejected);
            }
        }

        Ok(())
    }

    /// Predicate form of [`Block::validate`]
    pub fn is_valid(&self, parent: &BlockHeader, extra_validator: ExtraValidator<'_>) -> bool {
        self.validate(parent, extra_validator).is_ok()
    }

    /// Get the merkle tree over this block's data
    pub fn merkle_tree(&self) -> MerkleTree {
        MerkleTree::new(&self.data)
    }

    /// Inclusion proof for the data item at `item_index`
    pub fn merkle_proof(&self, item_index: usize) -> Result<MerkleProof> {
        self.merkle_tree().generate_proof(item_index)
    }
}

fn check_extra_len(len: usize) -> std::result::Result<(), ValidationError> {
    if len > MAX_EXTRA_LEN {
        return Err(ValidationError::ExtraTooLarge {
            len,
            max: MAX_EXTRA_LEN,
        });
    }
    Ok(())
}
