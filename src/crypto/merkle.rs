//! Merkle commitment over block data.
//!
//! Leaves are `sha256(item)`, a parent is `sha256(left || right)` and an odd
//! node at the end of a level is paired with itself. The root of an empty
//! sequence is the zero hash.

use crate::crypto::{hash_data, hash_multiple, Hash256};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Compute the merkle root of a sequence of data items
pub fn merkle_root<T: AsRef<[u8]>>(items: &[T]) -> Hash256 {
    MerkleTree::new(items).root()
}

fn hash_pair(left: &Hash256, right: &Hash256) -> Hash256 {
    hash_multiple(&[left.as_slice(), right.as_slice()])
}

fn next_level(level: &[Hash256]) -> Vec<Hash256> {
    level
        .chunks(2)
        .map(|chunk| match chunk {
            [left, right] => hash_pair(left, right),
            [single] => hash_pair(single, single),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

/// A merkle tree kept level by level, leaves first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash256>>,
}

impl MerkleTree {
    /// Create a new merkle tree from leaf data
    pub fn new<T: AsRef<[u8]>>(items: &[T]) -> Self {
        let leaves: Vec<Hash256> = items.iter().map(|item| hash_data(item.as_ref())).collect();
        Self::from_hashes(leaves)
    }

    /// Create a merkle tree from pre-computed leaf hashes
    pub fn from_hashes(leaves: Vec<Hash256>) -> Self {
        let mut levels = vec![leaves];
        while levels.last().map_or(false, |level| level.len() > 1) {
            let level = next_level(&levels[levels.len() - 1]);
            levels.push(level);
        }
        Self { levels }
    }

    /// Root hash of the tree, zero for an empty tree
    pub fn root(&self) -> Hash256 {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_else(Hash256::zero)
    }

    /// Number of levels above the leaves
    pub fn height(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Get the number of leaves
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Get all leaf hashes
    pub fn leaves(&self) -> &[Hash256] {
        &self.levels[0]
    }

    /// Generate an inclusion proof for the leaf at `leaf_index`
    pub fn generate_proof(&self, leaf_index: usize) -> Result<MerkleProof> {
        if leaf_index >= self.leaf_count() {
            return Err(LedgerError::Crypto(format!(
                "invalid leaf index {} for tree of {} leaves",
                leaf_index,
                self.leaf_count()
            )));
        }

        let mut proof_hashes = Vec::with_capacity(self.height());
        let mut proof_directions = Vec::with_capacity(self.height());
        let mut current_index = leaf_index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = if current_index % 2 == 0 {
                (current_index + 1).min(level.len() - 1)
            } else {
                current_index - 1
            };
            proof_hashes.push(level[sibling_index]);
            // true if the current node is the left child
            proof_directions.push(current_index % 2 == 0);
            current_index /= 2;
        }

        Ok(MerkleProof {
            leaf_hash: self.levels[0][leaf_index],
            leaf_index,
            proof_hashes,
            proof_directions,
            root_hash: self.root(),
        })
    }
}

/// A proof of inclusion for a leaf in a merkle tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf hash being proven
    pub leaf_hash: Hash256,
    /// Index of the leaf in the tree
    pub leaf_index: usize,
    /// Sibling hashes along the path to root
    pub proof_hashes: Vec<Hash256>,
    /// Direction indicators (true = current node is left child)
    pub proof_directions: Vec<bool>,
    /// Expected root hash
    pub root_hash: Hash256,
}

impl MerkleProof {
    /// Verify this proof against a given root hash
    pub fn verify(&self, expected_root: &Hash256) -> bool {
        if self.root_hash != *expected_root || self.proof_hashes.len() != self.proof_directions.len() {
            return false;
        }

        let computed = self
            .proof_hashes
            .iter()
            .zip(&self.proof_directions)
            .fold(self.leaf_hash, |current, (sibling, is_left)| {
                if *is_left {
                    hash_pair(&current, sibling)
                } else {
                    hash_pair(sibling, &current)
                }
            });

        computed == *expected_root
    }

    /// Verify that `item` is the proven leaf and that it belongs under `expected_root`
    pub fn verify_item(&self, item: &[u8], expected_root: &Hash256) -> bool {
        hash_data(item) == self.leaf_hash && self.verify(expected_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_root_is_zero() {
        let items: Vec<Vec<u8>> = Vec::new();
        assert!(merkle_root(&items).is_zero());
        assert_eq!(MerkleTree::new(&items).leaf_count(), 0);
    }

    #[test]
    fn test_single_leaf_root_is_leaf_hash() {
        let tree = MerkleTree::new(&["single"]);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.root(), hash_data(b"single"));
    }

    #[test]
    fn test_two_leaf_root() {
        let root = merkle_root(&["a", "b"]);
        let expected = hash_multiple(&[hash_data(b"a").as_slice(), hash_data(b"b").as_slice()]);
        assert_eq!(root, expected);
    }

    #[test]
    fn test_odd_leaf_is_paired_with_itself() {
        let root = merkle_root(&["a", "b", "c"]);
        let ab = hash_pair(&hash_data(b"a"), &hash_data(b"b"));
        let cc = hash_pair(&hash_data(b"c"), &hash_data(b"c"));
        assert_eq!(root, hash_pair(&ab, &cc));
    }

    #[test]
    fn test_root_depends_on_order() {
        assert_ne!(merkle_root(&["a", "b"]), merkle_root(&["b", "a"]));
    }

    #[test]
    fn test_proofs_verify_for_every_leaf() {
        let data = ["tx1", "tx2", "tx3", "tx4", "tx5"];
        let tree = MerkleTree::new(&data);
        let root = tree.root();

        for (i, item) in data.iter().enumerate() {
            let proof = tree.generate_proof(i).unwrap();
            assert!(proof.verify(&root));
            assert!(proof.verify_item(item.as_bytes(), &root));
        }
    }

    #[test]
    fn test_proof_rejects_wrong_root_and_item() {
        let tree = MerkleTree::new(&["tx1", "tx2"]);
        let proof = tree.generate_proof(0).unwrap();

        assert!(!proof.verify(&hash_data(b"other root")));
        assert!(!proof.verify_item(b"tx2", &tree.root()));
    }

    #[test]
    fn test_proof_index_out_of_range() {
        let tree = MerkleTree::new(&["tx1"]);
        assert!(matches!(tree.generate_proof(1), Err(LedgerError::Crypto(_))));
    }
}
