//! Merkle commitments over 32-byte leaves, with authentication paths.
//!
//! Construction matches the canonical parent combiner used everywhere in
//! the workspace: `BLAKE3(left || right)`, with odd leaves promoted
//! unhashed to the next level (left-balanced).

use blake3::Hasher;
use serde::{Deserialize, Serialize};

/// Hash two children into their parent.
#[inline]
#[must_use]
pub fn merkle_parent(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut h = Hasher::new();
    h.update(a);
    h.update(b);
    *h.finalize().as_bytes()
}

/// Authentication path for one leaf.
///
/// `siblings[i]` is the sibling at level `i` (leaves = level 0); `None`
/// marks a level where the node was promoted without a sibling.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MerklePath {
    /// Leaf index the path authenticates.
    pub index: u32,
    /// Bottom-up sibling hashes.
    pub siblings: Vec<Option<[u8; 32]>>,
}

/// In-memory Merkle tree retaining every level for opening.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Build a tree over `leaves`. An empty leaf set commits to the
    /// all-zero root.
    #[must_use]
    pub fn from_leaves(leaves: Vec<[u8; 32]>) -> Self {
        let mut levels = vec![leaves];
        while levels.last().map_or(false, |l| l.len() > 1) {
            let cur = levels.last().expect("non-empty by construction");
            let mut next = Vec::with_capacity((cur.len() + 1) / 2);
            for i in (0..cur.len()).step_by(2) {
                if i + 1 < cur.len() {
                    next.push(merkle_parent(&cur[i], &cur[i + 1]));
                } else {
                    next.push(cur[i]);
                }
            }
            levels.push(next);
        }
        Self { levels }
    }

    /// Root commitment.
    #[must_use]
    pub fn root(&self) -> [u8; 32] {
        self.levels
            .last()
            .and_then(|l| l.first().copied())
            .unwrap_or([0u8; 32])
    }

    /// Number of leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Whether the tree has no leaves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Open the leaf at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range; callers index within `len()`.
    #[must_use]
    pub fn open(&self, index: usize) -> MerklePath {
        assert!(index < self.len(), "leaf index out of range");
        let mut siblings = Vec::new();
        let mut idx = index;
        for level in &self.levels[..self.levels.len().saturating_sub(1)] {
            let sib = idx ^ 1;
            siblings.push(level.get(sib).copied());
            idx >>= 1;
        }
        MerklePath {
            index: index as u32,
            siblings,
        }
    }
}

/// Check a leaf against a root via its authentication path.
#[must_use]
pub fn verify_path(root: &[u8; 32], leaf: &[u8; 32], path: &MerklePath) -> bool {
    let mut cur = *leaf;
    let mut idx = path.index as usize;
    for sib in &path.siblings {
        cur = match sib {
            Some(s) if idx & 1 == 0 => merkle_parent(&cur, s),
            Some(s) => merkle_parent(s, &cur),
            None => cur,
        };
        idx >>= 1;
    }
    cur == *root
}
