//! Merkle tree utilities for batch commitments.
//!
//! Proof artifacts are batched and committed as leaves of a binary Merkle
//! tree (RFC 6962 style): when a level has an odd number of nodes, the last
//! node is duplicated rather than padded with a zero hash. This matches the
//! node-duplication convention already used by external batch-anchoring
//! services this validator submits to, so a batch root computed here and a
//! root recomputed independently downstream always agree.
//!
//! # Performance
//!
//! - Tree construction: O(n) hashes for n leaves
//! - Proof generation: O(log n) per proof, O(n log n) total
//! - Proof verification: O(log n) hashes

use crate::Hash;
use serde::{Deserialize, Serialize};

/// Which side of its sibling a node sits on, for inclusion-path replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    /// This node is the left child; the path entry is the right sibling.
    Left,
    /// This node is the right child; the path entry is the left sibling.
    Right,
}

/// One step of a Merkle inclusion path: a sibling hash plus which side it
/// sits on relative to the node being folded up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathNode {
    /// The sibling hash at this level.
    pub hash: Hash,
    /// Which side `hash` is on.
    pub position: Position,
}

/// Merkle inclusion proof (path) for a leaf in a binary Merkle tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// Index of the leaf in the tree (0-based, dense, pre-padding).
    pub leaf_index: u32,

    /// Ordered sibling nodes from leaf to root.
    pub path: Vec<PathNode>,
}

impl MerklePath {
    /// Verify that `leaf_hash` is included in `root` along this path.
    pub fn verify(&self, leaf_hash: &Hash, root: &Hash) -> bool {
        let mut current = *leaf_hash;
        for node in &self.path {
            current = match node.position {
                Position::Right => hash_pair(&current, &node.hash),
                Position::Left => hash_pair(&node.hash, &current),
            };
        }
        current == *root
    }

    /// Depth of the tree this proof is for.
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

/// Fold two sibling hashes into their parent: `SHA-256(left || right)`.
#[inline]
fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(left.as_bytes());
    data[32..].copy_from_slice(right.as_bytes());
    Hash::from_bytes(&data)
}

/// Build a Merkle tree from leaf hashes and produce the inclusion path for
/// each leaf, in input order.
///
/// # Algorithm
///
/// At each level, pairs are folded left-to-right; if the level has an odd
/// number of nodes the last one is duplicated as its own sibling (RFC 6962
/// odd-duplication), rather than padded to the next power of two.
///
/// # Panics
///
/// Panics if `leaves` is empty.
pub fn build_merkle_tree_with_paths(leaves: &[Hash]) -> (Hash, Vec<MerklePath>) {
    assert!(!leaves.is_empty(), "cannot build a Merkle tree with no leaves");

    if leaves.len() == 1 {
        return (
            leaves[0],
            vec![MerklePath {
                leaf_index: 0,
                path: vec![],
            }],
        );
    }

    // levels[0] is the leaf level; each subsequent level is built by pairing
    // (and, for an odd tail, duplicating) the previous one.
    let mut levels: Vec<Vec<Hash>> = vec![leaves.to_vec()];
    while levels.last().unwrap().len() > 1 {
        let current = levels.last().unwrap();
        let mut next = Vec::with_capacity(current.len().div_ceil(2));
        let mut i = 0;
        while i < current.len() {
            if i + 1 < current.len() {
                next.push(hash_pair(&current[i], &current[i + 1]));
            } else {
                // Odd node at this level: duplicate it against itself.
                next.push(hash_pair(&current[i], &current[i]));
            }
            i += 2;
        }
        levels.push(next);
    }

    let root = levels.last().unwrap()[0];

    let paths = (0..leaves.len())
        .map(|leaf_idx| {
            let mut path = Vec::with_capacity(levels.len() - 1);
            let mut idx = leaf_idx;
            for level in &levels[..levels.len() - 1] {
                let is_right = idx % 2 == 1;
                let sibling_idx = if is_right { idx - 1 } else { idx + 1 };
                // An odd tail's last node is its own sibling.
                let sibling = if sibling_idx < level.len() {
                    level[sibling_idx]
                } else {
                    level[idx]
                };
                path.push(PathNode {
                    hash: sibling,
                    position: if is_right {
                        Position::Left
                    } else {
                        Position::Right
                    },
                });
                idx /= 2;
            }
            MerklePath {
                leaf_index: leaf_idx as u32,
                path,
            }
        })
        .collect();

    (root, paths)
}

/// Deterministic leaf hash for a batched proof artifact:
/// `SHA-256(proof_id || source_tx_hash || leaf_hash)`.
pub fn batch_leaf_hash(proof_id: &Hash, source_tx_hash: &Hash, leaf_hash: &Hash) -> Hash {
    Hash::from_parts(&[
        proof_id.as_bytes(),
        source_tx_hash.as_bytes(),
        leaf_hash.as_bytes(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: u32) -> Vec<Hash> {
        (0..n).map(|i| Hash::from_bytes(&i.to_le_bytes())).collect()
    }

    #[test]
    fn single_leaf() {
        let leaf = Hash::from_bytes(b"single leaf");
        let (root, paths) = build_merkle_tree_with_paths(&[leaf]);
        assert_eq!(root, leaf);
        assert_eq!(paths.len(), 1);
        assert!(paths[0].verify(&leaf, &root));
    }

    #[test]
    fn two_leaves() {
        let leaf0 = Hash::from_bytes(b"leaf 0");
        let leaf1 = Hash::from_bytes(b"leaf 1");
        let (root, paths) = build_merkle_tree_with_paths(&[leaf0, leaf1]);

        assert_eq!(root, hash_pair(&leaf0, &leaf1));
        assert!(paths[0].verify(&leaf0, &root));
        assert!(paths[1].verify(&leaf1, &root));
        assert_eq!(paths[0].depth(), 1);
    }

    #[test]
    fn three_leaves_duplicates_odd_tail() {
        // Scenario seed: root = H(H(L0,L1), H(L2,L2))
        let l = leaves(3);
        let (root, paths) = build_merkle_tree_with_paths(&l);

        let left = hash_pair(&l[0], &l[1]);
        let right = hash_pair(&l[2], &l[2]);
        assert_eq!(root, hash_pair(&left, &right));

        for (i, p) in paths.iter().enumerate() {
            assert!(p.verify(&l[i], &root), "leaf {i} failed to verify");
            assert_eq!(p.depth(), 2);
        }
    }

    #[test]
    fn four_leaves_no_duplication_needed() {
        let l = leaves(4);
        let (root, paths) = build_merkle_tree_with_paths(&l);
        for (i, (p, leaf)) in paths.iter().zip(l.iter()).enumerate() {
            assert!(p.verify(leaf, &root), "proof {i} failed");
            assert_eq!(p.leaf_index, i as u32);
            assert_eq!(p.depth(), 2);
        }
    }

    #[test]
    fn large_tree() {
        let l = leaves(1000);
        let (root, paths) = build_merkle_tree_with_paths(&l);
        assert_eq!(paths.len(), 1000);
        for (i, (p, leaf)) in paths.iter().zip(l.iter()).enumerate() {
            assert!(p.verify(leaf, &root), "proof {i} failed");
        }
    }

    #[test]
    fn proof_rejects_wrong_leaf() {
        let l = leaves(4);
        let (root, paths) = build_merkle_tree_with_paths(&l);
        assert!(!paths[0].verify(&l[1], &root));
    }

    #[test]
    fn proof_rejects_wrong_root() {
        let l = leaves(4);
        let (_, paths) = build_merkle_tree_with_paths(&l);
        let wrong_root = Hash::from_bytes(b"wrong root");
        assert!(!paths[0].verify(&l[0], &wrong_root));
    }

    #[test]
    fn batch_leaf_hash_deterministic_and_differentiated() {
        let proof_id = Hash::from_bytes(b"proof");
        let tx = Hash::from_bytes(b"tx");
        let leaf = Hash::from_bytes(b"leaf");

        assert_eq!(
            batch_leaf_hash(&proof_id, &tx, &leaf),
            batch_leaf_hash(&proof_id, &tx, &leaf)
        );
        let other_tx = Hash::from_bytes(b"other-tx");
        assert_ne!(
            batch_leaf_hash(&proof_id, &tx, &leaf),
            batch_leaf_hash(&proof_id, &other_tx, &leaf)
        );
    }

    #[test]
    #[should_panic(expected = "cannot build a Merkle tree with no leaves")]
    fn empty_leaves_panics() {
        build_merkle_tree_with_paths(&[]);
    }
}
