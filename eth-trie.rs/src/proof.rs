//! Stateless verification of Merkle-Patricia proofs.
//!
//! A proof is the list of node encodings a trie walk touches, ordered from the root. Verification needs nothing but
//! the root hash: each node must hash to the reference its parent holds, the key is consumed node by node, and the
//! walk has to use every node it was given.

use alloy::primitives::{keccak256, B256};
use rlp::{DecoderError, Prototype, Rlp};

use crate::nibbles::Nibbles;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    #[error("proof contains no nodes")]
    EmptyProof,
    #[error("proof node {index} does not match the hash its parent refers to")]
    HashMismatch { index: usize },
    #[error("proof node {index} could not be decoded: {reason}")]
    Decode { index: usize, reason: String },
    #[error("proof ends before the key is resolved")]
    Incomplete,
    #[error("proof has {extra} unused trailing node(s)")]
    TrailingNodes { extra: usize },
    #[error("key is not included under the given root")]
    KeyNotIncluded,
    #[error("proven value does not match the expected value")]
    ValueMismatch,
}

/// A reference from a node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Empty,
    Hash(B256),
    /// The RLP of a child whose encoding is shorter than a hash.
    Inline(Vec<u8>),
}

/// A decoded trie node, as found in a proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrieNode {
    Empty,
    Branch {
        children: Box<[NodeRef; 16]>,
        value: Option<Vec<u8>>,
    },
    Extension {
        path: Nibbles,
        child: NodeRef,
    },
    Leaf {
        path: Nibbles,
        value: Vec<u8>,
    },
}

impl TrieNode {
    pub fn decode(data: &[u8]) -> Result<Self, DecoderError> {
        let r = Rlp::new(data);
        match r.prototype()? {
            Prototype::Data(0) => Ok(TrieNode::Empty),
            Prototype::List(2) => {
                let (path, is_leaf) = Nibbles::from_compact(r.at(0)?.data()?)
                    .map_err(|_| DecoderError::Custom("invalid hex-prefix path"))?;
                if is_leaf {
                    Ok(TrieNode::Leaf {
                        path,
                        value: r.at(1)?.data()?.to_vec(),
                    })
                } else {
                    Ok(TrieNode::Extension {
                        path,
                        child: NodeRef::decode(&r.at(1)?)?,
                    })
                }
            }
            Prototype::List(17) => {
                let mut children: [NodeRef; 16] = std::array::from_fn(|_| NodeRef::Empty);
                for (i, child) in children.iter_mut().enumerate() {
                    *child = NodeRef::decode(&r.at(i)?)?;
                }
                let value_rlp = r.at(16)?;
                let value = if value_rlp.is_empty() {
                    None
                } else {
                    Some(value_rlp.data()?.to_vec())
                };
                Ok(TrieNode::Branch {
                    children: Box::new(children),
                    value,
                })
            }
            _ => Err(DecoderError::Custom("unexpected trie node shape")),
        }
    }
}

impl NodeRef {
    fn decode(r: &Rlp) -> Result<Self, DecoderError> {
        if r.is_list() {
            Ok(NodeRef::Inline(r.as_raw().to_vec()))
        } else if r.is_empty() {
            Ok(NodeRef::Empty)
        } else if r.size() == 32 {
            Ok(NodeRef::Hash(B256::from_slice(r.data()?)))
        } else {
            Err(DecoderError::Custom("invalid child reference"))
        }
    }
}

/// Walks `proof` from `root_hash` along `key` and returns the proven value, or `None` if the proof shows the key is
/// absent.
pub fn read_proof(
    root_hash: B256,
    key: &[u8],
    proof: &[Vec<u8>],
) -> Result<Option<Vec<u8>>, ProofError> {
    if proof.is_empty() {
        return Err(ProofError::EmptyProof);
    }

    let path = Nibbles::from_raw(key);
    let mut remaining = path.as_slice();
    let mut used = 0;
    let mut next = NodeRef::Hash(root_hash);

    let finish = |used: usize, value: Option<Vec<u8>>| {
        if used < proof.len() {
            Err(ProofError::TrailingNodes {
                extra: proof.len() - used,
            })
        } else {
            Ok(value)
        }
    };

    loop {
        let (encoded, index) = match next {
            NodeRef::Empty => return finish(used, None),
            NodeRef::Hash(hash) => {
                let encoded = proof.get(used).ok_or(ProofError::Incomplete)?;
                if keccak256(encoded) != hash {
                    return Err(ProofError::HashMismatch { index: used });
                }
                used += 1;
                (encoded.clone(), used - 1)
            }
            // Inline nodes are part of the proof node that contained them.
            NodeRef::Inline(raw) => (raw, used.saturating_sub(1)),
        };

        let node = TrieNode::decode(&encoded).map_err(|e| ProofError::Decode {
            index,
            reason: e.to_string(),
        })?;

        match node {
            TrieNode::Empty => return finish(used, None),
            TrieNode::Leaf { path, value } => {
                let found = (path.as_slice() == remaining).then_some(value);
                return finish(used, found);
            }
            TrieNode::Extension { path, child } => {
                if !remaining.starts_with(path.as_slice()) {
                    return finish(used, None);
                }
                remaining = &remaining[path.len()..];
                next = child;
            }
            TrieNode::Branch { children, value } => match remaining.split_first() {
                None => return finish(used, value),
                Some((&index, rest)) => {
                    remaining = rest;
                    next = children[index as usize].clone();
                }
            },
        }
    }
}

/// Checks that `proof` shows `key` maps to `expected` under `root_hash`. Passing `None` checks that the key is absent.
pub fn verify_proof(
    root_hash: B256,
    key: &[u8],
    expected: Option<&[u8]>,
    proof: &[Vec<u8>],
) -> Result<(), ProofError> {
    match (read_proof(root_hash, key, proof)?, expected) {
        (Some(value), Some(expected)) if value == expected => Ok(()),
        (None, None) => Ok(()),
        (None, Some(_)) => Err(ProofError::KeyNotIncluded),
        _ => Err(ProofError::ValueMismatch),
    }
}

pub fn verify(root_hash: B256, key: &[u8], expected: Option<&[u8]>, proof: &[Vec<u8>]) -> bool {
    verify_proof(root_hash, key, expected, proof).is_ok()
}
