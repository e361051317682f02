use alloy::primitives::B256;
use rlp::DecoderError;

use crate::proof::ProofError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrieError {
    #[error("trie database error: {0}")]
    DB(String),
    #[error("rlp decoding failed: {0}")]
    Decoder(#[from] DecoderError),
    #[error("invalid trie node data")]
    InvalidData,
    #[error("invalid proof: {0}")]
    InvalidProof(#[from] ProofError),
    #[error("missing trie node {node_hash} (root: {root_hash:?}, key: {err_key:?})")]
    MissingTrieNode {
        node_hash: B256,
        root_hash: Option<B256>,
        err_key: Option<Vec<u8>>,
    },
}

impl TrieError {
    /// Attaches the key being looked up to a missing node error.
    pub(crate) fn with_key(self, key: &[u8]) -> Self {
        match self {
            TrieError::MissingTrieNode {
                node_hash,
                root_hash,
                err_key: _,
            } => TrieError::MissingTrieNode {
                node_hash,
                root_hash,
                err_key: Some(key.to_vec()),
            },
            other => other,
        }
    }
}
