//! An Ethereum-compatible Merkle-Patricia Trie.
//!
//! [`EthTrie`] builds tries and produces inclusion proofs; [`proof`] checks those proofs against a root hash
//! without access to the trie itself.

mod db;
mod errors;
mod nibbles;
mod node;
pub mod proof;
mod trie;

pub use db::{MemoryDB, DB};
pub use errors::TrieError;
pub use nibbles::Nibbles;
pub use proof::{ProofError, TrieNode};
pub use trie::{EthTrie, Trie, TrieResult, EMPTY_ROOT};
