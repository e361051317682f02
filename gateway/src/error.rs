use alloy::primitives::B256;
use eth_trie::{ProofError, TrieError};

use crate::token::TokenError;

/// A rejected gateway call. Every variant leaves the ledger exactly as it was before the call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },
    #[error("invalid amount: {0}")]
    InvalidAmount(&'static str),
    #[error("beneficiary must not be the zero address")]
    InvalidBeneficiary,
    #[error("unlock secret does not match the hash lock")]
    InvalidSecret,
    #[error("proof verification failed: {0}")]
    ProofInvalid(#[from] ProofError),
    #[error("no state root is anchored for block {block_height}")]
    ProofTooOld { block_height: u64 },
    #[error("block {block_height} is newer than the latest anchored block {latest}")]
    NotYetAnchored { block_height: u64, latest: u64 },
    #[error("message is already finalized")]
    AlreadyFinalized,
    #[error("message revocation is in progress")]
    RevocationInProgress,
    #[error("message can not be revoked for another {remaining} block(s)")]
    NotYetUnlockable { remaining: u64 },
    #[error("caller is not allowed to perform this operation")]
    Unauthorized,
    #[error("anchor height {block_height} is not above the latest anchored height {latest}")]
    NonMonotonicHeight { block_height: u64, latest: u64 },
    #[error("message {0} is already declared")]
    MessageExists(B256),
    #[error("unknown message {0}")]
    UnknownMessage(B256),
    #[error("message is in status {0:?}, which does not allow this operation")]
    InvalidStatus(crate::message::MessageStatus),
    #[error("previous process of the account is not finalized")]
    PreviousProcessNotFinalized,
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("state trie error: {0}")]
    Trie(#[from] TrieError),
    #[error("no state root recorded for block {0}")]
    UnknownBlock(u64),
    #[error("token {0} is not registered on this chain")]
    UnknownToken(alloy::primitives::Address),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = GatewayError> = std::result::Result<T, E>;
