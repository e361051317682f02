//! What an off-chain facilitator does between the two chains. Nothing here is trusted by the gateways: anchoring is
//! restricted to the reporter and every proof is checked against the anchored roots.

use alloy::primitives::{Address, B256};
use tracing::*;

use crate::{
    error::Result,
    ledger::Ledger,
    message::MessageBox,
    proof::AccountProof,
    token::UtilityToken,
};

/// Anchors the latest state root of `source` into `target`, unless it is already anchored. Returns the anchored
/// height.
pub fn relay_anchor<S: UtilityToken + Clone, T: UtilityToken + Clone>(
    source: &Ledger<S>,
    target: &mut Ledger<T>,
    reporter: Address,
) -> Result<u64> {
    let block_height = source.block_number();
    let state_root = source.block_root(block_height)?;
    if target.anchor().get(block_height) == Some(state_root) {
        debug!(block_height, "state root already anchored");
        return Ok(block_height);
    }
    target.anchor_state_root(reporter, block_height, state_root)?;
    Ok(block_height)
}

/// Proof of a message in the outbox of `source`, at `block_height`.
pub fn outbox_proof<T: UtilityToken + Clone>(
    source: &Ledger<T>,
    message_hash: B256,
    block_height: u64,
) -> Result<AccountProof> {
    source.message_proof(MessageBox::Outbox, message_hash, block_height)
}

/// Proof of a message in the inbox of `source`, at `block_height`.
pub fn inbox_proof<T: UtilityToken + Clone>(
    source: &Ledger<T>,
    message_hash: B256,
    block_height: u64,
) -> Result<AccountProof> {
    source.message_proof(MessageBox::Inbox, message_hash, block_height)
}
