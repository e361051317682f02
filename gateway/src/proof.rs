//! `eth_getProof` style proofs, and their verification against an anchored remote state root.

use alloy::primitives::{Address, B256, Bytes, U256, keccak256};
use eth_trie::{EMPTY_ROOT, ProofError, proof};
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{
    anchor::StateAnchor,
    error::{GatewayError, Result},
    message::{MessageBox, MessageStatus},
    state::{Account, encode_word},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProof {
    pub key: B256,
    pub value: U256,
    pub proof: Vec<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProof {
    pub address: Address,
    pub block_number: u64,
    /// RLP of the account, empty if the account does not exist.
    pub encoded_account: Bytes,
    pub account_proof: Vec<Bytes>,
    pub storage_hash: B256,
    pub storage_proof: Vec<StorageProof>,
}

fn nodes(proof: &[Bytes]) -> Vec<Vec<u8>> {
    proof.iter().map(|node| node.to_vec()).collect()
}

impl AccountProof {
    /// Verifies the account of `address` under `state_root` and returns its storage root.
    pub fn verify_account(&self, address: Address, state_root: B256) -> Result<B256> {
        let expected = (!self.encoded_account.is_empty()).then_some(&self.encoded_account[..]);
        proof::verify_proof(
            state_root,
            keccak256(address).as_slice(),
            expected,
            &nodes(&self.account_proof),
        )?;

        let storage_root = match expected {
            Some(encoded) => {
                rlp::decode::<Account>(encoded)
                    .map_err(|e| ProofError::Decode {
                        index: self.account_proof.len().saturating_sub(1),
                        reason: e.to_string(),
                    })?
                    .storage_root
            }
            None => EMPTY_ROOT,
        };
        if storage_root != self.storage_hash {
            return Err(ProofError::ValueMismatch.into());
        }
        Ok(storage_root)
    }

    /// Verifies the storage proof for `slot` under `storage_root` and returns the proven word.
    pub fn verify_storage(&self, storage_root: B256, slot: B256) -> Result<U256> {
        let entry = self
            .storage_proof
            .iter()
            .find(|p| p.key == slot)
            .ok_or(ProofError::EmptyProof)?;

        let expected = (!entry.value.is_zero()).then(|| encode_word(entry.value));
        proof::verify_proof(
            storage_root,
            keccak256(slot).as_slice(),
            expected.as_deref(),
            &nodes(&entry.proof),
        )?;
        Ok(entry.value)
    }
}

/// A proof about the counterpart gateway's storage, checked against the locally anchored remote state roots.
#[derive(Debug, Clone, Copy)]
pub struct CounterpartProof<'a> {
    pub anchor: &'a StateAnchor,
    pub gateway: Address,
    pub proof: &'a AccountProof,
}

impl CounterpartProof<'_> {
    /// The status of `message_hash` in the counterpart's `message_box`, as of the proof's block.
    pub fn message_status(&self, message_box: MessageBox, message_hash: B256) -> Result<MessageStatus> {
        let result = self.verify(message_box, message_hash);
        if let Err(e) = &result {
            warn!(
                %message_hash,
                ?message_box,
                block_number = self.proof.block_number,
                error = %e,
                "rejected counterpart proof"
            );
        }
        result
    }

    fn verify(&self, message_box: MessageBox, message_hash: B256) -> Result<MessageStatus> {
        let state_root = self.anchor.state_root(self.proof.block_number)?;
        let storage_root = self.proof.verify_account(self.gateway, state_root)?;
        let word = self
            .proof
            .verify_storage(storage_root, message_box.storage_slot(message_hash))?;
        MessageStatus::from_word(word).ok_or(GatewayError::ProofInvalid(ProofError::ValueMismatch))
    }
}
