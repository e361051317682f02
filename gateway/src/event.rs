use alloy::primitives::{Address, B256};
use serde::Serialize;

use crate::message::Intent;

/// Emitted by a ledger for every committed gateway transition. Each event carries enough for a relayer to request
/// the proofs of the next step without reading chain state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    StakeIntentDeclared {
        message_hash: B256,
        intent: Intent,
    },
    StakeIntentConfirmed {
        message_hash: B256,
        intent: Intent,
        block_height: u64,
    },
    StakeProgressed {
        message_hash: B256,
        staker: Address,
        amount: u128,
        proven: bool,
        unlock_secret: Option<B256>,
    },
    MintProgressed {
        message_hash: B256,
        beneficiary: Address,
        minted: u128,
        reward: u128,
        proven: bool,
        unlock_secret: Option<B256>,
    },
    RevertStakeIntentDeclared {
        message_hash: B256,
        staker: Address,
        penalty: u128,
    },
    RevertStakeIntentConfirmed {
        message_hash: B256,
        staker: Address,
        block_height: u64,
    },
    RevertStakeProgressed {
        message_hash: B256,
        staker: Address,
        amount: u128,
    },
    RevertStakeIntentProgressed {
        message_hash: B256,
        staker: Address,
    },
    RedeemIntentDeclared {
        message_hash: B256,
        intent: Intent,
    },
    RedeemIntentConfirmed {
        message_hash: B256,
        intent: Intent,
        block_height: u64,
    },
    RedeemProgressed {
        message_hash: B256,
        redeemer: Address,
        amount: u128,
        proven: bool,
        unlock_secret: Option<B256>,
    },
    UnstakeProgressed {
        message_hash: B256,
        beneficiary: Address,
        unstaked: u128,
        reward: u128,
        proven: bool,
        unlock_secret: Option<B256>,
    },
    RevertRedeemIntentDeclared {
        message_hash: B256,
        redeemer: Address,
        penalty: u128,
    },
    RevertRedeemIntentConfirmed {
        message_hash: B256,
        redeemer: Address,
        block_height: u64,
    },
    RevertRedeemProgressed {
        message_hash: B256,
        redeemer: Address,
        amount: u128,
    },
    RevertRedeemIntentProgressed {
        message_hash: B256,
        redeemer: Address,
    },
    StateRootAvailable {
        block_height: u64,
        state_root: B256,
    },
}

impl Event {
    pub fn message_hash(&self) -> Option<B256> {
        match self {
            Event::StakeIntentDeclared { message_hash, .. }
            | Event::StakeIntentConfirmed { message_hash, .. }
            | Event::StakeProgressed { message_hash, .. }
            | Event::MintProgressed { message_hash, .. }
            | Event::RevertStakeIntentDeclared { message_hash, .. }
            | Event::RevertStakeIntentConfirmed { message_hash, .. }
            | Event::RevertStakeProgressed { message_hash, .. }
            | Event::RevertStakeIntentProgressed { message_hash, .. }
            | Event::RedeemIntentDeclared { message_hash, .. }
            | Event::RedeemIntentConfirmed { message_hash, .. }
            | Event::RedeemProgressed { message_hash, .. }
            | Event::UnstakeProgressed { message_hash, .. }
            | Event::RevertRedeemIntentDeclared { message_hash, .. }
            | Event::RevertRedeemIntentConfirmed { message_hash, .. }
            | Event::RevertRedeemProgressed { message_hash, .. }
            | Event::RevertRedeemIntentProgressed { message_hash, .. } => Some(*message_hash),
            Event::StateRootAvailable { .. } => None,
        }
    }
}
