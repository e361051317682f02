//! Intents, messages and the hashes both chains derive from them.

use alloy::{
    primitives::{Address, B256, U256, keccak256},
    sol_types::SolValue,
};
use serde::{Deserialize, Serialize};

/// Storage offsets of the outbox and inbox status mappings in the gateway account.
const OUTBOX_OFFSET: u64 = 7;
const INBOX_OFFSET: u64 = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageStatus {
    #[default]
    Undeclared = 0,
    Declared = 1,
    Progressed = 2,
    DeclaredRevocation = 3,
    Revoked = 4,
}

impl MessageStatus {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(MessageStatus::Undeclared),
            1 => Some(MessageStatus::Declared),
            2 => Some(MessageStatus::Progressed),
            3 => Some(MessageStatus::DeclaredRevocation),
            4 => Some(MessageStatus::Revoked),
            _ => None,
        }
    }

    /// Decodes a status from its storage word.
    pub fn from_word(word: U256) -> Option<Self> {
        u8::try_from(word).ok().and_then(Self::from_u8)
    }

    pub fn to_word(self) -> U256 {
        U256::from(self as u8)
    }

    /// Progressed and Revoked are absorbing.
    pub fn is_final(self) -> bool {
        matches!(self, MessageStatus::Progressed | MessageStatus::Revoked)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageBox {
    Outbox,
    Inbox,
}

impl MessageBox {
    /// The storage slot holding the status of `message_hash`, laid out like a Solidity
    /// `mapping(bytes32 => MessageStatus)`.
    pub fn storage_slot(self, message_hash: B256) -> B256 {
        let offset = match self {
            MessageBox::Outbox => OUTBOX_OFFSET,
            MessageBox::Inbox => INBOX_OFFSET,
        };
        keccak256((message_hash, U256::from(offset)).abi_encode())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    Stake,
    Redeem,
}

impl IntentKind {
    fn typehash(self) -> B256 {
        match self {
            IntentKind::Stake => keccak256(
                "StakeIntent(address staker,uint256 nonce,address beneficiary,uint256 amount,uint256 gasPrice,uint256 gasLimit,address gateway)",
            ),
            IntentKind::Redeem => keccak256(
                "RedeemIntent(address redeemer,uint256 nonce,address beneficiary,uint256 amount,uint256 gasPrice,uint256 gasLimit,address cogateway)",
            ),
        }
    }
}

/// What a staker or redeemer asks for. Never mutated once declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// The staker or redeemer.
    pub account: Address,
    pub nonce: u64,
    pub beneficiary: Address,
    pub amount: u128,
    pub gas_price: u128,
    pub gas_limit: u128,
    pub hash_lock: B256,
}

impl Intent {
    /// Hash of every field except the hash lock, bound to the gateway which declares the intent.
    pub fn intent_hash(&self, kind: IntentKind, declaring_gateway: Address) -> B256 {
        keccak256(
            (
                kind.typehash(),
                self.account,
                U256::from(self.nonce),
                self.beneficiary,
                U256::from(self.amount),
                U256::from(self.gas_price),
                U256::from(self.gas_limit),
                declaring_gateway,
            )
                .abi_encode(),
        )
    }

    pub fn message(&self, kind: IntentKind, declaring_gateway: Address) -> Message {
        Message {
            intent_hash: self.intent_hash(kind, declaring_gateway),
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            sender: self.account,
            hash_lock: self.hash_lock,
        }
    }

    /// The facilitator reward, `gas_price * gas_limit`. `None` on overflow.
    pub fn reward(&self) -> Option<u128> {
        self.gas_price.checked_mul(self.gas_limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub intent_hash: B256,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u128,
    pub sender: Address,
    pub hash_lock: B256,
}

impl Message {
    pub fn hash(&self) -> B256 {
        keccak256((self.intent_hash, U256::from(self.nonce), self.sender).abi_encode())
    }
}

pub fn hash_lock(unlock_secret: B256) -> B256 {
    keccak256(unlock_secret)
}
