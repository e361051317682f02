//! Provable chain state, laid out like an Ethereum state trie.

use std::sync::Arc;

use alloy::primitives::{Address, B256, Bytes, U256, keccak256};
use eth_trie::{EMPTY_ROOT, EthTrie as PatriciaTrie, MemoryDB, Trie, TrieError};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

use crate::{
    error::{GatewayError, Result},
    proof::{AccountProof, StorageProof},
};

/// keccak256 of empty code.
pub const KECCAK_EMPTY: B256 =
    alloy::primitives::b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub nonce: u64,
    pub balance: u128,
    pub storage_root: B256,
    pub code_hash: B256,
}

impl Default for Account {
    fn default() -> Self {
        Account {
            nonce: 0,
            balance: 0,
            storage_root: EMPTY_ROOT,
            code_hash: KECCAK_EMPTY,
        }
    }
}

impl Encodable for Account {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.nonce);
        s.append(&self.balance);
        s.append(&self.storage_root.as_slice());
        s.append(&self.code_hash.as_slice());
    }
}

impl Decodable for Account {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Account {
            nonce: rlp.val_at(0)?,
            balance: rlp.val_at(1)?,
            storage_root: decode_hash(&rlp.at(2)?)?,
            code_hash: decode_hash(&rlp.at(3)?)?,
        })
    }
}

fn decode_hash(rlp: &Rlp) -> Result<B256, DecoderError> {
    let data = rlp.data()?;
    if data.len() != 32 {
        return Err(DecoderError::RlpInvalidLength);
    }
    Ok(B256::from_slice(data))
}

/// Storage words are stored as the RLP of their minimal big-endian encoding. Zero words are not stored.
pub(crate) fn encode_word(value: U256) -> Vec<u8> {
    rlp::encode(&value.to_be_bytes_trimmed_vec()).to_vec()
}

pub(crate) fn decode_word(raw: &[u8]) -> Result<U256, DecoderError> {
    let bytes: Vec<u8> = rlp::decode(raw)?;
    U256::try_from_be_slice(&bytes).ok_or(DecoderError::RlpIsTooBig)
}

#[derive(Clone)]
pub struct State {
    db: Arc<MemoryDB>,
    accounts: PatriciaTrie<MemoryDB>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    pub fn new() -> Self {
        let db = Arc::new(MemoryDB::new());
        State {
            db: db.clone(),
            accounts: PatriciaTrie::new(db),
        }
    }

    /// The state as of `root_hash`, which must have been committed through this state's database.
    pub fn at_root(&self, root_hash: B256) -> Self {
        State {
            db: self.db.clone(),
            accounts: self.accounts.at_root(root_hash),
        }
    }

    pub fn root_hash(&mut self) -> Result<B256> {
        Ok(self.accounts.root_hash()?)
    }

    /// Canonical method to obtain trie key for an account node
    fn account_key(address: Address) -> B256 {
        keccak256(address)
    }

    /// Canonical method to obtain trie key for a storage slot, within the account's storage trie
    fn storage_key(slot: B256) -> B256 {
        keccak256(slot)
    }

    /// Returns an empty account if one didn't exist yet.
    pub fn get_account(&self, address: Address) -> Result<Account> {
        match self.accounts.get(Self::account_key(address).as_slice())? {
            Some(bytes) => Ok(rlp::decode(&bytes).map_err(TrieError::from)?),
            None => Ok(Account::default()),
        }
    }

    pub fn save_account(&mut self, address: Address, account: &Account) -> Result<()> {
        Ok(self
            .accounts
            .insert(Self::account_key(address).as_slice(), &rlp::encode(account))?)
    }

    fn get_account_trie(&self, account: &Account) -> PatriciaTrie<MemoryDB> {
        PatriciaTrie::new(self.db.clone()).at_root(account.storage_root)
    }

    pub fn get_account_storage(&self, address: Address, slot: B256) -> Result<U256> {
        let account = self.get_account(address)?;
        let trie = self.get_account_trie(&account);
        match trie.get(Self::storage_key(slot).as_slice())? {
            Some(raw) => Ok(decode_word(&raw).map_err(TrieError::from)?),
            // empty storage location
            None => Ok(U256::ZERO),
        }
    }

    pub fn set_account_storage(&mut self, address: Address, slot: B256, value: U256) -> Result<()> {
        let mut account = self.get_account(address)?;
        let mut trie = self.get_account_trie(&account);
        let key = Self::storage_key(slot);
        if value.is_zero() {
            trie.remove(key.as_slice())?;
        } else {
            trie.insert(key.as_slice(), &encode_word(value))?;
        }
        account.storage_root = trie.root_hash()?;
        self.save_account(address, &account)
    }

    pub fn get_native_balance(&self, address: Address) -> Result<u128> {
        Ok(self.get_account(address)?.balance)
    }

    pub fn set_native_balance(&mut self, address: Address, balance: u128) -> Result<()> {
        let mut account = self.get_account(address)?;
        account.balance = balance;
        self.save_account(address, &account)
    }

    pub fn transfer_native(&mut self, from: Address, to: Address, amount: u128) -> Result<()> {
        let available = self.get_native_balance(from)?;
        let remaining = available
            .checked_sub(amount)
            .ok_or(GatewayError::InsufficientBalance {
                needed: amount,
                available,
            })?;
        self.set_native_balance(from, remaining)?;
        let credited = self
            .get_native_balance(to)?
            .checked_add(amount)
            .ok_or(GatewayError::InvalidAmount("balance overflow"))?;
        self.set_native_balance(to, credited)
    }

    /// Builds an `eth_getProof` style proof of the account and the given storage slots. The trie is committed first,
    /// so the proof is against the current root.
    pub fn get_proof(
        &self,
        address: Address,
        slots: &[B256],
        block_number: u64,
    ) -> Result<AccountProof> {
        let account_key = Self::account_key(address);
        let encoded_account = self
            .accounts
            .get(account_key.as_slice())?
            .unwrap_or_default();
        let account_proof = self.accounts.get_proof(account_key.as_slice())?;

        let account = self.get_account(address)?;
        let storage = self.get_account_trie(&account);
        let storage_proof = slots
            .iter()
            .map(|slot| {
                let key = Self::storage_key(*slot);
                let value = match storage.get(key.as_slice())? {
                    Some(raw) => decode_word(&raw).map_err(TrieError::from)?,
                    None => U256::ZERO,
                };
                Ok(StorageProof {
                    key: *slot,
                    value,
                    proof: into_bytes(storage.get_proof(key.as_slice())?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AccountProof {
            address,
            block_number,
            encoded_account: encoded_account.into(),
            account_proof: into_bytes(account_proof),
            storage_hash: account.storage_root,
            storage_proof,
        })
    }
}

fn into_bytes(nodes: Vec<Vec<u8>>) -> Vec<Bytes> {
    nodes.into_iter().map(Bytes::from).collect()
}
