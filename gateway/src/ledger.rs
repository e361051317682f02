//! A single chain: its provable state, tokens, message bus, anchor of the counterpart chain and block history.
//!
//! Every mutation goes through [`Ledger::transact`], which runs against a copy and only keeps the result if the whole
//! call succeeded.

use std::collections::{BTreeMap, HashMap};

use alloy::primitives::{Address, B256};
use serde::Serialize;
use tracing::*;

use crate::{
    anchor::{AnchorEntry, StateAnchor},
    cfg::ChainConfig,
    error::{GatewayError, Result},
    event::Event,
    message::{Intent, MessageBox, MessageStatus},
    message_bus::MessageBus,
    proof::AccountProof,
    state::State,
    token::{MemoryToken, UtilityToken},
};

/// Value held by the gateway against an outbox message, and the intent it was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transfer {
    pub intent: Intent,
    pub bounty: u128,
    /// Posted when the revocation is declared.
    pub penalty: u128,
}

#[derive(Clone)]
pub struct Ledger<T = MemoryToken> {
    pub(crate) chain_id: u64,
    pub(crate) block_number: u64,
    pub(crate) gateway: Address,
    pub(crate) state: State,
    pub(crate) tokens: BTreeMap<Address, T>,
    pub(crate) bus: MessageBus,
    /// Last declared nonce per staker or redeemer.
    pub(crate) outbox_nonces: HashMap<Address, u64>,
    /// Last confirmed nonce per counterpart staker or redeemer.
    pub(crate) inbox_nonces: HashMap<Address, u64>,
    /// Latest outbox message per account.
    pub(crate) active: HashMap<Address, B256>,
    /// Latest confirmed inbox message per counterpart account.
    pub(crate) inbox_active: HashMap<Address, B256>,
    pub(crate) transfers: HashMap<B256, Transfer>,
    pub(crate) anchor: StateAnchor,
    pub(crate) events: Vec<Event>,
    pub(crate) block_roots: BTreeMap<u64, B256>,
}

impl<T: UtilityToken + Clone> Ledger<T> {
    /// A chain at block 0, anchoring the state of `remote`.
    pub fn new(chain: &ChainConfig, remote: &ChainConfig) -> Result<Self> {
        chain.validate()?;
        let anchor = StateAnchor::new(
            remote.chain_id,
            chain.anchor_reporter,
            chain.anchor_capacity,
            chain.genesis_anchor.block_height,
            chain.genesis_anchor.state_root,
        )?;
        let mut state = State::new();
        let genesis_root = state.root_hash()?;

        Ok(Ledger {
            chain_id: chain.chain_id,
            block_number: 0,
            gateway: chain.gateway,
            state,
            tokens: BTreeMap::new(),
            bus: MessageBus::new(),
            outbox_nonces: HashMap::new(),
            inbox_nonces: HashMap::new(),
            active: HashMap::new(),
            inbox_active: HashMap::new(),
            transfers: HashMap::new(),
            anchor,
            events: Vec::new(),
            block_roots: BTreeMap::from([(0, genesis_root)]),
        })
    }

    /// Runs `f` as a single transaction in a new block. If `f` fails, the ledger is left exactly as it was.
    pub fn transact<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let mut next = self.clone();
        let output = f(&mut next)?;
        next.flush_messages()?;
        next.seal_block()?;
        *self = next;
        Ok(output)
    }

    /// Writes pending message statuses into the gateway's storage, where the counterpart can prove them.
    fn flush_messages(&mut self) -> Result<()> {
        for (message_box, message_hash, status) in self.bus.take_changes() {
            self.state.set_account_storage(
                self.gateway,
                message_box.storage_slot(message_hash),
                status.to_word(),
            )?;
        }
        Ok(())
    }

    fn seal_block(&mut self) -> Result<()> {
        self.block_number += 1;
        let state_root = self.state.root_hash()?;
        self.block_roots.insert(self.block_number, state_root);
        debug!(
            chain_id = self.chain_id,
            block_number = self.block_number,
            %state_root,
            "sealed block"
        );
        Ok(())
    }

    /// Produces `count` empty blocks.
    pub fn advance_blocks(&mut self, count: u64) -> Result<()> {
        for _ in 0..count {
            self.seal_block()?;
        }
        Ok(())
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// The height the currently executing transaction will be included at.
    pub fn pending_height(&self) -> u64 {
        self.block_number + 1
    }

    pub fn gateway(&self) -> Address {
        self.gateway
    }

    pub fn block_root(&self, block_number: u64) -> Result<B256> {
        self.block_roots
            .get(&block_number)
            .copied()
            .ok_or(GatewayError::UnknownBlock(block_number))
    }

    /// The `eth_getProof` equivalent, against the state as of `block_number`.
    pub fn get_proof(&self, address: Address, slots: &[B256], block_number: u64) -> Result<AccountProof> {
        let root = self.block_root(block_number)?;
        self.state
            .at_root(root)
            .get_proof(address, slots, block_number)
    }

    /// Proof of the gateway's record of `message_hash` in `message_box`.
    pub fn message_proof(
        &self,
        message_box: MessageBox,
        message_hash: B256,
        block_number: u64,
    ) -> Result<AccountProof> {
        self.get_proof(
            self.gateway,
            &[message_box.storage_slot(message_hash)],
            block_number,
        )
    }

    /// Records a state root of the counterpart chain. Only the configured reporter may call this.
    pub fn anchor_state_root(
        &mut self,
        caller: Address,
        block_height: u64,
        state_root: B256,
    ) -> Result<AnchorEntry> {
        self.transact(|ledger| {
            let entry = ledger.anchor.anchor(caller, block_height, state_root)?;
            info!(
                chain_id = ledger.chain_id,
                remote_chain_id = entry.remote_chain_id,
                block_height,
                %state_root,
                "state root anchored"
            );
            ledger.emit(Event::StateRootAvailable {
                block_height,
                state_root,
            });
            Ok(entry)
        })
    }

    pub fn anchor(&self) -> &StateAnchor {
        &self.anchor
    }

    /// Mints native currency to `address`.
    pub fn fund(&mut self, address: Address, amount: u128) -> Result<()> {
        self.transact(|ledger| {
            let balance = ledger.state.get_native_balance(address)?;
            let balance = balance
                .checked_add(amount)
                .ok_or(GatewayError::InvalidAmount("balance overflow"))?;
            ledger.state.set_native_balance(address, balance)
        })
    }

    pub fn native_balance(&self, address: Address) -> Result<u128> {
        self.state.get_native_balance(address)
    }

    pub(crate) fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn add_token(&mut self, token: T) {
        self.tokens.insert(token.address(), token);
    }

    pub fn token(&self, address: Address) -> Result<&T> {
        self.tokens
            .get(&address)
            .ok_or(GatewayError::UnknownToken(address))
    }

    pub fn token_mut(&mut self, address: Address) -> Result<&mut T> {
        self.tokens
            .get_mut(&address)
            .ok_or(GatewayError::UnknownToken(address))
    }

    pub fn token_balance(&self, token: Address, owner: Address) -> Result<u128> {
        Ok(self.token(token)?.balance_of(owner))
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Last nonce `account` declared on this chain. Zero if it never declared.
    pub fn nonce(&self, account: Address) -> u64 {
        self.outbox_nonces.get(&account).copied().unwrap_or_default()
    }

    /// Last nonce of `account` confirmed from the counterpart chain.
    pub fn inbox_nonce(&self, account: Address) -> u64 {
        self.inbox_nonces.get(&account).copied().unwrap_or_default()
    }

    pub fn message_status(&self, message_box: MessageBox, message_hash: B256) -> MessageStatus {
        self.bus.status(message_box, message_hash)
    }

    pub fn transfer(&self, message_hash: B256) -> Option<&Transfer> {
        self.transfers.get(&message_hash)
    }
}
