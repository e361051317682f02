use std::collections::VecDeque;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorEntry {
    pub remote_chain_id: u64,
    pub block_height: u64,
    pub state_root: B256,
}

/// The last `capacity` state roots of the remote chain, as reported by a single trusted reporter.
#[derive(Debug, Clone)]
pub struct StateAnchor {
    remote_chain_id: u64,
    reporter: Address,
    capacity: usize,
    /// Ordered by strictly increasing height. Never empty.
    entries: VecDeque<AnchorEntry>,
}

impl StateAnchor {
    pub fn new(
        remote_chain_id: u64,
        reporter: Address,
        capacity: usize,
        genesis_height: u64,
        genesis_root: B256,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(GatewayError::Config(
                "anchor capacity must be at least 1".to_owned(),
            ));
        }
        let mut entries = VecDeque::with_capacity(capacity);
        entries.push_back(AnchorEntry {
            remote_chain_id,
            block_height: genesis_height,
            state_root: genesis_root,
        });
        Ok(StateAnchor {
            remote_chain_id,
            reporter,
            capacity,
            entries,
        })
    }

    /// Records the state root of a remote block. Once full, the oldest entry is evicted.
    pub fn anchor(
        &mut self,
        caller: Address,
        block_height: u64,
        state_root: B256,
    ) -> Result<AnchorEntry> {
        if caller != self.reporter {
            return Err(GatewayError::Unauthorized);
        }
        let latest = self.latest().block_height;
        if block_height <= latest {
            return Err(GatewayError::NonMonotonicHeight {
                block_height,
                latest,
            });
        }

        let entry = AnchorEntry {
            remote_chain_id: self.remote_chain_id,
            block_height,
            state_root,
        };
        self.entries.push_back(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        Ok(entry)
    }

    pub fn latest(&self) -> AnchorEntry {
        // `new` inserts the genesis entry and eviction never empties the buffer.
        self.entries[self.entries.len() - 1]
    }

    pub fn get(&self, block_height: u64) -> Option<B256> {
        self.entries
            .binary_search_by_key(&block_height, |e| e.block_height)
            .ok()
            .map(|i| self.entries[i].state_root)
    }

    /// Like [`StateAnchor::get`], but tells apart heights which are too old (or were never reported) from heights
    /// which have not been reported yet.
    pub fn state_root(&self, block_height: u64) -> Result<B256> {
        let latest = self.latest().block_height;
        if block_height > latest {
            return Err(GatewayError::NotYetAnchored {
                block_height,
                latest,
            });
        }
        self.get(block_height)
            .ok_or(GatewayError::ProofTooOld { block_height })
    }

    pub fn remote_chain_id(&self) -> u64 {
        self.remote_chain_id
    }

    pub fn reporter(&self) -> Address {
        self.reporter
    }

    pub fn entries(&self) -> impl Iterator<Item = &AnchorEntry> {
        self.entries.iter()
    }
}
