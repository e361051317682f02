//! Outbox and inbox records of one chain, and the transitions between message states.
//!
//! The outbox holds messages this chain declared. The inbox holds messages the counterpart declared, confirmed here
//! with a proof of the counterpart's outbox. Every transition either completes or leaves the bus untouched.

use std::collections::HashMap;

use alloy::primitives::B256;
use serde::Serialize;

use crate::{
    error::{GatewayError, Result},
    message::{Message, MessageBox, MessageStatus, hash_lock},
    proof::CounterpartProof,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    pub message: Message,
    pub status: MessageStatus,
    /// Block in which the record was created.
    pub declared_at: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MessageBus {
    outbox: HashMap<B256, MessageRecord>,
    inbox: HashMap<B256, MessageRecord>,
    /// Status changes not yet written to provable storage.
    changes: Vec<(MessageBox, B256, MessageStatus)>,
}

/// Forward progression is only possible from `Declared`.
fn check_progressable(status: MessageStatus) -> Result<()> {
    match status {
        MessageStatus::Declared => Ok(()),
        MessageStatus::DeclaredRevocation => Err(GatewayError::RevocationInProgress),
        s if s.is_final() => Err(GatewayError::AlreadyFinalized),
        s => Err(GatewayError::InvalidStatus(s)),
    }
}

/// Completing a revocation is only possible from `DeclaredRevocation`.
fn check_revocable(status: MessageStatus) -> Result<()> {
    match status {
        MessageStatus::DeclaredRevocation => Ok(()),
        s if s.is_final() => Err(GatewayError::AlreadyFinalized),
        s => Err(GatewayError::InvalidStatus(s)),
    }
}

fn check_secret(message: &Message, unlock_secret: B256) -> Result<()> {
    if hash_lock(unlock_secret) != message.hash_lock {
        return Err(GatewayError::InvalidSecret);
    }
    Ok(())
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self, message_box: MessageBox) -> &HashMap<B256, MessageRecord> {
        match message_box {
            MessageBox::Outbox => &self.outbox,
            MessageBox::Inbox => &self.inbox,
        }
    }

    pub fn get(&self, message_box: MessageBox, message_hash: B256) -> Option<&MessageRecord> {
        self.records(message_box).get(&message_hash)
    }

    /// `Undeclared` for unknown messages.
    pub fn status(&self, message_box: MessageBox, message_hash: B256) -> MessageStatus {
        self.get(message_box, message_hash)
            .map(|r| r.status)
            .unwrap_or_default()
    }

    fn record(&self, message_box: MessageBox, message_hash: B256) -> Result<MessageRecord> {
        self.get(message_box, message_hash)
            .copied()
            .ok_or(GatewayError::UnknownMessage(message_hash))
    }

    fn insert(&mut self, message_box: MessageBox, message: Message, block_height: u64) -> Result<B256> {
        let message_hash = message.hash();
        let records = match message_box {
            MessageBox::Outbox => &mut self.outbox,
            MessageBox::Inbox => &mut self.inbox,
        };
        if records.contains_key(&message_hash) {
            return Err(GatewayError::MessageExists(message_hash));
        }
        records.insert(
            message_hash,
            MessageRecord {
                message,
                status: MessageStatus::Declared,
                declared_at: block_height,
            },
        );
        self.changes
            .push((message_box, message_hash, MessageStatus::Declared));
        Ok(message_hash)
    }

    fn set_status(
        &mut self,
        message_box: MessageBox,
        message_hash: B256,
        status: MessageStatus,
    ) -> Result<Message> {
        let records = match message_box {
            MessageBox::Outbox => &mut self.outbox,
            MessageBox::Inbox => &mut self.inbox,
        };
        let record = records
            .get_mut(&message_hash)
            .ok_or(GatewayError::UnknownMessage(message_hash))?;
        record.status = status;
        self.changes.push((message_box, message_hash, status));
        Ok(record.message)
    }

    /// Drains the status changes made since the last call, in order.
    pub fn take_changes(&mut self) -> Vec<(MessageBox, B256, MessageStatus)> {
        std::mem::take(&mut self.changes)
    }

    pub fn declare_message(&mut self, message: Message, block_height: u64) -> Result<B256> {
        self.insert(MessageBox::Outbox, message, block_height)
    }

    pub fn progress_outbox(&mut self, message_hash: B256, unlock_secret: B256) -> Result<Message> {
        let record = self.record(MessageBox::Outbox, message_hash)?;
        check_progressable(record.status)?;
        check_secret(&record.message, unlock_secret)?;
        self.set_status(MessageBox::Outbox, message_hash, MessageStatus::Progressed)
    }

    /// Progresses a declared outbox message once the counterpart has confirmed it. A message whose revocation was
    /// declared can still be progressed if the counterpart already progressed its inbox, because that revocation can
    /// never complete.
    pub fn progress_outbox_with_proof(
        &mut self,
        message_hash: B256,
        counterpart: &CounterpartProof,
    ) -> Result<Message> {
        let record = self.record(MessageBox::Outbox, message_hash)?;
        let revoking = record.status == MessageStatus::DeclaredRevocation;
        if !revoking {
            check_progressable(record.status)?;
        }

        let remote = counterpart.message_status(MessageBox::Inbox, message_hash)?;
        match remote {
            MessageStatus::Progressed => {}
            MessageStatus::Declared if !revoking => {}
            MessageStatus::Declared => return Err(GatewayError::RevocationInProgress),
            s => return Err(GatewayError::InvalidStatus(s)),
        }
        self.set_status(MessageBox::Outbox, message_hash, MessageStatus::Progressed)
    }

    /// Starts revoking a declared outbox message. Only possible once `unlock_window` blocks have passed since it was
    /// declared.
    pub fn declare_revocation_message(
        &mut self,
        message_hash: B256,
        block_height: u64,
        unlock_window: u64,
    ) -> Result<Message> {
        let record = self.record(MessageBox::Outbox, message_hash)?;
        check_progressable(record.status)?;
        let unlockable_at = record.declared_at.saturating_add(unlock_window);
        if block_height < unlockable_at {
            return Err(GatewayError::NotYetUnlockable {
                remaining: unlockable_at - block_height,
            });
        }
        self.set_status(
            MessageBox::Outbox,
            message_hash,
            MessageStatus::DeclaredRevocation,
        )
    }

    pub fn progress_outbox_revocation(
        &mut self,
        message_hash: B256,
        counterpart: &CounterpartProof,
    ) -> Result<Message> {
        let record = self.record(MessageBox::Outbox, message_hash)?;
        check_revocable(record.status)?;
        match counterpart.message_status(MessageBox::Inbox, message_hash)? {
            MessageStatus::DeclaredRevocation | MessageStatus::Revoked => {}
            s => return Err(GatewayError::InvalidStatus(s)),
        }
        self.set_status(MessageBox::Outbox, message_hash, MessageStatus::Revoked)
    }

    /// Records a message the counterpart declared. Returns the message hash, derived locally from `message`. The
    /// counterpart may already have progressed it with the secret.
    pub fn confirm_message(
        &mut self,
        message: Message,
        block_height: u64,
        counterpart: &CounterpartProof,
    ) -> Result<B256> {
        let message_hash = message.hash();
        if self.inbox.contains_key(&message_hash) {
            return Err(GatewayError::MessageExists(message_hash));
        }
        match counterpart.message_status(MessageBox::Outbox, message_hash)? {
            MessageStatus::Declared | MessageStatus::Progressed => {}
            s => return Err(GatewayError::InvalidStatus(s)),
        }
        self.insert(MessageBox::Inbox, message, block_height)
    }

    pub fn progress_inbox(&mut self, message_hash: B256, unlock_secret: B256) -> Result<Message> {
        let record = self.record(MessageBox::Inbox, message_hash)?;
        check_progressable(record.status)?;
        check_secret(&record.message, unlock_secret)?;
        self.set_status(MessageBox::Inbox, message_hash, MessageStatus::Progressed)
    }

    pub fn progress_inbox_with_proof(
        &mut self,
        message_hash: B256,
        counterpart: &CounterpartProof,
    ) -> Result<Message> {
        let record = self.record(MessageBox::Inbox, message_hash)?;
        check_progressable(record.status)?;
        match counterpart.message_status(MessageBox::Outbox, message_hash)? {
            MessageStatus::Declared | MessageStatus::Progressed => {}
            MessageStatus::DeclaredRevocation => return Err(GatewayError::RevocationInProgress),
            s => return Err(GatewayError::InvalidStatus(s)),
        }
        self.set_status(MessageBox::Inbox, message_hash, MessageStatus::Progressed)
    }

    /// Mirrors a revocation the counterpart declared on its outbox.
    pub fn confirm_revocation(
        &mut self,
        message_hash: B256,
        counterpart: &CounterpartProof,
    ) -> Result<Message> {
        let record = self.record(MessageBox::Inbox, message_hash)?;
        check_progressable(record.status)?;
        match counterpart.message_status(MessageBox::Outbox, message_hash)? {
            MessageStatus::DeclaredRevocation => {}
            s => return Err(GatewayError::InvalidStatus(s)),
        }
        self.set_status(
            MessageBox::Inbox,
            message_hash,
            MessageStatus::DeclaredRevocation,
        )
    }

    pub fn progress_inbox_revocation(
        &mut self,
        message_hash: B256,
        unlock_secret: B256,
    ) -> Result<Message> {
        let record = self.record(MessageBox::Inbox, message_hash)?;
        check_revocable(record.status)?;
        check_secret(&record.message, unlock_secret)?;
        self.set_status(MessageBox::Inbox, message_hash, MessageStatus::Revoked)
    }

    pub fn progress_inbox_revocation_with_proof(
        &mut self,
        message_hash: B256,
        counterpart: &CounterpartProof,
    ) -> Result<Message> {
        let record = self.record(MessageBox::Inbox, message_hash)?;
        check_revocable(record.status)?;
        match counterpart.message_status(MessageBox::Outbox, message_hash)? {
            MessageStatus::Revoked => {}
            s => return Err(GatewayError::InvalidStatus(s)),
        }
        self.set_status(MessageBox::Inbox, message_hash, MessageStatus::Revoked)
    }
}
