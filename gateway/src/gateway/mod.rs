//! The two ends of a bridge. [`Gateway`] runs on the origin chain, where value is staked and later unstaked.
//! [`CoGateway`] runs on the auxiliary chain, where the staked value is minted and later redeemed.
//!
//! Both are built on [`GatewayCore`], which owns the shared rules: who may declare, nonce discipline, escrow of
//! bounties and penalties, and driving the message bus with a secret or a counterpart proof.

mod auxiliary;
mod origin;

use alloy::primitives::{Address, B256};
pub use auxiliary::CoGateway;
pub use origin::Gateway;

use crate::{
    anchor::StateAnchor,
    cfg::ChainConfig,
    error::{GatewayError, Result},
    ledger::{Ledger, Transfer},
    message::{Intent, IntentKind, MessageBox, MessageStatus},
    payment::PaymentMethod,
    proof::{AccountProof, CounterpartProof},
    token::UtilityToken,
};

/// How a message is unlocked: with the secret behind its hash lock, or with a proof of the counterpart's record.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Unlock<'a> {
    Secret(B256),
    Proof(&'a AccountProof),
}

impl Unlock<'_> {
    fn secret(&self) -> Option<B256> {
        match self {
            Unlock::Secret(secret) => Some(*secret),
            Unlock::Proof(_) => None,
        }
    }

    fn is_proof(&self) -> bool {
        matches!(self, Unlock::Proof(_))
    }
}

#[derive(Debug, Clone)]
pub struct GatewayCore {
    pub address: Address,
    pub remote_gateway: Address,
    /// The token this gateway escrows when its intents are declared.
    pub token: Address,
    pub bounty: u128,
    pub bounty_payment: PaymentMethod,
    pub penalty_bps: u32,
    pub unlock_window: u64,
    pub facilitators: Vec<Address>,
    /// Kind of the intents declared on this chain.
    outbox_kind: IntentKind,
    /// Kind of the intents declared on the counterpart.
    inbox_kind: IntentKind,
}

const BPS: u128 = 10_000;

/// Intents of an account are numbered 1, 2, 3 and so on, with no gaps.
fn check_nonce(last: u64, got: u64) -> Result<()> {
    match last.checked_add(1) {
        Some(expected) if expected == got => Ok(()),
        Some(expected) => Err(GatewayError::InvalidNonce { expected, got }),
        None => Err(GatewayError::InvalidNonce {
            expected: last,
            got,
        }),
    }
}

/// An account has at most one open process per message box.
fn check_finalized<T: UtilityToken + Clone>(
    ledger: &Ledger<T>,
    message_box: MessageBox,
    previous: Option<&B256>,
) -> Result<()> {
    match previous.map(|hash| ledger.bus.status(message_box, *hash)) {
        Some(MessageStatus::Declared | MessageStatus::DeclaredRevocation) => {
            Err(GatewayError::PreviousProcessNotFinalized)
        }
        _ => Ok(()),
    }
}

impl GatewayCore {
    fn new(
        chain: &ChainConfig,
        remote: &ChainConfig,
        outbox_kind: IntentKind,
        inbox_kind: IntentKind,
    ) -> Result<Self> {
        chain.validate()?;
        Ok(GatewayCore {
            address: chain.gateway,
            remote_gateway: remote.gateway,
            token: chain.token,
            bounty: chain.bounty,
            bounty_payment: chain.bounty_payment,
            penalty_bps: chain.penalty_bps,
            unlock_window: chain.unlock_window,
            facilitators: chain.facilitators.clone(),
            outbox_kind,
            inbox_kind,
        })
    }

    /// The penalty a reverting account posts, scaled from the bounty.
    pub fn penalty(&self) -> Result<u128> {
        self.bounty
            .checked_mul(u128::from(self.penalty_bps))
            .map(|p| p / BPS)
            .ok_or(GatewayError::InvalidAmount("penalty overflow"))
    }

    fn check_caller(&self, caller: Address, account: Address) -> Result<()> {
        if caller == account || self.facilitators.contains(&caller) {
            Ok(())
        } else {
            Err(GatewayError::Unauthorized)
        }
    }

    fn validate_intent(intent: &Intent) -> Result<u128> {
        if intent.amount == 0 {
            return Err(GatewayError::InvalidAmount("amount must be positive"));
        }
        if intent.beneficiary.is_zero() {
            return Err(GatewayError::InvalidBeneficiary);
        }
        let reward = intent
            .reward()
            .ok_or(GatewayError::InvalidAmount("reward overflow"))?;
        if reward > intent.amount {
            return Err(GatewayError::InvalidAmount("reward exceeds amount"));
        }
        Ok(reward)
    }

    fn counterpart<'a>(&self, anchor: &'a StateAnchor, proof: &'a AccountProof) -> CounterpartProof<'a> {
        CounterpartProof {
            anchor,
            gateway: self.remote_gateway,
            proof,
        }
    }

    /// Declares `intent` in the outbox, escrowing its amount from the account and the bounty from the caller.
    fn declare<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        intent: Intent,
    ) -> Result<B256> {
        self.check_caller(caller, intent.account)?;
        Self::validate_intent(&intent)?;

        check_nonce(ledger.nonce(intent.account), intent.nonce)?;
        check_finalized(ledger, MessageBox::Outbox, ledger.active.get(&intent.account))?;

        ledger.token_mut(self.token)?.transfer_from(
            self.address,
            intent.account,
            self.address,
            intent.amount,
        )?;
        self.bounty_payment.collect(ledger, caller, self.bounty)?;

        let message = intent.message(self.outbox_kind, self.address);
        let height = ledger.pending_height();
        let message_hash = ledger.bus.declare_message(message, height)?;

        ledger.outbox_nonces.insert(intent.account, intent.nonce);
        ledger.active.insert(intent.account, message_hash);
        ledger.transfers.insert(
            message_hash,
            Transfer {
                intent,
                bounty: self.bounty,
                penalty: 0,
            },
        );
        Ok(message_hash)
    }

    /// Records an intent the counterpart declared, given a proof of the counterpart's outbox. The returned hash is
    /// derived here from `intent`, so a proof about any other message is rejected. Confirmations follow the
    /// counterpart's nonces one by one, so every declared intent can be confirmed.
    fn confirm<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        intent: Intent,
        proof: &AccountProof,
    ) -> Result<B256> {
        Self::validate_intent(&intent)?;
        check_nonce(ledger.inbox_nonce(intent.account), intent.nonce)?;
        check_finalized(ledger, MessageBox::Inbox, ledger.inbox_active.get(&intent.account))?;

        let message = intent.message(self.inbox_kind, self.remote_gateway);
        let height = ledger.pending_height();
        let counterpart = self.counterpart(&ledger.anchor, proof);
        let message_hash = ledger.bus.confirm_message(message, height, &counterpart)?;

        ledger.inbox_nonces.insert(intent.account, intent.nonce);
        ledger.inbox_active.insert(intent.account, message_hash);
        ledger.transfers.insert(
            message_hash,
            Transfer {
                intent,
                bounty: 0,
                penalty: 0,
            },
        );
        Ok(message_hash)
    }

    fn transfer<T: UtilityToken + Clone>(ledger: &Ledger<T>, message_hash: B256) -> Result<Transfer> {
        ledger
            .transfer(message_hash)
            .copied()
            .ok_or(GatewayError::UnknownMessage(message_hash))
    }

    fn progress_outbox<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        unlock: Unlock<'_>,
    ) -> Result<Transfer> {
        match unlock {
            Unlock::Secret(secret) => {
                ledger.bus.progress_outbox(message_hash, secret)?;
            }
            Unlock::Proof(proof) => {
                let counterpart = self.counterpart(&ledger.anchor, proof);
                ledger
                    .bus
                    .progress_outbox_with_proof(message_hash, &counterpart)?;
            }
        }
        Self::transfer(ledger, message_hash)
    }

    fn progress_inbox<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        unlock: Unlock<'_>,
    ) -> Result<Transfer> {
        match unlock {
            Unlock::Secret(secret) => {
                ledger.bus.progress_inbox(message_hash, secret)?;
            }
            Unlock::Proof(proof) => {
                let counterpart = self.counterpart(&ledger.anchor, proof);
                ledger
                    .bus
                    .progress_inbox_with_proof(message_hash, &counterpart)?;
            }
        }
        Self::transfer(ledger, message_hash)
    }

    /// Declares the revocation of an outbox message. Only the declaring account may revert, and it posts the penalty.
    fn revert<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
    ) -> Result<Transfer> {
        let mut transfer = Self::transfer(ledger, message_hash)?;
        if caller != transfer.intent.account {
            return Err(GatewayError::Unauthorized);
        }
        let height = ledger.pending_height();
        ledger
            .bus
            .declare_revocation_message(message_hash, height, self.unlock_window)?;

        transfer.penalty = self.penalty()?;
        self.bounty_payment.collect(ledger, caller, transfer.penalty)?;
        ledger.transfers.insert(message_hash, transfer);
        Ok(transfer)
    }

    /// Completes the revocation of an outbox message, once the counterpart has mirrored it.
    fn progress_revert<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        proof: &AccountProof,
    ) -> Result<Transfer> {
        let counterpart = self.counterpart(&ledger.anchor, proof);
        ledger
            .bus
            .progress_outbox_revocation(message_hash, &counterpart)?;
        Self::transfer(ledger, message_hash)
    }

    /// Mirrors a revocation the counterpart declared.
    fn confirm_revert<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        proof: &AccountProof,
    ) -> Result<Transfer> {
        let counterpart = self.counterpart(&ledger.anchor, proof);
        ledger.bus.confirm_revocation(message_hash, &counterpart)?;
        Self::transfer(ledger, message_hash)
    }

    fn progress_revert_intent<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        unlock: Unlock<'_>,
    ) -> Result<Transfer> {
        match unlock {
            Unlock::Secret(secret) => {
                ledger.bus.progress_inbox_revocation(message_hash, secret)?;
            }
            Unlock::Proof(proof) => {
                let counterpart = self.counterpart(&ledger.anchor, proof);
                ledger
                    .bus
                    .progress_inbox_revocation_with_proof(message_hash, &counterpart)?;
            }
        }
        Self::transfer(ledger, message_hash)
    }

    /// Pays the facilitator reward out of `amount`. Returns what is left for the beneficiary.
    fn split_reward(intent: &Intent) -> Result<(u128, u128)> {
        let reward = Self::validate_intent(intent)?;
        Ok((intent.amount - reward, reward))
    }
}
