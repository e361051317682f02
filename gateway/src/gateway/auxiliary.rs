use alloy::primitives::{Address, B256};
use tracing::*;

use super::{GatewayCore, Unlock};
use crate::{
    cfg::Config,
    error::Result,
    event::Event,
    ledger::Ledger,
    message::{Intent, IntentKind},
    proof::AccountProof,
    token::UtilityToken,
};

/// The auxiliary end of a bridge. Stakes are confirmed and minted here, redeems are declared here. The gateway must
/// be the minter of the utility token.
#[derive(Debug, Clone)]
pub struct CoGateway {
    pub core: GatewayCore,
}

impl CoGateway {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(CoGateway {
            core: GatewayCore::new(
                &config.auxiliary,
                &config.origin,
                IntentKind::Redeem,
                IntentKind::Stake,
            )?,
        })
    }

    pub fn address(&self) -> Address {
        self.core.address
    }

    pub fn redeem_intent_hash(&self, intent: &Intent) -> B256 {
        intent.intent_hash(IntentKind::Redeem, self.core.address)
    }

    /// Confirms a stake declared on the origin chain. Returns the message hash derived from `intent`.
    pub fn confirm_stake_intent<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        intent: Intent,
        proof: &AccountProof,
    ) -> Result<B256> {
        ledger.transact(|ledger| {
            let message_hash = self.core.confirm(ledger, intent, proof)?;
            info!(
                %message_hash,
                staker = %intent.account,
                nonce = intent.nonce,
                block_height = proof.block_number,
                "stake intent confirmed"
            );
            ledger.emit(Event::StakeIntentConfirmed {
                message_hash,
                intent,
                block_height: proof.block_number,
            });
            Ok(message_hash)
        })
    }

    pub fn progress_mint<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        unlock_secret: B256,
    ) -> Result<()> {
        self.progress_mint_inner(ledger, caller, message_hash, Unlock::Secret(unlock_secret))
    }

    /// Mints with a proof that the origin chain still has the stake declared, or has progressed it.
    pub fn progress_mint_with_proof<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        proof: &AccountProof,
    ) -> Result<()> {
        self.progress_mint_inner(ledger, caller, message_hash, Unlock::Proof(proof))
    }

    fn progress_mint_inner<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        unlock: Unlock<'_>,
    ) -> Result<()> {
        ledger.transact(|ledger| {
            let transfer = self.core.progress_inbox(ledger, message_hash, unlock)?;
            let (minted, reward) = GatewayCore::split_reward(&transfer.intent)?;
            let beneficiary = transfer.intent.beneficiary;

            let token = ledger.token_mut(self.core.token)?;
            token.mint(self.core.address, beneficiary, minted)?;
            token.mint(self.core.address, caller, reward)?;

            info!(%message_hash, %beneficiary, minted, reward, "mint progressed");
            ledger.emit(Event::MintProgressed {
                message_hash,
                beneficiary,
                minted,
                reward,
                proven: unlock.is_proof(),
                unlock_secret: unlock.secret(),
            });
            Ok(())
        })
    }

    /// Mirrors a stake revert declared on the origin chain.
    pub fn confirm_revert_stake_intent<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        proof: &AccountProof,
    ) -> Result<()> {
        ledger.transact(|ledger| {
            let transfer = self.core.confirm_revert(ledger, message_hash, proof)?;
            let staker = transfer.intent.account;
            info!(%message_hash, %staker, block_height = proof.block_number, "stake revert confirmed");
            ledger.emit(Event::RevertStakeIntentConfirmed {
                message_hash,
                staker,
                block_height: proof.block_number,
            });
            Ok(())
        })
    }

    pub fn progress_revert_stake_intent<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        unlock_secret: B256,
    ) -> Result<()> {
        self.progress_revert_stake_intent_inner(ledger, message_hash, Unlock::Secret(unlock_secret))
    }

    pub fn progress_revert_stake_intent_with_proof<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        proof: &AccountProof,
    ) -> Result<()> {
        self.progress_revert_stake_intent_inner(ledger, message_hash, Unlock::Proof(proof))
    }

    fn progress_revert_stake_intent_inner<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        unlock: Unlock<'_>,
    ) -> Result<()> {
        ledger.transact(|ledger| {
            let transfer = self
                .core
                .progress_revert_intent(ledger, message_hash, unlock)?;
            let staker = transfer.intent.account;
            info!(%message_hash, %staker, "stake revert finalized");
            ledger.emit(Event::RevertStakeIntentProgressed {
                message_hash,
                staker,
            });
            Ok(())
        })
    }

    /// Declares a redeem. The redeemer must have approved the gateway for `intent.amount` of the utility token and
    /// the caller pays the bounty.
    pub fn redeem<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        intent: Intent,
    ) -> Result<B256> {
        ledger.transact(|ledger| {
            let message_hash = self.core.declare(ledger, caller, intent)?;
            info!(
                %message_hash,
                redeemer = %intent.account,
                nonce = intent.nonce,
                amount = intent.amount,
                "redeem intent declared"
            );
            ledger.emit(Event::RedeemIntentDeclared {
                message_hash,
                intent,
            });
            Ok(message_hash)
        })
    }

    pub fn progress_redeem<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        unlock_secret: B256,
    ) -> Result<()> {
        self.progress_redeem_inner(ledger, caller, message_hash, Unlock::Secret(unlock_secret))
    }

    pub fn progress_redeem_with_proof<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        proof: &AccountProof,
    ) -> Result<()> {
        self.progress_redeem_inner(ledger, caller, message_hash, Unlock::Proof(proof))
    }

    /// Burns the escrowed utility tokens and pays the bounty to the caller.
    fn progress_redeem_inner<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        unlock: Unlock<'_>,
    ) -> Result<()> {
        ledger.transact(|ledger| {
            let transfer = self.core.progress_outbox(ledger, message_hash, unlock)?;
            let redeemer = transfer.intent.account;
            let amount = transfer.intent.amount;

            ledger
                .token_mut(self.core.token)?
                .burn(self.core.address, self.core.address, amount)?;
            // A penalty was only posted if a revert was declared, which this progression defeated.
            self.core
                .bounty_payment
                .pay(ledger, caller, transfer.bounty + transfer.penalty)?;

            info!(%message_hash, %redeemer, amount, proven = unlock.is_proof(), "redeem progressed");
            ledger.emit(Event::RedeemProgressed {
                message_hash,
                redeemer,
                amount,
                proven: unlock.is_proof(),
                unlock_secret: unlock.secret(),
            });
            Ok(())
        })
    }

    pub fn revert_redeem<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
    ) -> Result<()> {
        ledger.transact(|ledger| {
            let transfer = self.core.revert(ledger, caller, message_hash)?;
            info!(%message_hash, redeemer = %caller, penalty = transfer.penalty, "redeem revert declared");
            ledger.emit(Event::RevertRedeemIntentDeclared {
                message_hash,
                redeemer: caller,
                penalty: transfer.penalty,
            });
            Ok(())
        })
    }

    /// Returns the escrowed utility tokens and the penalty to the redeemer once the origin chain mirrored the revert.
    pub fn progress_revert_redeem<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        proof: &AccountProof,
    ) -> Result<()> {
        ledger.transact(|ledger| {
            let transfer = self.core.progress_revert(ledger, message_hash, proof)?;
            let redeemer = transfer.intent.account;
            let amount = transfer.intent.amount;

            ledger
                .token_mut(self.core.token)?
                .transfer(self.core.address, redeemer, amount)?;
            self.core
                .bounty_payment
                .pay(ledger, redeemer, transfer.penalty)?;
            self.core
                .bounty_payment
                .pay(ledger, caller, transfer.bounty)?;

            info!(%message_hash, %redeemer, amount, "redeem reverted");
            ledger.emit(Event::RevertRedeemProgressed {
                message_hash,
                redeemer,
                amount,
            });
            Ok(())
        })
    }
}
