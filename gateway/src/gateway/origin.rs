use alloy::primitives::{Address, B256};
use tracing::*;

use super::{GatewayCore, Unlock};
use crate::{
    cfg::Config,
    error::{GatewayError, Result},
    event::Event,
    ledger::Ledger,
    message::{Intent, IntentKind},
    proof::AccountProof,
    token::UtilityToken,
};

/// The origin end of a bridge. Stakes are declared here and unstakes are confirmed here.
#[derive(Debug, Clone)]
pub struct Gateway {
    pub core: GatewayCore,
    /// Holds staked value from `progress_stake` until it is unstaked. Unstaking spends the vault's allowance to the
    /// gateway.
    pub stake_vault: Address,
}

impl Gateway {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let stake_vault = config
            .origin
            .stake_vault
            .ok_or_else(|| GatewayError::Config("origin needs a stake vault".to_owned()))?;
        Ok(Gateway {
            core: GatewayCore::new(
                &config.origin,
                &config.auxiliary,
                IntentKind::Stake,
                IntentKind::Redeem,
            )?,
            stake_vault,
        })
    }

    pub fn address(&self) -> Address {
        self.core.address
    }

    pub fn stake_intent_hash(&self, intent: &Intent) -> B256 {
        intent.intent_hash(IntentKind::Stake, self.core.address)
    }

    /// Declares a stake. The staker must have approved the gateway for `intent.amount` of the value token and the
    /// caller pays the bounty.
    pub fn stake<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        intent: Intent,
    ) -> Result<B256> {
        ledger.transact(|ledger| {
            let message_hash = self.core.declare(ledger, caller, intent)?;
            info!(
                %message_hash,
                staker = %intent.account,
                nonce = intent.nonce,
                amount = intent.amount,
                "stake intent declared"
            );
            ledger.emit(Event::StakeIntentDeclared {
                message_hash,
                intent,
            });
            Ok(message_hash)
        })
    }

    pub fn progress_stake<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        unlock_secret: B256,
    ) -> Result<()> {
        self.progress_stake_inner(ledger, caller, message_hash, Unlock::Secret(unlock_secret))
    }

    /// Progresses a stake with a proof that the auxiliary chain confirmed or progressed it.
    pub fn progress_stake_with_proof<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        proof: &AccountProof,
    ) -> Result<()> {
        self.progress_stake_inner(ledger, caller, message_hash, Unlock::Proof(proof))
    }

    fn progress_stake_inner<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        unlock: Unlock<'_>,
    ) -> Result<()> {
        ledger.transact(|ledger| {
            let transfer = self.core.progress_outbox(ledger, message_hash, unlock)?;
            let staker = transfer.intent.account;
            let amount = transfer.intent.amount;

            ledger
                .token_mut(self.core.token)?
                .transfer(self.core.address, self.stake_vault, amount)?;
            // A penalty was only posted if a revert was declared, which this progression defeated.
            self.core
                .bounty_payment
                .pay(ledger, caller, transfer.bounty + transfer.penalty)?;

            info!(%message_hash, %staker, amount, proven = unlock.is_proof(), "stake progressed");
            ledger.emit(Event::StakeProgressed {
                message_hash,
                staker,
                amount,
                proven: unlock.is_proof(),
                unlock_secret: unlock.secret(),
            });
            Ok(())
        })
    }

    /// Starts reverting a stake which has not been progressed. Only the staker may call this, after the unlock
    /// window, and it posts the penalty.
    pub fn revert_stake<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
    ) -> Result<()> {
        ledger.transact(|ledger| {
            let transfer = self.core.revert(ledger, caller, message_hash)?;
            info!(%message_hash, staker = %caller, penalty = transfer.penalty, "stake revert declared");
            ledger.emit(Event::RevertStakeIntentDeclared {
                message_hash,
                staker: caller,
                penalty: transfer.penalty,
            });
            Ok(())
        })
    }

    /// Completes a revert once the auxiliary chain has mirrored it. The staker gets the staked amount and the penalty
    /// back and the caller earns the bounty.
    pub fn progress_revert_stake<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        proof: &AccountProof,
    ) -> Result<()> {
        ledger.transact(|ledger| {
            let transfer = self.core.progress_revert(ledger, message_hash, proof)?;
            let staker = transfer.intent.account;
            let amount = transfer.intent.amount;

            ledger
                .token_mut(self.core.token)?
                .transfer(self.core.address, staker, amount)?;
            self.core
                .bounty_payment
                .pay(ledger, staker, transfer.penalty)?;
            self.core
                .bounty_payment
                .pay(ledger, caller, transfer.bounty)?;

            info!(%message_hash, %staker, amount, "stake reverted");
            ledger.emit(Event::RevertStakeProgressed {
                message_hash,
                staker,
                amount,
            });
            Ok(())
        })
    }

    /// Confirms a redeem declared on the auxiliary chain. Returns the message hash derived from `intent`.
    pub fn confirm_redeem_intent<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        intent: Intent,
        proof: &AccountProof,
    ) -> Result<B256> {
        ledger.transact(|ledger| {
            let message_hash = self.core.confirm(ledger, intent, proof)?;
            info!(
                %message_hash,
                redeemer = %intent.account,
                nonce = intent.nonce,
                block_height = proof.block_number,
                "redeem intent confirmed"
            );
            ledger.emit(Event::RedeemIntentConfirmed {
                message_hash,
                intent,
                block_height: proof.block_number,
            });
            Ok(message_hash)
        })
    }

    pub fn progress_unstake<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        unlock_secret: B256,
    ) -> Result<()> {
        self.progress_unstake_inner(ledger, caller, message_hash, Unlock::Secret(unlock_secret))
    }

    pub fn progress_unstake_with_proof<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        proof: &AccountProof,
    ) -> Result<()> {
        self.progress_unstake_inner(ledger, caller, message_hash, Unlock::Proof(proof))
    }

    /// Releases redeemed value from the vault, which must have approved the gateway. The beneficiary gets the amount
    /// less the reward, which goes to the caller.
    fn progress_unstake_inner<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        caller: Address,
        message_hash: B256,
        unlock: Unlock<'_>,
    ) -> Result<()> {
        ledger.transact(|ledger| {
            let transfer = self.core.progress_inbox(ledger, message_hash, unlock)?;
            let (unstaked, reward) = GatewayCore::split_reward(&transfer.intent)?;
            let beneficiary = transfer.intent.beneficiary;

            let token = ledger.token_mut(self.core.token)?;
            token.transfer_from(self.core.address, self.stake_vault, beneficiary, unstaked)?;
            token.transfer_from(self.core.address, self.stake_vault, caller, reward)?;

            info!(%message_hash, %beneficiary, unstaked, reward, "unstake progressed");
            ledger.emit(Event::UnstakeProgressed {
                message_hash,
                beneficiary,
                unstaked,
                reward,
                proven: unlock.is_proof(),
                unlock_secret: unlock.secret(),
            });
            Ok(())
        })
    }

    /// Mirrors a redeem revert declared on the auxiliary chain.
    pub fn confirm_revert_redeem_intent<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        proof: &AccountProof,
    ) -> Result<()> {
        ledger.transact(|ledger| {
            let transfer = self.core.confirm_revert(ledger, message_hash, proof)?;
            let redeemer = transfer.intent.account;
            info!(%message_hash, %redeemer, block_height = proof.block_number, "redeem revert confirmed");
            ledger.emit(Event::RevertRedeemIntentConfirmed {
                message_hash,
                redeemer,
                block_height: proof.block_number,
            });
            Ok(())
        })
    }

    pub fn progress_revert_redeem_intent<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        unlock_secret: B256,
    ) -> Result<()> {
        self.progress_revert_redeem_intent_inner(ledger, message_hash, Unlock::Secret(unlock_secret))
    }

    pub fn progress_revert_redeem_intent_with_proof<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        proof: &AccountProof,
    ) -> Result<()> {
        self.progress_revert_redeem_intent_inner(ledger, message_hash, Unlock::Proof(proof))
    }

    fn progress_revert_redeem_intent_inner<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        message_hash: B256,
        unlock: Unlock<'_>,
    ) -> Result<()> {
        ledger.transact(|ledger| {
            let transfer = self
                .core
                .progress_revert_intent(ledger, message_hash, unlock)?;
            let redeemer = transfer.intent.account;
            info!(%message_hash, %redeemer, "redeem revert finalized");
            ledger.emit(Event::RevertRedeemIntentProgressed {
                message_hash,
                redeemer,
            });
            Ok(())
        })
    }
}
