use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{error::Result, ledger::Ledger, token::UtilityToken};

/// How bounties and penalties are paid to and by a gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum PaymentMethod {
    /// The chain's native currency.
    #[default]
    Native,
    /// An EIP-20 token registered on the chain. Payers must approve the gateway first.
    Token { token: Address },
}

impl PaymentMethod {
    /// Moves `amount` from `from` into the gateway's custody.
    pub fn collect<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        from: Address,
        amount: u128,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let gateway = ledger.gateway();
        match self {
            PaymentMethod::Native => ledger.state_mut().transfer_native(from, gateway, amount),
            PaymentMethod::Token { token } => {
                Ok(ledger
                    .token_mut(*token)?
                    .transfer_from(gateway, from, gateway, amount)?)
            }
        }
    }

    /// Pays `amount` out of the gateway's custody.
    pub fn pay<T: UtilityToken + Clone>(
        &self,
        ledger: &mut Ledger<T>,
        to: Address,
        amount: u128,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let gateway = ledger.gateway();
        match self {
            PaymentMethod::Native => ledger.state_mut().transfer_native(gateway, to, amount),
            PaymentMethod::Token { token } => {
                Ok(ledger.token_mut(*token)?.transfer(gateway, to, amount)?)
            }
        }
    }
}
