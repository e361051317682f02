use std::{fs, path::Path};

use alloy::primitives::{Address, B256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{error::GatewayError, payment::PaymentMethod};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The chain value is staked on. Runs the `Gateway`.
    pub origin: ChainConfig,
    /// The chain the staked value is minted on. Runs the `CoGateway`.
    pub auxiliary: ChainConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Address of this chain's gateway account. Message statuses are stored in its storage.
    pub gateway: Address,
    /// On origin, the token being staked. On auxiliary, the utility token minted for it.
    pub token: Address,
    /// Account holding staked value until it is unstaked. Required on origin.
    #[serde(default)]
    pub stake_vault: Option<Address>,
    /// The only account allowed to anchor state roots of the counterpart chain.
    pub anchor_reporter: Address,
    /// How many counterpart state roots are kept. Defaults to 10.
    #[serde(default = "anchor_capacity_default")]
    pub anchor_capacity: usize,
    /// Counterpart state root to start the anchor from.
    #[serde(default)]
    pub genesis_anchor: GenesisAnchor,
    /// Posted by whoever declares a stake or redeem, paid to whoever progresses it.
    pub bounty: u128,
    #[serde(default)]
    pub bounty_payment: PaymentMethod,
    /// Penalty posted on revert, in basis points of the bounty. Defaults to 15000 (1.5x).
    #[serde(default = "penalty_bps_default")]
    pub penalty_bps: u32,
    /// Blocks which must pass after declaring a message before its revocation may be declared.
    #[serde(default = "unlock_window_default")]
    pub unlock_window: u64,
    /// Accounts allowed to declare stakes and redeems on behalf of others.
    #[serde(default)]
    pub facilitators: Vec<Address>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisAnchor {
    pub block_height: u64,
    pub state_root: B256,
}

pub fn anchor_capacity_default() -> usize {
    10
}

pub fn penalty_bps_default() -> u32 {
    15_000
}

pub fn unlock_window_default() -> u64 {
    100
}

impl ChainConfig {
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.gateway.is_zero() {
            return Err(GatewayError::Config(format!(
                "chain {}: gateway address must be set",
                self.chain_id
            )));
        }
        if self.anchor_capacity == 0 {
            return Err(GatewayError::Config(format!(
                "chain {}: anchor capacity must be at least 1",
                self.chain_id
            )));
        }
        if let PaymentMethod::Token { token } = self.bounty_payment {
            if token.is_zero() {
                return Err(GatewayError::Config(format!(
                    "chain {}: bounty token address must be set",
                    self.chain_id
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), GatewayError> {
        self.origin.validate()?;
        self.auxiliary.validate()?;
        if self.origin.chain_id == self.auxiliary.chain_id {
            return Err(GatewayError::Config(
                "origin and auxiliary chain ids must differ".to_owned(),
            ));
        }
        match self.origin.stake_vault {
            Some(vault) if !vault.is_zero() && vault != self.origin.gateway => {}
            _ => {
                return Err(GatewayError::Config(
                    "origin needs a stake vault distinct from its gateway".to_owned(),
                ));
            }
        }
        Ok(())
    }
}

pub fn read_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
