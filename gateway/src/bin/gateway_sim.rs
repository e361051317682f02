use std::path::PathBuf;

use alloy::primitives::{Address, B256};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use gateway::{
    cfg::{Config, read_config},
    gateway::{CoGateway, Gateway},
    ledger::Ledger,
    message::{Intent, hash_lock},
    relayer::{inbox_proof, outbox_proof, relay_anchor},
    token::{Eip20Token, MemoryToken},
};
use tracing::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = include_str!("../../config.toml");

const STAKER: Address = Address::repeat_byte(0xa1);
const BENEFICIARY: Address = Address::repeat_byte(0xb1);

/// Runs a stake and a redeem across two in-memory chains.
#[derive(Parser, Debug)]
struct Args {
    /// Amount to stake. Everything minted for it is redeemed again.
    #[clap(long, default_value = "1000")]
    amount: u128,
    #[clap(long, default_value = "1")]
    gas_price: u128,
    #[clap(long, default_value = "10")]
    gas_limit: u128,
    /// Bridge configuration. Uses a built-in configuration if not set.
    #[clap(long, short)]
    config_file: Option<PathBuf>,
    /// Print every emitted event as JSON.
    #[clap(long, default_value = "false")]
    events: bool,
    #[clap(long, default_value = "false")]
    log_json: bool,
}

/// Enough native currency for the facilitator to post every bounty of the run.
fn facilitator_funds(bounty: u128) -> Result<u128> {
    bounty
        .checked_mul(4)
        .ok_or_else(|| anyhow!("bounty {bounty} is too large to fund the facilitator"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_line_number(true)
        .with_ansi(false);
    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    let config = match &args.config_file {
        Some(path) => read_config(path)?,
        None => {
            let config: Config = toml::from_str(DEFAULT_CONFIG)?;
            config.validate()?;
            config
        }
    };

    let mut origin: Ledger = Ledger::new(&config.origin, &config.auxiliary)?;
    let mut auxiliary: Ledger = Ledger::new(&config.auxiliary, &config.origin)?;
    origin.add_token(MemoryToken::new(config.origin.token).with_balance(STAKER, args.amount));
    auxiliary.add_token(MemoryToken::with_minter(
        config.auxiliary.token,
        config.auxiliary.gateway,
    ));

    let facilitator = config
        .origin
        .facilitators
        .first()
        .copied()
        .filter(|f| config.auxiliary.facilitators.contains(f))
        .ok_or_else(|| anyhow!("both chains need a common registered facilitator"))?;
    for (ledger, bounty) in [
        (&mut origin, config.origin.bounty),
        (&mut auxiliary, config.auxiliary.bounty),
    ] {
        ledger.fund(facilitator, facilitator_funds(bounty)?)?;
    }

    let gateway = Gateway::new(&config)?;
    let cogateway = CoGateway::new(&config)?;
    origin
        .token_mut(config.origin.token)?
        .approve(gateway.stake_vault, gateway.address(), u128::MAX)?;

    // Stake and mint.
    let secret = B256::repeat_byte(0x51);
    let stake = Intent {
        account: STAKER,
        nonce: origin.nonce(STAKER) + 1,
        beneficiary: BENEFICIARY,
        amount: args.amount,
        gas_price: args.gas_price,
        gas_limit: args.gas_limit,
        hash_lock: hash_lock(secret),
    };
    origin
        .token_mut(config.origin.token)?
        .approve(STAKER, gateway.address(), stake.amount)?;
    let stake_hash = gateway.stake(&mut origin, facilitator, stake)?;

    let height = relay_anchor(&origin, &mut auxiliary, config.auxiliary.anchor_reporter)?;
    let proof = outbox_proof(&origin, stake_hash, height)?;
    let confirmed = cogateway.confirm_stake_intent(&mut auxiliary, stake, &proof)?;
    if confirmed != stake_hash {
        return Err(anyhow!("message hash mismatch: {stake_hash} != {confirmed}"));
    }
    gateway.progress_stake(&mut origin, facilitator, stake_hash, secret)?;
    cogateway.progress_mint(&mut auxiliary, facilitator, stake_hash, secret)?;
    info!(%stake_hash, "stake and mint complete");

    // Redeem everything the beneficiary received and unstake it back to the staker.
    let minted = auxiliary.token_balance(config.auxiliary.token, BENEFICIARY)?;
    let secret = B256::repeat_byte(0x52);
    let redeem = Intent {
        account: BENEFICIARY,
        nonce: auxiliary.nonce(BENEFICIARY) + 1,
        beneficiary: STAKER,
        amount: minted,
        gas_price: args.gas_price,
        gas_limit: args.gas_limit,
        hash_lock: hash_lock(secret),
    };
    auxiliary
        .token_mut(config.auxiliary.token)?
        .approve(BENEFICIARY, cogateway.address(), minted)?;
    let redeem_hash = cogateway
        .redeem(&mut auxiliary, facilitator, redeem)
        .context("redeem failed")?;

    let height = relay_anchor(&auxiliary, &mut origin, config.origin.anchor_reporter)?;
    let proof = outbox_proof(&auxiliary, redeem_hash, height)?;
    gateway.confirm_redeem_intent(&mut origin, redeem, &proof)?;
    gateway.progress_unstake(&mut origin, facilitator, redeem_hash, secret)?;

    // The redeem is finalized on auxiliary with a proof of the progressed inbox on origin.
    let height = relay_anchor(&origin, &mut auxiliary, config.auxiliary.anchor_reporter)?;
    let proof = inbox_proof(&origin, redeem_hash, height)?;
    cogateway.progress_redeem_with_proof(&mut auxiliary, facilitator, redeem_hash, &proof)?;
    info!(%redeem_hash, "redeem and unstake complete");

    let value_token = origin.token(config.origin.token)?;
    let utility_token = auxiliary.token(config.auxiliary.token)?;
    println!("origin (chain {}, block {})", origin.chain_id(), origin.block_number());
    println!("  staker        {:>12}", value_token.balance_of(STAKER));
    println!("  stake vault   {:>12}", value_token.balance_of(gateway.stake_vault));
    println!("  facilitator   {:>12}", value_token.balance_of(facilitator));
    println!("auxiliary (chain {}, block {})", auxiliary.chain_id(), auxiliary.block_number());
    println!("  beneficiary   {:>12}", utility_token.balance_of(BENEFICIARY));
    println!("  facilitator   {:>12}", utility_token.balance_of(facilitator));
    println!("  total supply  {:>12}", utility_token.total_supply());

    if args.events {
        for event in origin.events().iter().chain(auxiliary.events()) {
            println!("{}", serde_json::to_string(event)?);
        }
    }

    Ok(())
}
