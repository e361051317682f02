use alloy::primitives::{Address, B256};
use gateway::{
    error::GatewayError,
    event::Event,
    message::{MessageBox, MessageStatus},
    payment::PaymentMethod,
    token::{Eip20Token, TokenError},
};

use crate::{
    BENEFICIARY, BOUNTY, Bridge, FACILITATOR, INITIAL_NATIVE, INITIAL_VALUE, ORIGIN_GATEWAY, STAKE_VAULT, STAKER,
    STRANGER, UTILITY_TOKEN, VALUE_TOKEN, config,
};

#[test]
fn stake_and_mint_with_secret() {
    let mut bridge = Bridge::new(0);
    let (intent, secret, hash) = bridge.stake_and_confirm(200, 1, 10);

    assert_eq!(bridge.value(STAKER), INITIAL_VALUE - 200);
    assert_eq!(bridge.value(ORIGIN_GATEWAY), 200);
    assert_eq!(bridge.origin_native(FACILITATOR), INITIAL_NATIVE - BOUNTY);
    assert_eq!(bridge.origin_native(ORIGIN_GATEWAY), BOUNTY);
    assert_eq!(
        bridge.origin.message_status(MessageBox::Outbox, hash),
        MessageStatus::Declared
    );
    assert_eq!(
        bridge.auxiliary.message_status(MessageBox::Inbox, hash),
        MessageStatus::Declared
    );
    assert_eq!(bridge.origin.nonce(STAKER), 1);
    assert_eq!(bridge.auxiliary.inbox_nonce(STAKER), 1);
    assert!(bridge.origin.events().contains(&Event::StakeIntentDeclared {
        message_hash: hash,
        intent
    }));

    bridge
        .gateway
        .progress_stake(&mut bridge.origin, FACILITATOR, hash, secret)
        .unwrap();
    assert_eq!(bridge.value(STAKE_VAULT), 200);
    assert_eq!(bridge.value(ORIGIN_GATEWAY), 0);
    assert_eq!(bridge.origin_native(FACILITATOR), INITIAL_NATIVE);
    assert_eq!(bridge.origin_native(ORIGIN_GATEWAY), 0);

    bridge
        .cogateway
        .progress_mint(&mut bridge.auxiliary, FACILITATOR, hash, secret)
        .unwrap();
    assert_eq!(bridge.utility(BENEFICIARY), 190);
    assert_eq!(bridge.utility(FACILITATOR), 10);
    assert_eq!(
        bridge
            .auxiliary
            .token(UTILITY_TOKEN)
            .unwrap()
            .total_supply(),
        200
    );
    assert_eq!(
        bridge.auxiliary.message_status(MessageBox::Inbox, hash),
        MessageStatus::Progressed
    );
    assert!(matches!(
        bridge.auxiliary.events().last(),
        Some(Event::MintProgressed { minted: 190, reward: 10, proven: false, .. })
    ));
    assert!(bridge
        .auxiliary
        .events()
        .iter()
        .filter_map(Event::message_hash)
        .all(|h| h == hash));
}

#[test]
fn mint_before_stake() {
    let mut bridge = Bridge::new(1);
    let (_, secret, hash) = bridge.stake_and_confirm(300, 2, 5);

    bridge
        .cogateway
        .progress_mint(&mut bridge.auxiliary, FACILITATOR, hash, secret)
        .unwrap();

    // The staker never reveals the secret on origin. A proof of the progressed inbox is enough.
    let proof = bridge.auxiliary_inbox_proof(hash);
    bridge
        .gateway
        .progress_stake_with_proof(&mut bridge.origin, STRANGER, hash, &proof)
        .unwrap();
    assert_eq!(bridge.value(STAKE_VAULT), 300);
    assert_eq!(bridge.origin_native(STRANGER), BOUNTY);
    assert_eq!(
        bridge.origin.message_status(MessageBox::Outbox, hash),
        MessageStatus::Progressed
    );
}

#[test]
fn progress_with_proofs_only() {
    let mut bridge = Bridge::new(2);
    let (_, _, hash) = bridge.stake_and_confirm(50, 0, 0);

    let proof = bridge.origin_outbox_proof(hash);
    bridge
        .cogateway
        .progress_mint_with_proof(&mut bridge.auxiliary, FACILITATOR, hash, &proof)
        .unwrap();
    assert_eq!(bridge.utility(BENEFICIARY), 50);

    let proof = bridge.auxiliary_inbox_proof(hash);
    bridge
        .gateway
        .progress_stake_with_proof(&mut bridge.origin, FACILITATOR, hash, &proof)
        .unwrap();
    assert_eq!(bridge.value(STAKE_VAULT), 50);
}

#[test]
fn wrong_secret_changes_nothing() {
    let mut bridge = Bridge::new(3);
    let (_, _, hash) = bridge.stake_and_confirm(200, 0, 0);
    let height = bridge.origin.block_number();

    assert_eq!(
        bridge
            .gateway
            .progress_stake(&mut bridge.origin, FACILITATOR, hash, B256::ZERO),
        Err(GatewayError::InvalidSecret)
    );
    assert_eq!(
        bridge
            .cogateway
            .progress_mint(&mut bridge.auxiliary, FACILITATOR, hash, B256::repeat_byte(0x42)),
        Err(GatewayError::InvalidSecret)
    );
    assert_eq!(bridge.origin.block_number(), height);
    assert_eq!(
        bridge.origin.message_status(MessageBox::Outbox, hash),
        MessageStatus::Declared
    );
    assert_eq!(bridge.value(ORIGIN_GATEWAY), 200);
    assert_eq!(bridge.utility(BENEFICIARY), 0);
}

#[test]
fn stake_validation() {
    let mut bridge = Bridge::new(4);
    bridge.approve_stake(1_000);
    let height = bridge.origin.block_number();

    let (mut intent, _) = bridge.stake_intent(0, 0, 0);
    assert_eq!(
        bridge.gateway.stake(&mut bridge.origin, FACILITATOR, intent),
        Err(GatewayError::InvalidAmount("amount must be positive"))
    );

    intent.amount = 100;
    intent.beneficiary = Address::ZERO;
    assert_eq!(
        bridge.gateway.stake(&mut bridge.origin, FACILITATOR, intent),
        Err(GatewayError::InvalidBeneficiary)
    );

    intent.beneficiary = BENEFICIARY;
    intent.gas_price = 11;
    intent.gas_limit = 10;
    assert_eq!(
        bridge.gateway.stake(&mut bridge.origin, FACILITATOR, intent),
        Err(GatewayError::InvalidAmount("reward exceeds amount"))
    );

    intent.gas_price = 1;
    assert_eq!(
        bridge.gateway.stake(&mut bridge.origin, STRANGER, intent),
        Err(GatewayError::Unauthorized)
    );

    intent.nonce = 2;
    assert_eq!(
        bridge.gateway.stake(&mut bridge.origin, FACILITATOR, intent),
        Err(GatewayError::InvalidNonce {
            expected: 1,
            got: 2
        })
    );

    intent.nonce = 1;
    intent.amount = 2_000;
    assert_eq!(
        bridge.gateway.stake(&mut bridge.origin, FACILITATOR, intent),
        Err(GatewayError::Token(TokenError::InsufficientAllowance {
            owner: STAKER,
            spender: ORIGIN_GATEWAY,
            allowance: 1_000,
            needed: 2_000
        }))
    );

    assert_eq!(bridge.origin.block_number(), height);
    assert_eq!(bridge.origin.nonce(STAKER), 0);
    assert_eq!(bridge.value(STAKER), INITIAL_VALUE);

    // The staker may declare for themselves.
    intent.amount = 100;
    bridge
        .gateway
        .stake(&mut bridge.origin, STAKER, intent)
        .unwrap();
    assert_eq!(bridge.origin_native(STAKER), INITIAL_NATIVE - BOUNTY);
}

#[test]
fn one_active_process_per_staker() {
    let mut bridge = Bridge::new(5);
    let (_, secret, hash) = bridge.stake_and_confirm(100, 0, 0);

    let (next, _) = bridge.stake_intent(100, 0, 0);
    bridge.approve_stake(100);
    assert_eq!(next.nonce, 2);
    assert_eq!(
        bridge.gateway.stake(&mut bridge.origin, FACILITATOR, next),
        Err(GatewayError::PreviousProcessNotFinalized)
    );

    bridge
        .gateway
        .progress_stake(&mut bridge.origin, FACILITATOR, hash, secret)
        .unwrap();
    bridge
        .gateway
        .stake(&mut bridge.origin, FACILITATOR, next)
        .unwrap();
    assert_eq!(bridge.origin.nonce(STAKER), 2);
}

#[test]
fn confirmation_rejects_a_different_intent() {
    let mut bridge = Bridge::new(6);
    let (intent, secret) = bridge.stake_intent(200, 1, 1);
    bridge.approve_stake(200);
    let hash = bridge
        .gateway
        .stake(&mut bridge.origin, FACILITATOR, intent)
        .unwrap();
    let proof = bridge.origin_outbox_proof(hash);

    // The proof covers the slot of the honest message only.
    let mut inflated = intent;
    inflated.amount = 2_000;
    assert!(matches!(
        bridge
            .cogateway
            .confirm_stake_intent(&mut bridge.auxiliary, inflated, &proof),
        Err(GatewayError::ProofInvalid(_))
    ));
    assert_eq!(bridge.auxiliary.inbox_nonce(STAKER), 0);

    let confirmed = bridge
        .cogateway
        .confirm_stake_intent(&mut bridge.auxiliary, intent, &proof)
        .unwrap();
    assert_eq!(confirmed, hash);
    assert_eq!(
        bridge
            .cogateway
            .confirm_stake_intent(&mut bridge.auxiliary, intent, &proof),
        Err(GatewayError::InvalidNonce {
            expected: 2,
            got: 1
        })
    );

    bridge
        .cogateway
        .progress_mint(&mut bridge.auxiliary, FACILITATOR, hash, secret)
        .unwrap();
    assert_eq!(bridge.utility(BENEFICIARY), 199);
}

#[test]
fn bounty_in_tokens() {
    let mut config = config();
    config.origin.bounty_payment = PaymentMethod::Token { token: VALUE_TOKEN };
    let mut bridge = Bridge::with_config(7, config);

    let token = bridge.origin.token_mut(VALUE_TOKEN).unwrap();
    token.transfer(STAKER, FACILITATOR, 500).unwrap();
    token
        .approve(FACILITATOR, ORIGIN_GATEWAY, BOUNTY)
        .unwrap();

    let (_, secret, hash) = bridge.stake_and_confirm(200, 0, 0);
    assert_eq!(bridge.value(FACILITATOR), 500 - BOUNTY);
    assert_eq!(bridge.value(ORIGIN_GATEWAY), 200 + BOUNTY);
    assert_eq!(bridge.origin_native(FACILITATOR), INITIAL_NATIVE);

    bridge
        .gateway
        .progress_stake(&mut bridge.origin, FACILITATOR, hash, secret)
        .unwrap();
    assert_eq!(bridge.value(FACILITATOR), 500);
    assert_eq!(bridge.value(ORIGIN_GATEWAY), 0);
    assert_eq!(bridge.value(STAKE_VAULT), 200);
}
