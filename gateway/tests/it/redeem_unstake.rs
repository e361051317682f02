use gateway::{
    error::GatewayError,
    event::Event,
    message::{IntentKind, MessageBox, MessageStatus},
    token::{Eip20Token, TokenError},
};

use crate::{
    BENEFICIARY, BOUNTY, Bridge, COGATEWAY, FACILITATOR, INITIAL_NATIVE, INITIAL_VALUE, ORIGIN_GATEWAY, STAKE_VAULT,
    STAKER, STRANGER, UTILITY_TOKEN, VALUE_TOKEN,
};

fn total_supply(bridge: &Bridge) -> u128 {
    bridge
        .auxiliary
        .token(UTILITY_TOKEN)
        .unwrap()
        .total_supply()
}

#[test]
fn redeem_and_unstake_with_secret() {
    let mut bridge = Bridge::new(20);
    bridge.mint(1_000);
    assert_eq!(bridge.utility(BENEFICIARY), 1_000);

    let (intent, secret, hash) = bridge.redeem_and_confirm(400, 1, 20);
    assert_eq!(bridge.utility(BENEFICIARY), 600);
    assert_eq!(bridge.utility(COGATEWAY), 400);
    assert_eq!(bridge.auxiliary_native(FACILITATOR), INITIAL_NATIVE - BOUNTY);
    assert_eq!(bridge.origin.inbox_nonce(BENEFICIARY), 1);
    assert!(bridge.auxiliary.events().contains(&Event::RedeemIntentDeclared {
        message_hash: hash,
        intent
    }));

    bridge
        .cogateway
        .progress_redeem(&mut bridge.auxiliary, FACILITATOR, hash, secret)
        .unwrap();
    assert_eq!(bridge.utility(COGATEWAY), 0);
    assert_eq!(total_supply(&bridge), 600);
    assert_eq!(bridge.auxiliary_native(FACILITATOR), INITIAL_NATIVE);

    bridge
        .gateway
        .progress_unstake(&mut bridge.origin, FACILITATOR, hash, secret)
        .unwrap();
    assert_eq!(bridge.value(STAKER), INITIAL_VALUE - 1_000 + 380);
    assert_eq!(bridge.value(FACILITATOR), 20);
    assert_eq!(bridge.value(STAKE_VAULT), 600);
    assert_eq!(
        bridge.origin.message_status(MessageBox::Inbox, hash),
        MessageStatus::Progressed
    );
    assert!(matches!(
        bridge.origin.events().last(),
        Some(Event::UnstakeProgressed { unstaked: 380, reward: 20, .. })
    ));
}

#[test]
fn unstake_before_redeem_with_proofs() {
    let mut bridge = Bridge::new(21);
    bridge.mint(500);
    let (_, _, hash) = bridge.redeem_and_confirm(500, 0, 0);

    let proof = bridge.auxiliary_outbox_proof(hash);
    bridge
        .gateway
        .progress_unstake_with_proof(&mut bridge.origin, FACILITATOR, hash, &proof)
        .unwrap();
    assert_eq!(bridge.value(STAKER), INITIAL_VALUE);
    assert_eq!(bridge.value(STAKE_VAULT), 0);

    let proof = bridge.origin_inbox_proof(hash);
    bridge
        .cogateway
        .progress_redeem_with_proof(&mut bridge.auxiliary, STRANGER, hash, &proof)
        .unwrap();
    assert_eq!(total_supply(&bridge), 0);
    assert_eq!(bridge.auxiliary_native(STRANGER), BOUNTY);
    assert_eq!(
        bridge.auxiliary.message_status(MessageBox::Outbox, hash),
        MessageStatus::Progressed
    );
}

#[test]
fn redeem_validation() {
    let mut bridge = Bridge::new(22);
    bridge.mint(1_000);
    let height = bridge.auxiliary.block_number();

    let (intent, _) = bridge.redeem_intent(5_000, 0, 0);
    bridge.approve_redeem(5_000);
    assert_eq!(
        bridge
            .cogateway
            .redeem(&mut bridge.auxiliary, FACILITATOR, intent),
        Err(GatewayError::Token(TokenError::InsufficientBalance {
            account: BENEFICIARY,
            balance: 1_000,
            needed: 5_000
        }))
    );
    assert_eq!(
        bridge.cogateway.redeem(&mut bridge.auxiliary, STRANGER, intent),
        Err(GatewayError::Unauthorized)
    );

    assert_eq!(bridge.auxiliary.block_number(), height);
    assert_eq!(bridge.auxiliary.nonce(BENEFICIARY), 0);

    let (intent, _) = bridge.redeem_intent(1_000, 0, 0);
    let hash = bridge
        .cogateway
        .redeem(&mut bridge.auxiliary, FACILITATOR, intent)
        .unwrap();
    assert_eq!(
        hash,
        intent.message(IntentKind::Redeem, COGATEWAY).hash()
    );
    assert_eq!(bridge.utility(BENEFICIARY), 0);
}

#[test]
fn unstake_is_exactly_once() {
    let mut bridge = Bridge::new(23);
    bridge.mint(300);
    let (_, secret, hash) = bridge.redeem_and_confirm(300, 1, 1);

    bridge
        .gateway
        .progress_unstake(&mut bridge.origin, FACILITATOR, hash, secret)
        .unwrap();
    let vault = bridge.value(STAKE_VAULT);
    assert_eq!(
        bridge
            .gateway
            .progress_unstake(&mut bridge.origin, STRANGER, hash, secret),
        Err(GatewayError::AlreadyFinalized)
    );
    let proof = bridge.auxiliary_outbox_proof(hash);
    assert_eq!(
        bridge
            .gateway
            .progress_unstake_with_proof(&mut bridge.origin, STRANGER, hash, &proof),
        Err(GatewayError::AlreadyFinalized)
    );
    assert_eq!(bridge.value(STAKE_VAULT), vault);
    assert_eq!(bridge.value(STRANGER), 0);
}

#[test]
fn unstake_spends_the_vault_allowance() {
    let mut bridge = Bridge::new(24);
    bridge.mint(500);
    let (_, secret, hash) = bridge.redeem_and_confirm(500, 1, 10);

    bridge
        .origin
        .token_mut(VALUE_TOKEN)
        .unwrap()
        .approve(STAKE_VAULT, ORIGIN_GATEWAY, 100)
        .unwrap();
    assert_eq!(
        bridge
            .gateway
            .progress_unstake(&mut bridge.origin, FACILITATOR, hash, secret),
        Err(GatewayError::Token(TokenError::InsufficientAllowance {
            owner: STAKE_VAULT,
            spender: ORIGIN_GATEWAY,
            allowance: 100,
            needed: 490
        }))
    );
    assert_eq!(bridge.value(STAKE_VAULT), 500);

    bridge
        .origin
        .token_mut(VALUE_TOKEN)
        .unwrap()
        .approve(STAKE_VAULT, ORIGIN_GATEWAY, 500)
        .unwrap();
    bridge
        .gateway
        .progress_unstake(&mut bridge.origin, FACILITATOR, hash, secret)
        .unwrap();
    assert_eq!(bridge.value(STAKE_VAULT), 0);
    assert_eq!(
        bridge
            .origin
            .token(VALUE_TOKEN)
            .unwrap()
            .allowance(STAKE_VAULT, ORIGIN_GATEWAY),
        0
    );
}
