use alloy::primitives::B256;
use gateway::{
    error::GatewayError,
    event::Event,
    message::{MessageBox, MessageStatus},
};

use crate::{
    BOUNTY, Bridge, FACILITATOR, INITIAL_NATIVE, INITIAL_VALUE, ORIGIN_GATEWAY, PENALTY, STAKE_VAULT, STAKER, STRANGER,
    UNLOCK_WINDOW,
};

#[test]
fn revert_stake() {
    let mut bridge = Bridge::new(10);
    let (_, secret, hash) = bridge.stake_and_confirm(200, 1, 10);

    // Nothing happened on origin since the stake, so the next block is one past its declaration.
    assert_eq!(
        bridge.gateway.revert_stake(&mut bridge.origin, STAKER, hash),
        Err(GatewayError::NotYetUnlockable {
            remaining: UNLOCK_WINDOW - 1
        })
    );
    bridge.origin.advance_blocks(UNLOCK_WINDOW - 1).unwrap();
    assert_eq!(
        bridge
            .gateway
            .revert_stake(&mut bridge.origin, FACILITATOR, hash),
        Err(GatewayError::Unauthorized)
    );
    assert_eq!(
        bridge
            .gateway
            .revert_stake(&mut bridge.origin, STAKER, B256::ZERO),
        Err(GatewayError::UnknownMessage(B256::ZERO))
    );

    bridge
        .gateway
        .revert_stake(&mut bridge.origin, STAKER, hash)
        .unwrap();
    assert_eq!(bridge.origin_native(STAKER), INITIAL_NATIVE - PENALTY);
    assert_eq!(bridge.origin_native(ORIGIN_GATEWAY), BOUNTY + PENALTY);
    assert_eq!(
        bridge.origin.message_status(MessageBox::Outbox, hash),
        MessageStatus::DeclaredRevocation
    );
    assert_eq!(
        bridge
            .gateway
            .progress_stake(&mut bridge.origin, FACILITATOR, hash, secret),
        Err(GatewayError::RevocationInProgress)
    );

    let proof = bridge.origin_outbox_proof(hash);
    bridge
        .cogateway
        .confirm_revert_stake_intent(&mut bridge.auxiliary, hash, &proof)
        .unwrap();
    assert_eq!(
        bridge.auxiliary.message_status(MessageBox::Inbox, hash),
        MessageStatus::DeclaredRevocation
    );
    assert_eq!(
        bridge
            .cogateway
            .progress_mint(&mut bridge.auxiliary, FACILITATOR, hash, secret),
        Err(GatewayError::RevocationInProgress)
    );

    let proof = bridge.auxiliary_inbox_proof(hash);
    bridge
        .gateway
        .progress_revert_stake(&mut bridge.origin, STRANGER, hash, &proof)
        .unwrap();
    assert_eq!(bridge.value(STAKER), INITIAL_VALUE);
    assert_eq!(bridge.value(ORIGIN_GATEWAY), 0);
    assert_eq!(bridge.value(STAKE_VAULT), 0);
    assert_eq!(bridge.origin_native(STAKER), INITIAL_NATIVE);
    assert_eq!(bridge.origin_native(STRANGER), BOUNTY);
    assert_eq!(bridge.origin_native(FACILITATOR), INITIAL_NATIVE - BOUNTY);
    assert_eq!(bridge.origin_native(ORIGIN_GATEWAY), 0);
    assert_eq!(
        bridge.origin.message_status(MessageBox::Outbox, hash),
        MessageStatus::Revoked
    );

    let proof = bridge.origin_outbox_proof(hash);
    bridge
        .cogateway
        .progress_revert_stake_intent_with_proof(&mut bridge.auxiliary, hash, &proof)
        .unwrap();
    assert_eq!(
        bridge.auxiliary.message_status(MessageBox::Inbox, hash),
        MessageStatus::Revoked
    );
    assert!(bridge
        .auxiliary
        .events()
        .contains(&Event::RevertStakeIntentProgressed {
            message_hash: hash,
            staker: STAKER
        }));

    // The staker is free to stake again.
    let (intent, _) = bridge.stake_intent(100, 0, 0);
    bridge.approve_stake(100);
    bridge
        .gateway
        .stake(&mut bridge.origin, STAKER, intent)
        .unwrap();
}

#[test]
fn inbox_revocation_with_secret() {
    let mut bridge = Bridge::new(11);
    let (_, secret, hash) = bridge.stake_and_confirm(200, 0, 0);
    bridge.origin.advance_blocks(UNLOCK_WINDOW).unwrap();
    bridge
        .gateway
        .revert_stake(&mut bridge.origin, STAKER, hash)
        .unwrap();
    let proof = bridge.origin_outbox_proof(hash);
    bridge
        .cogateway
        .confirm_revert_stake_intent(&mut bridge.auxiliary, hash, &proof)
        .unwrap();

    assert_eq!(
        bridge
            .cogateway
            .progress_revert_stake_intent(&mut bridge.auxiliary, hash, B256::ZERO),
        Err(GatewayError::InvalidSecret)
    );
    bridge
        .cogateway
        .progress_revert_stake_intent(&mut bridge.auxiliary, hash, secret)
        .unwrap();
    assert_eq!(
        bridge.auxiliary.message_status(MessageBox::Inbox, hash),
        MessageStatus::Revoked
    );

    // Origin finalizes with a proof of the revoked inbox just as well.
    let proof = bridge.auxiliary_inbox_proof(hash);
    bridge
        .gateway
        .progress_revert_stake(&mut bridge.origin, FACILITATOR, hash, &proof)
        .unwrap();
    assert_eq!(bridge.value(STAKER), INITIAL_VALUE);
}

#[test]
fn revert_after_progress_fails() {
    let mut bridge = Bridge::new(12);
    let (_, secret, hash) = bridge.stake_and_confirm(200, 0, 0);
    bridge
        .gateway
        .progress_stake(&mut bridge.origin, FACILITATOR, hash, secret)
        .unwrap();
    bridge.origin.advance_blocks(UNLOCK_WINDOW * 2).unwrap();

    assert_eq!(
        bridge.gateway.revert_stake(&mut bridge.origin, STAKER, hash),
        Err(GatewayError::AlreadyFinalized)
    );
    assert_eq!(bridge.origin_native(STAKER), INITIAL_NATIVE);
}

#[test]
fn mint_defeats_a_late_revert() {
    let mut bridge = Bridge::new(13);
    let (_, secret, hash) = bridge.stake_and_confirm(200, 0, 0);
    bridge
        .cogateway
        .progress_mint(&mut bridge.auxiliary, FACILITATOR, hash, secret)
        .unwrap();

    bridge.origin.advance_blocks(UNLOCK_WINDOW).unwrap();
    bridge
        .gateway
        .revert_stake(&mut bridge.origin, STAKER, hash)
        .unwrap();

    let proof = bridge.origin_outbox_proof(hash);
    assert_eq!(
        bridge
            .cogateway
            .confirm_revert_stake_intent(&mut bridge.auxiliary, hash, &proof),
        Err(GatewayError::AlreadyFinalized)
    );

    // The revocation can never complete, so the stake is progressed instead and the penalty is forfeited.
    let proof = bridge.auxiliary_inbox_proof(hash);
    assert_eq!(
        bridge
            .gateway
            .progress_revert_stake(&mut bridge.origin, FACILITATOR, hash, &proof),
        Err(GatewayError::InvalidStatus(MessageStatus::Progressed))
    );
    bridge
        .gateway
        .progress_stake_with_proof(&mut bridge.origin, STRANGER, hash, &proof)
        .unwrap();
    assert_eq!(bridge.value(STAKE_VAULT), 200);
    assert_eq!(bridge.origin_native(STRANGER), BOUNTY + PENALTY);
    assert_eq!(bridge.origin_native(STAKER), INITIAL_NATIVE - PENALTY);
    assert_eq!(
        bridge.origin.message_status(MessageBox::Outbox, hash),
        MessageStatus::Progressed
    );
}
