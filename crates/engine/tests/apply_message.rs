//! Message-level state transitions: intrinsic gas, EIP-7702 authorization
//! handling, refund quotients, the minimum-gas floor, and the end-to-end
//! transfer and creation scenarios.

mod common;

use common::*;
use cosmevm_engine::{
    gas, AuthorizationResult, EngineError, Message, MessageApplier, SkippedReason,
};
use k256::ecdsa::SigningKey;
use primitives::{address, parse_delegation, Address, Bytes, U256};
use statedb::{InMemoryKeeper, Keeper, StateDB, TxConfig};

const SENDER: Address = address!("0x00000000000000000000000000000000000000aa");
const RECIPIENT: Address = address!("0x00000000000000000000000000000000000000bb");
const DELEGATE: Address = address!("0x00000000000000000000000000000000000000cc");

#[test]
fn gas_limit_below_intrinsic_is_rejected_before_execution() {
    let mut keeper = InMemoryKeeper::new();
    fund(&mut keeper, SENDER, 1_000_000);
    let runtime = runtime();
    let block = block();
    let hooks = no_hooks();
    let executor = ScriptedExecutor::default();

    let mut state = StateDB::new(&mut keeper, TxConfig::default());
    let applier = MessageApplier::new(&runtime, &block, &hooks, &executor);
    let mut msg = Message::call(SENDER, RECIPIENT, U256::ZERO);
    msg.gas_limit = gas::TX_GAS - 1;

    let err = applier
        .apply_with_config(&mut state, &config(), &msg, true, false)
        .unwrap_err();
    assert!(matches!(err, EngineError::IntrinsicGas { .. }));
    drop(state);

    assert!(keeper.account(RECIPIENT).is_none(), "no state mutation");
    assert_eq!(keeper.account(SENDER).unwrap().nonce, 0);
}

#[test]
fn invalid_authorization_is_skipped_not_fatal() {
    let mut keeper = InMemoryKeeper::new();
    fund(&mut keeper, SENDER, 1_000_000);
    let runtime = runtime();
    let block = block();
    let hooks = no_hooks();
    let executor = ScriptedExecutor::default();

    let good_key = SigningKey::from_slice(&[0x11; 32]).unwrap();
    let bad_key = SigningKey::from_slice(&[0x22; 32]).unwrap();
    let good_authority = address_of(&good_key);
    let bad_authority = address_of(&bad_key);

    let mut msg = Message::call(SENDER, RECIPIENT, U256::ZERO);
    msg.gas_limit = 200_000;
    msg.authorizations = vec![
        // Wrong chain id: skipped.
        signed_authorization(&bad_key, CHAIN_ID + 1, DELEGATE, 0),
        signed_authorization(&good_key, CHAIN_ID, DELEGATE, 0),
    ];

    let mut state = StateDB::new(&mut keeper, TxConfig::default());
    let applier = MessageApplier::new(&runtime, &block, &hooks, &executor);
    let (response, results) = applier
        .apply_with_authorization_results(&mut state, &config(), &msg, true, false)
        .unwrap();

    assert!(!response.failed(), "the call itself still executes");
    assert_eq!(
        results,
        vec![
            AuthorizationResult::Skipped(SkippedReason::ChainId),
            AuthorizationResult::Applied {
                authority: good_authority
            },
        ]
    );
    drop(state);

    let installed = keeper.account(good_authority).unwrap();
    assert_eq!(installed.nonce, 1);
    assert_eq!(
        parse_delegation(&keeper.code(installed.code_hash)),
        Some(DELEGATE)
    );
    assert!(keeper.account(bad_authority).is_none());
}

#[test]
fn zero_chain_id_authorization_is_a_wildcard() {
    let mut keeper = InMemoryKeeper::new();
    fund(&mut keeper, SENDER, 1_000_000);
    let runtime = runtime();
    let block = block();
    let hooks = no_hooks();
    let executor = ScriptedExecutor::default();

    let key = SigningKey::from_slice(&[0x33; 32]).unwrap();
    let mut msg = Message::call(SENDER, RECIPIENT, U256::ZERO);
    msg.gas_limit = 200_000;
    msg.authorizations = vec![signed_authorization(&key, 0, DELEGATE, 0)];

    let mut state = StateDB::new(&mut keeper, TxConfig::default());
    let applier = MessageApplier::new(&runtime, &block, &hooks, &executor);
    let (_, results) = applier
        .apply_with_authorization_results(&mut state, &config(), &msg, false, false)
        .unwrap();
    assert!(results[0].is_applied());
}

#[test]
fn existing_authority_gets_the_partial_refund() {
    let mut keeper = InMemoryKeeper::new();
    fund(&mut keeper, SENDER, 1_000_000);
    let key = SigningKey::from_slice(&[0x44; 32]).unwrap();
    let authority = address_of(&key);
    fund(&mut keeper, authority, 1);

    let runtime = runtime();
    let block = block();
    let hooks = no_hooks();
    let executor = ScriptedExecutor::default();

    let mut msg = Message::call(SENDER, RECIPIENT, U256::ZERO);
    msg.gas_limit = 200_000;
    msg.authorizations = vec![signed_authorization(&key, CHAIN_ID, DELEGATE, 0)];

    let mut state = StateDB::new(&mut keeper, TxConfig::default());
    let applier = MessageApplier::new(&runtime, &block, &hooks, &executor);
    let (response, results) = applier
        .apply_with_authorization_results(&mut state, &config(), &msg, false, true)
        .unwrap();
    assert!(results[0].is_applied());

    // Internal call: the full refund is granted, uncapped, so the partial
    // authorization refund is directly visible in gas_used.
    let expected_refund = gas::CALL_NEW_ACCOUNT_GAS - gas::TX_AUTH_TUPLE_GAS;
    assert_eq!(response.gas_used, response.max_used_gas - expected_refund);
}

#[test]
fn refund_quotient_differs_for_internal_and_external_calls() {
    let runtime = runtime();
    let block = block();
    let hooks = no_hooks();
    let code = Bytes::from_static(&[0x60, 0x00]);
    // Consumes 40k gas on top of intrinsic and accrues a large refund.
    let executor = ScriptedExecutor {
        consume: 40_000,
        refund: 30_000,
        ..Default::default()
    };

    let run = |internal: bool| {
        let mut keeper = InMemoryKeeper::new();
        fund(&mut keeper, SENDER, 1_000_000);
        install_code(&mut keeper, RECIPIENT, code.clone());
        let mut state = StateDB::new(&mut keeper, TxConfig::default());
        let applier = MessageApplier::new(&runtime, &block, &hooks, &executor);
        let mut msg = Message::call(SENDER, RECIPIENT, U256::ZERO);
        msg.gas_limit = 100_000;
        applier
            .apply_with_config(&mut state, &config(), &msg, false, internal)
            .unwrap()
    };

    let internal = run(true);
    let external = run(false);

    let used_before_refund = gas::TX_GAS + 40_000;
    assert_eq!(internal.max_used_gas, used_before_refund);
    // Quotient 1: the whole 30k refund counts.
    assert_eq!(internal.gas_used, used_before_refund - 30_000);
    // Quotient 5, then lifted to the minimum-gas floor of half the limit.
    let capped = used_before_refund - used_before_refund / gas::REFUND_QUOTIENT_EIP3529;
    assert_eq!(external.gas_used, capped.max(50_000));
}

#[test]
fn external_calls_pay_the_minimum_gas_floor() {
    let mut keeper = InMemoryKeeper::new();
    fund(&mut keeper, SENDER, 1_000_000);
    let runtime = runtime();
    let block = block();
    let hooks = no_hooks();
    let executor = ScriptedExecutor::default();

    let mut msg = Message::call(SENDER, RECIPIENT, U256::ZERO);
    msg.gas_limit = 100_000;

    let mut state = StateDB::new(&mut keeper, TxConfig::default());
    let applier = MessageApplier::new(&runtime, &block, &hooks, &executor);
    let response = applier
        .apply_with_config(&mut state, &config(), &msg, false, false)
        .unwrap();

    // Only intrinsic gas was consumed, but half the limit is charged.
    assert_eq!(response.max_used_gas, gas::TX_GAS);
    assert_eq!(response.gas_used, 50_000);

    // Internal calls skip the floor.
    let mut state = StateDB::new(&mut keeper, TxConfig::default());
    let response = applier
        .apply_with_config(&mut state, &config(), &msg, false, true)
        .unwrap();
    assert_eq!(response.gas_used, gas::TX_GAS);
}

#[test]
fn legacy_transfer_end_to_end() {
    let mut keeper = InMemoryKeeper::new();
    fund(&mut keeper, SENDER, 100_000);
    let runtime = runtime();
    let block = block();
    let hooks = no_hooks();
    let executor = ScriptedExecutor::default();

    let mut msg = Message::call(SENDER, RECIPIENT, U256::from(1_000));
    msg.gas_limit = 21_000;
    msg.gas_price = U256::from(1);

    // Admission deducts the max fee up front; simulate it here.
    let upfront = U256::from(msg.gas_limit) * msg.gas_price;
    let mut state = StateDB::new(&mut keeper, TxConfig::default());
    state.sub_balance(SENDER, upfront);

    let applier = MessageApplier::new(&runtime, &block, &hooks, &executor);
    let response = applier
        .apply_with_config(&mut state, &config(), &msg, true, false)
        .unwrap();

    assert!(!response.failed());
    assert!(response.ret.is_empty());
    assert_eq!(response.gas_used, 21_000);
    drop(state);

    let sender = keeper.account(SENDER).unwrap();
    assert_eq!(sender.nonce, 1);
    assert_eq!(sender.balance, U256::from(100_000 - 1_000 - 21_000));
    assert_eq!(
        keeper.account(RECIPIENT).unwrap().balance,
        U256::from(1_000)
    );
}

#[test]
fn contract_creation_end_to_end() {
    let mut keeper = InMemoryKeeper::new();
    fund(&mut keeper, SENDER, 1_000_000);
    let runtime = runtime();
    let block = block();
    let hooks = no_hooks();
    let executor = DeployExecutor;

    let init_code = Bytes::from_static(&[0x60, 0x01, 0x60, 0x02]);
    let mut msg = Message::create(SENDER, U256::ZERO, init_code.clone());
    msg.nonce = 7;
    msg.gas_limit = 200_000;

    let mut state = StateDB::new(&mut keeper, TxConfig::default());
    // The sender's committed nonce is the declared one.
    state.set_nonce(SENDER, 7);

    let applier = MessageApplier::new(&runtime, &block, &hooks, &executor);
    let response = applier
        .apply_with_config(&mut state, &config(), &msg, true, false)
        .unwrap();
    assert!(!response.failed());
    drop(state);

    let expected_address = SENDER.create(7);
    let deployed = keeper.account(expected_address).unwrap();
    assert_eq!(keeper.code(deployed.code_hash), init_code);
    assert_eq!(deployed.nonce, 1);
    assert_eq!(
        keeper.account(SENDER).unwrap().nonce,
        8,
        "exactly one increment regardless of internal handling"
    );
}
