//! Shared fixtures for the engine integration tests.
#![allow(dead_code)]

use cosmevm_engine::{
    BlockContext, BytecodeExecutor, ChainRuntimeConfig, Evm, EvmConfig, Frame, FrameResult,
    HookSet, VmError,
};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use primitives::{
    alloy_primitives::Signature, keccak256, Address, Bytes, Log, B256, U256,
};
use statedb::{Account, InMemoryKeeper, Keeper};

pub const CHAIN_ID: u64 = 9000;

pub fn runtime() -> ChainRuntimeConfig {
    ChainRuntimeConfig::latest(CHAIN_ID)
}

pub fn block() -> BlockContext {
    BlockContext {
        coinbase: Address::repeat_byte(0xcb),
        gas_limit: 30_000_000,
        number: 10,
        timestamp: 1_700_000_000,
        base_fee: None,
        random: B256::with_last_byte(1),
    }
}

pub fn config() -> EvmConfig {
    EvmConfig {
        coinbase: Address::repeat_byte(0xcb),
        ..Default::default()
    }
}

pub fn fund(keeper: &mut InMemoryKeeper, address: Address, balance: u64) {
    keeper
        .set_account(address, Account::from_balance(U256::from(balance)))
        .unwrap();
}

pub fn install_code(keeper: &mut InMemoryKeeper, address: Address, code: Bytes) {
    let code_hash = keccak256(&code);
    keeper.set_code(code_hash, code);
    let account = keeper.account(address).unwrap_or_default();
    keeper
        .set_account(address, Account { code_hash, ..account })
        .unwrap();
}

/// Executor whose behavior is fixed per test: consumes `consume` gas,
/// accrues `refund` into the refund counter, emits `logs` and returns
/// `ret`.
#[derive(Default)]
pub struct ScriptedExecutor {
    pub consume: u64,
    pub refund: u64,
    pub logs: Vec<Log>,
    pub ret: Bytes,
    pub error: Option<VmError>,
}

impl BytecodeExecutor for ScriptedExecutor {
    fn execute(&self, evm: &mut Evm<'_, '_>, frame: &Frame, _code: &Bytes) -> FrameResult {
        if self.refund > 0 {
            evm.state().add_refund(self.refund);
        }
        for log in &self.logs {
            evm.state().add_log(log.clone());
        }
        let gas_left = frame.gas.saturating_sub(self.consume);
        FrameResult {
            ret: self.ret.clone(),
            gas_left,
            error: self.error.clone(),
        }
    }
}

/// Executor for creation tests: deploys the init code verbatim.
pub struct DeployExecutor;

impl BytecodeExecutor for DeployExecutor {
    fn execute(&self, _evm: &mut Evm<'_, '_>, frame: &Frame, code: &Bytes) -> FrameResult {
        FrameResult::ok(code.clone(), frame.gas)
    }
}

pub fn no_hooks() -> HookSet {
    HookSet::new()
}

/// Address of a secp256k1 key, Ethereum style.
pub fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    Address::from_raw_public_key(&point.as_bytes()[1..])
}

/// Signs an EIP-7702 authorization tuple with `key`.
pub fn signed_authorization(
    key: &SigningKey,
    chain_id: u64,
    address: Address,
    nonce: u64,
) -> alloy_eip7702::SignedAuthorization {
    let authorization = alloy_eip7702::Authorization {
        chain_id: U256::from(chain_id),
        address,
        nonce,
    };
    let hash = authorization.signature_hash();
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(hash.as_slice())
        .expect("signing cannot fail");
    let signature = Signature::new(
        U256::from_be_slice(signature.r().to_bytes().as_slice()),
        U256::from_be_slice(signature.s().to_bytes().as_slice()),
        recovery_id.is_y_odd(),
    );
    authorization.into_signed(signature)
}
