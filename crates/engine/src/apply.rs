//! The message-level state transition.
//!
//! `apply` runs one decoded message against a [`StateDB`]: intrinsic and
//! floor gas checks, access-list warming, EIP-7702 authorizations, the
//! create or call frame, refund computation, minimum-gas enforcement and the
//! final commit. VM failures come back inside the response; only setup,
//! permission and commit failures are `Err`.

use crate::{
    authorization::{apply_authorization_list, AuthorizationResult},
    config::{ChainRuntimeConfig, EvmConfig},
    context::BlockContext,
    errors::EngineError,
    evm::{BytecodeExecutor, Evm},
    gas::{check_intrinsic_gas, floor_data_gas, gas_to_refund, intrinsic_gas, minimum_gas_used, refund_quotient},
    hooks::HookSet,
    message::Message,
    response::MsgEthereumTxResponse,
};
use primitives::{parse_delegation, Address, Bytes, HashMap, U256};
use statedb::{StateDB, Storage};

/// Requested replacement of account state before an `eth_call`-style
/// execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateOverride {
    pub balance: Option<U256>,
    pub nonce: Option<u64>,
    pub code: Option<Bytes>,
    /// Full replacement of the account's storage.
    pub state: Option<Storage>,
    /// Per-slot overlay on the existing storage.
    pub state_diff: Option<Storage>,
}

/// Overrides per account.
pub type StateOverrides = HashMap<Address, StateOverride>;

/// Applies Ethereum messages against a state, bound to one block.
pub struct MessageApplier<'a> {
    runtime: &'a ChainRuntimeConfig,
    block: &'a BlockContext,
    hooks: &'a HookSet,
    executor: &'a dyn BytecodeExecutor,
}

impl<'a> MessageApplier<'a> {
    pub fn new(
        runtime: &'a ChainRuntimeConfig,
        block: &'a BlockContext,
        hooks: &'a HookSet,
        executor: &'a dyn BytecodeExecutor,
    ) -> Self {
        Self {
            runtime,
            block,
            hooks,
            executor,
        }
    }

    /// Applies `msg` with the given configuration.
    ///
    /// `commit` writes the resulting state into the keeper before returning;
    /// `internal` marks module-originated calls, which refund in full and
    /// skip the minimum-gas floor.
    pub fn apply_with_config(
        &self,
        state: &mut StateDB<'_>,
        config: &EvmConfig,
        msg: &Message,
        commit: bool,
        internal: bool,
    ) -> Result<MsgEthereumTxResponse, EngineError> {
        self.apply_inner(state, config, msg, commit, internal)
            .map(|(response, _)| response)
    }

    /// Like [`apply_with_config`](Self::apply_with_config), additionally
    /// returning the per-tuple EIP-7702 outcomes.
    pub fn apply_with_authorization_results(
        &self,
        state: &mut StateDB<'_>,
        config: &EvmConfig,
        msg: &Message,
        commit: bool,
        internal: bool,
    ) -> Result<(MsgEthereumTxResponse, Vec<AuthorizationResult>), EngineError> {
        self.apply_inner(state, config, msg, commit, internal)
    }

    fn apply_inner(
        &self,
        state: &mut StateDB<'_>,
        config: &EvmConfig,
        msg: &Message,
        commit: bool,
        internal: bool,
    ) -> Result<(MsgEthereumTxResponse, Vec<AuthorizationResult>), EngineError> {
        let rules = self
            .runtime
            .chain_config
            .rules(self.block.number, self.block.timestamp);

        // Recomputed here even though admission already checked it: query
        // paths bypass admission entirely.
        let intrinsic = intrinsic_gas(
            &msg.data,
            &msg.access_list,
            msg.authorizations.len() as u64,
            msg.is_create(),
            &rules,
        );
        check_intrinsic_gas(msg.gas_limit, intrinsic)?;

        let mut floor = 0;
        if rules.is_prague {
            floor = floor_data_gas(&msg.data);
            if msg.gas_limit < floor {
                return Err(EngineError::FloorDataGas {
                    have: msg.gas_limit,
                    want: floor,
                });
            }
        }
        let leftover_gas = msg.gas_limit - intrinsic;

        state.prepare(
            &rules,
            msg.from,
            self.block.coinbase,
            msg.to,
            &config.params.active_static_precompiles,
            &msg.access_list,
        );

        let mut evm = Evm::new(state, self.block, rules, self.hooks, self.executor);

        let (result, authorization_results) = match msg.to {
            None => {
                // The executor manages nonces internally during creation;
                // pin the declared nonce before and force exactly one
                // increment after, success or not.
                evm.state().set_nonce(msg.from, msg.nonce);
                let (result, _) = evm.create(msg.from, msg.value, &msg.data, leftover_gas)?;
                evm.state().set_nonce(msg.from, msg.nonce + 1);
                (result, Vec::new())
            }
            Some(to) => {
                // Bump the sender nonce before the authorization list so a
                // self-authorizing sender validates against the bumped value.
                evm.state().set_nonce(msg.from, msg.nonce + 1);
                let authorization_results = apply_authorization_list(
                    evm.state(),
                    rules.chain_id,
                    &msg.authorizations,
                );
                if rules.is_prague {
                    // The destination's delegation may have been installed
                    // by a tuple a moment ago; warm its target now.
                    let code = evm.state().code(to);
                    if let Some(target) = parse_delegation(&code) {
                        evm.state().add_address_to_access_list(target);
                    }
                }
                let result =
                    evm.call(msg.from, to, msg.data.clone(), leftover_gas, msg.value, false)?;
                (result, authorization_results)
            }
        };

        // Refunds: quotient 1 for internal calls (full, uncapped), 5 after
        // London, 2 before.
        let max_used_gas = msg.gas_limit - result.gas_left;
        let quotient = refund_quotient(rules.is_london, internal);
        let refund = gas_to_refund(state.refund(), max_used_gas, quotient);
        let mut gas_used = max_used_gas - refund;

        if rules.is_prague {
            gas_used = gas_used.max(floor);
        }
        if !internal {
            let minimum = minimum_gas_used(msg.gas_limit, config.fee_market.min_gas_multiplier_bps);
            gas_used = gas_used.max(minimum);
        }
        gas_used = gas_used.min(msg.gas_limit);

        if commit {
            state.commit().map_err(EngineError::Commit)?;
        }

        let response = MsgEthereumTxResponse {
            hash: state.tx_config().tx_hash,
            logs: state.logs().to_vec(),
            ret: result.ret,
            vm_error: result.error,
            gas_used,
            max_used_gas,
            block_hash: state.tx_config().block_hash,
            block_timestamp: self.block.timestamp,
        };
        Ok((response, authorization_results))
    }
}

/// Installs `eth_call` state overrides into the state before execution.
///
/// `state` and `state_diff` are mutually exclusive per account: the former
/// replaces the whole storage, the latter overlays individual slots.
pub fn apply_state_overrides(
    state: &mut StateDB<'_>,
    overrides: &StateOverrides,
) -> Result<(), EngineError> {
    for (address, entry) in overrides {
        if entry.state.is_some() && entry.state_diff.is_some() {
            return Err(EngineError::StateOverride(format!(
                "account {address} has both state and state_diff overrides"
            )));
        }
        if let Some(balance) = entry.balance {
            state.set_balance(*address, balance);
        }
        if let Some(nonce) = entry.nonce {
            state.set_nonce(*address, nonce);
        }
        if let Some(code) = &entry.code {
            state.set_code(*address, code.clone());
        }
        if let Some(replacement) = &entry.state {
            state.set_storage(*address, replacement.clone());
        }
        if let Some(diff) = &entry.state_diff {
            for (key, value) in diff {
                state.set_state(*address, *key, *value);
            }
        }
    }
    Ok(())
}
