//! The consensus-level transaction wrapper around the message applier.
//!
//! One transaction runs inside a cache context so a hard failure rolls back
//! without touching the parent store. Success, VM reverts included, yields a
//! receipt and advances the per-block counters; hard failure consumes the
//! block gas meter to its limit and yields nothing.

use crate::{
    apply::MessageApplier,
    config::{ChainRuntimeConfig, EvmConfig},
    context::BlockContext,
    errors::{EngineError, VmError},
    evm::BytecodeExecutor,
    gas::GasMeter,
    hooks::HookSet,
    message::Message,
    response::MsgEthereumTxResponse,
};
use auto_impl::auto_impl;
use primitives::{Address, Bloom, B256, U256};
use statedb::{CachedKeeper, Keeper, KeeperError, StateDB, TxConfig, TxLog};
use tracing::debug;

/// Fee-denomination refund boundary into the chain's bank module.
#[auto_impl(&mut, Box)]
pub trait BankKeeper {
    /// Returns `amount` of `denom` from the fee collector to `to`.
    fn refund_gas(&mut self, to: Address, amount: U256, denom: &str) -> Result<(), KeeperError>;
}

/// Module extension point invoked after every receipted transaction.
///
/// Processors run on a fresh cache context that commits regardless of the
/// transaction's own outcome.
pub trait PostTxProcessor {
    fn post_tx_processing(
        &self,
        keeper: &mut dyn Keeper,
        msg: &Message,
        receipt: &Receipt,
    ) -> Result<(), EngineError>;
}

/// Ethereum-shaped receipt of one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// `true` when the execution neither failed nor reverted.
    pub status: bool,
    /// Gas used by the block up to and including this transaction, capped
    /// at the block gas limit when one is set.
    pub cumulative_gas_used: u64,
    /// Bloom filter over the logs.
    pub bloom: Bloom,
    /// Emitted logs; empty for failed executions.
    pub logs: Vec<TxLog>,
    pub tx_hash: B256,
    /// Deployed contract address for creation transactions.
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    pub block_number: u64,
    pub transaction_index: u64,
}

/// Transient per-block counters threaded through consecutive transactions
/// to keep receipt numbering contiguous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCounters {
    pub tx_index: u64,
    pub log_index: u64,
    pub cumulative_gas_used: u64,
}

/// Result of a receipted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub response: MsgEthereumTxResponse,
    pub receipt: Receipt,
}

/// Applies full consensus transactions for one block.
pub struct TransactionApplier<'a> {
    runtime: &'a ChainRuntimeConfig,
    block: &'a BlockContext,
    hooks: &'a HookSet,
    executor: &'a dyn BytecodeExecutor,
    post_processors: &'a [Box<dyn PostTxProcessor>],
}

impl<'a> TransactionApplier<'a> {
    pub fn new(
        runtime: &'a ChainRuntimeConfig,
        block: &'a BlockContext,
        hooks: &'a HookSet,
        executor: &'a dyn BytecodeExecutor,
        post_processors: &'a [Box<dyn PostTxProcessor>],
    ) -> Self {
        Self {
            runtime,
            block,
            hooks,
            executor,
            post_processors,
        }
    }

    /// Applies one transaction against `keeper`.
    ///
    /// Hard failure consumes `gas_meter` to its limit and returns the error;
    /// nothing is written and no receipt exists. Otherwise the returned
    /// receipt is final, the counters have advanced and unused gas has been
    /// refunded through `bank`.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_transaction(
        &self,
        keeper: &mut dyn Keeper,
        bank: &mut dyn BankKeeper,
        config: &EvmConfig,
        counters: &mut BlockCounters,
        gas_meter: &mut GasMeter,
        block_hash: B256,
        tx_hash: B256,
        msg: &Message,
    ) -> Result<TxOutcome, EngineError> {
        let tx_config = TxConfig::new(block_hash, tx_hash, counters.tx_index, counters.log_index);

        // Isolation layer: nothing reaches `keeper` unless flushed.
        let mut cache = CachedKeeper::new(&mut *keeper);
        let applier = MessageApplier::new(self.runtime, self.block, self.hooks, self.executor);

        let mut response = {
            let mut state = StateDB::new(&mut cache, tx_config);
            match applier.apply_with_config(&mut state, config, msg, true, false) {
                Ok(response) => response,
                Err(err) => {
                    // Deterministic penalty: a failing transaction costs the
                    // whole limit.
                    gas_meter.consume_to_limit();
                    return Err(err);
                }
            }
        };

        let mut cumulative_gas_used = counters
            .cumulative_gas_used
            .saturating_add(response.gas_used);
        if let Some(limit) = gas_meter.limit() {
            cumulative_gas_used = cumulative_gas_used.min(limit);
        }

        let mut bloom = Bloom::default();
        for log in &response.logs {
            bloom.accrue_log(&log.log);
        }
        let mut receipt = Receipt {
            status: !response.failed(),
            cumulative_gas_used,
            bloom,
            logs: response.logs.clone(),
            tx_hash,
            contract_address: msg.to.is_none().then(|| msg.from.create(msg.nonce)),
            gas_used: response.gas_used,
            block_number: self.block.number,
            transaction_index: counters.tx_index,
        };

        // Only non-failed executions reach the parent keeper.
        if !response.failed() {
            if let Err(err) = cache.flush() {
                gas_meter.consume_to_limit();
                return Err(EngineError::Commit(err));
            }
        }
        drop(cache);

        // The block log index advances by what was emitted, even if a post
        // processor strips the logs below.
        let emitted_logs = response.logs.len() as u64;

        self.run_post_processors(keeper, msg, &mut response, &mut receipt);

        counters.tx_index += 1;
        counters.log_index += emitted_logs;
        counters.cumulative_gas_used = cumulative_gas_used;
        gas_meter.consume(response.gas_used);

        let unused_gas = msg.gas_limit.saturating_sub(response.gas_used);
        let refund = U256::from(unused_gas) * msg.gas_price;
        if !refund.is_zero() {
            bank.refund_gas(msg.from, refund, &config.params.evm_denom)?;
        }

        Ok(TxOutcome { response, receipt })
    }

    /// Runs the post-tx processors on a fresh cache that commits regardless
    /// of the transaction's outcome. A processor error poisons the response:
    /// `vm_error` is overwritten and logs and bloom are stripped, but the
    /// transaction's own state effects stay committed.
    fn run_post_processors(
        &self,
        keeper: &mut dyn Keeper,
        msg: &Message,
        response: &mut MsgEthereumTxResponse,
        receipt: &mut Receipt,
    ) {
        if self.post_processors.is_empty() {
            return;
        }
        let mut cache = CachedKeeper::new(&mut *keeper);
        let failed = self
            .post_processors
            .iter()
            .find_map(|processor| processor.post_tx_processing(&mut cache, msg, receipt).err());
        match failed {
            None => {
                if let Err(err) = cache.flush() {
                    debug!(%err, "failed to flush post-processing state");
                    poison(response, receipt, &err.to_string());
                }
            }
            Some(err) => {
                debug!(%err, "post transaction processing failed");
                poison(response, receipt, &err.to_string());
            }
        }
    }
}

fn poison(response: &mut MsgEthereumTxResponse, receipt: &mut Receipt, reason: &str) {
    response.vm_error = Some(VmError::Custom(format!(
        "failed to execute post transaction processing: {reason}"
    )));
    response.logs.clear();
    receipt.status = false;
    receipt.logs.clear();
    receipt.bloom = Bloom::default();
}
