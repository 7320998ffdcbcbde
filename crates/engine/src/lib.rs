//! EVM execution engine for a Cosmos-style chain.
//!
//! The engine turns a decoded Ethereum message into a state transition over a
//! [`statedb::StateDB`]: it meters intrinsic and floor gas, warms the
//! EIP-2929 access list, applies EIP-7702 authorizations, drives call and
//! create frames through the pluggable [`BytecodeExecutor`], computes
//! refunds, and commits. [`TransactionApplier`] wraps one message into a full
//! consensus transaction with cache-context isolation, receipt and bloom
//! construction, post-transaction hooks and gas refunds.
//!
//! Opcode interpretation and precompile business logic live behind the
//! [`BytecodeExecutor`] and [`Precompile`] seams; this crate owns everything
//! around them.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod apply;
pub mod authorization;
pub mod config;
pub mod context;
pub mod errors;
pub mod evm;
pub mod gas;
pub mod hooks;
pub mod message;
pub mod response;
pub mod tx;

pub use apply::{apply_state_overrides, MessageApplier, StateOverride, StateOverrides};
pub use authorization::{apply_authorization_list, AuthorizationResult, SkippedReason};
pub use config::{
    AccessControl, AccessControlType, AccessType, ChainRuntimeConfig, EvmCoinInfo, EvmConfig,
    FeeMarketParams, Params,
};
pub use context::{
    block_hash, BlockContext, ChainContext, ConsensusParams, ConsensusParamsProvider,
};
pub use errors::{EngineError, VmError};
pub use evm::{BytecodeExecutor, Evm, Frame, FrameResult, CALL_DEPTH_LIMIT};
pub use gas::{
    floor_data_gas, gas_to_refund, intrinsic_gas, minimum_gas_used, refund_quotient, GasMeter,
};
pub use hooks::{
    default_hook_set, CallAccessControl, CallInterceptor, CallOutcome, CreateAccessControl,
    CreateInterceptor, HookSet, Precompile, PrecompileOutput, RecipientPrecompile,
    StaticPrecompileSet,
};
pub use message::Message;
pub use response::MsgEthereumTxResponse;
pub use tx::{BankKeeper, BlockCounters, PostTxProcessor, Receipt, TransactionApplier, TxOutcome};
