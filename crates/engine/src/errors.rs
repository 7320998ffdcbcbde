use primitives::Address;
use statedb::KeeperError;

/// Hard failure of message or transaction application.
///
/// These abort the enclosing transaction or query outright; no receipt is
/// produced. VM-level failures are not errors, see [`VmError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Gas limit below the intrinsic cost of the message.
    #[error("intrinsic gas too low: have {have}, want {want}")]
    IntrinsicGas { have: u64, want: u64 },
    /// Gas limit below the EIP-7623 calldata floor.
    #[error("insufficient gas for floor data gas cost: have {have}, want {want}")]
    FloorDataGas { have: u64, want: u64 },
    /// A create interceptor rejected the deployment.
    #[error("{0} does not have permission to deploy contracts")]
    CreateNotAuthorized(Address),
    /// A call interceptor rejected the call.
    #[error("{caller} does not have permission to perform a call to {target}")]
    CallNotAuthorized { caller: Address, target: Address },
    /// A state override could not be applied.
    #[error("invalid state override: {0}")]
    StateOverride(String),
    /// The final state commit failed; the whole transition is void.
    #[error("failed to commit state: {0}")]
    Commit(#[source] KeeperError),
    /// A keeper operation outside commit failed.
    #[error(transparent)]
    Keeper(#[from] KeeperError),
    /// Invalid runtime configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failure of the EVM execution itself.
///
/// Carried inside [`MsgEthereumTxResponse`](crate::MsgEthereumTxResponse) as
/// `vm_error`: the transition still commits (when asked to) and still
/// charges gas, its semantic result is just "the call failed".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    /// `REVERT` was executed; the revert payload is in the response's `ret`.
    #[error("execution reverted")]
    ExecutionReverted,
    #[error("out of gas")]
    OutOfGas,
    #[error("max call depth exceeded")]
    CallDepthExceeded,
    #[error("insufficient balance for transfer")]
    InsufficientBalance,
    #[error("contract address collision")]
    ContractAddressCollision,
    #[error("contract creation code storage out of gas")]
    CodeStoreOutOfGas,
    #[error("max code size exceeded")]
    MaxCodeSizeExceeded,
    #[error("max initcode size exceeded")]
    MaxInitCodeSizeExceeded,
    /// EIP-3541: deployed code may not start with `0xEF`.
    #[error("invalid code: must not begin with 0xef")]
    InvalidCode,
    #[error("nonce uint64 overflow")]
    NonceOverflow,
    /// Executor- or hook-defined failure.
    #[error("{0}")]
    Custom(String),
}

impl VmError {
    /// Whether this error is a plain `REVERT`, which keeps its remaining gas
    /// and surfaces its payload.
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::ExecutionReverted)
    }
}
