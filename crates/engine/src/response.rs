use crate::errors::VmError;
use primitives::{Bytes, B256};
use statedb::TxLog;

/// Result of one applied Ethereum message.
///
/// Immutable once returned. A set `vm_error` means the call failed or
/// reverted, but the transition itself succeeded: gas was charged and, when
/// requested, state was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgEthereumTxResponse {
    /// Hash of the transaction.
    pub hash: B256,
    /// Logs emitted by the execution, block-positioned.
    pub logs: Vec<TxLog>,
    /// Return data, or the revert payload when the call reverted.
    pub ret: Bytes,
    /// VM-level failure of the execution, if any.
    pub vm_error: Option<VmError>,
    /// Gas charged to the sender, refunds and floors applied.
    pub gas_used: u64,
    /// Gas used before refunds, the execution's true consumption.
    pub max_used_gas: u64,
    /// Hash of the enclosing block.
    pub block_hash: B256,
    /// Timestamp of the enclosing block.
    pub block_timestamp: u64,
}

impl MsgEthereumTxResponse {
    /// Whether the execution failed or reverted.
    pub fn failed(&self) -> bool {
        self.vm_error.is_some()
    }

    /// The revert payload, when the call reverted with one.
    pub fn revert_reason(&self) -> Option<&Bytes> {
        match self.vm_error {
            Some(VmError::ExecutionReverted) if !self.ret.is_empty() => Some(&self.ret),
            _ => None,
        }
    }
}
