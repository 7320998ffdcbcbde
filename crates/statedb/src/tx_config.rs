use primitives::{Log, B256};

/// Position of the current transaction within its block.
///
/// Drives the numbering of receipts and logs. Query paths that execute
/// without a real transaction (`eth_call`, gas estimation) use
/// [`TxConfig::empty`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxConfig {
    /// Hash of the enclosing block header.
    pub block_hash: B256,
    /// Hash of the transaction.
    pub tx_hash: B256,
    /// Index of the transaction within the block.
    pub tx_index: u64,
    /// Index of the first log of this transaction within the block.
    pub log_index: u64,
}

impl TxConfig {
    /// Creates a new transaction config.
    pub fn new(block_hash: B256, tx_hash: B256, tx_index: u64, log_index: u64) -> Self {
        Self {
            block_hash,
            tx_hash,
            tx_index,
            log_index,
        }
    }

    /// Config for a query without a backing transaction.
    pub fn empty(block_hash: B256) -> Self {
        Self {
            block_hash,
            ..Default::default()
        }
    }
}

/// A log emitted during execution, positioned within its transaction and
/// block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxLog {
    /// Emitting address, topics and data.
    pub log: Log,
    /// Hash of the emitting transaction.
    pub tx_hash: B256,
    /// Hash of the enclosing block.
    pub block_hash: B256,
    /// Index of the emitting transaction within the block.
    pub tx_index: u64,
    /// Index of this log within the block.
    pub log_index: u64,
}
