use crate::EvmConfig;
use auto_impl::auto_impl;
use primitives::{Address, B256, U256};

/// Consensus parameters the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsensusParams {
    /// Maximum gas per block; `None` means unlimited.
    pub block_max_gas: Option<u64>,
}

/// Ambient chain context of the block being executed.
///
/// Implemented by the host application over its store-bound context; the
/// engine only ever reads from it.
#[auto_impl(&, Box)]
pub trait ChainContext {
    /// Height of the block being executed.
    fn block_height(&self) -> u64;

    /// Timestamp of the block being executed, in seconds.
    fn block_time(&self) -> u64;

    /// Hash of the current block header.
    fn header_hash(&self) -> B256;

    /// Proposer of the current block.
    fn proposer(&self) -> Address;

    /// Consensus params carried by the context, absent on query paths.
    fn consensus_params(&self) -> Option<ConsensusParams>;

    /// Header hash of a strictly older block, from the historical hash
    /// store.
    fn historical_block_hash(&self, height: u64) -> Option<B256>;
}

/// Fallback source of consensus params for contexts that carry none, so the
/// block gas limit is fetched once instead of per opcode.
#[auto_impl(&, Box)]
pub trait ConsensusParamsProvider {
    fn consensus_params(&self) -> ConsensusParams;
}

/// Sentinel `PREVRANDAO` value: non-zero, marking post-merge opcode
/// semantics without a randomness beacon.
pub const RANDOM_SENTINEL: B256 = B256::with_last_byte(1);

/// Block-level execution context handed to the EVM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    /// Fee recipient exposed through `COINBASE`.
    pub coinbase: Address,
    /// Block gas limit; `u64::MAX` when consensus does not cap gas.
    pub gas_limit: u64,
    /// Block height.
    pub number: u64,
    /// Block timestamp in seconds.
    pub timestamp: u64,
    /// Base fee, `None` when base-fee enforcement is off.
    pub base_fee: Option<U256>,
    /// `PREVRANDAO` value, fixed to [`RANDOM_SENTINEL`].
    pub random: B256,
}

impl BlockContext {
    /// Assembles the block context from the ambient chain context and the
    /// per-call configuration. Consensus params are taken from the context
    /// when present and fetched from `params` once otherwise.
    pub fn new(
        ctx: &dyn ChainContext,
        params: &dyn ConsensusParamsProvider,
        config: &EvmConfig,
    ) -> Self {
        let consensus = ctx
            .consensus_params()
            .unwrap_or_else(|| params.consensus_params());
        Self {
            coinbase: config.coinbase,
            gas_limit: consensus.block_max_gas.unwrap_or(u64::MAX),
            number: ctx.block_height(),
            timestamp: ctx.block_time(),
            base_fee: config.base_fee(),
            random: RANDOM_SENTINEL,
        }
    }
}

/// Resolves a `BLOCKHASH` request against the chain context.
///
/// The current height answers with the header hash; strictly older heights
/// consult the historical store, zero hash when pruned; heights at or beyond
/// the tip answer zero.
pub fn block_hash(ctx: &dyn ChainContext, requested: u64) -> B256 {
    let current = ctx.block_height();
    if requested == current {
        ctx.header_hash()
    } else if requested < current {
        ctx.historical_block_hash(requested).unwrap_or(B256::ZERO)
    } else {
        B256::ZERO
    }
}
