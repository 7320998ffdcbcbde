use crate::EngineError;
use primitives::{Address, ChainConfig, U256};

/// Native coin of the chain as seen by the EVM.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvmCoinInfo {
    /// Bank denomination used for gas fees and EVM balances.
    pub denom: String,
    /// Decimals of the denomination; 18 matches Ethereum's wei.
    pub decimals: u8,
}

impl Default for EvmCoinInfo {
    fn default() -> Self {
        Self {
            denom: "atest".to_string(),
            decimals: 18,
        }
    }
}

/// Immutable chain-wide runtime configuration.
///
/// Constructed once at process start and passed by reference everywhere a
/// component needs the fork schedule or the fee coin. Replaces what would
/// otherwise be sealed global singletons.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainRuntimeConfig {
    /// Hard-fork activation schedule.
    pub chain_config: ChainConfig,
    /// Fee coin of the chain.
    pub coin: EvmCoinInfo,
}

impl ChainRuntimeConfig {
    /// Validates and assembles the runtime configuration.
    pub fn new(chain_config: ChainConfig, coin: EvmCoinInfo) -> Result<Self, EngineError> {
        if coin.denom.is_empty() {
            return Err(EngineError::Config("coin denom cannot be empty".into()));
        }
        Ok(Self { chain_config, coin })
    }

    /// Configuration with every fork active from genesis and the default
    /// test coin.
    pub fn latest(chain_id: u64) -> Self {
        Self {
            chain_config: ChainConfig::latest(chain_id),
            coin: EvmCoinInfo::default(),
        }
    }
}

/// Who may perform an operation guarded by an access-control policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccessType {
    /// Everyone, except the addresses on the list.
    #[default]
    Permissionless,
    /// Nobody.
    Restricted,
    /// Only the addresses on the list.
    Permissioned,
}

/// One access-control policy: a type plus the list it interprets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessControlType {
    pub access_type: AccessType,
    /// Blocklist under `Permissionless`, allowlist under `Permissioned`,
    /// ignored under `Restricted`.
    pub access_control_list: Vec<Address>,
}

impl AccessControlType {
    /// Whether `address` may perform the guarded operation.
    pub fn allows(&self, address: Address) -> bool {
        let listed = self.access_control_list.contains(&address);
        match self.access_type {
            AccessType::Permissionless => !listed,
            AccessType::Restricted => false,
            AccessType::Permissioned => listed,
        }
    }
}

/// Access control for contract creation and contract calls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessControl {
    pub create: AccessControlType,
    pub call: AccessControlType,
}

/// EVM module parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Params {
    /// Denomination used for EVM balances and fees.
    pub evm_denom: String,
    /// Deployment and call permissioning.
    pub access_control: AccessControl,
    /// Addresses of the enabled static precompiles, used to pre-warm the
    /// access list.
    pub active_static_precompiles: Vec<Address>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            evm_denom: EvmCoinInfo::default().denom,
            access_control: AccessControl::default(),
            active_static_precompiles: Vec::new(),
        }
    }
}

/// Basis points denominator for the minimum gas multiplier.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Fee-market module parameters the engine consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeeMarketParams {
    /// Disables base-fee enforcement entirely.
    pub no_base_fee: bool,
    /// Current base fee.
    pub base_fee: U256,
    /// Minimum charged gas as a fraction of the gas limit, in basis points.
    /// 5000 means half the limit is always charged for external calls.
    pub min_gas_multiplier_bps: u64,
}

impl Default for FeeMarketParams {
    fn default() -> Self {
        Self {
            no_base_fee: false,
            base_fee: U256::ZERO,
            min_gas_multiplier_bps: 5_000,
        }
    }
}

/// Immutable per-call execution configuration, assembled fresh for every
/// message application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvmConfig {
    pub params: Params,
    pub fee_market: FeeMarketParams,
    /// Block proposer, credited as `COINBASE`.
    pub coinbase: Address,
    /// Whether the interpreter should record SHA3 preimages.
    pub record_preimages: bool,
}

impl EvmConfig {
    /// Effective base fee, `None` when base-fee enforcement is off.
    pub fn base_fee(&self) -> Option<U256> {
        if self.fee_market.no_base_fee {
            None
        } else {
            Some(self.fee_market.base_fee)
        }
    }
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            params: Params::default(),
            fee_market: FeeMarketParams::default(),
            coinbase: Address::ZERO,
            record_preimages: false,
        }
    }
}
