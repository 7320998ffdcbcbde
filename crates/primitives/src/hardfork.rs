//! Hard-fork schedule of the chain.
//!
//! The chain activates Ethereum hard-forks at configurable block heights
//! (pre-merge forks) or block timestamps (post-merge forks). [`ChainConfig`]
//! is built once at process start as part of the runtime configuration and
//! never mutated afterwards; [`ForkRules`] is the per-block view derived from
//! it.

/// Activation schedule for the Ethereum hard-forks the execution core cares
/// about.
///
/// `None` means the fork never activates. A fresh chain normally enables
/// everything from genesis, see [`ChainConfig::latest`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainConfig {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Homestead activation height.
    pub homestead_block: Option<u64>,
    /// Istanbul activation height (EIP-2028 calldata repricing).
    pub istanbul_block: Option<u64>,
    /// Berlin activation height (EIP-2929/2930 access lists).
    pub berlin_block: Option<u64>,
    /// London activation height (EIP-1559/3529/3541).
    pub london_block: Option<u64>,
    /// Shanghai activation timestamp (EIP-3651/3860).
    pub shanghai_time: Option<u64>,
    /// Cancun activation timestamp (EIP-6780).
    pub cancun_time: Option<u64>,
    /// Prague activation timestamp (EIP-7702/7623).
    pub prague_time: Option<u64>,
}

impl ChainConfig {
    /// Configuration with every supported fork active from genesis.
    pub fn latest(chain_id: u64) -> Self {
        Self {
            chain_id,
            homestead_block: Some(0),
            istanbul_block: Some(0),
            berlin_block: Some(0),
            london_block: Some(0),
            shanghai_time: Some(0),
            cancun_time: Some(0),
            prague_time: Some(0),
        }
    }

    /// Returns the rule set active at the given block height and timestamp.
    pub fn rules(&self, number: u64, timestamp: u64) -> ForkRules {
        let active_block = |fork: Option<u64>| fork.is_some_and(|height| height <= number);
        let active_time = |fork: Option<u64>| fork.is_some_and(|time| time <= timestamp);
        ForkRules {
            chain_id: self.chain_id,
            is_homestead: active_block(self.homestead_block),
            is_istanbul: active_block(self.istanbul_block),
            is_berlin: active_block(self.berlin_block),
            is_london: active_block(self.london_block),
            is_shanghai: active_time(self.shanghai_time),
            is_cancun: active_time(self.cancun_time),
            is_prague: active_time(self.prague_time),
        }
    }
}

/// Fork rules in effect for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForkRules {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Homestead rules (creation base cost 53000).
    pub is_homestead: bool,
    /// Istanbul rules (16 gas per non-zero calldata byte).
    pub is_istanbul: bool,
    /// Berlin rules (warm/cold access lists).
    pub is_berlin: bool,
    /// London rules (refund quotient 5, EIP-3541 code rejection).
    pub is_london: bool,
    /// Shanghai rules (warm coinbase, initcode metering).
    pub is_shanghai: bool,
    /// Cancun rules (EIP-6780 restricted selfdestruct).
    pub is_cancun: bool,
    /// Prague rules (set-code transactions, calldata floor cost).
    pub is_prague: bool,
}

impl ForkRules {
    /// Rule set with every fork active, for the given chain id.
    pub fn latest(chain_id: u64) -> Self {
        ChainConfig::latest(chain_id).rules(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forks_activate_at_heights_and_times() {
        let config = ChainConfig {
            chain_id: 9000,
            homestead_block: Some(0),
            istanbul_block: Some(0),
            berlin_block: Some(10),
            london_block: Some(10),
            shanghai_time: Some(1_000),
            cancun_time: Some(2_000),
            prague_time: None,
        };

        let early = config.rules(5, 500);
        assert!(early.is_istanbul);
        assert!(!early.is_berlin);
        assert!(!early.is_shanghai);

        let mid = config.rules(10, 1_000);
        assert!(mid.is_berlin);
        assert!(mid.is_london);
        assert!(mid.is_shanghai);
        assert!(!mid.is_cancun);

        let late = config.rules(100, 5_000);
        assert!(late.is_cancun);
        assert!(!late.is_prague, "unscheduled fork never activates");
    }

    #[test]
    fn latest_enables_everything() {
        let rules = ForkRules::latest(1);
        assert!(rules.is_prague && rules.is_cancun && rules.is_berlin);
    }
}
