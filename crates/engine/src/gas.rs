//! Protocol gas constants and the transaction-level gas math: intrinsic
//! cost, the EIP-7623 calldata floor, refund computation and the chain's
//! minimum-gas policy.

use crate::{config::BPS_DENOMINATOR, EngineError};
use alloy_eip2930::AccessList;
use primitives::ForkRules;

/// Base cost of any transaction.
pub const TX_GAS: u64 = 21_000;
/// Base cost of a contract-creation transaction, post-Homestead.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;
/// Per zero byte of calldata.
pub const TX_DATA_ZERO_GAS: u64 = 4;
/// Per non-zero byte of calldata, pre-Istanbul.
pub const TX_DATA_NON_ZERO_GAS_FRONTIER: u64 = 68;
/// Per non-zero byte of calldata, post-Istanbul (EIP-2028).
pub const TX_DATA_NON_ZERO_GAS_EIP2028: u64 = 16;
/// Per access-list address (EIP-2930).
pub const TX_ACCESS_LIST_ADDRESS_GAS: u64 = 2_400;
/// Per access-list storage key (EIP-2930).
pub const TX_ACCESS_LIST_STORAGE_KEY_GAS: u64 = 1_900;
/// Per 32-byte word of init code, post-Shanghai (EIP-3860).
pub const INITCODE_WORD_GAS: u64 = 2;
/// Charged per EIP-7702 authorization tuple at intrinsic-gas time, assuming
/// the authority account must be created.
pub const CALL_NEW_ACCOUNT_GAS: u64 = 25_000;
/// Actual cost of an authorization tuple whose authority already exists;
/// the difference is refunded when applying the tuple.
pub const TX_AUTH_TUPLE_GAS: u64 = 12_500;
/// Per byte of deployed contract code.
pub const CODE_DEPOSIT_GAS: u64 = 200;
/// EIP-7623 floor cost per calldata token.
pub const TOTAL_COST_FLOOR_PER_TOKEN: u64 = 10;
/// EIP-7623 tokens per non-zero calldata byte; zero bytes count one.
pub const NON_ZERO_BYTE_TOKENS: u64 = 4;
/// Refund quotient before London.
pub const REFUND_QUOTIENT: u64 = 2;
/// Refund quotient after London (EIP-3529).
pub const REFUND_QUOTIENT_EIP3529: u64 = 5;

/// Intrinsic cost of a message: the gas charged before a single opcode runs.
///
/// Covers the base transaction cost, calldata, the EIP-2930 access list,
/// EIP-3860 init-code words for creations, and one prospective new-account
/// cost per EIP-7702 authorization tuple.
pub fn intrinsic_gas(
    data: &[u8],
    access_list: &AccessList,
    authorization_count: u64,
    is_create: bool,
    rules: &ForkRules,
) -> u64 {
    let mut gas = if is_create && rules.is_homestead {
        TX_GAS_CONTRACT_CREATION
    } else {
        TX_GAS
    };

    let non_zero_bytes = data.iter().filter(|byte| **byte != 0).count() as u64;
    let zero_bytes = data.len() as u64 - non_zero_bytes;
    let non_zero_gas = if rules.is_istanbul {
        TX_DATA_NON_ZERO_GAS_EIP2028
    } else {
        TX_DATA_NON_ZERO_GAS_FRONTIER
    };
    gas = gas
        .saturating_add(non_zero_bytes.saturating_mul(non_zero_gas))
        .saturating_add(zero_bytes.saturating_mul(TX_DATA_ZERO_GAS));

    if is_create && rules.is_shanghai {
        let words = (data.len() as u64).div_ceil(32);
        gas = gas.saturating_add(words.saturating_mul(INITCODE_WORD_GAS));
    }

    let addresses = access_list.0.len() as u64;
    let storage_keys: u64 = access_list
        .0
        .iter()
        .map(|item| item.storage_keys.len() as u64)
        .sum();
    gas = gas
        .saturating_add(addresses.saturating_mul(TX_ACCESS_LIST_ADDRESS_GAS))
        .saturating_add(storage_keys.saturating_mul(TX_ACCESS_LIST_STORAGE_KEY_GAS));

    gas.saturating_add(authorization_count.saturating_mul(CALL_NEW_ACCOUNT_GAS))
}

/// EIP-7623 floor cost of a transaction derived from its calldata alone.
pub fn floor_data_gas(data: &[u8]) -> u64 {
    let non_zero_bytes = data.iter().filter(|byte| **byte != 0).count() as u64;
    let zero_bytes = data.len() as u64 - non_zero_bytes;
    let tokens = zero_bytes.saturating_add(non_zero_bytes.saturating_mul(NON_ZERO_BYTE_TOKENS));
    TX_GAS.saturating_add(tokens.saturating_mul(TOTAL_COST_FLOOR_PER_TOKEN))
}

/// Refund quotient for the active rules and call origin.
///
/// Internal calls, those originated by another module rather than a user
/// transaction, refund in full: quotient one, uncapped.
pub fn refund_quotient(is_london: bool, is_internal: bool) -> u64 {
    if is_internal {
        1
    } else if is_london {
        REFUND_QUOTIENT_EIP3529
    } else {
        REFUND_QUOTIENT
    }
}

/// Portion of the accumulated `refund` actually granted: capped at
/// `gas_used / quotient`, except quotient one which is uncapped.
pub fn gas_to_refund(refund: u64, gas_used: u64, quotient: u64) -> u64 {
    if quotient <= 1 {
        refund
    } else {
        refund.min(gas_used / quotient)
    }
}

/// Minimum charged gas for an external transaction:
/// `gas_limit × multiplier`, with the multiplier in basis points.
pub fn minimum_gas_used(gas_limit: u64, min_gas_multiplier_bps: u64) -> u64 {
    let scaled = u128::from(gas_limit) * u128::from(min_gas_multiplier_bps) / u128::from(BPS_DENOMINATOR);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Block-level gas meter of the host chain.
///
/// Tracks cumulative consumption against an optional limit. The transaction
/// applier consumes the gas used by each receipted transaction and, on hard
/// failure, the whole remaining limit as a deterministic penalty.
#[derive(Debug, Clone)]
pub struct GasMeter {
    limit: Option<u64>,
    consumed: u64,
}

impl GasMeter {
    /// Meter with a hard limit.
    pub fn new(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            consumed: 0,
        }
    }

    /// Meter without a limit, for query paths.
    pub fn infinite() -> Self {
        Self {
            limit: None,
            consumed: 0,
        }
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Consumes `amount`, clamped to the limit.
    pub fn consume(&mut self, amount: u64) {
        self.consumed = self.consumed.saturating_add(amount);
        if let Some(limit) = self.limit {
            self.consumed = self.consumed.min(limit);
        }
    }

    /// Consumes everything up to the limit. No-op on an unlimited meter.
    pub fn consume_to_limit(&mut self) {
        if let Some(limit) = self.limit {
            self.consumed = limit;
        }
    }
}

/// Checks the gas limit against the intrinsic cost, the deterministic
/// rejection performed before any state is touched.
pub fn check_intrinsic_gas(gas_limit: u64, intrinsic: u64) -> Result<(), EngineError> {
    if gas_limit < intrinsic {
        return Err(EngineError::IntrinsicGas {
            have: gas_limit,
            want: intrinsic,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_eip2930::AccessListItem;
    use primitives::{Address, B256};

    #[test]
    fn intrinsic_gas_for_plain_transfer_is_21000() {
        let rules = ForkRules::latest(1);
        assert_eq!(intrinsic_gas(&[], &AccessList::default(), 0, false, &rules), TX_GAS);
    }

    #[test]
    fn intrinsic_gas_counts_calldata_bytes() {
        let rules = ForkRules::latest(1);
        // Two non-zero bytes at 16 gas, one zero byte at 4.
        let gas = intrinsic_gas(&[1, 0, 2], &AccessList::default(), 0, false, &rules);
        assert_eq!(gas, TX_GAS + 2 * TX_DATA_NON_ZERO_GAS_EIP2028 + TX_DATA_ZERO_GAS);

        let mut pre_istanbul = rules;
        pre_istanbul.is_istanbul = false;
        let gas = intrinsic_gas(&[1, 0, 2], &AccessList::default(), 0, false, &pre_istanbul);
        assert_eq!(gas, TX_GAS + 2 * TX_DATA_NON_ZERO_GAS_FRONTIER + TX_DATA_ZERO_GAS);
    }

    #[test]
    fn intrinsic_gas_counts_creation_and_initcode_words() {
        let rules = ForkRules::latest(1);
        let init_code = [1u8; 33];
        let gas = intrinsic_gas(&init_code, &AccessList::default(), 0, true, &rules);
        assert_eq!(
            gas,
            TX_GAS_CONTRACT_CREATION + 33 * TX_DATA_NON_ZERO_GAS_EIP2028 + 2 * INITCODE_WORD_GAS
        );
    }

    #[test]
    fn intrinsic_gas_counts_access_list_and_authorizations() {
        let rules = ForkRules::latest(1);
        let list = AccessList(vec![AccessListItem {
            address: Address::ZERO,
            storage_keys: vec![B256::ZERO, B256::with_last_byte(1)],
        }]);
        let gas = intrinsic_gas(&[], &list, 2, false, &rules);
        assert_eq!(
            gas,
            TX_GAS
                + TX_ACCESS_LIST_ADDRESS_GAS
                + 2 * TX_ACCESS_LIST_STORAGE_KEY_GAS
                + 2 * CALL_NEW_ACCOUNT_GAS
        );
    }

    #[test]
    fn floor_data_gas_counts_tokens() {
        // 2 zero bytes = 2 tokens, 3 non-zero bytes = 12 tokens.
        assert_eq!(floor_data_gas(&[0, 0, 1, 2, 3]), TX_GAS + 14 * TOTAL_COST_FLOOR_PER_TOKEN);
    }

    #[test]
    fn refund_quotient_selection() {
        assert_eq!(refund_quotient(true, false), REFUND_QUOTIENT_EIP3529);
        assert_eq!(refund_quotient(false, false), REFUND_QUOTIENT);
        assert_eq!(refund_quotient(true, true), 1);
    }

    #[test]
    fn internal_refund_is_uncapped() {
        assert_eq!(gas_to_refund(10_000, 100, 1), 10_000);
        assert_eq!(gas_to_refund(10_000, 100, REFUND_QUOTIENT_EIP3529), 20);
    }

    #[test]
    fn minimum_gas_is_half_the_limit_by_default() {
        assert_eq!(minimum_gas_used(21_000, 5_000), 10_500);
        assert_eq!(minimum_gas_used(0, 5_000), 0);
    }

    #[test]
    fn meter_consumes_to_limit() {
        let mut meter = GasMeter::new(100);
        meter.consume(30);
        assert_eq!(meter.consumed(), 30);
        meter.consume_to_limit();
        assert_eq!(meter.consumed(), 100);

        let mut infinite = GasMeter::infinite();
        infinite.consume_to_limit();
        assert_eq!(infinite.consumed(), 0);
    }
}
