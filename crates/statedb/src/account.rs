use primitives::{B256, KECCAK_EMPTY, U256};

/// Basic account data as persisted by the keeper.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Account {
    /// Transaction count of the account.
    pub nonce: u64,
    /// Native balance of the account, in the EVM denomination.
    pub balance: U256,
    /// Hash of the contract code; [`KECCAK_EMPTY`] when the account has none.
    pub code_hash: B256,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::ZERO,
            code_hash: KECCAK_EMPTY,
        }
    }
}

impl Account {
    /// Account with the given balance and no nonce or code.
    pub fn from_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    /// Whether the account carries contract code.
    pub fn is_contract(&self) -> bool {
        self.code_hash != KECCAK_EMPTY && self.code_hash != B256::ZERO
    }

    /// Whether the code hash denotes "no code".
    pub fn has_empty_code_hash(&self) -> bool {
        self.code_hash == KECCAK_EMPTY || self.code_hash == B256::ZERO
    }

    /// EIP-161 emptiness: zero nonce, zero balance and no code.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.has_empty_code_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitives::keccak256;

    #[test]
    fn default_account_is_empty() {
        let account = Account::default();
        assert!(account.is_empty());
        assert!(!account.is_contract());
    }

    #[test]
    fn account_with_code_is_a_contract() {
        let account = Account {
            code_hash: keccak256([0x60, 0x00]),
            ..Default::default()
        };
        assert!(account.is_contract());
        assert!(!account.is_empty());
    }
}
