use crate::{Account, Keeper, KeeperError};
use primitives::{Address, Bytes, HashMap, B256};
use std::collections::BTreeMap;

/// Keeper holding everything in memory.
///
/// Storage uses ordered maps so that iteration order is deterministic, the
/// same guarantee a store-backed keeper gives through its key encoding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeeper {
    accounts: HashMap<Address, Account>,
    codes: HashMap<B256, Bytes>,
    storage: HashMap<Address, BTreeMap<B256, B256>>,
}

impl InMemoryKeeper {
    /// Creates an empty keeper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Returns the full committed storage of an account.
    pub fn storage_of(&self, address: Address) -> BTreeMap<B256, B256> {
        self.storage.get(&address).cloned().unwrap_or_default()
    }
}

impl Keeper for InMemoryKeeper {
    fn account(&self, address: Address) -> Option<Account> {
        self.accounts.get(&address).cloned()
    }

    fn set_account(&mut self, address: Address, account: Account) -> Result<(), KeeperError> {
        self.accounts.insert(address, account);
        Ok(())
    }

    fn delete_account(&mut self, address: Address) -> Result<(), KeeperError> {
        self.accounts.remove(&address);
        self.storage.remove(&address);
        Ok(())
    }

    fn state(&self, address: Address, key: B256) -> B256 {
        self.storage
            .get(&address)
            .and_then(|slots| slots.get(&key))
            .copied()
            .unwrap_or(B256::ZERO)
    }

    fn set_state(&mut self, address: Address, key: B256, value: B256) {
        self.storage.entry(address).or_default().insert(key, value);
    }

    fn delete_state(&mut self, address: Address, key: B256) {
        if let Some(slots) = self.storage.get_mut(&address) {
            slots.remove(&key);
            if slots.is_empty() {
                self.storage.remove(&address);
            }
        }
    }

    fn code(&self, code_hash: B256) -> Bytes {
        self.codes.get(&code_hash).cloned().unwrap_or_default()
    }

    fn set_code(&mut self, code_hash: B256, code: Bytes) {
        self.codes.insert(code_hash, code);
    }

    fn delete_code(&mut self, code_hash: B256) {
        self.codes.remove(&code_hash);
    }

    fn for_each_storage(&self, address: Address, f: &mut dyn FnMut(B256, B256) -> bool) {
        if let Some(slots) = self.storage.get(&address) {
            for (key, value) in slots {
                if !f(*key, *value) {
                    return;
                }
            }
        }
    }
}
