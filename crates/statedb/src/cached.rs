use crate::{Account, Keeper, KeeperError};
use primitives::{Address, Bytes, HashMap, HashSet, B256};
use std::collections::BTreeMap;
use tracing::trace;

/// Write-buffering overlay over another keeper.
///
/// This is the cache-context of the transaction applier: every mutation is
/// held locally and becomes visible to the inner keeper only on
/// [`CachedKeeper::flush`]. Dropping the overlay discards all buffered
/// writes, which is how a failed transaction is rolled back without touching
/// the parent context.
pub struct CachedKeeper<'a> {
    inner: &'a mut dyn Keeper,
    /// Buffered account writes; `None` marks a deletion.
    accounts: HashMap<Address, Option<Account>>,
    /// Buffered code writes; `None` marks a deletion.
    codes: HashMap<B256, Option<Bytes>>,
    /// Buffered slot writes per account; `None` marks a deletion.
    storage: HashMap<Address, BTreeMap<B256, Option<B256>>>,
    /// Accounts whose inner storage has been wiped by a buffered
    /// account deletion.
    cleared: HashSet<Address>,
}

impl core::fmt::Debug for CachedKeeper<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CachedKeeper")
            .field("inner", &"dyn Keeper")
            .field("accounts", &self.accounts)
            .field("codes", &self.codes)
            .field("storage", &self.storage)
            .field("cleared", &self.cleared)
            .finish()
    }
}

impl<'a> CachedKeeper<'a> {
    /// Creates an overlay over `inner`.
    pub fn new(inner: &'a mut dyn Keeper) -> Self {
        Self {
            inner,
            accounts: HashMap::default(),
            codes: HashMap::default(),
            storage: HashMap::default(),
            cleared: HashSet::default(),
        }
    }

    /// Writes every buffered change into the inner keeper, deletions first,
    /// in deterministic key order. The overlay is empty afterwards.
    pub fn flush(&mut self) -> Result<(), KeeperError> {
        let mut cleared: Vec<Address> = self.cleared.drain().collect();
        cleared.sort_unstable();
        for address in cleared {
            self.inner.delete_account(address)?;
        }

        let mut codes: Vec<(B256, Option<Bytes>)> = self.codes.drain().collect();
        codes.sort_unstable_by_key(|(hash, _)| *hash);
        for (hash, code) in codes {
            match code {
                Some(code) => self.inner.set_code(hash, code),
                None => self.inner.delete_code(hash),
            }
        }

        let mut accounts: Vec<(Address, Option<Account>)> = self.accounts.drain().collect();
        accounts.sort_unstable_by_key(|(address, _)| *address);
        let written = accounts.len();
        for (address, account) in accounts {
            match account {
                Some(account) => self.inner.set_account(address, account)?,
                // Deletion of storage already happened through `cleared`.
                None => self.inner.delete_account(address)?,
            }
        }

        let mut storage: Vec<(Address, BTreeMap<B256, Option<B256>>)> =
            self.storage.drain().collect();
        storage.sort_unstable_by_key(|(address, _)| *address);
        for (address, slots) in storage {
            for (key, value) in slots {
                match value {
                    Some(value) => self.inner.set_state(address, key, value),
                    None => self.inner.delete_state(address, key),
                }
            }
        }

        trace!(accounts = written, "flushed cached keeper");
        Ok(())
    }
}

impl Keeper for CachedKeeper<'_> {
    fn account(&self, address: Address) -> Option<Account> {
        match self.accounts.get(&address) {
            Some(buffered) => buffered.clone(),
            None if self.cleared.contains(&address) => None,
            None => self.inner.account(address),
        }
    }

    fn set_account(&mut self, address: Address, account: Account) -> Result<(), KeeperError> {
        self.accounts.insert(address, Some(account));
        Ok(())
    }

    fn delete_account(&mut self, address: Address) -> Result<(), KeeperError> {
        self.accounts.insert(address, None);
        self.storage.remove(&address);
        self.cleared.insert(address);
        Ok(())
    }

    fn state(&self, address: Address, key: B256) -> B256 {
        if let Some(slots) = self.storage.get(&address) {
            if let Some(buffered) = slots.get(&key) {
                return buffered.unwrap_or(B256::ZERO);
            }
        }
        if self.cleared.contains(&address) {
            return B256::ZERO;
        }
        self.inner.state(address, key)
    }

    fn set_state(&mut self, address: Address, key: B256, value: B256) {
        self.storage
            .entry(address)
            .or_default()
            .insert(key, Some(value));
    }

    fn delete_state(&mut self, address: Address, key: B256) {
        self.storage.entry(address).or_default().insert(key, None);
    }

    fn code(&self, code_hash: B256) -> Bytes {
        match self.codes.get(&code_hash) {
            Some(buffered) => buffered.clone().unwrap_or_default(),
            None => self.inner.code(code_hash),
        }
    }

    fn set_code(&mut self, code_hash: B256, code: Bytes) {
        self.codes.insert(code_hash, Some(code));
    }

    fn delete_code(&mut self, code_hash: B256) {
        self.codes.insert(code_hash, None);
    }

    fn for_each_storage(&self, address: Address, f: &mut dyn FnMut(B256, B256) -> bool) {
        let mut merged: BTreeMap<B256, B256> = BTreeMap::new();
        if !self.cleared.contains(&address) {
            self.inner.for_each_storage(address, &mut |key, value| {
                merged.insert(key, value);
                true
            });
        }
        if let Some(slots) = self.storage.get(&address) {
            for (key, value) in slots {
                match value {
                    Some(value) => {
                        merged.insert(*key, *value);
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
        }
        for (key, value) in merged {
            if !f(key, value) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryKeeper;
    use primitives::{address, U256};

    const ADDR: Address = address!("0x00000000000000000000000000000000000000a1");

    #[test]
    fn writes_invisible_until_flush() {
        let mut inner = InMemoryKeeper::new();
        let mut cache = CachedKeeper::new(&mut inner);
        cache
            .set_account(ADDR, Account::from_balance(U256::from(5)))
            .unwrap();
        cache.set_state(ADDR, B256::ZERO, B256::with_last_byte(9));
        assert!(cache.account(ADDR).is_some());
        drop(cache);

        assert!(inner.account(ADDR).is_none(), "unflushed writes discarded");

        let mut cache = CachedKeeper::new(&mut inner);
        cache
            .set_account(ADDR, Account::from_balance(U256::from(5)))
            .unwrap();
        cache.set_state(ADDR, B256::ZERO, B256::with_last_byte(9));
        cache.flush().unwrap();
        assert_eq!(inner.account(ADDR).unwrap().balance, U256::from(5));
        assert_eq!(inner.state(ADDR, B256::ZERO), B256::with_last_byte(9));
    }

    #[test]
    fn buffered_deletion_hides_inner_account() {
        let mut inner = InMemoryKeeper::new();
        inner
            .set_account(ADDR, Account::from_balance(U256::from(1)))
            .unwrap();
        inner.set_state(ADDR, B256::ZERO, B256::with_last_byte(1));

        let mut cache = CachedKeeper::new(&mut inner);
        cache.delete_account(ADDR).unwrap();
        assert!(cache.account(ADDR).is_none());
        assert_eq!(cache.state(ADDR, B256::ZERO), B256::ZERO);

        cache.flush().unwrap();
        assert!(inner.account(ADDR).is_none());
    }

    #[test]
    fn for_each_merges_overlay_and_inner() {
        let mut inner = InMemoryKeeper::new();
        inner.set_state(ADDR, B256::with_last_byte(1), B256::with_last_byte(1));
        inner.set_state(ADDR, B256::with_last_byte(2), B256::with_last_byte(2));

        let mut cache = CachedKeeper::new(&mut inner);
        cache.set_state(ADDR, B256::with_last_byte(2), B256::with_last_byte(0x22));
        cache.delete_state(ADDR, B256::with_last_byte(1));
        cache.set_state(ADDR, B256::with_last_byte(3), B256::with_last_byte(3));

        let mut seen = Vec::new();
        cache.for_each_storage(ADDR, &mut |key, value| {
            seen.push((key, value));
            true
        });
        assert_eq!(
            seen,
            vec![
                (B256::with_last_byte(2), B256::with_last_byte(0x22)),
                (B256::with_last_byte(3), B256::with_last_byte(3)),
            ]
        );
    }
}
