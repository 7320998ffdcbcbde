use crate::{Account, Keeper};
use bitflags::bitflags;
use primitives::{Address, Bytes, HashMap, B256};

/// Storage slots of a single account.
pub type Storage = HashMap<B256, B256>;

bitflags! {
    /// Lifecycle flags of an in-flight state object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectFlags: u8 {
        /// Code was (re)assigned during this transaction.
        const DIRTY_CODE = 0b0000_0001;
        /// The account was self-destructed during this transaction.
        const SELF_DESTRUCTED = 0b0000_0010;
        /// The account was created as a contract in this transaction, which
        /// is what arms EIP-6780 selfdestruct.
        const NEW_CONTRACT = 0b0000_0100;
    }
}

/// In-flight view of one account inside the [`StateDB`](crate::StateDB).
///
/// Reads fall through dirty storage to committed storage; committed storage
/// is either the keeper's or, for overridden accounts, a replacement map
/// where absent keys read as zero.
#[derive(Debug, Clone)]
pub struct StateObject {
    /// Current account data, including journaled mutations.
    pub account: Account,
    /// Lazily loaded contract code, populated on first access or on
    /// `set_code`.
    code: Option<Bytes>,
    /// Committed slots read from the keeper, cached to avoid repeat fetches.
    origin_storage: Storage,
    /// Slots written during this transaction.
    dirty_storage: Storage,
    /// Full replacement of committed storage installed by a state override.
    override_storage: Option<Storage>,
    flags: ObjectFlags,
}

impl StateObject {
    /// Creates an object around an existing account.
    pub fn new(account: Account) -> Self {
        Self {
            account,
            code: None,
            origin_storage: Storage::default(),
            dirty_storage: Storage::default(),
            override_storage: None,
            flags: ObjectFlags::empty(),
        }
    }

    /// Creates an object for an account that does not exist in the keeper.
    pub fn new_empty() -> Self {
        Self::new(Account::default())
    }

    /// Committed value of `key`, consulting the override map when present
    /// and the keeper otherwise. The keeper read is cached.
    pub fn committed_state(&mut self, keeper: &dyn Keeper, address: Address, key: B256) -> B256 {
        if let Some(overridden) = &self.override_storage {
            return overridden.get(&key).copied().unwrap_or(B256::ZERO);
        }
        if let Some(value) = self.origin_storage.get(&key) {
            return *value;
        }
        let value = keeper.state(address, key);
        self.origin_storage.insert(key, value);
        value
    }

    /// Current value of `key`: the dirty value when written this
    /// transaction, the committed value otherwise.
    pub fn state(&mut self, keeper: &dyn Keeper, address: Address, key: B256) -> B256 {
        if let Some(value) = self.dirty_storage.get(&key) {
            return *value;
        }
        self.committed_state(keeper, address, key)
    }

    /// Writes `value` into dirty storage, returning the previous dirty
    /// value if there was one.
    pub fn set_state(&mut self, key: B256, value: B256) -> Option<B256> {
        self.dirty_storage.insert(key, value)
    }

    /// Removes `key` from dirty storage. Journal use only.
    pub fn remove_dirty_state(&mut self, key: B256) {
        self.dirty_storage.remove(&key);
    }

    /// Slots written during this transaction.
    pub fn dirty_storage(&self) -> &Storage {
        &self.dirty_storage
    }

    /// Replaces committed storage wholesale. Absent keys read as zero from
    /// now on. Used by `eth_call` state overrides, outside journal control.
    pub fn set_override_storage(&mut self, storage: Storage) {
        self.override_storage = Some(storage);
        self.origin_storage.clear();
        self.dirty_storage.clear();
    }

    /// Contract code, loading it from the keeper on first access.
    pub fn code(&mut self, keeper: &dyn Keeper) -> &Bytes {
        if self.code.is_none() {
            let code = if self.account.has_empty_code_hash() {
                Bytes::new()
            } else {
                keeper.code(self.account.code_hash)
            };
            self.code = Some(code);
        }
        self.code.as_ref().expect("code loaded above")
    }

    /// Assigns new code and its hash, marking the code dirty.
    pub fn set_code(&mut self, code_hash: B256, code: Bytes) {
        self.account.code_hash = code_hash;
        self.code = Some(code);
        self.flags.insert(ObjectFlags::DIRTY_CODE);
    }

    /// Restores code state from a journal entry.
    pub fn restore_code(&mut self, code_hash: B256, code: Option<Bytes>, dirty: bool) {
        self.account.code_hash = code_hash;
        self.code = code;
        self.flags.set(ObjectFlags::DIRTY_CODE, dirty);
    }

    pub fn is_dirty_code(&self) -> bool {
        self.flags.contains(ObjectFlags::DIRTY_CODE)
    }

    pub fn is_self_destructed(&self) -> bool {
        self.flags.contains(ObjectFlags::SELF_DESTRUCTED)
    }

    pub fn set_self_destructed(&mut self, destructed: bool) {
        self.flags.set(ObjectFlags::SELF_DESTRUCTED, destructed);
    }

    /// Whether the account became a contract in this transaction.
    pub fn is_new_contract(&self) -> bool {
        self.flags.contains(ObjectFlags::NEW_CONTRACT)
    }

    pub fn set_new_contract(&mut self, new_contract: bool) {
        self.flags.set(ObjectFlags::NEW_CONTRACT, new_contract);
    }

    /// EIP-161 emptiness of the current account data.
    pub fn is_empty(&self) -> bool {
        self.account.is_empty()
    }
}
