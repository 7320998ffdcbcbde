use crate::{
    journal::{Journal, JournalEntry},
    AccessList, Account, Keeper, KeeperError, StateObject, Storage, TxConfig, TxLog,
};
use primitives::{keccak256, Address, Bytes, ForkRules, HashMap, Log, B256, KECCAK_EMPTY, U256};
use tracing::trace;

#[derive(Debug, Clone, Copy)]
struct Revision {
    id: usize,
    journal_index: usize,
}

/// Per-transaction mutable state the EVM executes against.
///
/// All reads load lazily from the keeper into [`StateObject`]s; all writes
/// stay in those objects, recorded in the journal, until [`StateDB::commit`]
/// writes the dirtied accounts back. Snapshots are journal positions and
/// reverting undoes every entry past one.
pub struct StateDB<'a> {
    keeper: &'a mut dyn Keeper,
    tx_config: TxConfig,
    objects: HashMap<Address, StateObject>,
    journal: Journal,
    access_list: AccessList,
    logs: Vec<TxLog>,
    refund: u64,
    revisions: Vec<Revision>,
    next_revision_id: usize,
}

impl core::fmt::Debug for StateDB<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StateDB")
            .field("keeper", &"dyn Keeper")
            .field("tx_config", &self.tx_config)
            .field("objects", &self.objects)
            .field("journal", &self.journal)
            .field("access_list", &self.access_list)
            .field("logs", &self.logs)
            .field("refund", &self.refund)
            .field("revisions", &self.revisions)
            .field("next_revision_id", &self.next_revision_id)
            .finish()
    }
}

impl<'a> StateDB<'a> {
    /// Creates a fresh state over `keeper` for one transaction.
    pub fn new(keeper: &'a mut dyn Keeper, tx_config: TxConfig) -> Self {
        Self {
            keeper,
            tx_config,
            objects: HashMap::default(),
            journal: Journal::new(),
            access_list: AccessList::new(),
            logs: Vec::new(),
            refund: 0,
            revisions: Vec::new(),
            next_revision_id: 0,
        }
    }

    /// Position of the transaction this state executes.
    pub fn tx_config(&self) -> &TxConfig {
        &self.tx_config
    }

    /// Read access to the backing keeper, bypassing uncommitted changes.
    pub fn keeper(&self) -> &dyn Keeper {
        &*self.keeper
    }

    /// Number of journal entries recorded so far.
    pub fn journal_entries(&self) -> usize {
        self.journal.len()
    }

    /// Loads `address` into the object cache if the keeper knows it.
    /// Returns whether an object is present afterwards.
    fn load(&mut self, address: Address) -> bool {
        if self.objects.contains_key(&address) {
            return true;
        }
        match self.keeper.account(address) {
            Some(account) => {
                self.objects.insert(address, StateObject::new(account));
                true
            }
            None => false,
        }
    }

    /// Loads `address`, materializing (and journaling) an empty object when
    /// the keeper has no account.
    fn load_or_create(&mut self, address: Address) {
        if self.load(address) {
            return;
        }
        self.objects.insert(address, StateObject::new_empty());
        self.journal.append(JournalEntry::CreateObject { address });
    }

    /// Whether the account exists in this state or the keeper.
    pub fn exist(&mut self, address: Address) -> bool {
        self.load(address)
    }

    /// EIP-161 emptiness; nonexistent accounts are empty.
    pub fn empty(&mut self, address: Address) -> bool {
        if !self.load(address) {
            return true;
        }
        self.objects[&address].is_empty()
    }

    // -- balance and nonce --------------------------------------------------

    /// Current balance, zero for nonexistent accounts.
    pub fn balance(&mut self, address: Address) -> U256 {
        if !self.load(address) {
            return U256::ZERO;
        }
        self.objects[&address].account.balance
    }

    /// Adds `amount` to the balance, creating the account if needed.
    /// Returns the balance before the change. A zero `amount` touches
    /// nothing, including the journal.
    pub fn add_balance(&mut self, address: Address, amount: U256) -> U256 {
        if amount.is_zero() {
            return self.balance(address);
        }
        self.load_or_create(address);
        let Self {
            objects, journal, ..
        } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        let prev = object.account.balance;
        journal.append(JournalEntry::Balance { address, prev });
        object.account.balance = prev.saturating_add(amount);
        prev
    }

    /// Subtracts `amount` from the balance, saturating at zero. Returns the
    /// balance before the change. A zero `amount` is a no-op.
    pub fn sub_balance(&mut self, address: Address, amount: U256) -> U256 {
        if amount.is_zero() {
            return self.balance(address);
        }
        self.load_or_create(address);
        let Self {
            objects, journal, ..
        } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        let prev = object.account.balance;
        journal.append(JournalEntry::Balance { address, prev });
        object.account.balance = prev.saturating_sub(amount);
        prev
    }

    /// Sets the balance outright. Used by state overrides.
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.load_or_create(address);
        let Self {
            objects, journal, ..
        } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        journal.append(JournalEntry::Balance {
            address,
            prev: object.account.balance,
        });
        object.account.balance = balance;
    }

    /// Current nonce, zero for nonexistent accounts.
    pub fn nonce(&mut self, address: Address) -> u64 {
        if !self.load(address) {
            return 0;
        }
        self.objects[&address].account.nonce
    }

    /// Sets the nonce, creating the account if needed.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.load_or_create(address);
        let Self {
            objects, journal, ..
        } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        journal.append(JournalEntry::Nonce {
            address,
            prev: object.account.nonce,
        });
        object.account.nonce = nonce;
    }

    // -- code ---------------------------------------------------------------

    /// Code hash of the account; zero for nonexistent accounts,
    /// [`KECCAK_EMPTY`] for accounts without code.
    pub fn code_hash(&mut self, address: Address) -> B256 {
        if !self.load(address) {
            return B256::ZERO;
        }
        let account = &self.objects[&address].account;
        if account.has_empty_code_hash() {
            KECCAK_EMPTY
        } else {
            account.code_hash
        }
    }

    /// Contract code of the account, empty when there is none.
    pub fn code(&mut self, address: Address) -> Bytes {
        if !self.load(address) {
            return Bytes::new();
        }
        let Self {
            keeper, objects, ..
        } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        object.code(&**keeper).clone()
    }

    /// Length of the contract code.
    pub fn code_size(&mut self, address: Address) -> usize {
        self.code(address).len()
    }

    /// Assigns `code` to the account, hashing it on the spot. Empty code
    /// hashes to [`KECCAK_EMPTY`].
    pub fn set_code(&mut self, address: Address, code: Bytes) {
        self.load_or_create(address);
        let Self {
            keeper,
            objects,
            journal,
            ..
        } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        let prev_code = object.code(&**keeper).clone();
        journal.append(JournalEntry::Code {
            address,
            prev_code: Some(prev_code),
            prev_hash: object.account.code_hash,
            prev_dirty: object.is_dirty_code(),
        });
        let code_hash = if code.is_empty() {
            KECCAK_EMPTY
        } else {
            keccak256(&code)
        };
        object.set_code(code_hash, code);
    }

    // -- storage ------------------------------------------------------------

    /// Current value of a storage slot, dirty writes included.
    pub fn state(&mut self, address: Address, key: B256) -> B256 {
        if !self.load(address) {
            return B256::ZERO;
        }
        let Self {
            keeper, objects, ..
        } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        object.state(&**keeper, address, key)
    }

    /// Value of a storage slot as of the last commit.
    pub fn committed_state(&mut self, address: Address, key: B256) -> B256 {
        if !self.load(address) {
            return B256::ZERO;
        }
        let Self {
            keeper, objects, ..
        } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        object.committed_state(&**keeper, address, key)
    }

    /// Writes a storage slot. Always journaled, even when the value does not
    /// change, so gas metering of repeated writes stays exact on revert.
    pub fn set_state(&mut self, address: Address, key: B256, value: B256) {
        self.load_or_create(address);
        let Self {
            objects, journal, ..
        } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        let prev = object.set_state(key, value);
        journal.append(JournalEntry::Storage { address, key, prev });
    }

    /// Replaces the committed storage of the account wholesale; absent keys
    /// read as zero from now on. Not journaled: state overrides are applied
    /// before execution and are never reverted.
    pub fn set_storage(&mut self, address: Address, storage: Storage) {
        self.load_or_create(address);
        self.objects
            .get_mut(&address)
            .expect("object loaded above")
            .set_override_storage(storage);
    }

    /// Iterates the committed storage of `address` until the callback
    /// returns `false`. Dirty writes of this transaction are not visible.
    pub fn for_each_storage(&self, address: Address, f: &mut dyn FnMut(B256, B256) -> bool) {
        self.keeper.for_each_storage(address, f);
    }

    // -- account lifecycle --------------------------------------------------

    /// Resets the account to a fresh one, carrying only the balance over.
    pub fn create_account(&mut self, address: Address) {
        self.load(address);
        let Self {
            objects, journal, ..
        } = self;
        match objects.get_mut(&address) {
            Some(existing) => {
                let prev = Box::new(existing.clone());
                let balance = existing.account.balance;
                journal.append(JournalEntry::ResetObject { address, prev });
                *existing = StateObject::new(Account::from_balance(balance));
            }
            None => {
                objects.insert(address, StateObject::new_empty());
                journal.append(JournalEntry::CreateObject { address });
            }
        }
    }

    /// Marks the account as a contract created in this transaction, arming
    /// EIP-6780 selfdestruct for it.
    pub fn create_contract(&mut self, address: Address) {
        self.load_or_create(address);
        let Self {
            objects, journal, ..
        } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        if !object.is_new_contract() {
            journal.append(JournalEntry::NewContract { address });
            object.set_new_contract(true);
        }
    }

    /// Marks the account self-destructed and zeroes its balance. Code and
    /// storage stay readable until commit. Returns whether the account
    /// existed.
    pub fn self_destruct(&mut self, address: Address) -> bool {
        if !self.load(address) {
            return false;
        }
        let Self {
            objects, journal, ..
        } = self;
        let object = objects.get_mut(&address).expect("object loaded above");
        journal.append(JournalEntry::SelfDestruct {
            address,
            prev_destructed: object.is_self_destructed(),
            prev_balance: object.account.balance,
        });
        object.set_self_destructed(true);
        object.account.balance = U256::ZERO;
        true
    }

    /// EIP-6780 selfdestruct: only removes contracts created in the same
    /// transaction. For any other account this is a complete no-op, balance
    /// included.
    pub fn self_destruct_6780(&mut self, address: Address) {
        if !self.load(address) {
            return;
        }
        if self.objects[&address].is_new_contract() {
            self.self_destruct(address);
        }
    }

    /// Whether the account was self-destructed in this transaction.
    pub fn has_self_destructed(&mut self, address: Address) -> bool {
        self.load(address) && self.objects[&address].is_self_destructed()
    }

    // -- refund counter -----------------------------------------------------

    /// Current gas refund counter.
    pub fn refund(&self) -> u64 {
        self.refund
    }

    /// Adds to the refund counter.
    pub fn add_refund(&mut self, gas: u64) {
        self.journal.append(JournalEntry::Refund { prev: self.refund });
        self.refund += gas;
    }

    /// Subtracts from the refund counter.
    ///
    /// # Panics
    ///
    /// Panics when `gas` exceeds the counter; that is a bug in opcode
    /// accounting, not a user error.
    pub fn sub_refund(&mut self, gas: u64) {
        if gas > self.refund {
            panic!(
                "refund counter below zero (gas: {gas} > refund: {refund})",
                refund = self.refund
            );
        }
        self.journal.append(JournalEntry::Refund { prev: self.refund });
        self.refund -= gas;
    }

    // -- access list --------------------------------------------------------

    /// Whether `address` is warm.
    pub fn address_in_access_list(&self, address: Address) -> bool {
        self.access_list.contains_address(address)
    }

    /// Whether `address` and `slot` are warm.
    pub fn slot_in_access_list(&self, address: Address, slot: B256) -> (bool, bool) {
        self.access_list.contains(address, slot)
    }

    /// Warms `address`, journaled.
    pub fn add_address_to_access_list(&mut self, address: Address) {
        if self.access_list.add_address(address) {
            self.journal
                .append(JournalEntry::AccessListAddAccount { address });
        }
    }

    /// Warms `slot` of `address`, journaled.
    pub fn add_slot_to_access_list(&mut self, address: Address, slot: B256) {
        let (address_added, slot_added) = self.access_list.add_slot(address, slot);
        if address_added {
            self.journal
                .append(JournalEntry::AccessListAddAccount { address });
        }
        if slot_added {
            self.journal
                .append(JournalEntry::AccessListAddSlot { address, slot });
        }
    }

    /// Seeds the warm set for a transaction per EIP-2929, EIP-3651 and the
    /// transaction's own access list. Runs before the first snapshot, so the
    /// additions are deliberately not journaled.
    pub fn prepare(
        &mut self,
        rules: &ForkRules,
        sender: Address,
        coinbase: Address,
        dest: Option<Address>,
        precompiles: &[Address],
        tx_access_list: &alloy_eip2930::AccessList,
    ) {
        if rules.is_berlin {
            self.access_list.add_address(sender);
            if let Some(dest) = dest {
                self.access_list.add_address(dest);
            }
            for precompile in precompiles {
                self.access_list.add_address(*precompile);
            }
            for item in tx_access_list.0.iter() {
                self.access_list.add_address(item.address);
                for key in &item.storage_keys {
                    self.access_list.add_slot(item.address, *key);
                }
            }
        }
        if rules.is_shanghai {
            self.access_list.add_address(coinbase);
        }
    }

    // -- logs ---------------------------------------------------------------

    /// Appends a log, stamping it with the transaction position. The block
    /// log index continues from [`TxConfig::log_index`].
    pub fn add_log(&mut self, log: Log) {
        let tx_config = self.tx_config;
        self.journal.append(JournalEntry::Log);
        self.logs.push(TxLog {
            log,
            tx_hash: tx_config.tx_hash,
            block_hash: tx_config.block_hash,
            tx_index: tx_config.tx_index,
            log_index: tx_config.log_index + self.logs.len() as u64,
        });
    }

    /// Logs emitted so far, in emission order.
    pub fn logs(&self) -> &[TxLog] {
        &self.logs
    }

    // -- snapshots ----------------------------------------------------------

    /// Takes a snapshot and returns its id.
    pub fn snapshot(&mut self) -> usize {
        let id = self.next_revision_id;
        self.next_revision_id += 1;
        self.revisions.push(Revision {
            id,
            journal_index: self.journal.len(),
        });
        id
    }

    /// Reverts every change made since `snapshot` was taken, that snapshot
    /// and all later ones becoming unusable.
    ///
    /// # Panics
    ///
    /// Panics on an unknown or already-reverted id; callers only ever hold
    /// ids they took themselves, so this is a bug, not an input error.
    pub fn revert_to_snapshot(&mut self, id: usize) {
        let index = self
            .revisions
            .iter()
            .position(|revision| revision.id == id)
            .unwrap_or_else(|| panic!("revision id {id} cannot be reverted"));
        let journal_index = self.revisions[index].journal_index;
        let Self {
            journal,
            objects,
            access_list,
            logs,
            refund,
            ..
        } = self;
        journal.revert(journal_index, objects, access_list, logs, refund);
        self.revisions.truncate(index);
    }

    // -- commit -------------------------------------------------------------

    /// Writes every dirtied account back to the keeper, in address order.
    ///
    /// Self-destructed accounts are deleted. For the rest, freshly assigned
    /// code is stored under its hash, the account record is written, and
    /// dirty slots follow in key order with zero values deleting the slot.
    /// The first keeper error aborts the whole commit.
    pub fn commit(&mut self) -> Result<(), KeeperError> {
        let addresses = self.journal.dirty_addresses();
        let written = addresses.len();
        let Self {
            keeper, objects, ..
        } = self;
        for address in addresses {
            let Some(object) = objects.get_mut(&address) else {
                continue;
            };
            if object.is_self_destructed() {
                keeper.delete_account(address)?;
                continue;
            }
            if object.is_dirty_code() && !object.account.has_empty_code_hash() {
                let code = object.code(&**keeper).clone();
                keeper.set_code(object.account.code_hash, code);
            }
            keeper.set_account(address, object.account.clone())?;
            let mut slots: Vec<(B256, B256)> = object
                .dirty_storage()
                .iter()
                .map(|(key, value)| (*key, *value))
                .collect();
            slots.sort_unstable_by_key(|(key, _)| *key);
            for (key, value) in slots {
                if value.is_zero() {
                    keeper.delete_state(address, key);
                } else {
                    keeper.set_state(address, key, value);
                }
            }
        }
        trace!(accounts = written, "committed state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryKeeper;
    use primitives::address;

    const ADDR: Address = address!("0x00000000000000000000000000000000000000d1");

    #[test]
    fn zero_balance_change_does_not_journal() {
        let mut keeper = InMemoryKeeper::new();
        let mut state = StateDB::new(&mut keeper, TxConfig::default());
        state.add_balance(ADDR, U256::ZERO);
        state.sub_balance(ADDR, U256::ZERO);
        assert_eq!(state.journal_entries(), 0);

        state.add_balance(ADDR, U256::from(1));
        // CreateObject plus the balance change itself.
        assert_eq!(state.journal_entries(), 2);
    }

    #[test]
    fn set_state_journals_same_value_writes() {
        let mut keeper = InMemoryKeeper::new();
        let mut state = StateDB::new(&mut keeper, TxConfig::default());
        let value = B256::with_last_byte(1);
        state.set_state(ADDR, B256::ZERO, value);
        let before = state.journal_entries();
        state.set_state(ADDR, B256::ZERO, value);
        assert_eq!(state.journal_entries(), before + 1);
    }

    #[test]
    fn sub_balance_saturates_at_zero() {
        let mut keeper = InMemoryKeeper::new();
        let mut state = StateDB::new(&mut keeper, TxConfig::default());
        state.add_balance(ADDR, U256::from(5));
        state.sub_balance(ADDR, U256::from(9));
        assert_eq!(state.balance(ADDR), U256::ZERO);
    }

    #[test]
    #[should_panic(expected = "refund counter below zero")]
    fn sub_refund_past_zero_panics() {
        let mut keeper = InMemoryKeeper::new();
        let mut state = StateDB::new(&mut keeper, TxConfig::default());
        state.add_refund(3);
        state.sub_refund(4);
    }

    #[test]
    #[should_panic(expected = "revision id 7 cannot be reverted")]
    fn unknown_snapshot_panics() {
        let mut keeper = InMemoryKeeper::new();
        let mut state = StateDB::new(&mut keeper, TxConfig::default());
        state.revert_to_snapshot(7);
    }

    #[test]
    fn log_index_continues_from_tx_config() {
        let mut keeper = InMemoryKeeper::new();
        let config = TxConfig::new(B256::with_last_byte(1), B256::with_last_byte(2), 3, 10);
        let mut state = StateDB::new(&mut keeper, config);
        state.add_log(Log::new_unchecked(ADDR, vec![], Bytes::new()));
        state.add_log(Log::new_unchecked(ADDR, vec![], Bytes::new()));
        assert_eq!(state.logs()[0].log_index, 10);
        assert_eq!(state.logs()[1].log_index, 11);
        assert_eq!(state.logs()[1].tx_index, 3);
    }
}
