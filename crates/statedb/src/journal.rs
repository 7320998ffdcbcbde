use crate::{AccessList, StateObject};
use primitives::{Address, Bytes, HashMap, B256, U256};

/// One reversible state mutation.
///
/// Every entry stores the previous value of whatever it changed so that
/// [`Journal::revert`] can restore it exactly, newest first.
#[derive(Debug, Clone)]
pub enum JournalEntry {
    /// A state object was materialized for an account absent from the
    /// keeper.
    CreateObject { address: Address },
    /// An existing state object was replaced wholesale, as `CREATE` over a
    /// funded account does.
    ResetObject {
        address: Address,
        prev: Box<StateObject>,
    },
    /// The account was marked self-destructed and its balance zeroed.
    SelfDestruct {
        address: Address,
        prev_destructed: bool,
        prev_balance: U256,
    },
    /// Balance change.
    Balance { address: Address, prev: U256 },
    /// Nonce change.
    Nonce { address: Address, prev: u64 },
    /// Dirty-storage write; `prev` is `None` when the slot had no dirty
    /// value before, in which case revert removes it again.
    Storage {
        address: Address,
        key: B256,
        prev: Option<B256>,
    },
    /// Code assignment.
    Code {
        address: Address,
        prev_code: Option<Bytes>,
        prev_hash: B256,
        prev_dirty: bool,
    },
    /// Refund counter change.
    Refund { prev: u64 },
    /// A log was appended.
    Log,
    /// An address was newly warmed.
    AccessListAddAccount { address: Address },
    /// A slot was newly warmed. The address itself, if also newly warmed,
    /// gets its own entry.
    AccessListAddSlot { address: Address, slot: B256 },
    /// The account was marked as a contract created in this transaction.
    NewContract { address: Address },
}

impl JournalEntry {
    /// The account this entry dirties for commit purposes, if any.
    ///
    /// Access-list and log entries are transaction-scoped bookkeeping and
    /// never make an account eligible for commit.
    pub fn dirtied(&self) -> Option<Address> {
        match self {
            Self::CreateObject { address }
            | Self::ResetObject { address, .. }
            | Self::SelfDestruct { address, .. }
            | Self::Balance { address, .. }
            | Self::Nonce { address, .. }
            | Self::Storage { address, .. }
            | Self::Code { address, .. }
            | Self::NewContract { address } => Some(*address),
            Self::Refund { .. }
            | Self::Log
            | Self::AccessListAddAccount { .. }
            | Self::AccessListAddSlot { .. } => None,
        }
    }
}

/// Undo log of the [`StateDB`](crate::StateDB).
///
/// Entries are appended in execution order and undone in reverse on revert.
/// The journal also counts, per account, how many entries dirtied it; an
/// account with a nonzero count at commit time is written back to the
/// keeper.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    dirties: HashMap<Address, usize>,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries recorded so far. Snapshots are indices into this
    /// sequence.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records an entry.
    pub fn append(&mut self, entry: JournalEntry) {
        if let Some(address) = entry.dirtied() {
            *self.dirties.entry(address).or_insert(0) += 1;
        }
        self.entries.push(entry);
    }

    /// Accounts dirtied by at least one live entry, in address order.
    pub fn dirty_addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self
            .dirties
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(address, _)| *address)
            .collect();
        addresses.sort_unstable();
        addresses
    }

    /// Undoes every entry recorded at or after `snapshot`, newest first,
    /// applying each one to the state it guards.
    pub fn revert(
        &mut self,
        snapshot: usize,
        objects: &mut HashMap<Address, StateObject>,
        access_list: &mut AccessList,
        logs: &mut Vec<crate::TxLog>,
        refund: &mut u64,
    ) {
        for entry in self.entries.drain(snapshot..).rev() {
            if let Some(address) = entry.dirtied() {
                if let Some(count) = self.dirties.get_mut(&address) {
                    *count = count.saturating_sub(1);
                }
            }
            match entry {
                JournalEntry::CreateObject { address } => {
                    objects.remove(&address);
                }
                JournalEntry::ResetObject { address, prev } => {
                    objects.insert(address, *prev);
                }
                JournalEntry::SelfDestruct {
                    address,
                    prev_destructed,
                    prev_balance,
                } => {
                    if let Some(object) = objects.get_mut(&address) {
                        object.set_self_destructed(prev_destructed);
                        object.account.balance = prev_balance;
                    }
                }
                JournalEntry::Balance { address, prev } => {
                    if let Some(object) = objects.get_mut(&address) {
                        object.account.balance = prev;
                    }
                }
                JournalEntry::Nonce { address, prev } => {
                    if let Some(object) = objects.get_mut(&address) {
                        object.account.nonce = prev;
                    }
                }
                JournalEntry::Storage { address, key, prev } => {
                    if let Some(object) = objects.get_mut(&address) {
                        match prev {
                            Some(value) => {
                                object.set_state(key, value);
                            }
                            None => object.remove_dirty_state(key),
                        }
                    }
                }
                JournalEntry::Code {
                    address,
                    prev_code,
                    prev_hash,
                    prev_dirty,
                } => {
                    if let Some(object) = objects.get_mut(&address) {
                        object.restore_code(prev_hash, prev_code, prev_dirty);
                    }
                }
                JournalEntry::Refund { prev } => {
                    *refund = prev;
                }
                JournalEntry::Log => {
                    logs.pop();
                }
                JournalEntry::AccessListAddAccount { address } => {
                    access_list.remove_address(address);
                }
                JournalEntry::AccessListAddSlot { address, slot } => {
                    access_list.remove_slot(address, slot);
                }
                JournalEntry::NewContract { address } => {
                    if let Some(object) = objects.get_mut(&address) {
                        object.set_new_contract(false);
                    }
                }
            }
        }
    }
}
