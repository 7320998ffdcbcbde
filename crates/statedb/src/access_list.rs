use primitives::{Address, HashMap, HashSet, B256};

/// Per-transaction warm set of EIP-2929.
///
/// Tracks which accounts and storage slots the current transaction has
/// touched. Membership is monotone during execution; removal exists only so
/// the journal can undo additions on revert.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    addresses: HashMap<Address, HashSet<B256>>,
}

impl AccessList {
    /// Creates an empty access list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `address` is warm.
    pub fn contains_address(&self, address: Address) -> bool {
        self.addresses.contains_key(&address)
    }

    /// Whether `address` and its `slot` are warm, as
    /// `(address_present, slot_present)`.
    pub fn contains(&self, address: Address, slot: B256) -> (bool, bool) {
        match self.addresses.get(&address) {
            Some(slots) => (true, slots.contains(&slot)),
            None => (false, false),
        }
    }

    /// Marks `address` warm. Returns whether it was newly added.
    pub fn add_address(&mut self, address: Address) -> bool {
        match self.addresses.entry(address) {
            primitives::map::Entry::Occupied(_) => false,
            primitives::map::Entry::Vacant(entry) => {
                entry.insert(HashSet::default());
                true
            }
        }
    }

    /// Marks `slot` of `address` warm, warming the address itself if needed.
    /// Returns `(address_added, slot_added)`.
    pub fn add_slot(&mut self, address: Address, slot: B256) -> (bool, bool) {
        match self.addresses.entry(address) {
            primitives::map::Entry::Occupied(mut entry) => {
                (false, entry.get_mut().insert(slot))
            }
            primitives::map::Entry::Vacant(entry) => {
                entry.insert(HashSet::from_iter([slot]));
                (true, true)
            }
        }
    }

    /// Removes `slot` from `address`. Journal use only.
    pub fn remove_slot(&mut self, address: Address, slot: B256) {
        if let Some(slots) = self.addresses.get_mut(&address) {
            slots.remove(&slot);
        }
    }

    /// Removes `address` and all its slots. Journal use only.
    pub fn remove_address(&mut self, address: Address) {
        self.addresses.remove(&address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitives::address;

    const ADDR: Address = address!("0x00000000000000000000000000000000000000aa");

    #[test]
    fn add_address_is_idempotent() {
        let mut list = AccessList::new();
        assert!(list.add_address(ADDR));
        assert!(!list.add_address(ADDR));
        assert!(list.contains_address(ADDR));
    }

    #[test]
    fn add_slot_warms_address() {
        let mut list = AccessList::new();
        let slot = B256::with_last_byte(1);
        assert_eq!(list.add_slot(ADDR, slot), (true, true));
        assert_eq!(list.add_slot(ADDR, slot), (false, false));
        assert_eq!(list.add_slot(ADDR, B256::with_last_byte(2)), (false, true));
        assert_eq!(list.contains(ADDR, slot), (true, true));
    }

    #[test]
    fn removal_undoes_additions() {
        let mut list = AccessList::new();
        let slot = B256::with_last_byte(1);
        list.add_slot(ADDR, slot);
        list.remove_slot(ADDR, slot);
        assert_eq!(list.contains(ADDR, slot), (true, false));
        list.remove_address(ADDR);
        assert!(!list.contains_address(ADDR));
    }
}
