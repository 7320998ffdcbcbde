//! Ethereum-style account and storage view backed by a chain keeper.
//!
//! [`StateDB`] is the per-transaction mutable overlay the EVM executes
//! against: balances, nonces, code, storage slots, the EIP-2929 access list,
//! logs and the refund counter all live here, guarded by an undo [`Journal`]
//! that makes [`StateDB::snapshot`] / [`StateDB::revert_to_snapshot`] exact.
//! Nothing reaches the persistent [`Keeper`] until [`StateDB::commit`].
//!
//! [`CachedKeeper`] provides the transactional isolation layer above the
//! keeper itself: a buffered overlay whose writes only become visible to the
//! parent keeper when it is explicitly flushed.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod access_list;
mod account;
mod cached;
mod in_memory;
mod journal;
mod keeper;
mod state_object;
mod statedb;
mod tx_config;

pub use access_list::AccessList;
pub use account::Account;
pub use cached::CachedKeeper;
pub use in_memory::InMemoryKeeper;
pub use journal::{Journal, JournalEntry};
pub use keeper::{Keeper, KeeperError};
pub use state_object::{ObjectFlags, StateObject, Storage};
pub use statedb::StateDB;
pub use tx_config::{TxConfig, TxLog};
