use crate::Account;
use auto_impl::auto_impl;
use primitives::{Address, Bytes, B256, KECCAK_EMPTY};

/// Error raised by a [`Keeper`] on a failed store operation.
///
/// Keepers sit on top of an opaque multi-store; their failures carry no
/// structure the execution core could act on, so the error is a message. Any
/// keeper error aborts the surrounding commit wholesale.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("keeper: {0}")]
pub struct KeeperError(pub String);

impl KeeperError {
    /// Creates a new keeper error from any displayable cause.
    pub fn new(cause: impl core::fmt::Display) -> Self {
        Self(cause.to_string())
    }
}

/// Persistent store boundary of the execution core.
///
/// Implementations are already bound to a chain context (block height and
/// time); the execution core never passes one explicitly. Code is stored
/// content-addressed by its hash, storage slots are keyed by address and
/// slot key.
#[auto_impl(&mut, Box)]
pub trait Keeper {
    /// Returns the account stored at `address`, if any.
    fn account(&self, address: Address) -> Option<Account>;

    /// Writes `account` at `address`.
    fn set_account(&mut self, address: Address, account: Account) -> Result<(), KeeperError>;

    /// Removes the account at `address` together with its storage.
    fn delete_account(&mut self, address: Address) -> Result<(), KeeperError>;

    /// Returns the committed value of a storage slot, zero when unset.
    fn state(&self, address: Address, key: B256) -> B256;

    /// Writes a storage slot.
    fn set_state(&mut self, address: Address, key: B256, value: B256);

    /// Deletes a storage slot.
    fn delete_state(&mut self, address: Address, key: B256);

    /// Returns the code stored under `code_hash`, empty when unknown.
    fn code(&self, code_hash: B256) -> Bytes;

    /// Stores `code` under `code_hash`.
    fn set_code(&mut self, code_hash: B256, code: Bytes);

    /// Deletes the code stored under `code_hash`.
    fn delete_code(&mut self, code_hash: B256);

    /// Iterates the committed storage of `address` until the callback
    /// returns `false`.
    fn for_each_storage(&self, address: Address, f: &mut dyn FnMut(B256, B256) -> bool);

    /// Returns the code hash of the account at `address`,
    /// [`KECCAK_EMPTY`] for accounts without one.
    fn code_hash(&self, address: Address) -> B256 {
        self.account(address)
            .map(|account| account.code_hash)
            .unwrap_or(KECCAK_EMPTY)
    }
}
