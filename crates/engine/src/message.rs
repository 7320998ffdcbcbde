use alloy_eip2930::AccessList;
use alloy_eip7702::SignedAuthorization;
use primitives::{Address, Bytes, U256};

/// A decoded Ethereum message, ready for application.
///
/// Covers legacy, access-list, dynamic-fee and set-code transactions: the
/// fee fields are already collapsed to one effective gas price by the
/// admission layer, and `authorizations` is empty for everything but
/// EIP-7702 transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Recovered sender.
    pub from: Address,
    /// Destination; `None` is a contract creation.
    pub to: Option<Address>,
    /// Sender nonce declared by the transaction.
    pub nonce: u64,
    /// Transferred value.
    pub value: U256,
    /// Gas limit of the transaction.
    pub gas_limit: u64,
    /// Effective gas price.
    pub gas_price: U256,
    /// Calldata or init code.
    pub data: Bytes,
    /// EIP-2930 access list.
    pub access_list: AccessList,
    /// EIP-7702 authorization tuples, in order.
    pub authorizations: Vec<SignedAuthorization>,
}

impl Message {
    /// Plain call message with empty calldata and default gas fields.
    pub fn call(from: Address, to: Address, value: U256) -> Self {
        Self {
            from,
            to: Some(to),
            nonce: 0,
            value,
            gas_limit: 0,
            gas_price: U256::ZERO,
            data: Bytes::new(),
            access_list: AccessList::default(),
            authorizations: Vec::new(),
        }
    }

    /// Contract-creation message carrying `init_code`.
    pub fn create(from: Address, value: U256, init_code: Bytes) -> Self {
        Self {
            from,
            to: None,
            nonce: 0,
            value,
            gas_limit: 0,
            gas_price: U256::ZERO,
            data: init_code,
            access_list: AccessList::default(),
            authorizations: Vec::new(),
        }
    }

    /// Whether this message deploys a contract.
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }
}
