//! EIP-7702 delegation designators.
//!
//! An externally owned account that has authorized a delegation carries the
//! marker code `0xef0100 || address`. Execution against such an account loads
//! the code of the delegated-to address instead.

use alloy_primitives::{Address, Bytes};

/// Prefix of a delegation designator.
pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

/// Total length of a delegation designator (prefix + address).
pub const DELEGATION_CODE_LEN: usize = 23;

/// Returns the delegation target if `code` is a delegation designator.
pub fn parse_delegation(code: &[u8]) -> Option<Address> {
    if code.len() != DELEGATION_CODE_LEN || code[..3] != DELEGATION_PREFIX {
        return None;
    }
    Some(Address::from_slice(&code[3..]))
}

/// Builds the delegation designator pointing at `target`.
pub fn delegation_code(target: Address) -> Bytes {
    let mut code = Vec::with_capacity(DELEGATION_CODE_LEN);
    code.extend_from_slice(&DELEGATION_PREFIX);
    code.extend_from_slice(target.as_slice());
    code.into()
}
