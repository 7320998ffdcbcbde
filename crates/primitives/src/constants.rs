//! Protocol-level constants.

use alloy_primitives::{b256, B256};

/// Keccak-256 hash of the empty byte string, the code hash of every account
/// without code.
pub const KECCAK_EMPTY: B256 =
    b256!("0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

/// Maximum size of deployed contract code, introduced by EIP-170.
pub const MAX_CODE_SIZE: usize = 0x6000;

/// Maximum size of contract creation init code, introduced by EIP-3860.
pub const MAX_INITCODE_SIZE: usize = 2 * MAX_CODE_SIZE;
