//! Primitive types shared by the cosmevm execution core.
//!
//! Re-exports the alloy primitive types the rest of the workspace builds on,
//! together with the chain configuration (hard-fork schedule) and the
//! EIP-7702 delegation-designator helpers.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod constants;
pub mod eip7702;
pub mod hardfork;

pub use constants::KECCAK_EMPTY;
pub use eip7702::{delegation_code, parse_delegation, DELEGATION_PREFIX};
pub use hardfork::{ChainConfig, ForkRules};

// Re-export of the underlying primitive types so that downstream crates only
// name this crate.
pub use alloy_primitives::{
    self, address, b256, bytes, map,
    map::{HashMap, HashSet},
    Address, Bloom, Bytes, Log, LogData, B256, U256,
};
pub use alloy_primitives::{hex, keccak256};
