//! EIP-7702 set-code authorization processing.
//!
//! Authorization tuples ride on a message and are applied in order before
//! the call executes. An invalid tuple is skipped, never fatal: the message
//! proceeds without that delegation. Each tuple yields an explicit
//! [`AuthorizationResult`] so skips are observable without log scraping.

use crate::gas::{CALL_NEW_ACCOUNT_GAS, TX_AUTH_TUPLE_GAS};
use alloy_eip7702::SignedAuthorization;
use primitives::{delegation_code, parse_delegation, Address, Bytes, U256};
use statedb::StateDB;
use tracing::debug;

/// Why an authorization tuple was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkippedReason {
    /// Chain id is neither zero (wildcard) nor the executing chain's.
    #[error("invalid chain id")]
    ChainId,
    /// The authorization nonce cannot be incremented.
    #[error("nonce uint64 overflow")]
    NonceOverflow,
    /// Signature recovery failed.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// The authority already holds ordinary contract code.
    #[error("authority has non-delegation code")]
    AuthorityHasCode,
    /// The authority's account nonce does not match the tuple.
    #[error("authorization nonce mismatch")]
    NonceMismatch,
}

/// Outcome of one authorization tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult {
    /// The delegation (or its removal) was installed for `authority`.
    Applied { authority: Address },
    /// The tuple was ignored.
    Skipped(SkippedReason),
}

impl AuthorizationResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Validates and applies one tuple against the state.
fn process_authorization(
    state: &mut StateDB<'_>,
    chain_id: u64,
    authorization: &SignedAuthorization,
) -> AuthorizationResult {
    if !authorization.chain_id.is_zero() && authorization.chain_id != U256::from(chain_id) {
        return AuthorizationResult::Skipped(SkippedReason::ChainId);
    }
    if authorization.nonce == u64::MAX {
        return AuthorizationResult::Skipped(SkippedReason::NonceOverflow);
    }
    let authority = match authorization.recover_authority() {
        Ok(authority) => authority,
        Err(err) => {
            return AuthorizationResult::Skipped(SkippedReason::InvalidSignature(err.to_string()))
        }
    };

    // The authority is warmed as soon as it is recoverable, even when the
    // tuple then fails the remaining checks.
    state.add_address_to_access_list(authority);

    let code = state.code(authority);
    if !code.is_empty() && parse_delegation(&code).is_none() {
        return AuthorizationResult::Skipped(SkippedReason::AuthorityHasCode);
    }
    if state.nonce(authority) != authorization.nonce {
        return AuthorizationResult::Skipped(SkippedReason::NonceMismatch);
    }

    // Intrinsic gas charged for a fresh account; give the difference back
    // when the authority already exists.
    if state.exist(authority) {
        state.add_refund(CALL_NEW_ACCOUNT_GAS - TX_AUTH_TUPLE_GAS);
    }
    state.set_nonce(authority, authorization.nonce + 1);

    if authorization.address == Address::ZERO {
        state.set_code(authority, Bytes::new());
    } else {
        state.set_code(authority, delegation_code(authorization.address));
    }
    AuthorizationResult::Applied { authority }
}

/// Applies every tuple of a message in order, skipping invalid ones.
pub fn apply_authorization_list(
    state: &mut StateDB<'_>,
    chain_id: u64,
    authorizations: &[SignedAuthorization],
) -> Vec<AuthorizationResult> {
    authorizations
        .iter()
        .enumerate()
        .map(|(index, authorization)| {
            let result = process_authorization(state, chain_id, authorization);
            if let AuthorizationResult::Skipped(reason) = &result {
                debug!(index, %reason, "skipped set-code authorization");
            }
            result
        })
        .collect()
}
