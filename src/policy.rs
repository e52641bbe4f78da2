// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Destination access control.
//!
//! Evaluation order:
//! 1. a deny-list hit is always denied
//! 2. with the allow-list enabled, anything not on it is denied
//!    (an enabled, empty allow-list denies everything)
//! 3. otherwise the destination is allowed
//!
//! A contract creation has no destination to check. Creations that carry
//! value are refused while the allow-list is enabled.

use std::fmt;

use alloy::primitives::{Address, U256};

use crate::error::{CustodyError, CustodyResult};
use crate::storage::Account;

/// Why a destination was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Blacklisted,
    NotWhitelisted,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Blacklisted => f.write_str("destination is blacklisted"),
            DenyReason::NotWhitelisted => f.write_str("destination is not whitelisted"),
        }
    }
}

/// Result of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Allowed,
    Denied(DenyReason),
}

/// Evaluate `destination` against the account's lists.
pub fn evaluate(account: &Account, destination: &Address) -> PolicyDecision {
    if account.deny_list.contains(destination) {
        return PolicyDecision::Denied(DenyReason::Blacklisted);
    }
    if account.allow_list_enabled && !account.allow_list.contains(destination) {
        return PolicyDecision::Denied(DenyReason::NotWhitelisted);
    }
    PolicyDecision::Allowed
}

/// Like [`evaluate`], but a denial becomes [`CustodyError::AccessDenied`].
pub fn validate(account: &Account, destination: &Address) -> CustodyResult<()> {
    match evaluate(account, destination) {
        PolicyDecision::Allowed => Ok(()),
        PolicyDecision::Denied(reason) => {
            tracing::warn!(account = %account.name, to = %destination, %reason, "Destination refused");
            Err(CustodyError::AccessDenied(format!("{destination}: {reason}")))
        }
    }
}

/// Check a contract creation carrying `value` wei.
pub fn validate_creation(account: &Account, value: U256) -> CustodyResult<()> {
    if value.is_zero() || !account.allow_list_enabled {
        return Ok(());
    }
    let reason = DenyReason::NotWhitelisted;
    tracing::warn!(account = %account.name, %value, %reason, "Contract creation with value refused");
    Err(CustodyError::AccessDenied(format!(
        "contract creation with value: {reason}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use chrono::Utc;
    use std::collections::BTreeSet;

    const A: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
    const B: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

    fn account(allow: &[Address], deny: &[Address], enabled: bool) -> Account {
        Account {
            name: "policy".to_string(),
            index: 0,
            address: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            allow_list: allow.iter().copied().collect::<BTreeSet<_>>(),
            deny_list: deny.iter().copied().collect::<BTreeSet<_>>(),
            allow_list_enabled: enabled,
            initialized: true,
            nonce: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn open_account_allows_anything() {
        assert_eq!(evaluate(&account(&[], &[], false), &A), PolicyDecision::Allowed);
    }

    #[test]
    fn deny_beats_allow() {
        let acct = account(&[A], &[A], true);
        assert_eq!(
            evaluate(&acct, &A),
            PolicyDecision::Denied(DenyReason::Blacklisted)
        );
    }

    #[test]
    fn enabled_allow_list_restricts() {
        let acct = account(&[A], &[], true);
        assert_eq!(evaluate(&acct, &A), PolicyDecision::Allowed);
        assert_eq!(
            evaluate(&acct, &B),
            PolicyDecision::Denied(DenyReason::NotWhitelisted)
        );
    }

    #[test]
    fn empty_enabled_allow_list_denies_everything() {
        let acct = account(&[], &[], true);
        assert!(matches!(evaluate(&acct, &A), PolicyDecision::Denied(_)));
        assert!(matches!(evaluate(&acct, &B), PolicyDecision::Denied(_)));
    }

    #[test]
    fn disabled_allow_list_is_ignored() {
        let acct = account(&[A], &[], false);
        assert_eq!(evaluate(&acct, &B), PolicyDecision::Allowed);
    }

    #[test]
    fn value_bearing_creation_needs_open_account() {
        let one = U256::from(1u64);
        assert!(validate_creation(&account(&[], &[], false), one).is_ok());
        assert!(validate_creation(&account(&[A], &[], true), U256::ZERO).is_ok());

        let err = validate_creation(&account(&[A], &[], true), one).unwrap_err();
        assert_eq!(err.kind(), "access_denied");
        assert!(validate_creation(&account(&[], &[], true), one).is_err());
    }

    #[test]
    fn validate_maps_to_access_denied() {
        let acct = account(&[], &[B], false);
        assert!(validate(&acct, &A).is_ok());
        let err = validate(&acct, &B).unwrap_err();
        assert_eq!(err.kind(), "access_denied");
    }
}
