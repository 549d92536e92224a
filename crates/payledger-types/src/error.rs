//! Error types for the PayLedger custodial ledger.
//!
//! All errors use the `PL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Lifecycle / guard errors
//! - 2xx: Balance errors
//! - 3xx: Policy errors (pause, allowlist, time lock)
//! - 4xx: Authorization errors
//! - 5xx: Transfer adapter errors
//! - 9xx: General / internal errors
//!
//! Every error aborts the operation that raised it and leaves ledger state
//! exactly as it was before the call.

use thiserror::Error;

use crate::{Amount, AssetId, Timestamp};

/// Central error enum for all PayLedger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // =================================================================
    // Lifecycle / Guard Errors (1xx)
    // =================================================================
    /// A mutating operation is already in flight.
    #[error("PL_ERR_100: Reentrant call rejected: another ledger operation is in flight")]
    Reentrant,

    /// `initialize` was called more than once.
    #[error("PL_ERR_101: Ledger already initialized")]
    AlreadyInitialized,

    /// A mutating operation ran before `initialize`.
    #[error("PL_ERR_102: Ledger not initialized")]
    NotInitialized,

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// A debit would drive a balance below zero.
    #[error("PL_ERR_200: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    /// A credit would exceed the representable range.
    #[error("PL_ERR_201: Arithmetic overflow")]
    Overflow,

    /// A positive amount was required.
    #[error("PL_ERR_202: Invalid amount: must be greater than zero")]
    InvalidAmount,

    // =================================================================
    // Policy Errors (3xx)
    // =================================================================
    /// The system-wide pause flag is set.
    #[error("PL_ERR_300: Ledger is paused")]
    Paused,

    /// The asset is not on the supported-asset allowlist.
    #[error("PL_ERR_301: Unsupported asset: {0}")]
    UnsupportedAsset(AssetId),

    /// The account's release time has not been reached yet.
    #[error("PL_ERR_302: Withdrawal locked until {release_time} (now {now})")]
    WithdrawalLocked {
        release_time: Timestamp,
        now: Timestamp,
    },

    // =================================================================
    // Authorization Errors (4xx)
    // =================================================================
    /// The caller is not an authorized manager.
    #[error("PL_ERR_400: Permission denied: caller is not a manager")]
    PermissionDenied,

    // =================================================================
    // Transfer Errors (5xx)
    // =================================================================
    /// The asset transfer adapter rejected a transfer.
    #[error("PL_ERR_500: Transfer of {asset} failed: {reason}")]
    TransferFailed { asset: AssetId, reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Custody accounting no longer matches account balances.
    #[error("PL_ERR_900: Custody invariant violation: {reason}")]
    CustodyInvariantViolation { reason: String },

    /// Configuration error (invalid settings file, missing fields, etc.).
    #[error("PL_ERR_901: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("PL_ERR_902: Serialization error: {0}")]
    Serialization(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let msg = format!("{}", LedgerError::Reentrant);
        assert!(msg.starts_with("PL_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn insufficient_balance_display() {
        let err = LedgerError::InsufficientBalance {
            needed: 999_999,
            available: 5,
        };
        let msg = format!("{err}");
        assert!(msg.contains("PL_ERR_200"));
        assert!(msg.contains("999999"));
        assert!(msg.contains('5'));
    }

    #[test]
    fn unsupported_asset_names_the_asset() {
        let msg = format!("{}", LedgerError::UnsupportedAsset(AssetId::new("DOGE")));
        assert!(msg.contains("PL_ERR_301"));
        assert!(msg.contains("DOGE"));
    }

    #[test]
    fn all_errors_have_pl_err_prefix() {
        let errors = vec![
            LedgerError::AlreadyInitialized,
            LedgerError::NotInitialized,
            LedgerError::Overflow,
            LedgerError::InvalidAmount,
            LedgerError::Paused,
            LedgerError::PermissionDenied,
            LedgerError::WithdrawalLocked {
                release_time: Timestamp::default(),
                now: Timestamp::default(),
            },
            LedgerError::TransferFailed {
                asset: AssetId::new("USDC"),
                reason: "rejected".into(),
            },
            LedgerError::Configuration("bad".into()),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("PL_ERR_"),
                "Error missing PL_ERR_ prefix: {msg}"
            );
        }
    }

    #[test]
    fn json_error_converts_to_serialization() {
        let err: LedgerError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, LedgerError::Serialization(_)));
    }
}
