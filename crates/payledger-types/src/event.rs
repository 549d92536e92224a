//! Notifications emitted by the ledger after a committed mutation.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, AssetId, Timestamp};

/// An observable ledger notification.
///
/// Events are only delivered once the operation that produced them has
/// fully committed. An aborted operation emits nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEvent {
    /// The balance of `account`, denominated in `asset`, changed.
    BalanceChanged { asset: AssetId, account: AccountId },
    /// One batch-settlement entry moved funds from `sender` to `payee`.
    PaymentSettled {
        bill_date: Timestamp,
        asset: AssetId,
        sender: AccountId,
        payee: AccountId,
        amount: Amount,
    },
}

impl LedgerEvent {
    /// The account whose balance the event concerns.
    #[must_use]
    pub fn account(&self) -> AccountId {
        match self {
            Self::BalanceChanged { account, .. } => *account,
            Self::PaymentSettled { sender, .. } => *sender,
        }
    }

    #[must_use]
    pub fn asset(&self) -> &AssetId {
        match self {
            Self::BalanceChanged { asset, .. } | Self::PaymentSettled { asset, .. } => asset,
        }
    }
}

impl std::fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BalanceChanged { asset, account } => {
                write!(f, "BALANCE_CHANGED {account} {asset}")
            }
            Self::PaymentSettled {
                asset,
                sender,
                payee,
                amount,
                ..
            } => write!(f, "PAYMENT_SETTLED {sender} -> {payee} {amount} {asset}"),
        }
    }
}
