//! Per-account custody record.
//!
//! Every account holds a balance in at most one asset at a time, plus the
//! earliest time at which that balance may be withdrawn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AssetId;

/// Units of an asset. Arithmetic on amounts is always checked.
pub type Amount = u128;

/// Logical time as supplied by the host environment's clock.
pub type Timestamp = DateTime<Utc>;

/// The environment's time-zero (the Unix epoch). A release time equal to
/// this value is always withdrawable.
#[must_use]
pub fn time_zero() -> Timestamp {
    Timestamp::default()
}

/// The ledger's record for one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountRecord {
    /// The asset the balance is denominated in. Unset until first deposit.
    pub selected_asset: Option<AssetId>,
    /// Units of `selected_asset` held in custody for this account.
    pub balance: Amount,
    /// Earliest time at which a withdrawal may succeed.
    pub release_time: Timestamp,
}

impl AccountRecord {
    /// A fresh record: no asset, zero balance, withdrawable immediately.
    #[must_use]
    pub fn new() -> Self {
        Self {
            selected_asset: None,
            balance: 0,
            release_time: time_zero(),
        }
    }

    /// Whether the account holds no funds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balance == 0
    }

    /// Whether a deposit of `asset` would require switching away from a
    /// funded balance in another asset.
    #[must_use]
    pub fn requires_switch(&self, asset: &AssetId) -> bool {
        self.balance > 0 && self.selected_asset.as_ref() != Some(asset)
    }
}

impl Default for AccountRecord {
    fn default() -> Self {
        Self::new()
    }
}
