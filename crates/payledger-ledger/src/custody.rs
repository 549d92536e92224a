//! Custody conservation checker.
//!
//! Invariant enforced over committed state:
//! ```text
//! ∀ asset: Σ(balance of accounts denominated in asset)
//!            == deposited - withdrawn - settled
//! ```
//!
//! Settlement debits leave the ledger toward the payee, so they count
//! against custody exactly like withdrawals do.

use std::collections::{BTreeSet, HashMap};

use payledger_types::{Amount, AssetId, LedgerError, Result};

/// One movement of units into or out of ledger custody.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustodyEntry {
    Deposited(AssetId, Amount),
    Withdrawn(AssetId, Amount),
    Settled(AssetId, Amount),
}

/// Running per-asset custody totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CustodyTotals {
    pub deposited: Amount,
    pub withdrawn: Amount,
    pub settled: Amount,
}

impl CustodyTotals {
    /// Units that should still be held: `deposited - withdrawn - settled`.
    /// `None` if more left custody than ever entered it.
    #[must_use]
    pub fn expected_held(&self) -> Option<Amount> {
        self.deposited
            .checked_sub(self.withdrawn)?
            .checked_sub(self.settled)
    }
}

/// Tracks per-asset custody movements and validates them against balances.
#[derive(Debug, Default)]
pub struct CustodyAudit {
    totals: HashMap<AssetId, CustodyTotals>,
}

impl CustodyAudit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed custody movement.
    pub fn apply(&mut self, entry: &CustodyEntry) {
        match entry {
            CustodyEntry::Deposited(asset, amount) => {
                let totals = self.totals.entry(asset.clone()).or_default();
                totals.deposited = totals.deposited.saturating_add(*amount);
            }
            CustodyEntry::Withdrawn(asset, amount) => {
                let totals = self.totals.entry(asset.clone()).or_default();
                totals.withdrawn = totals.withdrawn.saturating_add(*amount);
            }
            CustodyEntry::Settled(asset, amount) => {
                let totals = self.totals.entry(asset.clone()).or_default();
                totals.settled = totals.settled.saturating_add(*amount);
            }
        }
    }

    #[must_use]
    pub fn totals(&self, asset: &AssetId) -> CustodyTotals {
        self.totals.get(asset).copied().unwrap_or_default()
    }

    /// All assets that ever moved through custody, in sorted order.
    #[must_use]
    pub fn tracked_assets(&self) -> BTreeSet<AssetId> {
        self.totals.keys().cloned().collect()
    }

    /// Verify that `actual_held` (sum of balances in `asset`) matches the
    /// recorded movements.
    ///
    /// # Errors
    /// Returns [`LedgerError::CustodyInvariantViolation`] on mismatch.
    pub fn verify(&self, asset: &AssetId, actual_held: Amount) -> Result<()> {
        let totals = self.totals(asset);
        if totals.expected_held() != Some(actual_held) {
            return Err(LedgerError::CustodyInvariantViolation {
                reason: format!(
                    "Asset {asset}: held {actual_held} != expected {:?} \
                     (deposited={}, withdrawn={}, settled={})",
                    totals.expected_held(),
                    totals.deposited,
                    totals.withdrawn,
                    totals.settled,
                ),
            });
        }
        Ok(())
    }
}
