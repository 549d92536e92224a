//! In-memory fungible asset adapter.
//!
//! Holds per-(asset, holder) balances and moves them the way a standard
//! fungible token does: a transfer either completes or fails without
//! side effects. Supports one-shot failure injection and a hook that runs
//! before every transfer, which lets a host observe (or attempt to
//! re-enter) the ledger from inside a transfer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use payledger_types::{AccountId, Amount, AssetId, LedgerError, Result};

use crate::collaborators::{AssetTransferAdapter, TransferLeg};

/// A completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub asset: AssetId,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
}

/// Callback run before each transfer is applied.
pub type TransferHook = Arc<dyn Fn(&TransferRecord) + Send + Sync>;

/// Token balances for any number of assets, with one custodian account
/// that `transfer_out` pays from.
pub struct InMemoryAssets {
    custodian: AccountId,
    holdings: Mutex<HashMap<(AssetId, AccountId), Amount>>,
    journal: Mutex<Vec<TransferRecord>>,
    fail_next: Mutex<Option<String>>,
    hook: Mutex<Option<TransferHook>>,
}

impl InMemoryAssets {
    #[must_use]
    pub fn new(custodian: AccountId) -> Self {
        Self {
            custodian,
            holdings: Mutex::new(HashMap::new()),
            journal: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            hook: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn custodian(&self) -> AccountId {
        self.custodian
    }

    /// Create `amount` units of `asset` out of thin air for `holder`.
    ///
    /// # Errors
    /// Returns [`LedgerError::Overflow`] if the holder's balance would wrap.
    pub fn mint(&self, asset: &AssetId, holder: AccountId, amount: Amount) -> Result<()> {
        let mut holdings = lock(&self.holdings);
        let balance = holdings.entry((asset.clone(), holder)).or_default();
        *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    #[must_use]
    pub fn balance(&self, asset: &AssetId, holder: AccountId) -> Amount {
        lock(&self.holdings)
            .get(&(asset.clone(), holder))
            .copied()
            .unwrap_or(0)
    }

    /// Units of `asset` held by the custodian.
    #[must_use]
    pub fn custody(&self, asset: &AssetId) -> Amount {
        self.balance(asset, self.custodian)
    }

    /// Make the next transfer fail with `reason`.
    pub fn fail_next_transfer(&self, reason: impl Into<String>) {
        *lock(&self.fail_next) = Some(reason.into());
    }

    pub fn set_hook(&self, hook: TransferHook) {
        *lock(&self.hook) = Some(hook);
    }

    pub fn clear_hook(&self) {
        *lock(&self.hook) = None;
    }

    /// Every completed transfer, oldest first.
    #[must_use]
    pub fn transfers(&self) -> Vec<TransferRecord> {
        lock(&self.journal).clone()
    }

    fn move_units(&self, record: TransferRecord) -> Result<()> {
        self.move_all(vec![record])
    }

    /// Apply `records` as one unit: the hook and failure injection run for
    /// each record first, then every move is checked against a scratch view
    /// of the holdings before any of them lands.
    fn move_all(&self, records: Vec<TransferRecord>) -> Result<()> {
        for record in &records {
            let hook = lock(&self.hook).clone();
            if let Some(hook) = hook {
                hook(record);
            }
            if let Some(reason) = lock(&self.fail_next).take() {
                return Err(LedgerError::TransferFailed {
                    asset: record.asset.clone(),
                    reason,
                });
            }
        }

        let mut holdings = lock(&self.holdings);
        let mut staged: HashMap<(AssetId, AccountId), Amount> = HashMap::new();
        for record in &records {
            let from_key = (record.asset.clone(), record.from);
            let to_key = (record.asset.clone(), record.to);
            let current = |key: &(AssetId, AccountId)| {
                staged
                    .get(key)
                    .or_else(|| holdings.get(key))
                    .copied()
                    .unwrap_or(0)
            };
            let from_balance = current(&from_key);
            let to_balance = current(&to_key);

            let debited = from_balance
                .checked_sub(record.amount)
                .ok_or_else(|| LedgerError::TransferFailed {
                    asset: record.asset.clone(),
                    reason: format!(
                        "holder {} has {from_balance}, needs {}",
                        record.from, record.amount
                    ),
                })?;
            if record.from != record.to {
                let credited = to_balance
                    .checked_add(record.amount)
                    .ok_or_else(|| LedgerError::TransferFailed {
                        asset: record.asset.clone(),
                        reason: format!("holder {} balance would overflow", record.to),
                    })?;
                staged.insert(from_key, debited);
                staged.insert(to_key, credited);
            }
        }
        holdings.extend(staged);
        drop(holdings);

        for record in &records {
            tracing::debug!(
                asset = %record.asset,
                from = %record.from,
                to = %record.to,
                amount = %record.amount,
                "Asset transfer applied"
            );
        }
        lock(&self.journal).extend(records);
        Ok(())
    }
}

impl AssetTransferAdapter for InMemoryAssets {
    fn transfer_in(
        &self,
        asset: &AssetId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.move_units(TransferRecord {
            asset: asset.clone(),
            from,
            to,
            amount,
        })
    }

    fn transfer_out(&self, asset: &AssetId, to: AccountId, amount: Amount) -> Result<()> {
        self.move_units(TransferRecord {
            asset: asset.clone(),
            from: self.custodian,
            to,
            amount,
        })
    }

    /// All-or-nothing: an insufficient or failing leg leaves every holding
    /// untouched. `custodian` must be this adapter's custodian.
    fn transfer_batch(&self, custodian: AccountId, legs: &[TransferLeg]) -> Result<()> {
        let records = legs
            .iter()
            .map(|leg| match leg {
                TransferLeg::In { asset, from, amount } => TransferRecord {
                    asset: asset.clone(),
                    from: *from,
                    to: custodian,
                    amount: *amount,
                },
                TransferLeg::Out { asset, to, amount } => TransferRecord {
                    asset: asset.clone(),
                    from: self.custodian,
                    to: *to,
                    amount: *amount,
                },
            })
            .collect();
        self.move_all(records)
    }
}

impl std::fmt::Debug for InMemoryAssets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryAssets")
            .field("custodian", &self.custodian)
            .field("holdings", &lock(&self.holdings).len())
            .field("transfers", &lock(&self.journal).len())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn usdc() -> AssetId {
        AssetId::new("USDC")
    }

    #[test]
    fn transfer_in_moves_to_custodian() {
        let custodian = AccountId::new();
        let holder = AccountId::new();
        let assets = InMemoryAssets::new(custodian);
        assets.mint(&usdc(), holder, 100).unwrap();

        assets.transfer_in(&usdc(), holder, custodian, 40).unwrap();
        assert_eq!(assets.balance(&usdc(), holder), 60);
        assert_eq!(assets.custody(&usdc()), 40);
        assert_eq!(assets.transfers().len(), 1);
    }

    #[test]
    fn transfer_out_pays_from_custodian() {
        let custodian = AccountId::new();
        let holder = AccountId::new();
        let assets = InMemoryAssets::new(custodian);
        assets.mint(&usdc(), custodian, 10).unwrap();

        assets.transfer_out(&usdc(), holder, 10).unwrap();
        assert_eq!(assets.balance(&usdc(), holder), 10);
        assert_eq!(assets.custody(&usdc()), 0);
    }

    #[test]
    fn insufficient_funds_fail_without_effect() {
        let custodian = AccountId::new();
        let holder = AccountId::new();
        let assets = InMemoryAssets::new(custodian);
        assets.mint(&usdc(), holder, 5).unwrap();

        let err = assets.transfer_in(&usdc(), holder, custodian, 6).unwrap_err();
        assert!(matches!(err, LedgerError::TransferFailed { .. }));
        assert_eq!(assets.balance(&usdc(), holder), 5);
        assert!(assets.transfers().is_empty());
    }

    #[test]
    fn injected_failure_is_one_shot() {
        let custodian = AccountId::new();
        let assets = InMemoryAssets::new(custodian);
        assets.mint(&usdc(), custodian, 10).unwrap();
        assets.fail_next_transfer("token paused");

        let err = assets.transfer_out(&usdc(), AccountId::new(), 1).unwrap_err();
        assert_eq!(
            err,
            LedgerError::TransferFailed {
                asset: usdc(),
                reason: "token paused".into(),
            }
        );
        assert!(assets.transfer_out(&usdc(), AccountId::new(), 1).is_ok());
    }

    #[test]
    fn hook_runs_before_each_transfer() {
        let custodian = AccountId::new();
        let assets = InMemoryAssets::new(custodian);
        assets.mint(&usdc(), custodian, 10).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        assets.set_hook(Arc::new(move |_: &TransferRecord| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        assets.transfer_out(&usdc(), AccountId::new(), 1).unwrap();
        assets.transfer_out(&usdc(), AccountId::new(), 1).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assets.clear_hook();
        assets.transfer_out(&usdc(), AccountId::new(), 1).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn batch_with_short_leg_moves_nothing() {
        let custodian = AccountId::new();
        let holder = AccountId::new();
        let assets = InMemoryAssets::new(custodian);
        assets.mint(&usdc(), custodian, 100).unwrap();

        let legs = [
            TransferLeg::Out {
                asset: usdc(),
                to: holder,
                amount: 100,
            },
            TransferLeg::In {
                asset: AssetId::new("DAI"),
                from: holder,
                amount: 50,
            },
        ];
        let err = assets.transfer_batch(custodian, &legs).unwrap_err();

        assert!(matches!(err, LedgerError::TransferFailed { .. }));
        assert_eq!(assets.custody(&usdc()), 100);
        assert_eq!(assets.balance(&usdc(), holder), 0);
        assert!(assets.transfers().is_empty());
    }

    #[test]
    fn batch_legs_see_earlier_legs() {
        let custodian = AccountId::new();
        let holder = AccountId::new();
        let assets = InMemoryAssets::new(custodian);
        assets.mint(&usdc(), holder, 10).unwrap();

        // The push is only covered by the pull staged before it.
        let legs = [
            TransferLeg::In {
                asset: usdc(),
                from: holder,
                amount: 10,
            },
            TransferLeg::Out {
                asset: usdc(),
                to: AccountId::new(),
                amount: 10,
            },
        ];
        assets.transfer_batch(custodian, &legs).unwrap();
        assert_eq!(assets.custody(&usdc()), 0);
        assert_eq!(assets.transfers().len(), 2);
    }

    #[test]
    fn failure_injected_mid_batch_moves_nothing() {
        let custodian = AccountId::new();
        let assets = Arc::new(InMemoryAssets::new(custodian));
        assets.mint(&usdc(), custodian, 10).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let handle = Arc::downgrade(&assets);
        assets.set_hook(Arc::new(move |_: &TransferRecord| {
            if seen.fetch_add(1, Ordering::SeqCst) == 1 {
                if let Some(assets) = handle.upgrade() {
                    assets.fail_next_transfer("second leg rejected");
                }
            }
        }));

        let legs = [
            TransferLeg::Out {
                asset: usdc(),
                to: AccountId::new(),
                amount: 4,
            },
            TransferLeg::Out {
                asset: usdc(),
                to: AccountId::new(),
                amount: 4,
            },
        ];
        assert!(assets.transfer_batch(custodian, &legs).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(assets.custody(&usdc()), 10);
    }

    #[test]
    fn mint_overflow_is_reported() {
        let assets = InMemoryAssets::new(AccountId::new());
        let holder = AccountId::new();
        assets.mint(&usdc(), holder, Amount::MAX).unwrap();
        assert_eq!(assets.mint(&usdc(), holder, 1).unwrap_err(), LedgerError::Overflow);
    }
}
