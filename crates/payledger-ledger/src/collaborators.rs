//! Interfaces the ledger consults but does not own.
//!
//! The host environment supplies a settings provider, a manager registry,
//! and an adapter that moves units of external assets. In-process
//! implementations live in [`settings`](crate::settings),
//! [`managers`](crate::managers) and [`assets`](crate::assets).

use std::time::Duration;

use payledger_types::{AccountId, Amount, AssetId, Result};

/// One staged asset movement of a ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferLeg {
    /// Pull units from an account into ledger custody.
    In {
        asset: AssetId,
        from: AccountId,
        amount: Amount,
    },
    /// Push units out of ledger custody.
    Out {
        asset: AssetId,
        to: AccountId,
        amount: Amount,
    },
}

impl TransferLeg {
    #[must_use]
    pub fn asset(&self) -> &AssetId {
        match self {
            Self::In { asset, .. } | Self::Out { asset, .. } => asset,
        }
    }
}

/// Ledger-wide policy: pause flag, asset allowlist, withdrawal delay, payee.
pub trait SettingsProvider: Send + Sync {
    fn is_paused(&self) -> bool;
    fn is_supported_asset(&self, asset: &AssetId) -> bool;
    /// Delay re-armed by every withdrawal. Read fresh on each operation.
    fn withdrawal_delay(&self) -> Duration;
    /// Recipient of batch-settlement debits.
    fn payee(&self) -> AccountId;
}

/// Authorization source for batch settlement.
pub trait ManagerRegistry: Send + Sync {
    fn is_manager(&self, account: &AccountId) -> bool;
}

/// Moves units of a named external asset.
///
/// Each call either completes the transfer or returns an error. The ledger
/// hands every leg of one operation to [`transfer_batch`](Self::transfer_batch)
/// at once; an error there aborts the operation and none of its
/// ledger-state changes are committed.
///
/// Implementations may call back into the ledger. Reads are answered from
/// committed state; mutating calls fail with `Reentrant` while the
/// triggering operation is in flight.
pub trait AssetTransferAdapter: Send + Sync {
    /// Pull `amount` of `asset` from `from` into the custody account `to`.
    fn transfer_in(&self, asset: &AssetId, from: AccountId, to: AccountId, amount: Amount)
    -> Result<()>;

    /// Push `amount` of `asset` out of ledger custody to `to`.
    fn transfer_out(&self, asset: &AssetId, to: AccountId, amount: Amount) -> Result<()>;

    /// Apply every leg or none of them. `custodian` is the ledger's own
    /// account, the destination of `In` legs.
    ///
    /// The default runs the legs in order and, when one fails, reverses
    /// the completed ones newest first before returning the original
    /// error. Adapters that can check all legs up front should override it.
    fn transfer_batch(&self, custodian: AccountId, legs: &[TransferLeg]) -> Result<()> {
        for (done, leg) in legs.iter().enumerate() {
            let applied = match leg {
                TransferLeg::In { asset, from, amount } => {
                    self.transfer_in(asset, *from, custodian, *amount)
                }
                TransferLeg::Out { asset, to, amount } => self.transfer_out(asset, *to, *amount),
            };
            if let Err(err) = applied {
                for leg in legs[..done].iter().rev() {
                    let reversed = match leg {
                        TransferLeg::In { asset, from, amount } => {
                            self.transfer_out(asset, *from, *amount)
                        }
                        TransferLeg::Out { asset, to, amount } => {
                            self.transfer_in(asset, *to, custodian, *amount)
                        }
                    };
                    if let Err(reverse_err) = reversed {
                        tracing::error!(?leg, %reverse_err, "Transfer reversal failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryAssets;

    /// Adapter exposing only single transfers, so batches use the default.
    struct OneByOne(InMemoryAssets);

    impl AssetTransferAdapter for OneByOne {
        fn transfer_in(
            &self,
            asset: &AssetId,
            from: AccountId,
            to: AccountId,
            amount: Amount,
        ) -> Result<()> {
            self.0.transfer_in(asset, from, to, amount)
        }

        fn transfer_out(&self, asset: &AssetId, to: AccountId, amount: Amount) -> Result<()> {
            self.0.transfer_out(asset, to, amount)
        }
    }

    #[test]
    fn default_batch_reverses_completed_legs() {
        let usdc = AssetId::new("USDC");
        let dai = AssetId::new("DAI");
        let custodian = AccountId::new();
        let holder = AccountId::new();
        let adapter = OneByOne(InMemoryAssets::new(custodian));
        adapter.0.mint(&usdc, custodian, 100).unwrap();

        // The push succeeds, the pull finds an empty wallet.
        let legs = [
            TransferLeg::Out {
                asset: usdc.clone(),
                to: holder,
                amount: 100,
            },
            TransferLeg::In {
                asset: dai.clone(),
                from: holder,
                amount: 50,
            },
        ];
        let err = adapter.transfer_batch(custodian, &legs).unwrap_err();

        assert!(matches!(err, payledger_types::LedgerError::TransferFailed { .. }));
        assert_eq!(adapter.0.custody(&usdc), 100);
        assert_eq!(adapter.0.balance(&usdc, holder), 0);
    }

    #[test]
    fn default_batch_applies_all_legs() {
        let usdc = AssetId::new("USDC");
        let custodian = AccountId::new();
        let holder = AccountId::new();
        let adapter = OneByOne(InMemoryAssets::new(custodian));
        adapter.0.mint(&usdc, holder, 10).unwrap();

        let legs = [
            TransferLeg::In {
                asset: usdc.clone(),
                from: holder,
                amount: 10,
            },
            TransferLeg::Out {
                asset: usdc.clone(),
                to: holder,
                amount: 4,
            },
        ];
        adapter.transfer_batch(custodian, &legs).unwrap();
        assert_eq!(adapter.0.custody(&usdc), 6);
        assert_eq!(adapter.0.balance(&usdc, holder), 4);
        assert_eq!(legs[0].asset(), &usdc);
    }
}
