//! Staged changes of one ledger operation.
//!
//! A [`UnitOfWork`] collects record changes, events, custody movements and
//! outbound transfers on private copies of the affected records. Nothing
//! reaches committed state until [`commit`](UnitOfWork::commit) runs, so
//! dropping a unit of work is a complete rollback.

use std::collections::HashMap;

use payledger_types::{AccountId, AccountRecord, Amount, AssetId, LedgerEvent};

use crate::collaborators::TransferLeg;
use crate::custody::{CustodyAudit, CustodyEntry};

#[derive(Debug, Default)]
pub(crate) struct UnitOfWork {
    staged: HashMap<AccountId, AccountRecord>,
    events: Vec<LedgerEvent>,
    custody: Vec<CustodyEntry>,
    transfers: Vec<TransferLeg>,
}

impl UnitOfWork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The staged copy of `account`, taken from `committed` on first touch.
    pub(crate) fn record(
        &mut self,
        committed: &HashMap<AccountId, AccountRecord>,
        account: AccountId,
    ) -> &mut AccountRecord {
        self.staged
            .entry(account)
            .or_insert_with(|| committed.get(&account).cloned().unwrap_or_default())
    }

    pub(crate) fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    pub(crate) fn custody(&mut self, entry: CustodyEntry) {
        self.custody.push(entry);
    }

    pub(crate) fn transfer_in(&mut self, asset: AssetId, from: AccountId, amount: Amount) {
        self.transfers
            .push(TransferLeg::In { asset, from, amount });
    }

    pub(crate) fn transfer_out(&mut self, asset: AssetId, to: AccountId, amount: Amount) {
        self.transfers
            .push(TransferLeg::Out { asset, to, amount });
    }

    /// Transfers in the order they were staged, handed to the adapter as
    /// one all-or-nothing batch.
    pub(crate) fn transfers(&self) -> &[TransferLeg] {
        &self.transfers
    }

    /// Write staged records and custody movements into committed state and
    /// hand back the events to deliver.
    pub(crate) fn commit(
        self,
        accounts: &mut HashMap<AccountId, AccountRecord>,
        audit: &mut CustodyAudit,
    ) -> Vec<LedgerEvent> {
        for entry in &self.custody {
            audit.apply(entry);
        }
        accounts.extend(self.staged);
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_copies_committed_state_once() {
        let account = AccountId::new();
        let mut committed = HashMap::new();
        committed.insert(
            account,
            AccountRecord {
                selected_asset: Some(AssetId::new("USDC")),
                balance: 10,
                ..AccountRecord::new()
            },
        );

        let mut uow = UnitOfWork::new();
        uow.record(&committed, account).balance = 3;
        assert_eq!(uow.record(&committed, account).balance, 3);
        assert_eq!(committed[&account].balance, 10);
    }

    #[test]
    fn unknown_account_starts_empty() {
        let mut uow = UnitOfWork::new();
        let record = uow.record(&HashMap::new(), AccountId::new());
        assert_eq!(*record, AccountRecord::new());
    }

    #[test]
    fn commit_applies_records_custody_and_returns_events() {
        let account = AccountId::new();
        let usdc = AssetId::new("USDC");
        let mut accounts = HashMap::new();
        let mut audit = CustodyAudit::new();

        let mut uow = UnitOfWork::new();
        let record = uow.record(&accounts, account);
        record.selected_asset = Some(usdc.clone());
        record.balance = 7;
        uow.emit(LedgerEvent::BalanceChanged {
            asset: usdc.clone(),
            account,
        });
        uow.custody(CustodyEntry::Deposited(usdc.clone(), 7));
        uow.transfer_in(usdc.clone(), account, 7);
        assert_eq!(uow.transfers().len(), 1);

        let events = uow.commit(&mut accounts, &mut audit);
        assert_eq!(events.len(), 1);
        assert_eq!(accounts[&account].balance, 7);
        assert!(audit.verify(&usdc, 7).is_ok());
    }

    #[test]
    fn dropping_discards_everything() {
        let account = AccountId::new();
        let accounts: HashMap<AccountId, AccountRecord> = HashMap::new();
        {
            let mut uow = UnitOfWork::new();
            uow.record(&accounts, account).balance = 99;
        }
        assert!(accounts.is_empty());
    }
}
