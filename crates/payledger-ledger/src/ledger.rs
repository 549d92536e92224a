//! The custodial payment ledger.
//!
//! Account holders deposit a single supported asset, withdraw it subject to
//! a per-account release time, and authorized managers debit balances in
//! batches toward the configured payee.
//!
//! Every mutating operation runs under the global [`ReentrancyGuard`] and
//! follows the same shape:
//! 1. Read collaborators (settings, registry, clock)
//! 2. Stage record changes on copies inside a [`UnitOfWork`]
//! 3. Run the staged asset transfers in order
//! 4. Commit records and custody totals, then deliver events
//!
//! A failure at any step drops the unit of work, so committed state is
//! exactly what it was before the call.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use payledger_types::{
    AccountId, AccountRecord, Amount, AssetId, BatchDigest, LedgerError, LedgerEvent,
    PaymentInstruction, Result, SettlementReceipt, Timestamp, constants,
};

use crate::clock::{Clock, SystemClock};
use crate::collaborators::{AssetTransferAdapter, ManagerRegistry, SettingsProvider};
use crate::custody::{CustodyAudit, CustodyEntry, CustodyTotals};
use crate::events::{EventSink, TracingEventSink};
use crate::guard::ReentrancyGuard;
use crate::release::WithdrawalLock;
use crate::unit_of_work::UnitOfWork;

/// Collaborators bound by [`PaymentLedger::initialize`].
struct Wiring {
    settings: Arc<dyn SettingsProvider>,
    managers: Arc<dyn ManagerRegistry>,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountId, AccountRecord>,
    custody: CustodyAudit,
}

/// Per-account custody balances with time-locked withdrawals and
/// all-or-nothing batch settlement.
pub struct PaymentLedger {
    /// The ledger's own identity; deposits are transferred to it.
    ledger_account: AccountId,
    transfers: Arc<dyn AssetTransferAdapter>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    wiring: OnceLock<Wiring>,
    guard: ReentrancyGuard,
    state: Mutex<LedgerState>,
}

impl PaymentLedger {
    /// Create an uninitialized ledger using the wall clock and the tracing
    /// event sink.
    #[must_use]
    pub fn new(ledger_account: AccountId, transfers: Arc<dyn AssetTransferAdapter>) -> Self {
        Self {
            ledger_account,
            transfers,
            clock: Arc::new(SystemClock),
            events: Arc::new(TracingEventSink),
            wiring: OnceLock::new(),
            guard: ReentrancyGuard::new(),
            state: Mutex::new(LedgerState::default()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Bind the settings provider and manager registry. One-time.
    ///
    /// # Errors
    /// Returns [`LedgerError::AlreadyInitialized`] on any call after the first.
    pub fn initialize(
        &self,
        settings: Arc<dyn SettingsProvider>,
        managers: Arc<dyn ManagerRegistry>,
    ) -> Result<()> {
        self.wiring
            .set(Wiring { settings, managers })
            .map_err(|_| LedgerError::AlreadyInitialized)
            .inspect_err(|_| tracing::warn!("Repeated ledger initialization rejected"))?;
        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            ledger = %self.ledger_account,
            "Ledger initialized"
        );
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.wiring.get().is_some()
    }

    #[must_use]
    pub fn ledger_account(&self) -> AccountId {
        self.ledger_account
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// Committed balance of `account`; 0 for accounts that never deposited.
    #[must_use]
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.state()
            .accounts
            .get(account)
            .map_or(0, |record| record.balance)
    }

    #[must_use]
    pub fn account(&self, account: &AccountId) -> Option<AccountRecord> {
        self.state().accounts.get(account).cloned()
    }

    #[must_use]
    pub fn selected_asset(&self, account: &AccountId) -> Option<AssetId> {
        self.state()
            .accounts
            .get(account)
            .and_then(|record| record.selected_asset.clone())
    }

    /// `None` for accounts that never deposited (always withdrawable).
    #[must_use]
    pub fn release_time(&self, account: &AccountId) -> Option<Timestamp> {
        self.state()
            .accounts
            .get(account)
            .map(|record| record.release_time)
    }

    #[must_use]
    pub fn custody_totals(&self, asset: &AssetId) -> CustodyTotals {
        self.state().custody.totals(asset)
    }

    /// Check that, for every asset, the balances held for accounts equal
    /// the units deposited minus those withdrawn and settled.
    ///
    /// # Errors
    /// Returns [`LedgerError::CustodyInvariantViolation`] on the first mismatch.
    pub fn verify_custody(&self) -> Result<()> {
        let state = self.state();
        let mut held: BTreeMap<AssetId, Amount> = BTreeMap::new();
        for record in state.accounts.values() {
            match &record.selected_asset {
                Some(asset) => {
                    let total = held.entry(asset.clone()).or_default();
                    *total = total.checked_add(record.balance).ok_or(LedgerError::Overflow)?;
                }
                None if record.balance > 0 => {
                    return Err(LedgerError::CustodyInvariantViolation {
                        reason: format!("balance {} held without an asset", record.balance),
                    });
                }
                None => {}
            }
        }
        for asset in state.custody.tracked_assets() {
            held.entry(asset).or_default();
        }
        for (asset, amount) in &held {
            state.custody.verify(asset, *amount)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------

    /// Deposit `amount` of `asset` for `account`.
    ///
    /// If the account holds a positive balance in a different asset, that
    /// whole balance is withdrawn first, under the same release-time check
    /// as an explicit withdrawal. Switching assets is therefore blocked
    /// until the existing balance is released.
    ///
    /// # Errors
    /// `Reentrant`, `NotInitialized`, `Paused`, `UnsupportedAsset`, any
    /// withdrawal error from the asset switch, `Overflow`, or
    /// `TransferFailed`.
    pub fn deposit(&self, account: AccountId, asset: &AssetId, amount: Amount) -> Result<()> {
        let _entered = self.guard.enter()?;
        self.stage_deposit(account, asset, amount)
            .and_then(|uow| self.finish(uow))
            .inspect_err(|err| {
                tracing::warn!(
                    account = %account,
                    asset = %asset,
                    amount = %amount,
                    %err,
                    "Deposit rejected"
                );
            })?;
        tracing::info!(account = %account, asset = %asset, amount = %amount, "Deposit committed");
        Ok(())
    }

    /// Withdraw `amount` of the account's selected asset back to `account`.
    ///
    /// Re-arms the release time to `now + withdrawal_delay` for the
    /// remaining balance, so a second withdrawal right after fails.
    ///
    /// # Errors
    /// `Reentrant`, `NotInitialized`, `InvalidAmount`, `WithdrawalLocked`,
    /// `InsufficientBalance`, `Overflow`, or `TransferFailed`.
    pub fn withdraw(&self, account: AccountId, amount: Amount) -> Result<()> {
        let _entered = self.guard.enter()?;
        self.stage_withdraw(account, amount)
            .and_then(|uow| self.finish(uow))
            .inspect_err(|err| {
                tracing::warn!(account = %account, amount = %amount, %err, "Withdrawal rejected");
            })?;
        tracing::info!(account = %account, amount = %amount, "Withdrawal committed");
        Ok(())
    }

    /// Debit every sender in `payments` toward the payee, in order, as one
    /// all-or-nothing batch.
    ///
    /// Release times do not apply: settlement is privileged. Each entry
    /// moves the sender's own selected asset, so one batch may pay the
    /// payee in several assets.
    ///
    /// # Errors
    /// `Reentrant`, `NotInitialized`, `PermissionDenied`,
    /// `InsufficientBalance` (for any entry, aborting the whole batch),
    /// `Overflow`, or `TransferFailed`.
    pub fn execute_batch_settlement(
        &self,
        caller: AccountId,
        payments: &[PaymentInstruction],
    ) -> Result<SettlementReceipt> {
        let _entered = self.guard.enter()?;
        let receipt = self
            .stage_settlement(caller, payments)
            .and_then(|(uow, receipt)| self.finish(uow).map(|()| receipt))
            .inspect_err(|err| {
                tracing::warn!(
                    caller = %caller,
                    entries = payments.len(),
                    %err,
                    "Settlement batch rejected"
                );
            })?;
        tracing::info!(
            caller = %caller,
            payee = %receipt.payee,
            entries = receipt.entries,
            digest = %receipt.digest,
            "Settlement batch committed"
        );
        Ok(receipt)
    }

    // -----------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------

    fn stage_deposit(
        &self,
        account: AccountId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<UnitOfWork> {
        let settings = &self.wiring()?.settings;
        if settings.is_paused() {
            return Err(LedgerError::Paused);
        }
        if !settings.is_supported_asset(asset) {
            return Err(LedgerError::UnsupportedAsset(asset.clone()));
        }
        let lock = WithdrawalLock::new(self.clock.now(), settings.withdrawal_delay());

        // Stage the pull ahead of any switch push.
        let mut uow = UnitOfWork::new();
        uow.transfer_in(asset.clone(), account, amount);
        let state = self.state();
        let record = uow.record(&state.accounts, account);
        if record.requires_switch(asset) {
            let balance = record.balance;
            tracing::debug!(
                account = %account,
                from = ?record.selected_asset,
                to = %asset,
                balance = %balance,
                "Asset switch: withdrawing existing balance"
            );
            stage_withdrawal(&mut uow, &state.accounts, &lock, account, balance)?;
        }

        let record = uow.record(&state.accounts, account);
        if record.selected_asset.as_ref() != Some(asset) {
            record.selected_asset = Some(asset.clone());
        }
        record.balance = record
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        drop(state);

        uow.emit(LedgerEvent::BalanceChanged {
            asset: asset.clone(),
            account,
        });
        uow.custody(CustodyEntry::Deposited(asset.clone(), amount));
        Ok(uow)
    }

    fn stage_withdraw(&self, account: AccountId, amount: Amount) -> Result<UnitOfWork> {
        let settings = &self.wiring()?.settings;
        let lock = WithdrawalLock::new(self.clock.now(), settings.withdrawal_delay());

        let mut uow = UnitOfWork::new();
        let state = self.state();
        stage_withdrawal(&mut uow, &state.accounts, &lock, account, amount)?;
        Ok(uow)
    }

    fn stage_settlement(
        &self,
        caller: AccountId,
        payments: &[PaymentInstruction],
    ) -> Result<(UnitOfWork, SettlementReceipt)> {
        let wiring = self.wiring()?;
        if !wiring.managers.is_manager(&caller) {
            return Err(LedgerError::PermissionDenied);
        }
        let payee = wiring.settings.payee();
        let settled_at = self.clock.now();

        let mut uow = UnitOfWork::new();
        let mut totals: BTreeMap<AssetId, Amount> = BTreeMap::new();
        let state = self.state();
        for (index, payment) in payments.iter().enumerate() {
            let record = uow.record(&state.accounts, payment.sender);
            let available = record.balance;
            let insufficient = LedgerError::InsufficientBalance {
                needed: payment.amount,
                available,
            };
            let remaining = available.checked_sub(payment.amount).ok_or_else(|| {
                tracing::debug!(
                    index,
                    sender = %payment.sender,
                    "Settlement entry exceeds balance"
                );
                insufficient.clone()
            })?;
            let asset = record.selected_asset.clone().ok_or(insufficient)?;
            record.balance = remaining;

            let total = totals.entry(asset.clone()).or_default();
            *total = total
                .checked_add(payment.amount)
                .ok_or(LedgerError::Overflow)?;

            uow.emit(LedgerEvent::BalanceChanged {
                asset: asset.clone(),
                account: payment.sender,
            });
            uow.emit(LedgerEvent::PaymentSettled {
                bill_date: payment.bill_date,
                asset: asset.clone(),
                sender: payment.sender,
                payee,
                amount: payment.amount,
            });
            uow.custody(CustodyEntry::Settled(asset.clone(), payment.amount));
            uow.transfer_out(asset, payee, payment.amount);
        }
        drop(state);

        let receipt = SettlementReceipt {
            digest: BatchDigest::compute(payments),
            payee,
            entries: payments.len(),
            totals,
            settled_at,
        };
        Ok((uow, receipt))
    }

    // -----------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------

    /// Run the staged transfers as one batch, then commit. The state lock
    /// is not held while the adapter runs, so adapter callbacks can read
    /// balances.
    fn finish(&self, uow: UnitOfWork) -> Result<()> {
        if !uow.transfers().is_empty() {
            self.transfers
                .transfer_batch(self.ledger_account, uow.transfers())?;
        }

        let events = {
            let mut state = self.state();
            let LedgerState { accounts, custody } = &mut *state;
            uow.commit(accounts, custody)
        };
        for event in &events {
            self.events.emit(event);
        }
        Ok(())
    }

    fn wiring(&self) -> Result<&Wiring> {
        self.wiring.get().ok_or(LedgerError::NotInitialized)
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stage a withdrawal of `amount` from `account`. Shared by explicit
/// withdrawals and the asset-switch path of deposits.
fn stage_withdrawal(
    uow: &mut UnitOfWork,
    committed: &HashMap<AccountId, AccountRecord>,
    lock: &WithdrawalLock,
    account: AccountId,
    amount: Amount,
) -> Result<()> {
    if amount == 0 {
        return Err(LedgerError::InvalidAmount);
    }
    let record = uow.record(committed, account);
    lock.check(record.release_time)?;

    let insufficient = LedgerError::InsufficientBalance {
        needed: amount,
        available: record.balance,
    };
    let remaining = record.balance.checked_sub(amount).ok_or(insufficient.clone())?;
    let asset = record.selected_asset.clone().ok_or(insufficient)?;
    let release_time = lock.rearm()?;
    record.balance = remaining;
    record.release_time = release_time;

    tracing::debug!(
        account = %account,
        asset = %asset,
        amount = %amount,
        release_time = %release_time,
        "Withdrawal staged"
    );
    uow.emit(LedgerEvent::BalanceChanged {
        asset: asset.clone(),
        account,
    });
    uow.custody(CustodyEntry::Withdrawn(asset.clone(), amount));
    uow.transfer_out(asset, account, amount);
    Ok(())
}

impl std::fmt::Debug for PaymentLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentLedger")
            .field("ledger_account", &self.ledger_account)
            .field("initialized", &self.is_initialized())
            .field("in_flight", &self.guard.is_entered())
            .finish_non_exhaustive()
    }
}
