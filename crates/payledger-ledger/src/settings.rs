//! In-process settings provider backed by [`LedgerSettings`].

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use payledger_types::{AccountId, AssetId, LedgerSettings, Result};

use crate::collaborators::SettingsProvider;

/// Mutable settings shared between the ledger and an administrator.
#[derive(Debug)]
pub struct SettingsStore {
    inner: RwLock<LedgerSettings>,
}

impl SettingsStore {
    #[must_use]
    pub fn new(settings: LedgerSettings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    /// Load validated settings from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self::new(LedgerSettings::from_json_str(json)?))
    }

    /// Copy of the current settings.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSettings {
        self.read().clone()
    }

    pub fn set_paused(&self, paused: bool) {
        self.write().paused = paused;
        tracing::info!(paused, "Pause flag updated");
    }

    pub fn support_asset(&self, asset: AssetId) {
        tracing::info!(asset = %asset, "Asset added to allowlist");
        self.write().supported_assets.insert(asset);
    }

    pub fn unsupport_asset(&self, asset: &AssetId) {
        self.write().supported_assets.remove(asset);
        tracing::info!(asset = %asset, "Asset removed from allowlist");
    }

    pub fn set_withdrawal_delay(&self, delay: Duration) {
        self.write().withdrawal_delay_secs = delay.as_secs();
        tracing::info!(delay_secs = delay.as_secs(), "Withdrawal delay updated");
    }

    pub fn set_payee(&self, payee: AccountId) {
        self.write().payee = payee;
        tracing::info!(payee = %payee, "Payee updated");
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerSettings> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerSettings> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SettingsProvider for SettingsStore {
    fn is_paused(&self) -> bool {
        self.read().paused
    }

    fn is_supported_asset(&self, asset: &AssetId) -> bool {
        self.read().supported_assets.contains(asset)
    }

    fn withdrawal_delay(&self) -> Duration {
        self.read().withdrawal_delay()
    }

    fn payee(&self) -> AccountId {
        self.read().payee
    }
}
