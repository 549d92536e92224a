//! Ledger settings.
//!
//! [`LedgerSettings`] is the serializable form of everything the settings
//! provider answers: the pause flag, the asset allowlist, the withdrawal
//! delay, and the payee of batch settlements.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AccountId, AssetId, LedgerError, Result, constants};

/// Settings consulted by the ledger on every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// When set, deposits are rejected.
    #[serde(default)]
    pub paused: bool,
    /// Assets accepted for deposit.
    #[serde(default)]
    pub supported_assets: BTreeSet<AssetId>,
    /// Delay re-armed by every withdrawal, in seconds.
    #[serde(default = "default_withdrawal_delay_secs")]
    pub withdrawal_delay_secs: u64,
    /// Recipient of all batch-settlement debits.
    pub payee: AccountId,
}

fn default_withdrawal_delay_secs() -> u64 {
    constants::DEFAULT_WITHDRAWAL_DELAY_SECS
}

impl LedgerSettings {
    /// Unpaused settings with an empty allowlist and the default delay.
    #[must_use]
    pub fn new(payee: AccountId) -> Self {
        Self {
            paused: false,
            supported_assets: BTreeSet::new(),
            withdrawal_delay_secs: constants::DEFAULT_WITHDRAWAL_DELAY_SECS,
            payee,
        }
    }

    /// Add an asset to the allowlist.
    #[must_use]
    pub fn with_asset(mut self, asset: impl Into<AssetId>) -> Self {
        self.supported_assets.insert(asset.into());
        self
    }

    #[must_use]
    pub fn with_withdrawal_delay(mut self, delay: Duration) -> Self {
        self.withdrawal_delay_secs = delay.as_secs();
        self
    }

    #[must_use]
    pub fn withdrawal_delay(&self) -> Duration {
        Duration::from_secs(self.withdrawal_delay_secs)
    }

    /// Parse and validate settings from JSON.
    ///
    /// # Errors
    /// `Serialization` on malformed JSON, `Configuration` if the settings
    /// fail [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject delays the ledger cannot represent as a release time.
    pub fn validate(&self) -> Result<()> {
        if self.withdrawal_delay_secs > constants::MAX_WITHDRAWAL_DELAY_SECS {
            return Err(LedgerError::Configuration(format!(
                "withdrawal_delay_secs {} exceeds maximum {}",
                self.withdrawal_delay_secs,
                constants::MAX_WITHDRAWAL_DELAY_SECS
            )));
        }
        Ok(())
    }
}
