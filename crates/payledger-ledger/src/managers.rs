//! In-process manager registry.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use payledger_types::AccountId;

use crate::collaborators::ManagerRegistry;

/// The set of accounts allowed to run batch settlement.
#[derive(Debug, Default)]
pub struct ManagerSet {
    managers: RwLock<HashSet<AccountId>>,
}

impl ManagerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_managers(managers: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            managers: RwLock::new(managers.into_iter().collect()),
        }
    }

    /// Returns `true` if the account was not already a manager.
    pub fn grant(&self, account: AccountId) -> bool {
        let added = self
            .managers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account);
        if added {
            tracing::info!(manager = %account, "Manager granted");
        }
        added
    }

    /// Returns `true` if the account was a manager.
    pub fn revoke(&self, account: &AccountId) -> bool {
        let removed = self
            .managers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(account);
        if removed {
            tracing::info!(manager = %account, "Manager revoked");
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.managers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ManagerRegistry for ManagerSet {
    fn is_manager(&self, account: &AccountId) -> bool {
        self.managers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(account)
    }
}
