//! Global reentrancy guard.
//!
//! One exclusive flag serializes every mutating ledger operation. The flag
//! is held for the whole operation, including the calls into the asset
//! transfer adapter, so a transfer callback cannot start a nested mutation
//! that observes staged balances.

use std::sync::atomic::{AtomicBool, Ordering};

use payledger_types::{LedgerError, Result};

/// Process-wide exclusive flag guarding ledger mutations.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

impl ReentrancyGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entered: AtomicBool::new(false),
        }
    }

    /// Acquire the flag. The returned token releases it on drop, on both
    /// success and failure paths.
    ///
    /// # Errors
    /// Returns [`LedgerError::Reentrant`] if the flag is already held.
    pub fn enter(&self) -> Result<Entered<'_>> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| LedgerError::Reentrant)?;
        Ok(Entered { guard: self })
    }

    /// Whether an operation currently holds the flag.
    #[must_use]
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Proof that the guard is held. Dropping it releases the guard.
#[must_use = "the guard is released as soon as the token is dropped"]
#[derive(Debug)]
pub struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::Release);
    }
}
