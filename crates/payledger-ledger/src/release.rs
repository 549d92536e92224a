//! Time-based withdrawal lock.
//!
//! Every account carries a release time. A withdrawal succeeds only once
//! the current logical time has reached it, and each successful withdrawal
//! pushes the release time to `now + delay` for whatever balance remains.

use std::time::Duration;

use chrono::TimeDelta;
use payledger_types::{LedgerError, Result, Timestamp};

/// Withdrawal gate evaluated at a single instant with a single delay.
///
/// Built once per operation from the clock and the settings provider, so
/// an operation that withdraws several times sees one consistent `now`.
#[derive(Debug, Clone, Copy)]
pub struct WithdrawalLock {
    now: Timestamp,
    delay: Duration,
}

impl WithdrawalLock {
    #[must_use]
    pub fn new(now: Timestamp, delay: Duration) -> Self {
        Self { now, delay }
    }

    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Whether a balance with `release_time` may be withdrawn now.
    #[must_use]
    pub fn is_released(&self, release_time: Timestamp) -> bool {
        self.now >= release_time
    }

    /// Guard a withdrawal attempt.
    ///
    /// # Errors
    /// Returns [`LedgerError::WithdrawalLocked`] if `now` precedes `release_time`.
    pub fn check(&self, release_time: Timestamp) -> Result<()> {
        if self.is_released(release_time) {
            Ok(())
        } else {
            Err(LedgerError::WithdrawalLocked {
                release_time,
                now: self.now,
            })
        }
    }

    /// The release time a successful withdrawal arms: `now + delay`.
    ///
    /// # Errors
    /// Returns [`LedgerError::Overflow`] if the result is not representable.
    pub fn rearm(&self) -> Result<Timestamp> {
        let delay = TimeDelta::from_std(self.delay).map_err(|_| LedgerError::Overflow)?;
        self.now
            .checked_add_signed(delay)
            .ok_or(LedgerError::Overflow)
    }
}
