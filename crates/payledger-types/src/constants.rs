//! System-wide constants for the PayLedger custodial ledger.

/// Default delay re-armed by every withdrawal (7 days).
pub const DEFAULT_WITHDRAWAL_DELAY_SECS: u64 = 7 * 24 * 60 * 60;

/// Largest accepted withdrawal delay (100 years). Keeps `now + delay`
/// well inside the range of a `chrono` timestamp.
pub const MAX_WITHDRAWAL_DELAY_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "PayLedger";
