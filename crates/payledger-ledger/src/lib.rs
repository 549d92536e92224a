//! # payledger-ledger
//!
//! **Custodial payment ledger**: deposits, time-locked withdrawals, and
//! all-or-nothing batch settlement toward a single payee.
//!
//! ## Architecture
//!
//! [`PaymentLedger`] owns every account record and consults three
//! host-provided collaborators:
//! 1. **SettingsProvider**: pause flag, asset allowlist, withdrawal delay, payee
//! 2. **ManagerRegistry**: who may run batch settlement
//! 3. **AssetTransferAdapter**: moves units of external assets in and out
//!
//! ## Operation Flow
//!
//! ```text
//! ReentrancyGuard.enter() → stage on UnitOfWork → adapter transfer_batch
//!     → commit records + CustodyAudit → EventSink
//! ```
//!
//! One global guard serializes all mutations, including the adapter calls,
//! so a transfer callback can never re-enter a half-applied operation. All
//! transfer legs of an operation go to the adapter as one batch that either
//! lands in full or not at all.

pub mod assets;
pub mod clock;
pub mod collaborators;
pub mod custody;
pub mod events;
pub mod guard;
pub mod ledger;
pub mod managers;
pub mod release;
pub mod settings;
mod unit_of_work;

pub use assets::{InMemoryAssets, TransferHook, TransferRecord};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{AssetTransferAdapter, ManagerRegistry, SettingsProvider, TransferLeg};
pub use custody::{CustodyAudit, CustodyEntry, CustodyTotals};
pub use events::{EventLog, EventSink, TracingEventSink};
pub use guard::ReentrancyGuard;
pub use ledger::PaymentLedger;
pub use managers::ManagerSet;
pub use release::WithdrawalLock;
pub use settings::SettingsStore;
