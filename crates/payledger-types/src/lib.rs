//! # payledger-types
//!
//! Shared types, errors, and configuration for the **PayLedger** custodial
//! balance ledger.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`AssetId`]
//! - **Account model**: [`AccountRecord`], [`Amount`], [`Timestamp`]
//! - **Settlement model**: [`PaymentInstruction`], [`SettlementReceipt`], [`BatchDigest`]
//! - **Notifications**: [`LedgerEvent`]
//! - **Configuration**: [`LedgerSettings`]
//! - **Errors**: [`LedgerError`] with `PL_ERR_` prefix codes
//! - **Constants**: system-wide defaults

pub mod account;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod payment;

// Re-export all primary types at crate root:
//   use payledger_types::{AccountId, AssetId, LedgerError, PaymentInstruction, ...};

pub use account::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use payment::*;

// Constants are accessed via `payledger_types::constants::FOO`.
