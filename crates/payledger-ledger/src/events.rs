//! Delivery of committed ledger notifications.

use std::sync::{Mutex, PoisonError};

use payledger_types::{LedgerEvent, Result};

/// Receives every event of a committed operation, in emission order.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &LedgerEvent);
}

/// Default sink: writes each event to the `tracing` pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &LedgerEvent) {
        tracing::info!(
            account = %event.account(),
            asset = %event.asset(),
            event = %event,
            "Ledger event"
        );
    }
}

/// In-memory append-only event journal.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<LedgerEvent>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event received so far.
    #[must_use]
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return everything received so far.
    pub fn drain(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// The journal as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.events())?)
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: &LedgerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payledger_types::{AccountId, AssetId};

    fn balance_changed() -> LedgerEvent {
        LedgerEvent::BalanceChanged {
            asset: AssetId::new("USDC"),
            account: AccountId::new(),
        }
    }

    #[test]
    fn log_records_in_order() {
        let log = EventLog::new();
        let first = balance_changed();
        let second = balance_changed();
        log.emit(&first);
        log.emit(&second);
        assert_eq!(log.events(), vec![first, second]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn drain_empties_the_log() {
        let log = EventLog::new();
        log.emit(&balance_changed());
        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn log_exports_json() {
        let log = EventLog::new();
        log.emit(&balance_changed());
        let json = log.to_json().unwrap();
        let back: Vec<LedgerEvent> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log.events());
    }

    #[test]
    fn tracing_sink_accepts_events() {
        TracingEventSink.emit(&balance_changed());
    }
}
