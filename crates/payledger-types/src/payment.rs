//! Batch settlement input and output.
//!
//! Operators submit an ordered sequence of [`PaymentInstruction`]s. Each
//! one debits a sender's balance toward the single payee configured for
//! the ledger. A successful batch yields a [`SettlementReceipt`] whose
//! [`BatchDigest`] commits to the exact instruction sequence.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AccountId, Amount, AssetId, Timestamp};

/// One debit in a settlement batch. Ephemeral: never stored by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInstruction {
    /// The billing date this debit settles.
    pub bill_date: Timestamp,
    /// The account being debited.
    pub sender: AccountId,
    /// Units of the sender's selected asset to move to the payee.
    pub amount: Amount,
}

impl PaymentInstruction {
    #[must_use]
    pub fn new(bill_date: Timestamp, sender: AccountId, amount: Amount) -> Self {
        Self {
            bill_date,
            sender,
            amount,
        }
    }
}

// ---------------------------------------------------------------------------
// BatchDigest
// ---------------------------------------------------------------------------

/// SHA-256 commitment to an ordered instruction sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchDigest(pub [u8; 32]);

impl BatchDigest {
    /// Hash the instructions in order. Reordering the batch changes the digest.
    #[must_use]
    pub fn compute(payments: &[PaymentInstruction]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"payledger:batch:v1:");
        hasher.update((payments.len() as u64).to_le_bytes());
        for payment in payments {
            hasher.update(payment.bill_date.timestamp().to_le_bytes());
            hasher.update(payment.bill_date.timestamp_subsec_nanos().to_le_bytes());
            hasher.update(payment.sender.as_bytes());
            hasher.update(payment.amount.to_le_bytes());
        }
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for BatchDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// SettlementReceipt
// ---------------------------------------------------------------------------

/// Summary of a committed settlement batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    /// Commitment to the settled instruction sequence.
    pub digest: BatchDigest,
    /// Recipient of every debit in the batch.
    pub payee: AccountId,
    /// Number of instructions processed.
    pub entries: usize,
    /// Units moved to the payee, per asset.
    pub totals: BTreeMap<AssetId, Amount>,
    /// When the batch was committed.
    pub settled_at: Timestamp,
}

impl SettlementReceipt {
    /// Units of `asset` moved to the payee by this batch.
    #[must_use]
    pub fn total(&self, asset: &AssetId) -> Amount {
        self.totals.get(asset).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_zero;

    fn instruction(amount: Amount) -> PaymentInstruction {
        PaymentInstruction::new(
            time_zero() + chrono::Duration::days(31),
            AccountId::from_bytes([1u8; 16]),
            amount,
        )
    }

    #[test]
    fn digest_is_deterministic() {
        let batch = vec![instruction(10), instruction(20)];
        assert_eq!(BatchDigest::compute(&batch), BatchDigest::compute(&batch));
    }

    #[test]
    fn digest_depends_on_order() {
        let a = vec![instruction(10), instruction(20)];
        let b = vec![instruction(20), instruction(10)];
        assert_ne!(BatchDigest::compute(&a), BatchDigest::compute(&b));
    }

    #[test]
    fn empty_batch_digest_differs_from_single_zero_entry() {
        let empty = BatchDigest::compute(&[]);
        let one = BatchDigest::compute(&[instruction(0)]);
        assert_ne!(empty, one);
    }

    #[test]
    fn digest_display_is_short_hex() {
        let digest = BatchDigest::compute(&[instruction(1)]);
        let shown = digest.to_string();
        assert!(shown.starts_with("batch:"));
        assert_eq!(shown.len(), "batch:".len() + 16);
        assert_eq!(digest.to_hex().len(), 64);
    }

    #[test]
    fn receipt_total_defaults_to_zero() {
        let mut totals = BTreeMap::new();
        totals.insert(AssetId::new("USDC"), 30);
        let receipt = SettlementReceipt {
            digest: BatchDigest::compute(&[]),
            payee: AccountId::new(),
            entries: 2,
            totals,
            settled_at: time_zero(),
        };
        assert_eq!(receipt.total(&AssetId::new("USDC")), 30);
        assert_eq!(receipt.total(&AssetId::new("DAI")), 0);
    }

    #[test]
    fn instruction_serde_roundtrip() {
        let original = instruction(42);
        let json = serde_json::to_string(&original).unwrap();
        let back: PaymentInstruction = serde_json::from_str(&json).unwrap();
        assert_eq!(original, back);
    }
}
