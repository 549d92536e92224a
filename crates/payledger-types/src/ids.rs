//! Identifiers used throughout PayLedger.
//!
//! Accounts use UUIDv7 for time-ordered sorting. Assets are named by a
//! short symbol (e.g. `"USDC"`), mirroring how the transfer adapter
//! addresses the external token.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Identity of an account holder, operator, payee, or the ledger itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// A fungible asset type an account balance is denominated in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_uniqueness() {
        let a = AccountId::new();
        let b = AccountId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn account_id_ordering() {
        let a = AccountId::new();
        let b = AccountId::new();
        assert!(a < b);
    }

    #[test]
    fn account_id_from_bytes() {
        let id = AccountId::from_bytes([7u8; 16]);
        assert_eq!(id.as_bytes(), &[7u8; 16]);
    }

    #[test]
    fn asset_id_display_is_symbol() {
        let asset = AssetId::new("USDC");
        assert_eq!(asset.to_string(), "USDC");
        assert_eq!(asset, AssetId::from("USDC"));
    }

    #[test]
    fn asset_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&AssetId::new("DAI")).unwrap();
        assert_eq!(json, "\"DAI\"");
        let back: AssetId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "DAI");
    }
}
