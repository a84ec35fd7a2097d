use std::fmt;

use chrono::{DateTime, Utc};
use domain::{LedgerError, ProductLedger, StockLevels};
use serde::{Deserialize, Serialize};

/// A counter mutation on the product ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerOperation {
    Reserve,
    Release,
    Confirm,
    Restock,
}

impl LedgerOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerOperation::Reserve => "reserve",
            LedgerOperation::Release => "release",
            LedgerOperation::Confirm => "confirm",
            LedgerOperation::Restock => "restock",
        }
    }

    /// Applies the operation's guard and arithmetic to `ledger`.
    pub fn apply(
        &self,
        ledger: &mut ProductLedger,
        quantity: u32,
        at: DateTime<Utc>,
    ) -> std::result::Result<StockLevels, LedgerError> {
        match self {
            LedgerOperation::Reserve => ledger.reserve(quantity, at),
            LedgerOperation::Release => ledger.release(quantity, at),
            LedgerOperation::Confirm => ledger.confirm(quantity, at),
            LedgerOperation::Restock => ledger.restock(quantity, at),
        }
    }
}

impl fmt::Display for LedgerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
