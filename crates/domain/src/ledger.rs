//! Product ledger arithmetic.
//!
//! The counters are private; the only way to change them is through the
//! guarded operations below, so `available + reserved <= total` holds for
//! every value of [`ProductLedger`].

use chrono::{DateTime, Utc};
use common::{CenterId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Available and reserved counters, returned by every ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevels {
    pub available_stock: u32,
    pub reserved_stock: u32,
}

/// Full stock figures including the derived sold count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockStats {
    pub product_id: ProductId,
    pub total_stock: u32,
    pub available_stock: u32,
    pub reserved_stock: u32,
    pub sold_stock: u32,
}

/// Input for registering a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub center_id: CenterId,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub initial_stock: u32,
}

/// A product and its stock counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLedger {
    id: ProductId,
    name: String,
    description: Option<String>,
    center_id: CenterId,
    unit_price_cents: i64,
    is_active: bool,
    total_stock: u32,
    available_stock: u32,
    reserved_stock: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductLedger {
    /// Creates the ledger for a freshly registered product.
    ///
    /// All initial stock is available; nothing is reserved.
    pub fn register(id: ProductId, product: NewProduct, at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: product.name,
            description: product.description,
            center_id: product.center_id,
            unit_price_cents: product.unit_price_cents,
            is_active: true,
            total_stock: product.initial_stock,
            available_stock: product.initial_stock,
            reserved_stock: 0,
            created_at: at,
            updated_at: at,
        }
    }

    /// Rebuilds a ledger from persisted columns, rejecting rows whose
    /// counters break the invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: ProductId,
        name: String,
        description: Option<String>,
        center_id: CenterId,
        unit_price_cents: i64,
        is_active: bool,
        total_stock: u32,
        available_stock: u32,
        reserved_stock: u32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let held = u64::from(available_stock) + u64::from(reserved_stock);
        if held > u64::from(total_stock) {
            return Err(LedgerError::InconsistentCounters {
                product_id: id,
                total: total_stock,
                available: available_stock,
                reserved: reserved_stock,
            });
        }
        Ok(Self {
            id,
            name,
            description,
            center_id,
            unit_price_cents,
            is_active,
            total_stock,
            available_stock,
            reserved_stock,
            created_at,
            updated_at,
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn center_id(&self) -> CenterId {
        self.center_id
    }

    pub fn unit_price_cents(&self) -> i64 {
        self.unit_price_cents
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn total_stock(&self) -> u32 {
        self.total_stock
    }

    pub fn available_stock(&self) -> u32 {
        self.available_stock
    }

    pub fn reserved_stock(&self) -> u32 {
        self.reserved_stock
    }

    /// Stock permanently consumed by confirmed reservations.
    pub fn sold_stock(&self) -> u32 {
        self.total_stock - self.available_stock - self.reserved_stock
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn levels(&self) -> StockLevels {
        StockLevels {
            available_stock: self.available_stock,
            reserved_stock: self.reserved_stock,
        }
    }

    pub fn stats(&self) -> StockStats {
        StockStats {
            product_id: self.id,
            total_stock: self.total_stock,
            available_stock: self.available_stock,
            reserved_stock: self.reserved_stock,
            sold_stock: self.sold_stock(),
        }
    }

    /// Moves `quantity` from available to reserved.
    pub fn reserve(&mut self, quantity: u32, at: DateTime<Utc>) -> Result<StockLevels, LedgerError> {
        check_quantity(quantity)?;
        if self.available_stock < quantity {
            return Err(LedgerError::InsufficientStock {
                product_id: self.id,
                requested: quantity,
                levels: self.levels(),
            });
        }
        self.available_stock -= quantity;
        self.reserved_stock += quantity;
        self.updated_at = at;
        Ok(self.levels())
    }

    /// Returns `quantity` from reserved to available.
    pub fn release(&mut self, quantity: u32, at: DateTime<Utc>) -> Result<StockLevels, LedgerError> {
        self.check_reserved(quantity)?;
        self.reserved_stock -= quantity;
        self.available_stock += quantity;
        self.updated_at = at;
        Ok(self.levels())
    }

    /// Consumes `quantity` of reserved stock. Available stock is untouched.
    pub fn confirm(&mut self, quantity: u32, at: DateTime<Utc>) -> Result<StockLevels, LedgerError> {
        self.check_reserved(quantity)?;
        self.reserved_stock -= quantity;
        self.updated_at = at;
        Ok(self.levels())
    }

    /// Adds newly produced stock to both the total and the available pool.
    pub fn restock(&mut self, quantity: u32, at: DateTime<Utc>) -> Result<StockLevels, LedgerError> {
        check_quantity(quantity)?;
        let product_id = self.id;
        let overflow = || LedgerError::StockOverflow {
            product_id,
            quantity,
        };
        let total = self.total_stock.checked_add(quantity).ok_or_else(overflow)?;
        let available = self
            .available_stock
            .checked_add(quantity)
            .ok_or_else(overflow)?;
        self.total_stock = total;
        self.available_stock = available;
        self.updated_at = at;
        Ok(self.levels())
    }

    fn check_reserved(&self, quantity: u32) -> Result<(), LedgerError> {
        check_quantity(quantity)?;
        if self.reserved_stock < quantity {
            return Err(LedgerError::InsufficientReserved {
                product_id: self.id,
                requested: quantity,
                levels: self.levels(),
            });
        }
        Ok(())
    }
}

fn check_quantity(quantity: u32) -> Result<(), LedgerError> {
    if quantity == 0 {
        return Err(LedgerError::InvalidQuantity { quantity });
    }
    Ok(())
}
