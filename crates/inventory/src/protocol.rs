//! Wire types of the ledger HTTP surface.

use common::ProductId;
use domain::StockLevels;
use serde::{Deserialize, Serialize};

/// Body of `POST /reserve`, `/release`, `/confirm` and `/restock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Order number the mutation is made for. Used for audit logging.
    pub order_ref: String,
}

/// Reply to every ledger mutation, success or not.
///
/// Counters are `null` when the product does not exist or the failure
/// happened before the ledger row was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerResponse {
    pub success: bool,
    pub message: String,
    pub available_stock: Option<u32>,
    pub reserved_stock: Option<u32>,
}

impl LedgerResponse {
    pub fn applied(message: impl Into<String>, levels: StockLevels) -> Self {
        Self {
            success: true,
            message: message.into(),
            available_stock: Some(levels.available_stock),
            reserved_stock: Some(levels.reserved_stock),
        }
    }

    pub fn failed(message: impl Into<String>, levels: Option<StockLevels>) -> Self {
        Self {
            success: false,
            message: message.into(),
            available_stock: levels.map(|l| l.available_stock),
            reserved_stock: levels.map(|l| l.reserved_stock),
        }
    }

    /// Counters carried by the response, when both are present.
    pub fn levels(&self) -> Option<StockLevels> {
        Some(StockLevels {
            available_stock: self.available_stock?,
            reserved_stock: self.reserved_stock?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case() {
        let request: LedgerRequest =
            serde_json::from_str(r#"{"productId":3,"quantity":5,"orderRef":"APP-20260101-00001"}"#)
                .unwrap();
        assert_eq!(request.product_id, ProductId::new(3));
        assert_eq!(request.order_ref, "APP-20260101-00001");
    }

    #[test]
    fn test_failed_response_without_counters() {
        let response = LedgerResponse::failed("Product not found: 9", None);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["availableStock"].is_null());
        assert!(response.levels().is_none());
    }
}
