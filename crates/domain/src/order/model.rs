//! Order records.

use chrono::{DateTime, Utc};
use common::{CenterId, FactoryId, OrderId, OutletId, ProductId};
use serde::{Deserialize, Serialize};

use super::number::OrderNumber;
use super::state::{ApplicationStatus, FulfillmentStatus, OrderStatus};
use crate::error::TransitionError;

/// Input for an application order, before its number and id are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplicationOrder {
    pub outlet_id: OutletId,
    pub center_id: CenterId,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// An outlet's request for stock of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationOrder {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub outlet_id: OutletId,
    pub center_id: CenterId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub status: ApplicationStatus,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationOrder {
    /// Builds a Pending order from its input.
    pub fn new(
        id: OrderId,
        order_number: OrderNumber,
        input: NewApplicationOrder,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_number,
            outlet_id: input.outlet_id,
            center_id: input.center_id,
            product_id: input.product_id,
            quantity: input.quantity,
            status: ApplicationStatus::initial(),
            remarks: input.remarks,
            created_at: at,
            updated_at: at,
        }
    }

    /// Moves the order along its graph, returning the previous status.
    ///
    /// The order is left untouched when the edge is not allowed.
    pub fn transition_to(
        &mut self,
        next: ApplicationStatus,
        at: DateTime<Utc>,
    ) -> Result<ApplicationStatus, TransitionError> {
        self.status.validate_transition(next)?;
        let previous = self.status;
        self.status = next;
        self.updated_at = at;
        Ok(previous)
    }
}

/// Input for a fulfillment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFulfillmentOrder {
    #[serde(default)]
    pub application_order_id: Option<OrderId>,
    pub factory_id: FactoryId,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// A printing order sent to a factory.
///
/// Orders without an application link publish new stock when completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentOrder {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub application_order_id: Option<OrderId>,
    pub factory_id: FactoryId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub status: FulfillmentStatus,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FulfillmentOrder {
    pub fn new(
        id: OrderId,
        order_number: OrderNumber,
        input: NewFulfillmentOrder,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_number,
            application_order_id: input.application_order_id,
            factory_id: input.factory_id,
            product_id: input.product_id,
            quantity: input.quantity,
            status: FulfillmentStatus::initial(),
            remarks: input.remarks,
            created_at: at,
            updated_at: at,
        }
    }

    /// Returns true when completing this order adds stock to the ledger.
    pub fn publishes_stock(&self) -> bool {
        self.application_order_id.is_none()
    }

    pub fn transition_to(
        &mut self,
        next: FulfillmentStatus,
        at: DateTime<Utc>,
    ) -> Result<FulfillmentStatus, TransitionError> {
        self.status.validate_transition(next)?;
        let previous = self.status;
        self.status = next;
        self.updated_at = at;
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application() -> ApplicationOrder {
        ApplicationOrder::new(
            OrderId::new(1),
            "APP-20260101-00001".parse().unwrap(),
            NewApplicationOrder {
                outlet_id: OutletId::new(10),
                center_id: CenterId::new(20),
                product_id: ProductId::new(30),
                quantity: 40,
                remarks: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_new_application_order_is_pending() {
        let order = application();
        assert_eq!(order.status, ApplicationStatus::Pending);
        assert_eq!(order.created_at, order.updated_at);
    }

    #[test]
    fn test_rejected_transition_leaves_order_pending() {
        let mut order = application();
        let before = order.clone();

        let result = order.transition_to(ApplicationStatus::Shipped, Utc::now());

        assert!(matches!(
            result,
            Err(TransitionError::InvalidTransition { .. })
        ));
        assert_eq!(order, before);
    }

    #[test]
    fn test_accepted_transition_returns_previous() {
        let mut order = application();
        let previous = order
            .transition_to(ApplicationStatus::Approved, Utc::now())
            .unwrap();
        assert_eq!(previous, ApplicationStatus::Pending);
        assert_eq!(order.status, ApplicationStatus::Approved);

        // Replaying the same edge is refused because the order moved on.
        assert!(
            order
                .transition_to(ApplicationStatus::Approved, Utc::now())
                .is_err()
        );
    }

    #[test]
    fn test_fulfillment_link_decides_publication() {
        let input = NewFulfillmentOrder {
            application_order_id: None,
            factory_id: FactoryId::new(1),
            product_id: ProductId::new(2),
            quantity: 100,
            remarks: None,
        };
        let number: OrderNumber = "FUL-20260101-00001".parse().unwrap();
        let published = FulfillmentOrder::new(OrderId::new(1), number.clone(), input.clone(), Utc::now());
        assert!(published.publishes_stock());

        let linked = FulfillmentOrder::new(
            OrderId::new(2),
            number,
            NewFulfillmentOrder {
                application_order_id: Some(OrderId::new(9)),
                ..input
            },
            Utc::now(),
        );
        assert!(!linked.publishes_stock());
    }

    #[test]
    fn test_application_order_serializes_camel_case() {
        let json = serde_json::to_value(application()).unwrap();
        assert_eq!(json["orderNumber"], "APP-20260101-00001");
        assert_eq!(json["outletId"], 10);
        assert_eq!(json["status"], "Pending");
    }
}
