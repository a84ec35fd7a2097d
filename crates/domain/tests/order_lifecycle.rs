//! Lifecycle tests for orders and ledger counters working together.

use chrono::Utc;
use common::{CenterId, FactoryId, OrderId, OutletId, ProductId};
use domain::{
    ApplicationOrder, ApplicationStatus, FulfillmentOrder, FulfillmentStatus, LedgerError,
    NewApplicationOrder, NewFulfillmentOrder, NewProduct, OrderStatus, ProductLedger,
    SequenceGenerator, TransitionError, prefix_for,
};

fn ledger(initial_stock: u32) -> ProductLedger {
    ProductLedger::register(
        ProductId::new(1),
        NewProduct {
            name: "Lucky 7".to_string(),
            description: Some("Instant ticket".to_string()),
            center_id: CenterId::new(1),
            unit_price_cents: 200,
            initial_stock,
        },
        Utc::now(),
    )
}

fn application(numbers: &SequenceGenerator, quantity: u32) -> ApplicationOrder {
    ApplicationOrder::new(
        OrderId::new(1),
        numbers.next(prefix_for(common::OrderKind::Application)).unwrap(),
        NewApplicationOrder {
            outlet_id: OutletId::new(1),
            center_id: CenterId::new(1),
            product_id: ProductId::new(1),
            quantity,
            remarks: None,
        },
        Utc::now(),
    )
}

mod application_lifecycle {
    use super::*;

    #[test]
    fn approved_order_walks_to_completion() {
        let numbers = SequenceGenerator::default();
        let mut stock = ledger(100);
        let mut order = application(&numbers, 30);

        stock.reserve(order.quantity, Utc::now()).unwrap();
        stock.confirm(order.quantity, Utc::now()).unwrap();
        order
            .transition_to(ApplicationStatus::Approved, Utc::now())
            .unwrap();

        for next in [
            ApplicationStatus::WaitingShipment,
            ApplicationStatus::Shipped,
            ApplicationStatus::InTransit,
            ApplicationStatus::Completed,
        ] {
            order.transition_to(next, Utc::now()).unwrap();
        }

        assert!(order.status.is_terminal());
        assert_eq!(stock.sold_stock(), 30);
        assert_eq!(stock.available_stock(), 70);
    }

    #[test]
    fn rejected_order_returns_stock() {
        let numbers = SequenceGenerator::default();
        let mut stock = ledger(100);
        let mut order = application(&numbers, 20);

        stock.reserve(order.quantity, Utc::now()).unwrap();
        stock.release(order.quantity, Utc::now()).unwrap();
        order
            .transition_to(ApplicationStatus::Rejected, Utc::now())
            .unwrap();

        assert_eq!(stock.available_stock(), 100);
        assert_eq!(stock.reserved_stock(), 0);
        assert!(
            order
                .transition_to(ApplicationStatus::Approved, Utc::now())
                .is_err()
        );
    }

    #[test]
    fn skipping_ahead_is_refused() {
        let numbers = SequenceGenerator::default();
        let mut order = application(&numbers, 5);

        let err = order
            .transition_to(ApplicationStatus::Shipped, Utc::now())
            .unwrap_err();

        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
        assert_eq!(order.status, ApplicationStatus::Pending);
    }

    #[test]
    fn oversized_application_cannot_reserve() {
        let mut stock = ledger(10);
        let err = stock.reserve(11, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { .. }));
        assert_eq!(stock.available_stock(), 10);
    }
}

mod fulfillment_lifecycle {
    use super::*;

    #[test]
    fn publication_order_restocks_on_completion() {
        let numbers = SequenceGenerator::default();
        let mut stock = ledger(0);
        let mut order = FulfillmentOrder::new(
            OrderId::new(1),
            numbers.next("FUL").unwrap(),
            NewFulfillmentOrder {
                application_order_id: None,
                factory_id: FactoryId::new(2),
                product_id: ProductId::new(1),
                quantity: 1_000,
                remarks: None,
            },
            Utc::now(),
        );

        for next in [
            FulfillmentStatus::InProduction,
            FulfillmentStatus::WaitingShipment,
            FulfillmentStatus::Shipped,
        ] {
            order.transition_to(next, Utc::now()).unwrap();
        }
        if order.publishes_stock() {
            stock.restock(order.quantity, Utc::now()).unwrap();
        }
        order
            .transition_to(FulfillmentStatus::Completed, Utc::now())
            .unwrap();

        assert_eq!(stock.total_stock(), 1_000);
        assert_eq!(stock.available_stock(), 1_000);
        assert!(order.status.is_terminal());
    }

    #[test]
    fn numbering_is_independent_from_applications() {
        let numbers = SequenceGenerator::default();
        let app = numbers.next("APP").unwrap();
        let ful = numbers.next("FUL").unwrap();
        assert_eq!(app.sequence(), 1);
        assert_eq!(ful.sequence(), 1);
        assert_ne!(app, ful);
    }
}
