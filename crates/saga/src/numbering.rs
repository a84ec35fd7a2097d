//! Start-up seeding of the order number sequences.

use common::OrderKind;
use domain::{SequenceGenerator, prefix_for};
use store::OrderStore;

/// Advances both daily sequences past the highest numbers already stored
/// for today, so a restarted service never reissues a number.
pub async fn seed_order_numbers<S: OrderStore + ?Sized>(
    numbers: &SequenceGenerator,
    store: &S,
) -> store::Result<()> {
    let application = store
        .last_application_number(&numbers.today_stem(prefix_for(OrderKind::Application)))
        .await?;
    let fulfillment = store
        .last_fulfillment_number(&numbers.today_stem(prefix_for(OrderKind::Fulfillment)))
        .await?;

    for last in application.iter().chain(fulfillment.iter()) {
        numbers.seed(last);
        tracing::info!(last = %last, "order number sequence seeded");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use common::{CenterId, FactoryId, OutletId, ProductId};
    use domain::{ManualClock, NewApplicationOrder, NewFulfillmentOrder, OrderNumber};
    use store::{
        ApplicationOrderRepository, FulfillmentOrderRepository, InMemoryOrderStore,
    };

    use super::*;

    #[tokio::test]
    async fn test_seeding_continues_after_stored_numbers() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap();
        let store = InMemoryOrderStore::new();
        let number = |s: &str| s.parse::<OrderNumber>().unwrap();

        store
            .insert_application(
                number("APP-20240309-00041"),
                NewApplicationOrder {
                    outlet_id: OutletId::new(1),
                    center_id: CenterId::new(1),
                    product_id: ProductId::new(1),
                    quantity: 5,
                    remarks: None,
                },
                now,
            )
            .await
            .unwrap();
        store
            .insert_fulfillment(
                number("FUL-20240308-00900"),
                NewFulfillmentOrder {
                    application_order_id: None,
                    factory_id: FactoryId::new(1),
                    product_id: ProductId::new(1),
                    quantity: 5,
                    remarks: None,
                },
                now,
            )
            .await
            .unwrap();

        let numbers = SequenceGenerator::new(Arc::new(ManualClock::new(now)));
        seed_order_numbers(&numbers, &store).await.unwrap();

        assert_eq!(numbers.next("APP").unwrap().as_str(), "APP-20240309-00042");
        assert_eq!(numbers.next("FUL").unwrap().as_str(), "FUL-20240309-00001");
    }
}
