//! Status history service.

use chrono::Utc;
use common::{OrderId, OrderKind};
use domain::{NewStatusHistoryEntry, OrderStatus, StatusHistoryEntry, TransitionContext};
use store::{HistoryRepository, Result};

/// Records and reads the append-only transition log.
#[derive(Clone)]
pub struct HistoryService<H> {
    repository: H,
}

impl<H: HistoryRepository> HistoryService<H> {
    pub fn new(repository: H) -> Self {
        Self { repository }
    }

    /// Appends one accepted transition. Replays append new rows.
    #[tracing::instrument(skip(self, context), fields(kind = %S::KIND))]
    pub async fn record_transition<S: OrderStatus>(
        &self,
        order_id: OrderId,
        from: S,
        to: S,
        context: &TransitionContext,
    ) -> Result<StatusHistoryEntry> {
        let entry = self
            .repository
            .append(NewStatusHistoryEntry {
                order_kind: S::KIND,
                order_id,
                from_status: from.to_string(),
                to_status: to.to_string(),
                context: context.clone(),
                created_at: Utc::now(),
            })
            .await?;

        tracing::debug!(history_id = entry.id, "status transition recorded");
        Ok(entry)
    }

    /// All transitions of an order, oldest first.
    pub async fn history(
        &self,
        kind: OrderKind,
        order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>> {
        self.repository.list_for_order(kind, order_id).await
    }

    pub async fn latest(
        &self,
        kind: OrderKind,
        order_id: OrderId,
    ) -> Result<Option<StatusHistoryEntry>> {
        self.repository.latest_for_order(kind, order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ApplicationStatus, FulfillmentStatus};
    use store::InMemoryOrderStore;

    #[tokio::test]
    async fn test_record_and_read_back() {
        let service = HistoryService::new(InMemoryOrderStore::new());
        let id = OrderId::new(1);
        let ctx = TransitionContext::with_reason("out of stock");

        service
            .record_transition(id, ApplicationStatus::Pending, ApplicationStatus::Rejected, &ctx)
            .await
            .unwrap();
        service
            .record_transition(
                id,
                FulfillmentStatus::Pending,
                FulfillmentStatus::InProduction,
                &TransitionContext::default(),
            )
            .await
            .unwrap();

        let history = service.history(OrderKind::Application, id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status, "Pending");
        assert_eq!(history[0].to_status, "Rejected");
        assert_eq!(history[0].reason.as_deref(), Some("out of stock"));

        let latest = service
            .latest(OrderKind::Fulfillment, id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.to_status, "InProduction");
    }

    #[tokio::test]
    async fn test_replayed_transition_appends_twice() {
        let service = HistoryService::new(InMemoryOrderStore::new());
        let id = OrderId::new(3);
        for _ in 0..2 {
            service
                .record_transition(
                    id,
                    ApplicationStatus::Shipped,
                    ApplicationStatus::InTransit,
                    &TransitionContext::default(),
                )
                .await
                .unwrap();
        }
        assert_eq!(
            service
                .history(OrderKind::Application, id)
                .await
                .unwrap()
                .len(),
            2
        );
    }
}
