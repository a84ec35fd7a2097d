//! Fulfillment order lifecycle.

use std::sync::Arc;

use chrono::Utc;
use common::{FactoryId, OrderId, OrderKind};
use domain::{
    ApplicationOrder, FulfillmentOrder, FulfillmentStatus, NewFulfillmentOrder, OrderNumber,
    OrderStatus, SequenceGenerator, TransitionContext, prefix_for,
};
use inventory::LedgerRequest;
use store::{FulfillmentFilter, OrderStore, StatusUpdate};

use crate::error::{Result, SagaError};
use crate::history::HistoryService;
use crate::locking::OrderLocks;
use crate::retry::{StatusWritePolicy, status_write_failed};
use crate::services::LedgerClient;
use crate::steps::{self, STEP_RESTOCK, STEP_STATUS_UPDATE};

/// Drives fulfillment orders from Pending to Completed.
///
/// Only completion of an unlinked order touches the ledger.
pub struct FulfillmentOrderService<L, S> {
    ledger: L,
    store: S,
    history: HistoryService<S>,
    numbers: Arc<SequenceGenerator>,
    locks: OrderLocks,
    policy: StatusWritePolicy,
}

impl<L: Clone, S: Clone> Clone for FulfillmentOrderService<L, S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            store: self.store.clone(),
            history: self.history.clone(),
            numbers: Arc::clone(&self.numbers),
            locks: self.locks.clone(),
            policy: self.policy,
        }
    }
}

impl<L, S> FulfillmentOrderService<L, S>
where
    L: LedgerClient + Clone,
    S: OrderStore + Clone,
{
    pub fn new(
        ledger: L,
        store: S,
        numbers: Arc<SequenceGenerator>,
        locks: OrderLocks,
        policy: StatusWritePolicy,
    ) -> Self {
        Self {
            history: HistoryService::new(store.clone()),
            ledger,
            store,
            numbers,
            locks,
            policy,
        }
    }

    /// Creates an unlinked order whose output is published on completion.
    #[tracing::instrument(skip(self, input), fields(factory_id = %input.factory_id, product_id = %input.product_id))]
    pub async fn create(&self, input: NewFulfillmentOrder) -> Result<FulfillmentOrder> {
        if input.application_order_id.is_some() {
            return Err(SagaError::Validation(
                "linked fulfillment orders are created by approving the application order".into(),
            ));
        }
        self.insert(input).await
    }

    /// Creates the Pending fulfillment order that follows an approval.
    pub(crate) async fn create_for_application(
        &self,
        application: &ApplicationOrder,
        factory_id: FactoryId,
    ) -> Result<FulfillmentOrder> {
        self.insert(NewFulfillmentOrder {
            application_order_id: Some(application.id),
            factory_id,
            product_id: application.product_id,
            quantity: application.quantity,
            remarks: None,
        })
        .await
    }

    async fn insert(&self, input: NewFulfillmentOrder) -> Result<FulfillmentOrder> {
        if input.quantity == 0 {
            return Err(SagaError::Validation("quantity must be greater than zero".into()));
        }
        let number = self.numbers.next(prefix_for(OrderKind::Fulfillment))?;
        let order = self
            .store
            .insert_fulfillment(number, input, Utc::now())
            .await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            linked = order.application_order_id.is_some(),
            "fulfillment order created"
        );
        Ok(order)
    }

    /// Pending → InProduction.
    pub async fn accept(&self, id: OrderId, context: TransitionContext) -> Result<FulfillmentOrder> {
        self.advance(id, FulfillmentStatus::InProduction, context)
            .await
    }

    pub async fn mark_waiting_shipment(
        &self,
        id: OrderId,
        context: TransitionContext,
    ) -> Result<FulfillmentOrder> {
        self.advance(id, FulfillmentStatus::WaitingShipment, context)
            .await
    }

    pub async fn ship(&self, id: OrderId, context: TransitionContext) -> Result<FulfillmentOrder> {
        self.advance(id, FulfillmentStatus::Shipped, context).await
    }

    /// Shipped → Completed. Unlinked orders restock the ledger first and the
    /// transition is aborted when the restock fails.
    #[tracing::instrument(skip(self, context))]
    pub async fn complete(&self, id: OrderId, context: TransitionContext) -> Result<FulfillmentOrder> {
        self.locks
            .run(OrderKind::Fulfillment, id, || self.restock_and_complete(id, &context))
            .await
    }

    pub async fn get(&self, id: OrderId) -> Result<FulfillmentOrder> {
        self.load(id).await
    }

    pub async fn get_by_number(&self, number: &str) -> Result<FulfillmentOrder> {
        let parsed: OrderNumber = number
            .parse()
            .map_err(|e: domain::SequenceError| SagaError::Validation(e.to_string()))?;
        self.store
            .get_fulfillment_by_number(&parsed)
            .await?
            .ok_or_else(|| not_found(number))
    }

    pub async fn list(&self, filter: &FulfillmentFilter) -> Result<Vec<FulfillmentOrder>> {
        Ok(self.store.list_fulfillments(filter).await?)
    }

    pub async fn list_for_application(
        &self,
        application_order_id: OrderId,
    ) -> Result<Vec<FulfillmentOrder>> {
        Ok(self
            .store
            .list_fulfillments_for_application(application_order_id)
            .await?)
    }

    /// Shipped → Completed under the order lock.
    async fn restock_and_complete(
        &self,
        id: OrderId,
        context: &TransitionContext,
    ) -> Result<FulfillmentOrder> {
        let order = self.load(id).await?;
        order.status.validate_transition(FulfillmentStatus::Completed)?;

        if !order.publishes_stock() {
            return self
                .commit(&order, FulfillmentStatus::Completed, context, STEP_STATUS_UPDATE)
                .await;
        }

        let outcome = self
            .ledger
            .restock(LedgerRequest {
                product_id: order.product_id,
                quantity: order.quantity,
                order_ref: order.order_number.to_string(),
            })
            .await;
        steps::record(STEP_RESTOCK, outcome.label());
        let levels = outcome.into_result(STEP_RESTOCK, Some(order.status.as_str()))?;
        tracing::info!(
            order_number = %order.order_number,
            available_stock = levels.available_stock,
            "printed stock published"
        );

        self.commit(&order, FulfillmentStatus::Completed, context, STEP_RESTOCK)
            .await
    }

    async fn advance(
        &self,
        id: OrderId,
        next: FulfillmentStatus,
        context: TransitionContext,
    ) -> Result<FulfillmentOrder> {
        let order = self.load(id).await?;
        order.status.validate_transition(next)?;
        self.commit(&order, next, &context, STEP_STATUS_UPDATE).await
    }

    async fn load(&self, id: OrderId) -> Result<FulfillmentOrder> {
        self.store
            .get_fulfillment(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Writes the status and its history entry.
    ///
    /// `step` names what already took effect; anything other than a plain
    /// status update means a failed write is reported as `StatusWriteFailed`.
    async fn commit(
        &self,
        order: &FulfillmentOrder,
        next: FulfillmentStatus,
        context: &TransitionContext,
        step: &'static str,
    ) -> Result<FulfillmentOrder> {
        let id = order.id;
        let from = order.status;
        let store = &self.store;
        let update = StatusUpdate::new(from, next, Utc::now());

        let written = self
            .policy
            .run("fulfillment status", || {
                let update = update.clone();
                async move { store.update_fulfillment_status(id, update).await }
            })
            .await;
        let updated = match written {
            Ok(updated) => updated,
            Err(e) if step == STEP_STATUS_UPDATE => return Err(SagaError::Store(e)),
            Err(e) => {
                return Err(status_write_failed(
                    order.order_number.as_str(),
                    step,
                    e,
                    Some(from.to_string()),
                ));
            }
        };

        let history = &self.history;
        if let Err(e) = self
            .policy
            .run("fulfillment history", move || {
                history.record_transition(id, from, next, context)
            })
            .await
        {
            return Err(status_write_failed(
                order.order_number.as_str(),
                step,
                e,
                Some(next.to_string()),
            ));
        }

        metrics::counter!("order_transitions_total", "kind" => "fulfillment", "to" => next.as_str())
            .increment(1);
        tracing::info!(
            order_id = %id,
            from = %from,
            to = %next,
            "fulfillment order transitioned"
        );
        Ok(updated)
    }
}

fn not_found(reference: impl ToString) -> SagaError {
    SagaError::OrderNotFound {
        kind: OrderKind::Fulfillment,
        reference: reference.to_string(),
    }
}

