//! Application order lifecycle: the saga across the ledger boundary.

use std::sync::Arc;

use chrono::Utc;
use common::{FactoryId, OrderId, OrderKind, ProductId};
use domain::{
    ApplicationOrder, ApplicationStatus, FulfillmentOrder, NewApplicationOrder, OrderNumber,
    OrderStatus, SequenceGenerator, TransitionContext, prefix_for,
};
use inventory::LedgerRequest;
use serde::{Deserialize, Serialize};
use store::{ApplicationFilter, OrderStore, StatusUpdate};

use crate::error::{Result, SagaError};
use crate::fulfillment::FulfillmentOrderService;
use crate::history::HistoryService;
use crate::locking::OrderLocks;
use crate::retry::{StatusWritePolicy, status_write_failed};
use crate::services::LedgerClient;
use crate::steps::{
    self, STEP_CONFIRM, STEP_CREATE_FULFILLMENT, STEP_RELEASE, STEP_RELEASE_REMAINDER,
    STEP_RESERVE, STEP_STATUS_UPDATE,
};

/// Input of an approval.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveApplication {
    /// Quantity to sell, between one and the ordered quantity.
    pub approved_quantity: u32,
    /// Factory that prints the approved quantity.
    pub factory_id: FactoryId,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(flatten)]
    pub context: TransitionContext,
}

/// An approved order and the fulfillment order raised for it.
///
/// `fulfillment` is `None` when creating it failed after the approval was
/// committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub order: ApplicationOrder,
    pub fulfillment: Option<FulfillmentOrder>,
}

/// Orchestrates application orders: every ledger call happens before the
/// status write it guards.
pub struct ApplicationOrderService<L, S> {
    ledger: L,
    store: S,
    history: HistoryService<S>,
    numbers: Arc<SequenceGenerator>,
    fulfillments: FulfillmentOrderService<L, S>,
    locks: OrderLocks,
    policy: StatusWritePolicy,
}

impl<L: Clone, S: Clone> Clone for ApplicationOrderService<L, S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            store: self.store.clone(),
            history: self.history.clone(),
            numbers: Arc::clone(&self.numbers),
            fulfillments: self.fulfillments.clone(),
            locks: self.locks.clone(),
            policy: self.policy,
        }
    }
}

impl<L, S> ApplicationOrderService<L, S>
where
    L: LedgerClient + Clone,
    S: OrderStore + Clone,
{
    /// `fulfillments` receives the orders raised by approvals.
    pub fn new(
        ledger: L,
        store: S,
        numbers: Arc<SequenceGenerator>,
        fulfillments: FulfillmentOrderService<L, S>,
        locks: OrderLocks,
        policy: StatusWritePolicy,
    ) -> Self {
        Self {
            history: HistoryService::new(store.clone()),
            ledger,
            store,
            numbers,
            fulfillments,
            locks,
            policy,
        }
    }

    /// Reserves the stock, then persists the order as Pending.
    ///
    /// Nothing is written when the reservation fails.
    #[tracing::instrument(
        skip(self, input),
        fields(outlet_id = %input.outlet_id, product_id = %input.product_id, quantity = input.quantity)
    )]
    pub async fn create(&self, input: NewApplicationOrder) -> Result<ApplicationOrder> {
        if input.quantity == 0 {
            return Err(SagaError::Validation("quantity must be greater than zero".into()));
        }
        let number = self.numbers.next(prefix_for(OrderKind::Application))?;

        let outcome = self
            .ledger
            .reserve(request(input.product_id, input.quantity, &number))
            .await;
        steps::record(STEP_RESERVE, outcome.label());
        outcome.into_result(STEP_RESERVE, None)?;

        let store = &self.store;
        let at = Utc::now();
        let inserted = self
            .policy
            .run("insert application order", || {
                let (number, input) = (number.clone(), input.clone());
                async move { store.insert_application(number, input, at).await }
            })
            .await;

        match inserted {
            Ok(order) => {
                tracing::info!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    "application order created"
                );
                Ok(order)
            }
            Err(e) => Err(status_write_failed(number.as_str(), STEP_RESERVE, e, None)),
        }
    }

    /// Confirms the approved quantity, approves the order, releases any
    /// unapproved remainder and raises the linked fulfillment order.
    ///
    /// A refused or failed confirm leaves the order Pending with no history.
    #[tracing::instrument(skip(self, approval), fields(approved_quantity = approval.approved_quantity))]
    pub async fn approve(&self, id: OrderId, approval: ApproveApplication) -> Result<Approval> {
        let (order, approved_order) = self
            .locks
            .run(OrderKind::Application, id, || self.confirm_approval(id, &approval))
            .await?;
        let approved = approval.approved_quantity;

        let remainder = order.quantity - approved;
        if remainder > 0 {
            let outcome = self
                .ledger
                .release(request(order.product_id, remainder, &order.order_number))
                .await;
            steps::record(STEP_RELEASE_REMAINDER, outcome.label());
            if let Err(e) = outcome.into_result(STEP_RELEASE_REMAINDER, None) {
                tracing::error!(
                    order_number = %order.order_number,
                    remainder,
                    error = %e,
                    "unapproved remainder was not released"
                );
            }
        }

        let fulfillment = match self
            .fulfillments
            .create_for_application(&approved_order, approval.factory_id)
            .await
        {
            Ok(fulfillment) => {
                steps::record(STEP_CREATE_FULFILLMENT, "applied");
                Some(fulfillment)
            }
            Err(e) => {
                steps::record(STEP_CREATE_FULFILLMENT, "failed");
                tracing::error!(
                    order_number = %order.order_number,
                    error = %e,
                    "fulfillment order for approved application was not created"
                );
                None
            }
        };

        Ok(Approval {
            order: approved_order,
            fulfillment,
        })
    }

    /// Releases the whole reservation, then rejects the order.
    ///
    /// The context reason is stored as the order remarks.
    #[tracing::instrument(skip(self, context))]
    pub async fn reject(&self, id: OrderId, context: TransitionContext) -> Result<ApplicationOrder> {
        self.locks
            .run(OrderKind::Application, id, || self.release_and_reject(id, &context))
            .await
    }

    pub async fn mark_waiting_shipment(
        &self,
        id: OrderId,
        context: TransitionContext,
    ) -> Result<ApplicationOrder> {
        self.advance(id, ApplicationStatus::WaitingShipment, context)
            .await
    }

    pub async fn ship(&self, id: OrderId, context: TransitionContext) -> Result<ApplicationOrder> {
        self.advance(id, ApplicationStatus::Shipped, context).await
    }

    pub async fn mark_in_transit(
        &self,
        id: OrderId,
        context: TransitionContext,
    ) -> Result<ApplicationOrder> {
        self.advance(id, ApplicationStatus::InTransit, context)
            .await
    }

    pub async fn complete(&self, id: OrderId, context: TransitionContext) -> Result<ApplicationOrder> {
        self.advance(id, ApplicationStatus::Completed, context)
            .await
    }

    pub async fn get(&self, id: OrderId) -> Result<ApplicationOrder> {
        self.load(id).await
    }

    pub async fn get_by_number(&self, number: &str) -> Result<ApplicationOrder> {
        let parsed: OrderNumber = number
            .parse()
            .map_err(|e: domain::SequenceError| SagaError::Validation(e.to_string()))?;
        self.store
            .get_application_by_number(&parsed)
            .await?
            .ok_or_else(|| not_found(number))
    }

    pub async fn list(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationOrder>> {
        Ok(self.store.list_applications(filter).await?)
    }

    pub fn fulfillments(&self) -> &FulfillmentOrderService<L, S> {
        &self.fulfillments
    }

    /// Downstream moves: no ledger call.
    #[tracing::instrument(skip(self, context))]
    async fn advance(
        &self,
        id: OrderId,
        next: ApplicationStatus,
        context: TransitionContext,
    ) -> Result<ApplicationOrder> {
        let order = self.load(id).await?;
        order.status.validate_transition(next)?;
        let update = StatusUpdate::new(order.status, next, Utc::now());
        self.commit(&order, update, &context, STEP_STATUS_UPDATE)
            .await
    }

    /// Pending → Approved under the order lock. Returns the order as loaded
    /// and as approved.
    async fn confirm_approval(
        &self,
        id: OrderId,
        approval: &ApproveApplication,
    ) -> Result<(ApplicationOrder, ApplicationOrder)> {
        let order = self.load(id).await?;
        order.status.validate_transition(ApplicationStatus::Approved)?;
        let approved = approval.approved_quantity;
        if approved == 0 || approved > order.quantity {
            return Err(SagaError::Validation(format!(
                "approved quantity must be between 1 and {}",
                order.quantity
            )));
        }

        let outcome = self
            .ledger
            .confirm(request(order.product_id, approved, &order.order_number))
            .await;
        steps::record(STEP_CONFIRM, outcome.label());
        outcome.into_result(STEP_CONFIRM, Some(order.status.as_str()))?;

        let update = StatusUpdate::new(order.status, ApplicationStatus::Approved, Utc::now())
            .with_quantity(approved)
            .with_remarks(approval.remarks.clone());
        let approved_order = self
            .commit(&order, update, &approval.context, STEP_CONFIRM)
            .await?;
        Ok((order, approved_order))
    }

    /// Pending → Rejected under the order lock.
    async fn release_and_reject(
        &self,
        id: OrderId,
        context: &TransitionContext,
    ) -> Result<ApplicationOrder> {
        let order = self.load(id).await?;
        order.status.validate_transition(ApplicationStatus::Rejected)?;

        let outcome = self
            .ledger
            .release(request(order.product_id, order.quantity, &order.order_number))
            .await;
        steps::record(STEP_RELEASE, outcome.label());
        outcome.into_result(STEP_RELEASE, Some(order.status.as_str()))?;

        let update = StatusUpdate::new(order.status, ApplicationStatus::Rejected, Utc::now())
            .with_remarks(context.reason.clone());
        self.commit(&order, update, context, STEP_RELEASE).await
    }

    async fn load(&self, id: OrderId) -> Result<ApplicationOrder> {
        self.store
            .get_application(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Writes the status and its history entry after `step` took effect.
    async fn commit(
        &self,
        order: &ApplicationOrder,
        update: StatusUpdate<ApplicationStatus>,
        context: &TransitionContext,
        step: &'static str,
    ) -> Result<ApplicationOrder> {
        let id = order.id;
        let (from, next) = (update.expected, update.next);
        let store = &self.store;

        let written = self
            .policy
            .run("application status", || {
                let update = update.clone();
                async move { store.update_application_status(id, update).await }
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
            .run("application history", move || {
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

        metrics::counter!("order_transitions_total", "kind" => "application", "to" => next.as_str())
            .increment(1);
        tracing::info!(
            order_id = %id,
            from = %from,
            to = %next,
            "application order transitioned"
        );
        Ok(updated)
    }
}

fn request(product_id: ProductId, quantity: u32, number: &OrderNumber) -> LedgerRequest {
    LedgerRequest {
        product_id,
        quantity,
        order_ref: number.to_string(),
    }
}

fn not_found(reference: impl ToString) -> SagaError {
    SagaError::OrderNotFound {
        kind: OrderKind::Application,
        reference: reference.to_string(),
    }
}
