//! HTTP handlers, grouped by resource.

pub mod applications;
pub mod fulfillments;
pub mod health;
pub mod history;
pub mod ledger;
pub mod metrics;
pub mod products;

use axum::body::Bytes;
use common::OrderId;
use domain::{ApplicationOrder, FulfillmentOrder, TransitionContext};
use serde::Serialize;

use crate::error::ApiError;

/// Body of every order operation response, success or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
    /// Set on approvals that raised a fulfillment order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfillment_order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfillment_order_number: Option<String>,
}

impl OperationResponse {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            order_id: None,
            order_number: None,
            current_status: None,
            fulfillment_order_id: None,
            fulfillment_order_number: None,
        }
    }

    pub fn application(message: impl Into<String>, order: &ApplicationOrder) -> Self {
        Self {
            success: true,
            order_id: Some(order.id),
            order_number: Some(order.order_number.to_string()),
            current_status: Some(order.status.to_string()),
            ..Self::failed(message)
        }
    }

    pub fn fulfillment(message: impl Into<String>, order: &FulfillmentOrder) -> Self {
        Self {
            success: true,
            order_id: Some(order.id),
            order_number: Some(order.order_number.to_string()),
            current_status: Some(order.status.to_string()),
            ..Self::failed(message)
        }
    }

    pub fn with_fulfillment(mut self, order: &FulfillmentOrder) -> Self {
        self.fulfillment_order_id = Some(order.id);
        self.fulfillment_order_number = Some(order.order_number.to_string());
        self
    }
}

/// Reads the optional operator context of a transition request.
///
/// An empty body means no context.
pub(crate) fn transition_context(body: &Bytes) -> Result<TransitionContext, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TransitionContext::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid transition body: {e}")))
}
