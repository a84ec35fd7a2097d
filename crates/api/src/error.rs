//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::OrderId;
use domain::{LedgerError, SequenceError};
use inventory::{InventoryError, LedgerResponse};
use lock::LockError;
use saga::{RefusalKind, SagaError};
use store::StoreError;

use crate::routes::OperationResponse;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Ledger service error; rendered in the ledger response shape.
    Inventory(InventoryError),
    /// Order service error, with the order it concerned when known.
    Saga {
        error: SagaError,
        order_id: Option<OrderId>,
    },
    /// Repository error outside any saga step.
    Store(StoreError),
}

impl ApiError {
    /// Attaches the order id to a saga error.
    pub fn for_order(order_id: OrderId) -> impl Fn(SagaError) -> ApiError {
        move |error| ApiError::Saga {
            error,
            order_id: Some(order_id),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => failure(StatusCode::NOT_FOUND, message),
            ApiError::BadRequest(message) => failure(StatusCode::BAD_REQUEST, message),
            ApiError::Inventory(err) => {
                let status = inventory_status(&err);
                log_server_error(status, &err);
                let body = LedgerResponse::failed(err.to_string(), err.levels());
                (status, Json(body)).into_response()
            }
            ApiError::Saga { error, order_id } => {
                let status = saga_status(&error);
                log_server_error(status, &error);
                let body = OperationResponse {
                    success: false,
                    message: error.to_string(),
                    order_id,
                    order_number: None,
                    current_status: error.current_status().map(str::to_string),
                    fulfillment_order_id: None,
                    fulfillment_order_number: None,
                };
                (status, Json(body)).into_response()
            }
            ApiError::Store(err) => {
                let status = store_status(&err);
                log_server_error(status, &err);
                failure(status, err.to_string())
            }
        }
    }
}

fn failure(status: StatusCode, message: String) -> Response {
    (status, Json(OperationResponse::failed(message))).into_response()
}

fn log_server_error(status: StatusCode, err: &dyn std::error::Error) {
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = %err, "request failed");
    }
}

fn inventory_status(err: &InventoryError) -> StatusCode {
    match err {
        InventoryError::Validation(_) => StatusCode::BAD_REQUEST,
        InventoryError::Ledger(LedgerError::ProductNotFound(_)) => StatusCode::NOT_FOUND,
        InventoryError::Ledger(
            LedgerError::InsufficientStock { .. } | LedgerError::InsufficientReserved { .. },
        ) => StatusCode::CONFLICT,
        InventoryError::Ledger(LedgerError::InconsistentCounters { .. }) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        InventoryError::Ledger(_) => StatusCode::BAD_REQUEST,
        InventoryError::Lock(LockError::AcquisitionFailed { .. } | LockError::StoreUnavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        InventoryError::Store(err) => store_status(err),
    }
}

fn saga_status(err: &SagaError) -> StatusCode {
    match err {
        SagaError::Validation(_) => StatusCode::BAD_REQUEST,
        SagaError::OrderNotFound { .. } => StatusCode::NOT_FOUND,
        SagaError::Transition(_) => StatusCode::CONFLICT,
        SagaError::LedgerRefused { refusal, .. } => match refusal.kind {
            RefusalKind::ProductNotFound => StatusCode::NOT_FOUND,
            RefusalKind::InsufficientStock | RefusalKind::InsufficientReserved => {
                StatusCode::CONFLICT
            }
            RefusalKind::Invalid => StatusCode::BAD_REQUEST,
        },
        SagaError::UpstreamCallFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
        SagaError::StatusWriteFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        SagaError::Sequence(SequenceError::SequenceExhausted { .. }) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SagaError::Sequence(SequenceError::Malformed(_)) => StatusCode::BAD_REQUEST,
        SagaError::Lock(LockError::AcquisitionFailed { .. }) => StatusCode::CONFLICT,
        SagaError::Lock(LockError::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        SagaError::Store(err) => store_status(err),
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::StatusConflict { .. } | StoreError::DuplicateOrderNumber(_) => {
            StatusCode::CONFLICT
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}

impl From<SagaError> for ApiError {
    fn from(error: SagaError) -> Self {
        ApiError::Saga {
            error,
            order_id: None,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
