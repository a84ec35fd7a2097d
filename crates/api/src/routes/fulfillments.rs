//! Fulfillment order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{FulfillmentOrder, NewFulfillmentOrder};
use saga::LedgerClient;
use store::{FulfillmentFilter, OrderStore};

use super::{OperationResponse, transition_context};
use crate::error::ApiError;
use crate::state::OrderState;

type Response = Result<Json<OperationResponse>, ApiError>;

/// POST /fulfillments: a print run not raised by an application order.
#[tracing::instrument(skip(state, input))]
pub async fn create<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Json(input): Json<NewFulfillmentOrder>,
) -> Result<(StatusCode, Json<OperationResponse>), ApiError>
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    let order = state.fulfillments.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(OperationResponse::fulfillment(
            "Fulfillment order created",
            &order,
        )),
    ))
}

/// POST /fulfillments/{id}/accept
pub async fn accept<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Response
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    let id = OrderId::new(id);
    let order = state
        .fulfillments
        .accept(id, transition_context(&body)?)
        .await
        .map_err(ApiError::for_order(id))?;
    Ok(Json(OperationResponse::fulfillment(
        "Fulfillment order in production",
        &order,
    )))
}

/// POST /fulfillments/{id}/waiting-shipment
pub async fn waiting_shipment<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Response
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    let id = OrderId::new(id);
    let order = state
        .fulfillments
        .mark_waiting_shipment(id, transition_context(&body)?)
        .await
        .map_err(ApiError::for_order(id))?;
    Ok(Json(OperationResponse::fulfillment(
        "Fulfillment order waiting for shipment",
        &order,
    )))
}

/// POST /fulfillments/{id}/ship
pub async fn ship<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Response
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    let id = OrderId::new(id);
    let order = state
        .fulfillments
        .ship(id, transition_context(&body)?)
        .await
        .map_err(ApiError::for_order(id))?;
    Ok(Json(OperationResponse::fulfillment(
        "Fulfillment order shipped",
        &order,
    )))
}

/// POST /fulfillments/{id}/complete: restocks first when unlinked.
#[tracing::instrument(skip(state, body))]
pub async fn complete<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Response
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    let id = OrderId::new(id);
    let order = state
        .fulfillments
        .complete(id, transition_context(&body)?)
        .await
        .map_err(ApiError::for_order(id))?;
    Ok(Json(OperationResponse::fulfillment(
        "Fulfillment order completed",
        &order,
    )))
}

/// GET /fulfillments/{id}
pub async fn get<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path(id): Path<i64>,
) -> Result<Json<FulfillmentOrder>, ApiError>
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    Ok(Json(state.fulfillments.get(OrderId::new(id)).await?))
}

/// GET /fulfillments/number/{order_number}
pub async fn get_by_number<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path(number): Path<String>,
) -> Result<Json<FulfillmentOrder>, ApiError>
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    Ok(Json(state.fulfillments.get_by_number(&number).await?))
}

/// GET /fulfillments/application/{application_order_id}
pub async fn list_for_application<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path(application_order_id): Path<i64>,
) -> Result<Json<Vec<FulfillmentOrder>>, ApiError>
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    Ok(Json(
        state
            .fulfillments
            .list_for_application(OrderId::new(application_order_id))
            .await?,
    ))
}

/// GET /fulfillments?factoryId=&status=
pub async fn list<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Query(filter): Query<FulfillmentFilter>,
) -> Result<Json<Vec<FulfillmentOrder>>, ApiError>
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    Ok(Json(state.fulfillments.list(&filter).await?))
}
