//! Application order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{ApplicationOrder, NewApplicationOrder};
use saga::{ApproveApplication, LedgerClient};
use store::{ApplicationFilter, OrderStore};

use super::{OperationResponse, transition_context};
use crate::error::ApiError;
use crate::state::OrderState;

type Response = Result<Json<OperationResponse>, ApiError>;

/// POST /applications: reserves stock and creates a Pending order.
#[tracing::instrument(skip(state, input))]
pub async fn create<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Json(input): Json<NewApplicationOrder>,
) -> Result<(StatusCode, Json<OperationResponse>), ApiError>
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    let order = state.applications.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(OperationResponse::application(
            "Application order created",
            &order,
        )),
    ))
}

/// POST /applications/{id}/approve
#[tracing::instrument(skip(state, approval))]
pub async fn approve<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path(id): Path<i64>,
    Json(approval): Json<ApproveApplication>,
) -> Response
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    let id = OrderId::new(id);
    let approval = state
        .applications
        .approve(id, approval)
        .await
        .map_err(ApiError::for_order(id))?;

    let response = OperationResponse::application("Application order approved", &approval.order);
    Ok(Json(match &approval.fulfillment {
        Some(fulfillment) => response.with_fulfillment(fulfillment),
        None => response,
    }))
}

/// POST /applications/{id}/reject
#[tracing::instrument(skip(state, body))]
pub async fn reject<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Response
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    let id = OrderId::new(id);
    let context = transition_context(&body)?;
    let order = state
        .applications
        .reject(id, context)
        .await
        .map_err(ApiError::for_order(id))?;
    Ok(Json(OperationResponse::application(
        "Application order rejected",
        &order,
    )))
}

/// POST /applications/{id}/waiting-shipment
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
        .applications
        .mark_waiting_shipment(id, transition_context(&body)?)
        .await
        .map_err(ApiError::for_order(id))?;
    Ok(Json(OperationResponse::application(
        "Application order waiting for shipment",
        &order,
    )))
}

/// POST /applications/{id}/ship
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
        .applications
        .ship(id, transition_context(&body)?)
        .await
        .map_err(ApiError::for_order(id))?;
    Ok(Json(OperationResponse::application(
        "Application order shipped",
        &order,
    )))
}

/// POST /applications/{id}/in-transit
pub async fn in_transit<L, S>(
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
        .applications
        .mark_in_transit(id, transition_context(&body)?)
        .await
        .map_err(ApiError::for_order(id))?;
    Ok(Json(OperationResponse::application(
        "Application order in transit",
        &order,
    )))
}

/// POST /applications/{id}/complete
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
        .applications
        .complete(id, transition_context(&body)?)
        .await
        .map_err(ApiError::for_order(id))?;
    Ok(Json(OperationResponse::application(
        "Application order completed",
        &order,
    )))
}

/// GET /applications/{id}
pub async fn get<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path(id): Path<i64>,
) -> Result<Json<ApplicationOrder>, ApiError>
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    Ok(Json(state.applications.get(OrderId::new(id)).await?))
}

/// GET /applications/number/{order_number}
pub async fn get_by_number<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path(number): Path<String>,
) -> Result<Json<ApplicationOrder>, ApiError>
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    Ok(Json(state.applications.get_by_number(&number).await?))
}

/// GET /applications?outletId=&centerId=&status=
pub async fn list<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Query(filter): Query<ApplicationFilter>,
) -> Result<Json<Vec<ApplicationOrder>>, ApiError>
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    Ok(Json(state.applications.list(&filter).await?))
}
