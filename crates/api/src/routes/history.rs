//! Status history queries.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{OrderId, OrderKind};
use domain::StatusHistoryEntry;
use saga::LedgerClient;
use store::OrderStore;

use crate::error::ApiError;
use crate::state::OrderState;

fn parse_kind(kind: &str) -> Result<OrderKind, ApiError> {
    kind.parse().map_err(ApiError::BadRequest)
}

/// GET /history/{order_kind}/{order_id}: oldest first.
pub async fn list<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path((kind, order_id)): Path<(String, i64)>,
) -> Result<Json<Vec<StatusHistoryEntry>>, ApiError>
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    let kind = parse_kind(&kind)?;
    Ok(Json(
        state.history.history(kind, OrderId::new(order_id)).await?,
    ))
}

/// GET /history/{order_kind}/{order_id}/latest
pub async fn latest<L, S>(
    State(state): State<Arc<OrderState<L, S>>>,
    Path((kind, order_id)): Path<(String, i64)>,
) -> Result<Json<StatusHistoryEntry>, ApiError>
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    let kind = parse_kind(&kind)?;
    state
        .history
        .latest(kind, OrderId::new(order_id))
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!("No status history for {kind} order {order_id}"))
        })
}
