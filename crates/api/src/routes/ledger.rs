//! Stock ledger mutations and stats: the surface the order service calls.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Path, Request, State};
use common::ProductId;
use domain::StockStats;
use inventory::{InventoryError, LedgerOperation, LedgerRequest, LedgerResponse};
use lock::LockStore;
use store::ProductRepository;

use crate::error::ApiError;
use crate::state::InventoryState;

/// JSON body whose rejection is answered in the ledger response shape.
pub struct LedgerJson<T>(pub T);

impl<S, T> FromRequest<S> for LedgerJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::Inventory(InventoryError::Validation(
                rejection.body_text(),
            ))),
        }
    }
}

/// POST /reserve
pub async fn reserve<R, S>(
    State(state): State<Arc<InventoryState<R, S>>>,
    LedgerJson(req): LedgerJson<LedgerRequest>,
) -> Result<Json<LedgerResponse>, ApiError>
where
    R: ProductRepository + 'static,
    S: LockStore + Clone + 'static,
{
    apply(&state, LedgerOperation::Reserve, req).await
}

/// POST /release
pub async fn release<R, S>(
    State(state): State<Arc<InventoryState<R, S>>>,
    LedgerJson(req): LedgerJson<LedgerRequest>,
) -> Result<Json<LedgerResponse>, ApiError>
where
    R: ProductRepository + 'static,
    S: LockStore + Clone + 'static,
{
    apply(&state, LedgerOperation::Release, req).await
}

/// POST /confirm
pub async fn confirm<R, S>(
    State(state): State<Arc<InventoryState<R, S>>>,
    LedgerJson(req): LedgerJson<LedgerRequest>,
) -> Result<Json<LedgerResponse>, ApiError>
where
    R: ProductRepository + 'static,
    S: LockStore + Clone + 'static,
{
    apply(&state, LedgerOperation::Confirm, req).await
}

/// POST /restock
pub async fn restock<R, S>(
    State(state): State<Arc<InventoryState<R, S>>>,
    LedgerJson(req): LedgerJson<LedgerRequest>,
) -> Result<Json<LedgerResponse>, ApiError>
where
    R: ProductRepository + 'static,
    S: LockStore + Clone + 'static,
{
    apply(&state, LedgerOperation::Restock, req).await
}

/// GET /stats/{product_id}
#[tracing::instrument(skip(state))]
pub async fn stats<R, S>(
    State(state): State<Arc<InventoryState<R, S>>>,
    Path(product_id): Path<i64>,
) -> Result<Json<StockStats>, ApiError>
where
    R: ProductRepository + 'static,
    S: LockStore + Clone + 'static,
{
    Ok(Json(state.ledger.stats(ProductId::new(product_id)).await?))
}

async fn apply<R, S>(
    state: &InventoryState<R, S>,
    operation: LedgerOperation,
    req: LedgerRequest,
) -> Result<Json<LedgerResponse>, ApiError>
where
    R: ProductRepository + 'static,
    S: LockStore + Clone + 'static,
{
    let levels = state
        .ledger
        .apply(operation, req.product_id, req.quantity, &req.order_ref)
        .await?;
    let message = match operation {
        LedgerOperation::Reserve => "Stock reserved",
        LedgerOperation::Release => "Reservation released",
        LedgerOperation::Confirm => "Reservation confirmed",
        LedgerOperation::Restock => "Stock added",
    };
    Ok(Json(LedgerResponse::applied(message, levels)))
}
