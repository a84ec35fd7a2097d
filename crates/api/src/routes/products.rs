//! Product registration and catalogue queries.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CenterId, ProductId};
use domain::{NewProduct, ProductLedger};
use lock::LockStore;
use store::ProductRepository;

use crate::error::ApiError;
use crate::state::InventoryState;

/// POST /products
#[tracing::instrument(skip(state, product))]
pub async fn create<R, S>(
    State(state): State<Arc<InventoryState<R, S>>>,
    Json(product): Json<NewProduct>,
) -> Result<(StatusCode, Json<ProductLedger>), ApiError>
where
    R: ProductRepository + 'static,
    S: LockStore + Clone + 'static,
{
    let product = state.ledger.register_product(product).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products
pub async fn list<R, S>(
    State(state): State<Arc<InventoryState<R, S>>>,
) -> Result<Json<Vec<ProductLedger>>, ApiError>
where
    R: ProductRepository + 'static,
    S: LockStore + Clone + 'static,
{
    Ok(Json(state.ledger.list_products().await?))
}

/// GET /products/{id}
pub async fn get<R, S>(
    State(state): State<Arc<InventoryState<R, S>>>,
    Path(id): Path<i64>,
) -> Result<Json<ProductLedger>, ApiError>
where
    R: ProductRepository + 'static,
    S: LockStore + Clone + 'static,
{
    Ok(Json(state.ledger.get_product(ProductId::new(id)).await?))
}

/// GET /products/center/{center_id}
pub async fn list_by_center<R, S>(
    State(state): State<Arc<InventoryState<R, S>>>,
    Path(center_id): Path<i64>,
) -> Result<Json<Vec<ProductLedger>>, ApiError>
where
    R: ProductRepository + 'static,
    S: LockStore + Clone + 'static,
{
    Ok(Json(
        state
            .ledger
            .list_products_by_center(CenterId::new(center_id))
            .await?,
    ))
}
