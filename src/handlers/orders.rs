use axum::extract::{Path, State};
use serde::Deserialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::models::{Order, OrderStatus, UpdateOrderStatus};

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>> {
    let conn = state.db.get()?;
    let order = queries::get_order_by_id(&conn, &order_id)?
        .ok_or_else(|| AppError::NotFound(format!("Order not found: {}", order_id)))?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

pub async fn list_store_orders(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>> {
    let conn = state.db.get()?;
    queries::get_store_by_id(&conn, &store_id)?
        .ok_or_else(|| AppError::StoreNotFound(store_id.clone()))?;

    let mut orders = queries::list_orders_by_store(&conn, &store_id)?;
    if let Some(status) = query.status {
        orders.retain(|o| o.status == status);
    }
    Ok(Json(orders))
}

/// Merchant-driven forward transitions (ship, deliver, cancel) and the
/// idempotent re-confirm, all through the same ledger operation the
/// webhook path uses.
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<UpdateOrderStatus>,
) -> Result<Json<Order>> {
    let conn = state.db.get()?;
    queries::transition_order_status(&conn, &order_id, request.status)?;

    let order = queries::get_order_by_id(&conn, &order_id)?
        .ok_or_else(|| AppError::NotFound(format!("Order not found: {}", order_id)))?;
    Ok(Json(order))
}
