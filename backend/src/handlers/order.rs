//! Order handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use shared::Order;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::order::{export_to_csv, CreateOrderInput, OrderFilter, RespondOrderInput};
use crate::services::OrderService;
use crate::AppState;

/// Place an order on a listing
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let service = OrderService::new(state.db.clone());
    let order = service.create(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Orders placed by the current user
pub async fn sent_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<Vec<Order>>> {
    let service = OrderService::new(state.db.clone());
    let orders = service.sent(&current_user.0, &filter).await?;
    Ok(Json(orders))
}

/// Orders received by the current farmer
pub async fn received_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<Vec<Order>>> {
    let service = OrderService::new(state.db.clone());
    let orders = service.received(&current_user.0, &filter).await?;
    Ok(Json(orders))
}

/// Received orders as a CSV download
pub async fn export_received_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let service = OrderService::new(state.db.clone());
    let rows = service.received_export(&current_user.0).await?;
    let csv = export_to_csv(&rows)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"received_orders.csv\""),
        ],
        csv,
    ))
}

pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db.clone());
    let order = service.get(&current_user.0, order_id).await?;
    Ok(Json(order))
}

/// Seller accepts or rejects
pub async fn respond_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<RespondOrderInput>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db.clone());
    let order = service.respond(&current_user.0, order_id, input).await?;
    Ok(Json(order))
}
