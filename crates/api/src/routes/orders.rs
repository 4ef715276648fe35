//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{ItemId, LineId, OrderId, UserId, Version};
use domain::{
    CreateOrder, LineChange, LineItem, LineItemBatch, Money, Order, OrderStatus, PaymentStatus,
    RecordPayment, UpdateOrder,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    pub items: Vec<LineChange>,
}

/// Header patch plus the three line-item change lists.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expected_version: Option<Version>,
    #[serde(flatten)]
    pub batch: LineItemBatch,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    #[serde(default)]
    pub payment_id: Option<String>,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    pub ids: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub total: Money,
    pub version: Version,
    pub items: Vec<LineItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct LineItemResponse {
    pub id: Option<LineId>,
    pub item_id: ItemId,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct UpdateOrderResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub total_changed: bool,
    /// The update left no lines, so the order was deleted.
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct OrderTotalResponse {
    pub order_id: OrderId,
    pub total: Money,
}

#[derive(Debug, Serialize)]
pub struct OrderExistsResponse {
    pub order_id: OrderId,
    pub exists: bool,
}

impl From<&LineItem> for LineItemResponse {
    fn from(line: &LineItem) -> Self {
        Self {
            id: line.line_id,
            item_id: line.item_id,
            quantity: line.quantity,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id(),
            user_id: order.user_id(),
            status: order.status(),
            order_date: order.order_date(),
            total: order.total(),
            version: order.version(),
            items: order.items().iter().map(LineItemResponse::from).collect(),
        }
    }
}

// -- Handlers --

/// POST /orders: create an order from its requested lines.
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = payload?;

    let mut cmd = CreateOrder::new(req.user_id, req.items);
    if let Some(status) = req.status {
        cmd = cmd.with_status(status);
    }
    if let Some(order_date) = req.order_date {
        cmd = cmd.with_order_date(order_date);
    }

    let order = state.order_service.create_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/{id}: load one order.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.order_service.get_order(order_id).await?;
    Ok(Json(order.into()))
}

/// GET /orders?ids=a,b: load several orders, failing if any is missing.
#[tracing::instrument(skip(state, query))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    query: Result<Query<IdsQuery>, QueryRejection>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let Query(query) = query?;
    let raw = query
        .ids
        .ok_or_else(|| ApiError::BadRequest("Query parameter `ids` is required".to_string()))?;
    let ids = split_ids(&raw)
        .map(parse_order_id)
        .collect::<Result<Vec<_>, _>>()?;

    let orders = state.order_service.get_orders(&ids).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// PATCH /orders/{id}: apply a header patch and a line-item batch.
///
/// An update that removes the last line deletes the order; the response
/// then carries the emptied order with `deleted: true`.
#[tracing::instrument(skip(state, payload))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<UpdateOrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = payload?;

    let mut cmd = UpdateOrder::new(order_id, req.batch);
    if let Some(user_id) = req.user_id {
        cmd = cmd.with_user(user_id);
    }
    if let Some(status) = req.status {
        cmd = cmd.with_status(status);
    }
    if let Some(order_date) = req.order_date {
        cmd = cmd.with_order_date(order_date);
    }
    if let Some(version) = req.expected_version {
        cmd = cmd.expecting_version(version);
    }

    let updated = state.order_service.update_order(cmd).await?;
    Ok(Json(UpdateOrderResponse {
        order: updated.order.into(),
        total_changed: updated.total_changed,
        deleted: updated.deleted,
    }))
}

/// DELETE /orders/{id}: delete an order and return it.
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.order_service.delete_order(order_id).await?;
    Ok(Json(order.into()))
}

/// GET /orders/{id}/total: stored total of an order.
#[tracing::instrument(skip(state))]
pub async fn total(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderTotalResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let total = state.order_service.order_total(order_id).await?;
    Ok(Json(OrderTotalResponse { order_id, total }))
}

/// GET /orders/{id}/exists: whether an order exists.
#[tracing::instrument(skip(state))]
pub async fn exists(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderExistsResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let exists = state.order_service.order_exists(order_id).await?;
    Ok(Json(OrderExistsResponse { order_id, exists }))
}

/// GET /users/{user_id}/orders: every order placed by a user.
#[tracing::instrument(skip(state))]
pub async fn by_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let user_id = parse_uuid(&user_id).map(UserId::from_uuid)?;
    let orders = state.order_service.get_orders_by_user(user_id).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// POST /orders/{id}/payment: record a payment result.
#[tracing::instrument(skip(state, payload))]
pub async fn payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = payload?;

    tracing::info!(
        %order_id,
        payment_id = req.payment_id.as_deref().unwrap_or("-"),
        payment_status = ?req.payment_status,
        "Payment result received"
    );
    let order = state
        .order_service
        .update_order_status(RecordPayment::new(order_id, req.payment_status))
        .await?;
    Ok(Json(order.into()))
}

/// Splits a comma-separated id list, skipping blanks.
pub(crate) fn split_ids(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|id| !id.is_empty())
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    parse_uuid(id).map(OrderId::from_uuid)
}

fn parse_uuid(id: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(id).map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
