//! Catalog item endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::ItemId;
use domain::{CatalogItem, Money};
use serde::{Deserialize, Serialize};

use super::orders::{IdsQuery, split_ids};
use crate::AppState;
use crate::error::ApiError;

/// Body of both create and update.
#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub name: String,
    pub price: Money,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: ItemId,
    pub name: String,
    pub price: Money,
}

impl From<CatalogItem> for ItemResponse {
    fn from(item: CatalogItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            price: item.price,
        }
    }
}

/// POST /items: add an item to the catalog.
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let Json(req) = payload?;
    let item = state
        .order_service
        .catalog()
        .create_item(&req.name, req.price)
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// GET /items/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item_id = parse_item_id(&id)?;
    let item = state.order_service.catalog().get_item(item_id).await?;
    Ok(Json(item.into()))
}

/// GET /items?ids=1,2: load several items, failing if any is missing.
#[tracing::instrument(skip(state, query))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    query: Result<Query<IdsQuery>, QueryRejection>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let Query(query) = query?;
    let raw = query
        .ids
        .ok_or_else(|| ApiError::BadRequest("Query parameter `ids` is required".to_string()))?;
    let ids = split_ids(&raw)
        .map(parse_item_id)
        .collect::<Result<Vec<_>, _>>()?;

    let items = state.order_service.catalog().get_items(&ids).await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// PUT /items/{id}: rename and reprice an item.
#[tracing::instrument(skip(state, payload))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ItemRequest>, JsonRejection>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item_id = parse_item_id(&id)?;
    let Json(req) = payload?;
    let item = state
        .order_service
        .catalog()
        .update_item(item_id, &req.name, req.price)
        .await?;
    Ok(Json(item.into()))
}

/// DELETE /items/{id}
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item_id = parse_item_id(&id)?;
    let item = state.order_service.catalog().delete_item(item_id).await?;
    Ok(Json(item.into()))
}

fn parse_item_id(id: &str) -> Result<ItemId, ApiError> {
    id.parse::<i64>()
        .map(ItemId::new)
        .map_err(|e| ApiError::BadRequest(format!("Invalid item ID `{id}`: {e}")))
}
