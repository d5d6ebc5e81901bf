//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use common::{CorrelationId, UserId};
use domain::{Order, OrderStatus, Page, ProductId};
use orchestrator::{CreateOrder, NewOrderItem};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the authenticated caller's id; auth enforcement itself
/// happens upstream of this service.
const USER_HEADER: &str = "x-user-id";

/// Header carrying pagination metadata on list responses.
const PAGINATION_HEADER: &str = "x-pagination";

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub billing_address: String,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    #[serde(alias = "pageSize")]
    pub page_size: Option<u32>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub payment_status: String,
    pub total_cents: i64,
    pub shipping_address: String,
    pub billing_address: String,
    pub items: Vec<OrderItemResponse>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub tracking_number: Option<String>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        let items = order
            .items
            .iter()
            .map(|item| OrderItemResponse {
                product_id: item.product_id.to_string(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price.cents(),
                total_cents: item.total_price.cents(),
            })
            .collect();

        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            status: order.status.to_string(),
            payment_status: order.payment_status.to_string(),
            total_cents: order.total_amount.cents(),
            shipping_address: order.shipping_address.clone(),
            billing_address: order.billing_address.clone(),
            items,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.map(|t| t.to_rfc3339()),
            tracking_number: order.tracking_number.clone(),
        }
    }
}

// -- Handlers --

/// POST /orders — create an order from requested items.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let user_id = caller_id(&headers)?;
    let correlation_id = correlation_id(&headers);

    let items = req
        .items
        .into_iter()
        .map(|item| NewOrderItem {
            product_id: ProductId::from_uuid(item.product_id),
            quantity: item.quantity,
        })
        .collect();

    let cmd = CreateOrder {
        user_id,
        items,
        shipping_address: req.shipping_address,
        billing_address: req.billing_address,
    };

    let order = state.orchestrator.create_order(cmd, correlation_id).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/{id} — load one of the caller's orders.
#[tracing::instrument(skip(state, headers))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let user_id = caller_id(&headers)?;
    let order_id = parse_order_id(&id)?;

    let order = state
        .orchestrator
        .get_order(order_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders — list the caller's orders, newest first, with pagination
/// metadata in the `x-pagination` response header.
#[tracing::instrument(skip(state, headers))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller_id(&headers)?;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| {
            OrderStatus::parse(s).ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {s}")))
        })
        .transpose()?;
    let page = Page::new(
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(Page::DEFAULT_SIZE),
    );

    let (orders, info) = state.orchestrator.list_orders(user_id, status, page).await?;

    let responses: Vec<OrderResponse> = orders.iter().map(OrderResponse::from).collect();
    let pagination =
        serde_json::to_string(&info).map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(([(PAGINATION_HEADER, pagination)], Json(responses)))
}

/// PUT /orders/{id}/status — move an order to a new status.
#[tracing::instrument(skip(state, headers, req))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let correlation_id = correlation_id(&headers);

    let new_status = OrderStatus::parse(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {}", req.status)))?;

    let order = state
        .orchestrator
        .update_status(order_id, new_status, correlation_id)
        .await?;

    Ok(Json(OrderResponse::from(&order)))
}

// -- Helpers --

fn caller_id(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let value = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing user ID".to_string()))?;
    let uuid = Uuid::parse_str(value)
        .map_err(|_| ApiError::Unauthorized("Invalid user ID".to_string()))?;
    Ok(UserId::from_uuid(uuid))
}

fn correlation_id(headers: &HeaderMap) -> CorrelationId {
    headers
        .get(CorrelationId::HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(CorrelationId::parse)
        .unwrap_or_default()
}

fn parse_order_id(id: &str) -> Result<common::OrderId, ApiError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(common::OrderId::from_uuid(uuid))
}
